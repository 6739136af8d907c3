//! # Exponential Homomorphic Encryption Testbed
//!
//! This library implements a probabilistic, partially homomorphic encryption
//! scheme over large integers, C = M^(w·λ(n)+1) mod (p·z), together with
//! diagnostics explaining why a ciphertext occasionally fails to randomize
//! its message.
//!
//! ## Features
//!
//! - **Key parameters**: two distinct probable primes with n, λ(n) and φ(n)
//! - **Two scheme variants**: a validated variant that rejection-samples a prime
//!   auxiliary modulus against probe messages, and a relaxed variant that only
//!   resamples when the actual ciphertext is trivial
//! - **Centered-remainder decryption** of signed messages
//! - **Failure classification** of trivial ciphertexts by multiplicative order
//!   and factorization
//! - **Parallel trials** with per-worker statistics and a final reduction
//!
//! ## Example
//!
//! ```rust
//! use exphe::{Scheme, SchemeConfig};
//!
//! let config = SchemeConfig::validated()
//!     .with_prime_bits(64)
//!     .with_message_bits(16)
//!     .with_aux_modulus_bits(64)
//!     .with_mask_bits(64);
//! let scheme = Scheme::generate(config).unwrap();
//!
//! let message = scheme.random_message().unwrap();
//! let ciphertext = scheme.encrypt(&message).unwrap();
//!
//! assert_eq!(scheme.decrypt(&ciphertext), message);
//! ```

pub mod bitstream;
pub mod classify;
pub mod encryption;
pub mod error;
pub mod experiment;
pub mod keys;
pub mod stats;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use classify::{
    classify_trivial_case, Classification, FailureClassifier, PrimeEvidence, UnknownReason,
};
pub use encryption::Scheme;
pub use error::{Result, SchemeError};
pub use experiment::Experiment;
pub use keys::KeyParameters;
pub use stats::{Summary, TrialOutcome, TrialStats};
pub use types::{
    Ciphertext, Encryption, EncryptionRandomness, GroupOrder, ModulusBase, SchemeConfig,
    SchemeVariant,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Generate key parameters with two `bit_length`-bit primes
pub fn generate_key_parameters(bit_length: u64) -> Result<KeyParameters> {
    KeyParameters::generate(bit_length)
}
