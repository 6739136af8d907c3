//! Error types for the scheme engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SchemeError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemeError {
    #[error("Invalid key size: {0} bits (must be at least {min})", min = crate::keys::MIN_PRIME_BITS)]
    InvalidKeySize(u64),

    #[error("Message size of {message_bits} bits is too large for {prime_bits}-bit primes")]
    MessageTooLarge { message_bits: u64, prime_bits: u64 },

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Could not find a valid auxiliary modulus after {attempts} attempts")]
    AuxiliaryModulusSearchExhausted { attempts: usize },

    #[error("Every ciphertext was trivial across {attempts} attempts")]
    NonTrivialSearchExhausted { attempts: usize },

    #[error("Multiplicative order not found within {cap} iterations")]
    OrderComputationTimeout { cap: u64 },

    #[error("Element is not invertible modulo the given modulus")]
    NotInvertible,

    #[error("Factorization incomplete: {0}")]
    FactorizationIncomplete(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Cryptographic error: {0}")]
    CryptoError(String),
}
