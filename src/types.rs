//! Core types and data structures

use num_bigint::{BigInt, BigUint};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{Result, SchemeError};
use crate::utils::to_residue;

/// How the encryption engine protects against trivial ciphertexts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemeVariant {
    /// Prime auxiliary modulus, validated against fresh probe messages before use
    Validated,
    /// Arbitrary odd auxiliary modulus; only the actual ciphertext is checked and resampled
    Relaxed,
}

impl fmt::Display for SchemeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemeVariant::Validated => write!(f, "Validated"),
            SchemeVariant::Relaxed => write!(f, "Relaxed"),
        }
    }
}

/// Group-order function multiplied into the blinding exponent
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupOrder {
    /// λ(n) = lcm(p-1, q-1)
    Carmichael,
    /// φ(n) = (p-1)(q-1)
    Euler,
}

/// Which fixed factor the auxiliary modulus is multiplied with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModulusBase {
    /// Working modulus p·z
    Prime,
    /// Working modulus n·z
    Composite,
}

/// Per-encryption randomness: the mask `w` and auxiliary modulus `z`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionRandomness {
    pub w: BigUint,
    pub z: BigUint,
}

impl EncryptionRandomness {
    pub fn new(w: BigUint, z: BigUint) -> Self {
        EncryptionRandomness { w, z }
    }

    /// ek = w · group_order
    pub fn blinding_exponent(&self, group_order: &BigUint) -> BigUint {
        &self.w * group_order
    }
}

/// Ciphertext C = M^(ek+1) mod pk, together with the working modulus pk
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext {
    pub(crate) value: BigUint,
    pub(crate) modulus: BigUint,
}

impl Ciphertext {
    /// Create a new ciphertext
    pub fn new(value: BigUint, modulus: BigUint) -> Self {
        Ciphertext { value, modulus }
    }

    /// Get the ciphertext value
    pub fn value(&self) -> &BigUint {
        &self.value
    }

    /// Get the working modulus the ciphertext was reduced by
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Bit length of the ciphertext value
    pub fn bit_length(&self) -> u64 {
        self.value.bits()
    }

    /// Whether this ciphertext equals `message` in the residue domain of its modulus
    pub fn is_trivial_for(&self, message: &BigInt) -> bool {
        self.value == to_residue(message, &self.modulus)
    }
}

impl fmt::Display for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ciphertext({} bits, modulus {} bits)",
            self.bit_length(),
            self.modulus.bits()
        )
    }
}

/// Everything produced by a single encryption call
#[derive(Clone, Debug)]
pub struct Encryption {
    pub message: BigInt,
    pub ciphertext: Ciphertext,
    /// Randomness behind the returned ciphertext
    pub randomness: EncryptionRandomness,
    /// Rejected auxiliary moduli (validated) or trivial draws (relaxed)
    pub rejections: usize,
    /// Draws whose ciphertext for the actual message was trivial
    pub trivial_draws: Vec<EncryptionRandomness>,
    pub elapsed: Duration,
}

impl Encryption {
    /// Whether the returned ciphertext equals the message
    pub fn is_trivial(&self) -> bool {
        self.ciphertext.is_trivial_for(&self.message)
    }
}

/// Configuration for the scheme engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeConfig {
    /// Bit size of p and q
    pub prime_bits: u64,
    /// Maximum bit size of message magnitudes
    pub message_bits: u64,
    /// Bit size of the auxiliary modulus z
    pub aux_modulus_bits: u64,
    /// Bit size of the mask w
    pub mask_bits: u64,
    /// Probe messages each candidate z must pass (validated variant)
    pub probe_count: usize,
    /// Attempt cap for the z search or the trivial-ciphertext retry loop
    pub max_search_attempts: usize,
    /// Iteration cap for multiplicative order searches during classification
    pub order_iteration_cap: u64,
    /// Number of Miller-Rabin rounds for primality testing
    pub primality_rounds: usize,
    pub variant: SchemeVariant,
    pub group_order: GroupOrder,
    pub modulus_base: ModulusBase,
}

impl Default for SchemeConfig {
    fn default() -> Self {
        SchemeConfig {
            prime_bits: 512,
            message_bits: 64,
            aux_modulus_bits: 512,
            mask_bits: 512,
            probe_count: 5,
            max_search_attempts: 100,
            order_iteration_cap: 100_000,
            primality_rounds: 20,
            variant: SchemeVariant::Validated,
            group_order: GroupOrder::Carmichael,
            modulus_base: ModulusBase::Prime,
        }
    }
}

impl SchemeConfig {
    /// Validated variant: prime z checked against probes, ek = w·λ(n), modulus p·z
    pub fn validated() -> Self {
        Self::default()
    }

    /// Relaxed variant: random odd z, 32-bit mask, ek = w·λ(n), modulus n·z
    pub fn relaxed() -> Self {
        SchemeConfig {
            mask_bits: 32,
            variant: SchemeVariant::Relaxed,
            modulus_base: ModulusBase::Composite,
            ..Self::default()
        }
    }

    pub fn with_prime_bits(mut self, bits: u64) -> Self {
        self.prime_bits = bits;
        self
    }

    pub fn with_message_bits(mut self, bits: u64) -> Self {
        self.message_bits = bits;
        self
    }

    pub fn with_aux_modulus_bits(mut self, bits: u64) -> Self {
        self.aux_modulus_bits = bits;
        self
    }

    pub fn with_mask_bits(mut self, bits: u64) -> Self {
        self.mask_bits = bits;
        self
    }

    pub fn with_probe_count(mut self, count: usize) -> Self {
        self.probe_count = count;
        self
    }

    pub fn with_max_search_attempts(mut self, attempts: usize) -> Self {
        self.max_search_attempts = attempts;
        self
    }

    pub fn with_order_iteration_cap(mut self, cap: u64) -> Self {
        self.order_iteration_cap = cap;
        self
    }

    pub fn with_group_order(mut self, group_order: GroupOrder) -> Self {
        self.group_order = group_order;
        self
    }

    pub fn with_modulus_base(mut self, base: ModulusBase) -> Self {
        self.modulus_base = base;
        self
    }

    /// Check the scalars against each other and against the actual size of p
    pub fn validate(&self, p_bits: u64) -> Result<()> {
        if self.message_bits < 2 {
            return Err(SchemeError::InvalidParameter(format!(
                "message size must be at least 2 bits, got {}",
                self.message_bits
            )));
        }
        // |M| < 2^message_bits <= 2^(p_bits - 2) <= p/2
        if self.message_bits + 2 > p_bits {
            return Err(SchemeError::MessageTooLarge {
                message_bits: self.message_bits,
                prime_bits: p_bits,
            });
        }
        if self.aux_modulus_bits < 2 {
            return Err(SchemeError::InvalidParameter(
                "auxiliary modulus must have at least 2 bits".to_string(),
            ));
        }
        if self.mask_bits == 0 {
            return Err(SchemeError::InvalidParameter(
                "mask must have at least 1 bit".to_string(),
            ));
        }
        if self.max_search_attempts == 0 {
            return Err(SchemeError::InvalidParameter(
                "search attempt cap must be positive".to_string(),
            ));
        }
        if self.variant == SchemeVariant::Validated && self.probe_count == 0 {
            return Err(SchemeError::InvalidParameter(
                "validated variant needs at least one probe message".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::ToBigUint;

    #[test]
    fn test_trivial_detection_uses_residues() {
        let ct = Ciphertext::new(1002u32.to_biguint().unwrap(), 1009u32.to_biguint().unwrap());
        assert!(ct.is_trivial_for(&BigInt::from(-7)));
        assert!(!ct.is_trivial_for(&BigInt::from(7)));
    }

    #[test]
    fn test_config_validation() {
        assert!(SchemeConfig::default().validate(512).is_ok());
        assert_eq!(
            SchemeConfig::default().validate(65),
            Err(SchemeError::MessageTooLarge {
                message_bits: 64,
                prime_bits: 65
            })
        );
        assert!(SchemeConfig::default().validate(66).is_ok());
        assert!(SchemeConfig::default()
            .with_max_search_attempts(0)
            .validate(512)
            .is_err());
        assert!(SchemeConfig::relaxed()
            .with_probe_count(0)
            .validate(512)
            .is_ok());
    }

    #[test]
    fn test_relaxed_preset() {
        let config = SchemeConfig::relaxed();
        assert_eq!(config.variant, SchemeVariant::Relaxed);
        assert_eq!(config.modulus_base, ModulusBase::Composite);
        assert_eq!(config.group_order, GroupOrder::Carmichael);
        assert_eq!(config.mask_bits, 32);
    }
}
