//! Key parameter generation

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive};
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::error::{Result, SchemeError};
use crate::utils::{generate_prime_with_rng, is_probable_prime, lcm};

/// Smallest prime size accepted by [`KeyParameters::generate`]
pub const MIN_PRIME_BITS: u64 = 8;

/// Miller-Rabin rounds used when no explicit count is given
pub const DEFAULT_PRIMALITY_ROUNDS: usize = 20;

/// The fixed secret primes of a run and the values derived from them.
///
/// Generated once and then shared read-only by every encryption,
/// decryption and classification call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyParameters {
    pub(crate) p: BigUint,
    pub(crate) q: BigUint,
    pub(crate) n: BigUint,      // p * q
    pub(crate) lambda: BigUint, // lcm(p-1, q-1)
    pub(crate) phi: BigUint,    // (p-1)(q-1)
}

impl KeyParameters {
    /// Generate two distinct primes of `bit_size` bits each
    ///
    /// # Example
    ///
    /// ```rust
    /// use exphe::KeyParameters;
    ///
    /// let params = KeyParameters::generate(64).expect("Failed to generate parameters");
    /// assert_ne!(params.p(), params.q());
    /// ```
    pub fn generate(bit_size: u64) -> Result<Self> {
        Self::generate_with_rng(bit_size, DEFAULT_PRIMALITY_ROUNDS, &mut thread_rng())
    }

    /// Generate parameters from an explicit random source
    pub fn generate_with_rng<R: Rng + ?Sized>(
        bit_size: u64,
        rounds: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if bit_size < MIN_PRIME_BITS {
            return Err(SchemeError::InvalidKeySize(bit_size));
        }

        let p = generate_prime_with_rng(bit_size, rounds, rng)?;
        let mut q = generate_prime_with_rng(bit_size, rounds, rng)?;
        while q == p {
            q = generate_prime_with_rng(bit_size, rounds, rng)?;
        }

        let params = Self::derive(p, q);
        info!(
            p_bits = params.p.bits(),
            q_bits = params.q.bits(),
            n_bits = params.n.bits(),
            lambda_bits = params.lambda.bits(),
            "key parameters generated"
        );
        Ok(params)
    }

    /// Build parameters from known primes, e.g. toy values for experiments
    pub fn from_primes(p: BigUint, q: BigUint) -> Result<Self> {
        if p == q {
            return Err(SchemeError::InvalidParameter(
                "p and q must be distinct".to_string(),
            ));
        }
        for (name, value) in [("p", &p), ("q", &q)] {
            if !is_probable_prime(value, DEFAULT_PRIMALITY_ROUNDS) {
                return Err(SchemeError::InvalidParameter(format!(
                    "{} = {} is not prime",
                    name, value
                )));
            }
        }
        Ok(Self::derive(p, q))
    }

    fn derive(p: BigUint, q: BigUint) -> Self {
        let p_minus_1 = &p - BigUint::one();
        let q_minus_1 = &q - BigUint::one();

        let n = &p * &q;
        let lambda = lcm(&p_minus_1, &q_minus_1);
        let phi = &p_minus_1 * &q_minus_1;

        KeyParameters {
            p,
            q,
            n,
            lambda,
            phi,
        }
    }

    /// Get the first prime
    pub fn p(&self) -> &BigUint {
        &self.p
    }

    /// Get the second prime
    pub fn q(&self) -> &BigUint {
        &self.q
    }

    /// Get n = p * q
    pub fn modulus(&self) -> &BigUint {
        &self.n
    }

    /// Carmichael function λ(n) = lcm(p-1, q-1)
    pub fn lambda(&self) -> &BigUint {
        &self.lambda
    }

    /// Euler totient φ(n) = (p-1)(q-1)
    pub fn phi(&self) -> &BigUint {
        &self.phi
    }

    /// ⌊p/2⌋
    pub fn p_half(&self) -> BigUint {
        &self.p >> 1
    }

    /// λ(n)/φ(n), i.e. 1 / gcd(p-1, q-1)
    pub fn lambda_phi_ratio(&self) -> f64 {
        match (self.lambda.to_f64(), self.phi.to_f64()) {
            (Some(l), Some(f)) if f.is_finite() && l.is_finite() && f > 0.0 => l / f,
            _ => {
                let g = &self.phi / &self.lambda;
                g.to_f64().map(|g| 1.0 / g).unwrap_or(0.0)
            }
        }
    }

    /// Bit size of p
    pub fn bit_size(&self) -> u64 {
        self.p.bits()
    }
}

impl fmt::Display for KeyParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KeyParameters(p: {} bits, n: {} bits)",
            self.p.bits(),
            self.n.bits()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::ToBigUint;
    use num_integer::Integer;

    #[test]
    fn test_parameter_generation() {
        let params = KeyParameters::generate(128).unwrap();
        assert_eq!(params.p().bits(), 128);
        assert_eq!(params.q().bits(), 128);
        assert_ne!(params.p(), params.q());
        assert_eq!(params.modulus(), &(params.p() * params.q()));

        let p1 = params.p() - 1u32;
        let q1 = params.q() - 1u32;
        assert_eq!(params.phi(), &(&p1 * &q1));
        assert!(params.lambda().is_multiple_of(&p1));
        assert!(params.lambda().is_multiple_of(&q1));
        assert!(params.phi().is_multiple_of(params.lambda()));
    }

    #[test]
    fn test_key_size_validation() {
        assert_eq!(
            KeyParameters::generate(4),
            Err(SchemeError::InvalidKeySize(4))
        );
        assert!(KeyParameters::generate(MIN_PRIME_BITS).is_ok());
    }

    #[test]
    fn test_toy_primes() {
        let params = KeyParameters::from_primes(
            1009u32.to_biguint().unwrap(),
            1013u32.to_biguint().unwrap(),
        )
        .unwrap();

        assert_eq!(params.modulus(), &1_022_117u32.to_biguint().unwrap());
        assert_eq!(params.lambda(), &255_024u32.to_biguint().unwrap());
        assert_eq!(params.phi(), &1_020_096u32.to_biguint().unwrap());
        assert_eq!(params.p_half(), 504u32.to_biguint().unwrap());
        assert!((params.lambda_phi_ratio() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_from_primes_validation() {
        let p = 1009u32.to_biguint().unwrap();
        assert!(KeyParameters::from_primes(p.clone(), p.clone()).is_err());
        assert!(KeyParameters::from_primes(p, 1011u32.to_biguint().unwrap()).is_err());
    }
}
