//! Encryption and decryption engines

use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::One;
use rand::{thread_rng, Rng};
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::{Result, SchemeError};
use crate::keys::KeyParameters;
use crate::types::{
    Ciphertext, Encryption, EncryptionRandomness, GroupOrder, ModulusBase, SchemeConfig,
    SchemeVariant,
};
use crate::utils::{
    centered_remainder, generate_prime_with_rng, mod_exp, random_message_with_rng,
    random_odd_with_rng, to_residue,
};

/// Scheme engine bound to one set of key parameters.
///
/// Holds no mutable state, so a single instance can be shared across
/// threads running independent trials.
#[derive(Clone, Debug)]
pub struct Scheme {
    params: KeyParameters,
    config: SchemeConfig,
}

impl Scheme {
    /// Create a scheme, rejecting configurations whose messages could leave (-p/2, p/2)
    pub fn new(params: KeyParameters, config: SchemeConfig) -> Result<Self> {
        config.validate(params.bit_size())?;
        Ok(Scheme { params, config })
    }

    /// Generate fresh key parameters of `config.prime_bits` and build a scheme on them
    pub fn generate(config: SchemeConfig) -> Result<Self> {
        let params = KeyParameters::generate_with_rng(
            config.prime_bits,
            config.primality_rounds,
            &mut thread_rng(),
        )?;
        Self::new(params, config)
    }

    pub fn params(&self) -> &KeyParameters {
        &self.params
    }

    pub fn config(&self) -> &SchemeConfig {
        &self.config
    }

    /// λ(n) or φ(n), depending on the configuration
    pub fn group_order(&self) -> &BigUint {
        match self.config.group_order {
            GroupOrder::Carmichael => self.params.lambda(),
            GroupOrder::Euler => self.params.phi(),
        }
    }

    /// pk = p·z or n·z
    pub fn working_modulus(&self, z: &BigUint) -> BigUint {
        match self.config.modulus_base {
            ModulusBase::Prime => self.params.p() * z,
            ModulusBase::Composite => self.params.modulus() * z,
        }
    }

    /// Check that `message` lies in (-p/2, p/2) and is not one of {-1, 0, 1}
    pub fn check_message(&self, message: &BigInt) -> Result<()> {
        let magnitude = message.magnitude();
        if magnitude <= &BigUint::one() {
            return Err(SchemeError::InvalidMessage(format!(
                "{} produces degenerate exponentiation",
                message
            )));
        }
        let doubled: BigUint = magnitude << 1;
        if &doubled >= self.params.p() {
            return Err(SchemeError::InvalidMessage(format!(
                "|{}| is not below p/2",
                message
            )));
        }
        Ok(())
    }

    /// Sample a message with `config.message_bits` magnitude and random sign
    pub fn random_message(&self) -> Result<BigInt> {
        self.random_message_with_rng(&mut thread_rng())
    }

    pub fn random_message_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<BigInt> {
        let message = random_message_with_rng(self.config.message_bits, rng)?;
        self.check_message(&message)?;
        Ok(message)
    }

    /// Encrypt a message with fresh randomness
    pub fn encrypt(&self, message: &BigInt) -> Result<Ciphertext> {
        self.encrypt_detailed(message).map(|e| e.ciphertext)
    }

    /// Encrypt and keep the randomness, rejection count and timing
    pub fn encrypt_detailed(&self, message: &BigInt) -> Result<Encryption> {
        self.encrypt_detailed_with_rng(message, &mut thread_rng())
    }

    pub fn encrypt_detailed_with_rng<R: Rng + ?Sized>(
        &self,
        message: &BigInt,
        rng: &mut R,
    ) -> Result<Encryption> {
        self.check_message(message)?;

        match self.config.variant {
            SchemeVariant::Validated => self.encrypt_validated(message, rng),
            SchemeVariant::Relaxed => self.encrypt_relaxed(message, rng),
        }
    }

    /// C = M^(ek+1) mod pk for caller-supplied randomness, without any search
    pub fn encrypt_with_randomness(
        &self,
        message: &BigInt,
        randomness: &EncryptionRandomness,
    ) -> Result<Ciphertext> {
        self.check_message(message)?;
        if randomness.z <= BigUint::one() {
            return Err(SchemeError::InvalidParameter(
                "auxiliary modulus must be at least 2".to_string(),
            ));
        }

        let pk = self.working_modulus(&randomness.z);
        let exponent = randomness.blinding_exponent(self.group_order()) + 1u32;
        let base = to_residue(message, &pk);
        let value = mod_exp(&base, &exponent, &pk);

        Ok(Ciphertext::new(value, pk))
    }

    fn encrypt_validated<R: Rng + ?Sized>(&self, message: &BigInt, rng: &mut R) -> Result<Encryption> {
        let start = Instant::now();

        let w = self.sample_mask(rng);
        let ek = &w * self.group_order();
        let (z, attempts) = self.find_auxiliary_modulus(&ek, rng)?;

        let randomness = EncryptionRandomness::new(w, z);
        let ciphertext = self.encrypt_with_randomness(message, &randomness)?;
        let elapsed = start.elapsed();

        let trivial_draws = if ciphertext.is_trivial_for(message) {
            debug!(%message, "validated auxiliary modulus still produced a trivial ciphertext");
            vec![randomness.clone()]
        } else {
            Vec::new()
        };

        Ok(Encryption {
            message: message.clone(),
            ciphertext,
            randomness,
            rejections: attempts - 1,
            trivial_draws,
            elapsed,
        })
    }

    fn encrypt_relaxed<R: Rng + ?Sized>(&self, message: &BigInt, rng: &mut R) -> Result<Encryption> {
        let start = Instant::now();
        let mut trivial_draws = Vec::new();

        for _ in 0..self.config.max_search_attempts {
            let z = random_odd_with_rng(self.config.aux_modulus_bits, rng);
            let w = self.sample_mask(rng);
            let randomness = EncryptionRandomness::new(w, z);

            let ciphertext = self.encrypt_with_randomness(message, &randomness)?;
            if !ciphertext.is_trivial_for(message) {
                return Ok(Encryption {
                    message: message.clone(),
                    ciphertext,
                    randomness,
                    rejections: trivial_draws.len(),
                    trivial_draws,
                    elapsed: start.elapsed(),
                });
            }

            debug!(
                %message,
                rejections = trivial_draws.len() + 1,
                "trivial ciphertext, resampling auxiliary modulus"
            );
            trivial_draws.push(randomness);
        }

        warn!(
            attempts = self.config.max_search_attempts,
            "no non-trivial ciphertext found"
        );
        Err(SchemeError::NonTrivialSearchExhausted {
            attempts: self.config.max_search_attempts,
        })
    }

    /// Rejection-sample a prime z such that fresh probe messages are coprime to z
    /// and do not encrypt to themselves under ek.
    ///
    /// Returns the modulus and the number of candidates drawn.
    pub fn find_auxiliary_modulus<R: Rng + ?Sized>(
        &self,
        ek: &BigUint,
        rng: &mut R,
    ) -> Result<(BigUint, usize)> {
        let exponent = ek + 1u32;

        for attempt in 1..=self.config.max_search_attempts {
            let z = generate_prime_with_rng(
                self.config.aux_modulus_bits,
                self.config.primality_rounds,
                rng,
            )?;
            let pk = self.working_modulus(&z);

            let mut valid = true;
            for _ in 0..self.config.probe_count {
                let probe = self.random_message_with_rng(rng)?;

                if !probe.magnitude().gcd(&z).is_one() {
                    valid = false;
                    break;
                }

                let residue = to_residue(&probe, &pk);
                if mod_exp(&residue, &exponent, &pk) == residue {
                    valid = false;
                    break;
                }
            }

            if valid {
                return Ok((z, attempt));
            }
            debug!(attempt, z_bits = z.bits(), "auxiliary modulus rejected by probe");
        }

        warn!(
            attempts = self.config.max_search_attempts,
            "auxiliary modulus search exhausted"
        );
        Err(SchemeError::AuxiliaryModulusSearchExhausted {
            attempts: self.config.max_search_attempts,
        })
    }

    /// Recover the signed message as the centered remainder of C modulo p
    pub fn decrypt(&self, ciphertext: &Ciphertext) -> BigInt {
        centered_remainder(ciphertext.value(), self.params.p())
    }

    /// Encrypt `count` freshly sampled messages
    pub fn generate_many_ciphertexts(&self, count: usize) -> Result<Vec<(BigInt, Ciphertext)>> {
        let mut rng = thread_rng();
        (0..count)
            .map(|_| {
                let message = self.random_message_with_rng(&mut rng)?;
                let encryption = self.encrypt_detailed_with_rng(&message, &mut rng)?;
                Ok((message, encryption.ciphertext))
            })
            .collect()
    }

    /// w in [1, 2^mask_bits]
    fn sample_mask<R: Rng + ?Sized>(&self, rng: &mut R) -> BigUint {
        rng.gen_biguint(self.config.mask_bits) + 1u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::ToBigUint;

    fn toy_scheme(config: SchemeConfig) -> Scheme {
        let params = KeyParameters::from_primes(
            1009u32.to_biguint().unwrap(),
            1013u32.to_biguint().unwrap(),
        )
        .unwrap();
        Scheme::new(params, config.with_message_bits(8)).unwrap()
    }

    fn small_config(config: SchemeConfig) -> SchemeConfig {
        config
            .with_prime_bits(64)
            .with_message_bits(16)
            .with_aux_modulus_bits(64)
            .with_mask_bits(64)
    }

    #[test]
    fn test_encryption_decryption() {
        let scheme = Scheme::generate(small_config(SchemeConfig::validated())).unwrap();

        for m in [42i64, -42, 2, -2, 65_535, -65_535] {
            let message = BigInt::from(m);
            let ciphertext = scheme.encrypt(&message).unwrap();
            assert!(ciphertext.value() < ciphertext.modulus());
            assert_eq!(scheme.decrypt(&ciphertext), message);
        }
    }

    #[test]
    fn test_relaxed_encryption_is_never_trivial() {
        let scheme = Scheme::generate(small_config(SchemeConfig::relaxed())).unwrap();

        for _ in 0..50 {
            let message = scheme.random_message().unwrap();
            let encryption = scheme.encrypt_detailed(&message).unwrap();
            assert!(!encryption.is_trivial());
            assert_eq!(encryption.rejections, encryption.trivial_draws.len());
            assert_eq!(scheme.decrypt(&encryption.ciphertext), message);
        }
    }

    #[test]
    fn test_working_modulus_follows_config() {
        let z = 11u32.to_biguint().unwrap();

        let prime = toy_scheme(SchemeConfig::validated());
        assert_eq!(prime.working_modulus(&z), 11_099u32.to_biguint().unwrap());

        let composite = toy_scheme(SchemeConfig::relaxed());
        assert_eq!(
            composite.working_modulus(&z),
            11_243_287u32.to_biguint().unwrap()
        );
    }

    #[test]
    fn test_known_trivial_ciphertext() {
        let scheme = toy_scheme(SchemeConfig::validated());

        // ord_11(7) = 10 divides 5·λ(n), so 7 encrypts to itself under z = 11
        let randomness =
            EncryptionRandomness::new(5u32.to_biguint().unwrap(), 11u32.to_biguint().unwrap());
        let ciphertext = scheme
            .encrypt_with_randomness(&BigInt::from(7), &randomness)
            .unwrap();
        assert_eq!(ciphertext.value(), &7u32.to_biguint().unwrap());
        assert!(ciphertext.is_trivial_for(&BigInt::from(7)));

        // With w = 1 the order does not divide ek and the ciphertext is randomized
        let randomness =
            EncryptionRandomness::new(1u32.to_biguint().unwrap(), 11u32.to_biguint().unwrap());
        let ciphertext = scheme
            .encrypt_with_randomness(&BigInt::from(7), &randomness)
            .unwrap();
        assert!(!ciphertext.is_trivial_for(&BigInt::from(7)));
        assert_eq!(scheme.decrypt(&ciphertext), BigInt::from(7));
    }

    #[test]
    fn test_message_range_checks() {
        let scheme = toy_scheme(SchemeConfig::validated());

        for m in [-1i64, 0, 1, 505, -505, 2000] {
            assert!(scheme.check_message(&BigInt::from(m)).is_err(), "{}", m);
        }
        for m in [2i64, -2, 504, -504] {
            assert!(scheme.check_message(&BigInt::from(m)).is_ok(), "{}", m);
        }
    }

    #[test]
    fn test_message_too_large_for_primes() {
        let params = KeyParameters::from_primes(
            1009u32.to_biguint().unwrap(),
            1013u32.to_biguint().unwrap(),
        )
        .unwrap();
        let result = Scheme::new(params, SchemeConfig::default());
        assert_eq!(
            result.err(),
            Some(SchemeError::MessageTooLarge {
                message_bits: 64,
                prime_bits: 10
            })
        );
    }

    #[test]
    fn test_search_exhaustion_is_reported() {
        // A 2-bit auxiliary modulus is always 3. Every probe either shares that
        // factor or has order dividing 2 | λ(n) modulo 3, so no candidate passes.
        let scheme = toy_scheme(
            SchemeConfig::validated()
                .with_aux_modulus_bits(2)
                .with_max_search_attempts(3),
        );
        let result = scheme.encrypt(&BigInt::from(9));
        assert_eq!(
            result.err(),
            Some(SchemeError::AuxiliaryModulusSearchExhausted { attempts: 3 })
        );
    }

    #[test]
    fn test_relaxed_exhaustion_is_fatal() {
        // z is always 3 and 3 | M, so every draw is trivial
        let scheme = toy_scheme(
            SchemeConfig::relaxed()
                .with_aux_modulus_bits(2)
                .with_max_search_attempts(4),
        );
        let result = scheme.encrypt(&BigInt::from(9));
        assert_eq!(
            result.err(),
            Some(SchemeError::NonTrivialSearchExhausted { attempts: 4 })
        );
    }

    #[test]
    fn test_generate_many_ciphertexts() {
        let scheme = Scheme::generate(small_config(SchemeConfig::relaxed())).unwrap();
        let batch = scheme.generate_many_ciphertexts(20).unwrap();

        assert_eq!(batch.len(), 20);
        for (message, ciphertext) in &batch {
            assert_eq!(&scheme.decrypt(ciphertext), message);
        }
    }
}
