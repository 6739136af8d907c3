//! Diagnosis of trivial ciphertexts.
//!
//! A ciphertext C = M^(ek+1) mod (p·z) or mod (n·z) equals M exactly when
//! M^(ek+1) ≡ M holds modulo every prime power dividing z (the congruence
//! modulo p or n always holds because λ(n) divides ek). That leaves two ways for
//! the auxiliary modulus to fail:
//!
//! - **Case 1**: gcd(M, z) = 1 and ord_z(M) divides ek.
//! - **Case 2**: gcd(M, z) > 1 and for every prime power r^b ∥ z either
//!   r^b divides M, or r ∤ M and ord_{r^b}(M) divides ek.
//!
//! Anything else, including an order search that hits its cap or a
//! modulus that cannot be factored, is reported as `Unknown`.

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Pow, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SchemeError;
use crate::utils::{factorize, multiplicative_order, to_residue, valuation};

/// Default iteration cap for multiplicative order searches
pub const DEFAULT_ORDER_ITERATION_CAP: u64 = 100_000;

/// Default iteration budget for Pollard's rho while factoring z
pub const DEFAULT_FACTOR_ITERATION_CAP: u64 = 200_000;

/// What one prime of z contributes to a shared-factor diagnosis
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimeEvidence {
    pub prime: BigUint,
    /// Exponent b of the prime in z
    pub exponent_in_modulus: u32,
    /// Exponent a of the prime in M
    pub exponent_in_message: u32,
    /// ord_{prime^b}(M) when the prime does not divide M
    pub order: Option<BigUint>,
    pub allows_failure: bool,
}

/// Why no sufficient condition could be established
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnknownReason {
    /// Coprime case, but ord_z(M) does not divide ek
    OrderDoesNotDivide { order: BigUint },
    /// An order search reached its iteration cap
    OrderSearchExhausted { cap: u64 },
    /// Shared-factor case, but at least one prime of z rules out failure
    PrimeBlocksFailure { evidence: Vec<PrimeEvidence> },
    /// z could not be fully factored
    FactorizationIncomplete(String),
    /// The inputs admit no order or factorization, e.g. z = 0
    ArithmeticError(String),
    /// M = 0 is divisible by everything and carries no information
    DegenerateMessage,
}

/// Diagnosis of a trivial-ciphertext event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    /// gcd(M, z) = 1 and ord_z(M) divides ek; `quotient` is ek / order
    Case1 { order: BigUint, quotient: BigUint },
    /// gcd(M, z) > 1 and every prime of z allows failure
    Case2 {
        gcd: BigUint,
        evidence: Vec<PrimeEvidence>,
    },
    Unknown(UnknownReason),
}

impl Classification {
    /// "Case 1", "Case 2" or "Unknown"
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Case1 { .. } => "Case 1",
            Classification::Case2 { .. } => "Case 2",
            Classification::Unknown(_) => "Unknown",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Classification::Unknown(_))
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Case1 { order, quotient } => {
                write!(f, "Case 1 (order {}, ek = {} * order)", order, quotient)
            }
            Classification::Case2 { gcd, evidence } => {
                write!(f, "Case 2 (gcd {}, {} primes)", gcd, evidence.len())
            }
            Classification::Unknown(reason) => write!(f, "Unknown ({:?})", reason),
        }
    }
}

/// Classifier with explicit iteration caps
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FailureClassifier {
    order_iteration_cap: u64,
    factor_iteration_cap: u64,
}

impl Default for FailureClassifier {
    fn default() -> Self {
        FailureClassifier {
            order_iteration_cap: DEFAULT_ORDER_ITERATION_CAP,
            factor_iteration_cap: DEFAULT_FACTOR_ITERATION_CAP,
        }
    }
}

impl FailureClassifier {
    pub fn new(order_iteration_cap: u64, factor_iteration_cap: u64) -> Self {
        FailureClassifier {
            order_iteration_cap,
            factor_iteration_cap,
        }
    }

    /// Classify a trivial ciphertext produced from `message` with mask `w`,
    /// auxiliary modulus `z` and blinding exponent ek = w · `group_order`.
    ///
    /// Pure: the same inputs always give the same record.
    pub fn classify(
        &self,
        message: &BigInt,
        z: &BigUint,
        w: &BigUint,
        group_order: &BigUint,
    ) -> Classification {
        if message.is_zero() {
            return Classification::Unknown(UnknownReason::DegenerateMessage);
        }
        if z.is_zero() {
            return Classification::Unknown(self.recover(SchemeError::InvalidParameter(
                "auxiliary modulus must be positive".to_string(),
            )));
        }

        let ek = w * group_order;
        let g = message.magnitude().gcd(z);

        if g.is_one() {
            self.classify_coprime(message, z, &ek)
        } else {
            self.classify_shared(message, z, &ek, g)
        }
    }

    fn classify_coprime(&self, message: &BigInt, z: &BigUint, ek: &BigUint) -> Classification {
        let base = to_residue(message, z);
        match multiplicative_order(&base, z, self.order_iteration_cap) {
            Ok(order) => {
                if ek.is_multiple_of(&order) {
                    let quotient = ek / &order;
                    Classification::Case1 { order, quotient }
                } else {
                    Classification::Unknown(UnknownReason::OrderDoesNotDivide { order })
                }
            }
            Err(e) => Classification::Unknown(self.recover(e)),
        }
    }

    fn classify_shared(
        &self,
        message: &BigInt,
        z: &BigUint,
        ek: &BigUint,
        gcd: BigUint,
    ) -> Classification {
        let factors = match factorize(z, self.factor_iteration_cap) {
            Ok(factors) => factors,
            Err(e) => return Classification::Unknown(self.recover(e)),
        };

        let magnitude = message.magnitude();
        let mut evidence = Vec::with_capacity(factors.len());

        for (prime, exponent_in_modulus) in factors {
            let exponent_in_message = valuation(magnitude, &prime);

            let (order, allows_failure) = if exponent_in_message > 0 {
                (None, exponent_in_message >= exponent_in_modulus)
            } else {
                let prime_power = Pow::pow(&prime, exponent_in_modulus);
                let base = to_residue(message, &prime_power);
                match multiplicative_order(&base, &prime_power, self.order_iteration_cap) {
                    Ok(order) => {
                        let divides = ek.is_multiple_of(&order);
                        (Some(order), divides)
                    }
                    Err(e) => return Classification::Unknown(self.recover(e)),
                }
            };

            evidence.push(PrimeEvidence {
                prime,
                exponent_in_modulus,
                exponent_in_message,
                order,
                allows_failure,
            });
        }

        if evidence.iter().all(|e| e.allows_failure) {
            Classification::Case2 { gcd, evidence }
        } else {
            Classification::Unknown(UnknownReason::PrimeBlocksFailure { evidence })
        }
    }

    fn recover(&self, error: SchemeError) -> UnknownReason {
        match error {
            SchemeError::OrderComputationTimeout { cap } => {
                UnknownReason::OrderSearchExhausted { cap }
            }
            SchemeError::FactorizationIncomplete(detail) => {
                UnknownReason::FactorizationIncomplete(detail)
            }
            other => UnknownReason::ArithmeticError(other.to_string()),
        }
    }
}

/// Classify with the default iteration caps
pub fn classify_trivial_case(
    message: &BigInt,
    z: &BigUint,
    w: &BigUint,
    group_order: &BigUint,
) -> Classification {
    FailureClassifier::default().classify(message, z, w, group_order)
}
