//! Number-theoretic helpers shared by key generation, encryption and classification

use std::collections::BTreeMap;

use num_bigint::{BigInt, BigUint, RandBigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{thread_rng, Rng};

use crate::error::{Result, SchemeError};

/// Witnesses for the deterministic Miller-Rabin variant used during factorization.
/// Exact for every n < 3.3 * 10^24.
const FIXED_WITNESSES: [u32; 13] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41];

/// Largest divisor tried by trial division before falling back to Pollard's rho
const TRIAL_DIVISION_BOUND: u32 = 10_000;

/// Maximum number of restarts (with a new polynomial constant) for Pollard's rho
const RHO_RESTARTS: u32 = 8;

/// Modular exponentiation: base^exp mod modulus
pub fn mod_exp(base: &BigUint, exp: &BigUint, modulus: &BigUint) -> BigUint {
    base.modpow(exp, modulus)
}

/// Map a signed integer into `[0, modulus)`
pub fn to_residue(value: &BigInt, modulus: &BigUint) -> BigUint {
    let m = BigInt::from_biguint(Sign::Plus, modulus.clone());
    let (_, magnitude) = value.mod_floor(&m).into_parts();
    magnitude
}

/// Least common multiple computed as a·b / gcd(a, b)
pub fn lcm(a: &BigUint, b: &BigUint) -> BigUint {
    if a.is_zero() || b.is_zero() {
        return BigUint::zero();
    }
    (a * b) / a.gcd(b)
}

/// Centered remainder of `value` modulo `modulus`, in `[-modulus/2, modulus/2)`.
///
/// Equivalent to `value - modulus * round(value / modulus)` with round-half-up,
/// but computed purely by comparing the residue against half the modulus.
pub fn centered_remainder(value: &BigUint, modulus: &BigUint) -> BigInt {
    let r = value % modulus;
    let r_doubled: BigUint = &r << 1;
    if &r_doubled < modulus {
        BigInt::from_biguint(Sign::Plus, r)
    } else {
        BigInt::from_biguint(Sign::Plus, r) - BigInt::from_biguint(Sign::Plus, modulus.clone())
    }
}

/// Factor out powers of 2 from n
pub fn factor_powers_of_two(n: &BigUint) -> (u64, BigUint) {
    let mut s = 0;
    let mut d = n.clone();

    while d.is_even() && !d.is_zero() {
        d >>= 1;
        s += 1;
    }

    (s, d)
}

/// Miller-Rabin primality test with `k` random witnesses drawn from the thread RNG
pub fn is_probable_prime(n: &BigUint, k: usize) -> bool {
    is_probable_prime_with_rng(n, k, &mut thread_rng())
}

/// Miller-Rabin primality test with `k` random witnesses drawn from `rng`
pub fn is_probable_prime_with_rng<R: Rng + ?Sized>(n: &BigUint, k: usize, rng: &mut R) -> bool {
    if let Some(small) = small_prime_verdict(n) {
        return small;
    }

    let two = BigUint::from(2u32);
    let n_minus_1 = n - 1u32;
    let witnesses: Vec<BigUint> = (0..k)
        .map(|_| rng.gen_biguint_range(&two, &n_minus_1))
        .collect();

    miller_rabin(n, &witnesses)
}

/// Miller-Rabin with a fixed witness set; deterministic, so repeated calls agree.
///
/// Exact below 3.3 * 10^24. Larger inputs (cofactors of z can reach hundreds of
/// bits) get a probable-prime verdict only: a strong pseudoprime to every fixed
/// witness would be accepted as a prime factor.
pub fn is_prime_deterministic(n: &BigUint) -> bool {
    if let Some(small) = small_prime_verdict(n) {
        return small;
    }

    let witnesses: Vec<BigUint> = FIXED_WITNESSES
        .iter()
        .map(|&a| BigUint::from(a))
        .filter(|a| a < n)
        .collect();

    miller_rabin(n, &witnesses)
}

/// Settles tiny inputs and inputs with a small factor; `None` means "run the full test"
fn small_prime_verdict(n: &BigUint) -> Option<bool> {
    if n <= &BigUint::one() {
        return Some(false);
    }

    for &p in FIXED_WITNESSES.iter() {
        let p = BigUint::from(p);
        if n == &p {
            return Some(true);
        }
        if (n % &p).is_zero() {
            return Some(false);
        }
    }

    // No factor up to 41, so anything below 43^2 is prime
    if n < &BigUint::from(43u32 * 43) {
        return Some(true);
    }

    None
}

fn miller_rabin(n: &BigUint, witnesses: &[BigUint]) -> bool {
    let one = BigUint::one();
    let two = BigUint::from(2u32);
    let n_minus_1 = n - 1u32;
    let (s, d) = factor_powers_of_two(&n_minus_1);

    'witness: for a in witnesses {
        let mut x = mod_exp(a, &d, n);

        if x == one || x == n_minus_1 {
            continue;
        }

        for _ in 0..s.saturating_sub(1) {
            x = mod_exp(&x, &two, n);
            if x == n_minus_1 {
                continue 'witness;
            }
        }

        return false;
    }

    true
}

/// Generate a probable prime with exactly `bit_size` bits
pub fn generate_prime_with_rng<R: Rng + ?Sized>(
    bit_size: u64,
    rounds: usize,
    rng: &mut R,
) -> Result<BigUint> {
    if bit_size < 2 {
        return Err(SchemeError::InvalidParameter(format!(
            "cannot generate a {}-bit prime",
            bit_size
        )));
    }

    let max_iterations = 100_000;

    for _ in 0..max_iterations {
        // Random odd number with the top bit set
        let mut candidate = rng.gen_biguint(bit_size);
        candidate |= BigUint::one();
        candidate |= BigUint::one() << (bit_size - 1);

        if candidate.bits() == bit_size && is_probable_prime_with_rng(&candidate, rounds, rng) {
            return Ok(candidate);
        }
    }

    Err(SchemeError::CryptoError(format!(
        "Failed to generate {}-bit prime after {} iterations",
        bit_size, max_iterations
    )))
}

/// Random odd integer of at most `bit_size` bits, never below 3
pub fn random_odd_with_rng<R: Rng + ?Sized>(bit_size: u64, rng: &mut R) -> BigUint {
    let mut candidate = rng.gen_biguint(bit_size.max(2));
    candidate |= BigUint::one();
    if candidate < BigUint::from(3u32) {
        candidate = BigUint::from(3u32);
    }
    candidate
}

/// Random signed message with magnitude below 2^bits, excluding {-1, 0, 1}
pub fn random_message_with_rng<R: Rng + ?Sized>(bits: u64, rng: &mut R) -> Result<BigInt> {
    if bits < 2 {
        return Err(SchemeError::InvalidParameter(format!(
            "message size must be at least 2 bits, got {}",
            bits
        )));
    }

    loop {
        let magnitude = rng.gen_biguint(bits);
        if magnitude <= BigUint::one() {
            continue;
        }
        let sign = if rng.gen::<bool>() {
            Sign::Minus
        } else {
            Sign::Plus
        };
        return Ok(BigInt::from_biguint(sign, magnitude));
    }
}

/// Smallest k in `1..=cap` with value^k ≡ 1 (mod modulus).
///
/// Fails with `NotInvertible` when gcd(value, modulus) ≠ 1 and with
/// `OrderComputationTimeout` when the cap is reached.
pub fn multiplicative_order(value: &BigUint, modulus: &BigUint, cap: u64) -> Result<BigUint> {
    if modulus.is_zero() {
        return Err(SchemeError::InvalidParameter(
            "modulus must be positive".to_string(),
        ));
    }
    if modulus.is_one() {
        return Ok(BigUint::one());
    }

    let base = value % modulus;
    if !base.gcd(modulus).is_one() {
        return Err(SchemeError::NotInvertible);
    }

    let one = BigUint::one();
    let mut acc = base.clone();
    for k in 1..=cap {
        if acc == one {
            return Ok(BigUint::from(k));
        }
        acc = (&acc * &base) % modulus;
    }

    Err(SchemeError::OrderComputationTimeout { cap })
}

/// Exponent of `prime` in `value`; `value` must be non-zero
pub fn valuation(value: &BigUint, prime: &BigUint) -> u32 {
    let mut rest = value.clone();
    let mut exponent = 0;
    while !rest.is_zero() && (&rest % prime).is_zero() {
        rest /= prime;
        exponent += 1;
    }
    exponent
}

/// Prime-power factorization of `n` as prime → exponent.
///
/// Trial division up to a small bound, then Pollard's rho on whatever
/// composite cofactor remains. Deterministic for a given input.
pub fn factorize(n: &BigUint, max_rho_iterations: u64) -> Result<BTreeMap<BigUint, u32>> {
    if n.is_zero() {
        return Err(SchemeError::InvalidParameter(
            "cannot factor zero".to_string(),
        ));
    }

    let mut factors = BTreeMap::new();
    let mut rest = n.clone();

    let mut d = 2u32;
    while d <= TRIAL_DIVISION_BOUND {
        let divisor = BigUint::from(d);
        if &divisor * &divisor > rest {
            break;
        }
        while (&rest % &divisor).is_zero() {
            rest /= &divisor;
            *factors.entry(divisor.clone()).or_insert(0) += 1;
        }
        d += if d == 2 { 1 } else { 2 };
    }

    let mut pending = vec![rest];
    while let Some(m) = pending.pop() {
        if m.is_one() {
            continue;
        }
        if is_prime_deterministic(&m) {
            *factors.entry(m).or_insert(0) += 1;
            continue;
        }
        match pollard_rho(&m, max_rho_iterations) {
            Some(divisor) => {
                let cofactor = &m / &divisor;
                pending.push(divisor);
                pending.push(cofactor);
            }
            None => {
                return Err(SchemeError::FactorizationIncomplete(format!(
                    "no factor of a {}-bit cofactor found within {} iterations",
                    m.bits(),
                    max_rho_iterations
                )));
            }
        }
    }

    Ok(factors)
}

/// Pollard's rho with Floyd cycle detection; returns a non-trivial divisor of a composite `n`
fn pollard_rho(n: &BigUint, max_iterations: u64) -> Option<BigUint> {
    if n.is_even() {
        return Some(BigUint::from(2u32));
    }

    let per_restart = (max_iterations / u64::from(RHO_RESTARTS)).max(1);

    for c in 1..=RHO_RESTARTS {
        let c = BigUint::from(c);
        let step = |x: &BigUint| (x * x + &c) % n;

        let mut x = BigUint::from(2u32);
        let mut y = x.clone();

        for _ in 0..per_restart {
            x = step(&x);
            y = step(&step(&y));

            let diff = if x > y { &x - &y } else { &y - &x };
            let d = diff.gcd(n);

            if &d == n {
                break;
            }
            if !d.is_one() {
                return Some(d);
            }
        }
    }

    None
}
