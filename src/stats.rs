//! Outcome accumulation across trials

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::classify::Classification;

/// Mean and population standard deviation of a sample
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
}

impl Summary {
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Summary::default();
        }

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

        Summary {
            count,
            mean,
            std_dev: variance.sqrt(),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mean {:.4}, std dev {:.4} (n = {})", self.mean, self.std_dev, self.count)
    }
}

/// Result of one encrypt / decrypt / classify trial
#[derive(Clone, Debug)]
pub struct TrialOutcome {
    pub encrypt_time: Duration,
    pub decrypt_time: Duration,
    pub ciphertext_bits: u64,
    pub rejections: usize,
    /// Whether the returned ciphertext equalled the message
    pub trivial: bool,
    pub round_trip_ok: bool,
    /// One record per trivial draw observed during the trial
    pub classifications: Vec<Classification>,
}

/// Per-worker accumulator; combine workers with [`TrialStats::merge`]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialStats {
    pub trials: u64,
    pub trivial_ciphertexts: u64,
    pub trivial_draws: u64,
    pub case1: u64,
    pub case2: u64,
    pub unknown: u64,
    pub rejections: u64,
    pub round_trip_failures: u64,
    /// λ(n)/φ(n) of the parameters the trials ran under
    pub lambda_phi_ratio: Option<f64>,
    encrypt_ms: Vec<f64>,
    decrypt_ms: Vec<f64>,
    ciphertext_bits: Vec<f64>,
}

impl TrialStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lambda_phi_ratio(mut self, ratio: f64) -> Self {
        self.lambda_phi_ratio = Some(ratio);
        self
    }

    pub fn record(&mut self, outcome: &TrialOutcome) {
        self.trials += 1;
        if outcome.trivial {
            self.trivial_ciphertexts += 1;
        }
        if !outcome.round_trip_ok {
            self.round_trip_failures += 1;
        }
        self.rejections += outcome.rejections as u64;

        for classification in &outcome.classifications {
            self.trivial_draws += 1;
            match classification {
                Classification::Case1 { .. } => self.case1 += 1,
                Classification::Case2 { .. } => self.case2 += 1,
                Classification::Unknown(_) => self.unknown += 1,
            }
        }

        self.encrypt_ms.push(outcome.encrypt_time.as_secs_f64() * 1000.0);
        self.decrypt_ms.push(outcome.decrypt_time.as_secs_f64() * 1000.0);
        self.ciphertext_bits.push(outcome.ciphertext_bits as f64);
    }

    /// Fold another accumulator into this one
    pub fn merge(&mut self, other: TrialStats) {
        self.trials += other.trials;
        self.trivial_ciphertexts += other.trivial_ciphertexts;
        self.trivial_draws += other.trivial_draws;
        self.case1 += other.case1;
        self.case2 += other.case2;
        self.unknown += other.unknown;
        self.rejections += other.rejections;
        self.round_trip_failures += other.round_trip_failures;
        self.lambda_phi_ratio = self.lambda_phi_ratio.or(other.lambda_phi_ratio);
        self.encrypt_ms.extend(other.encrypt_ms);
        self.decrypt_ms.extend(other.decrypt_ms);
        self.ciphertext_bits.extend(other.ciphertext_bits);
    }

    /// Fraction of trials whose returned ciphertext was trivial
    pub fn trivial_rate(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.trivial_ciphertexts as f64 / self.trials as f64
        }
    }

    pub fn encrypt_time_ms(&self) -> Summary {
        Summary::of(&self.encrypt_ms)
    }

    pub fn decrypt_time_ms(&self) -> Summary {
        Summary::of(&self.decrypt_ms)
    }

    pub fn ciphertext_bits(&self) -> Summary {
        Summary::of(&self.ciphertext_bits)
    }
}

impl fmt::Display for TrialStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "trials:              {}", self.trials)?;
        writeln!(
            f,
            "trivial ciphertexts: {} ({:.4}%)",
            self.trivial_ciphertexts,
            self.trivial_rate() * 100.0
        )?;
        writeln!(
            f,
            "trivial draws:       {} (case 1: {}, case 2: {}, unknown: {})",
            self.trivial_draws, self.case1, self.case2, self.unknown
        )?;
        writeln!(f, "rejections:          {}", self.rejections)?;
        writeln!(f, "round-trip failures: {}", self.round_trip_failures)?;
        if let Some(ratio) = self.lambda_phi_ratio {
            writeln!(f, "lambda / phi:        {:.6}", ratio)?;
        }
        writeln!(f, "encrypt ms:          {}", self.encrypt_time_ms())?;
        writeln!(f, "decrypt ms:          {}", self.decrypt_time_ms())?;
        write!(f, "ciphertext bits:     {}", self.ciphertext_bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::UnknownReason;
    use num_bigint::BigUint;

    fn outcome(trivial: bool, classifications: Vec<Classification>, bits: u64) -> TrialOutcome {
        TrialOutcome {
            encrypt_time: Duration::from_millis(2),
            decrypt_time: Duration::from_micros(10),
            ciphertext_bits: bits,
            rejections: classifications.len(),
            trivial,
            round_trip_ok: true,
            classifications,
        }
    }

    #[test]
    fn test_summary() {
        let s = Summary::of(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(s.count, 8);
        assert!((s.mean - 5.0).abs() < 1e-12);
        assert!((s.std_dev - 2.0).abs() < 1e-12);

        assert_eq!(Summary::of(&[]), Summary::default());
    }

    #[test]
    fn test_record_counts_cases() {
        let case1 = Classification::Case1 {
            order: BigUint::from(10u32),
            quotient: BigUint::from(2u32),
        };
        let unknown = Classification::Unknown(UnknownReason::DegenerateMessage);

        let mut stats = TrialStats::new();
        stats.record(&outcome(false, vec![], 1000));
        stats.record(&outcome(true, vec![case1], 1010));
        stats.record(&outcome(false, vec![unknown.clone(), unknown], 1020));

        assert_eq!(stats.trials, 3);
        assert_eq!(stats.trivial_ciphertexts, 1);
        assert_eq!(stats.trivial_draws, 3);
        assert_eq!(stats.case1, 1);
        assert_eq!(stats.case2, 0);
        assert_eq!(stats.unknown, 2);
        assert_eq!(stats.rejections, 3);
        assert!((stats.ciphertext_bits().mean - 1010.0).abs() < 1e-9);
        assert!((stats.encrypt_time_ms().mean - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_merge_matches_sequential_recording() {
        let outcomes: Vec<_> = (0..10)
            .map(|i| outcome(i % 3 == 0, vec![], 900 + i))
            .collect();

        let mut sequential = TrialStats::new();
        for o in &outcomes {
            sequential.record(o);
        }

        let mut left = TrialStats::new();
        let mut right = TrialStats::new();
        for o in &outcomes[..4] {
            left.record(o);
        }
        for o in &outcomes[4..] {
            right.record(o);
        }
        left.merge(right);

        assert_eq!(left, sequential);
        assert!((left.trivial_rate() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_lambda_phi_ratio_survives_merge() {
        let mut left = TrialStats::new();
        left.record(&outcome(false, vec![], 1000));
        let right = TrialStats::new().with_lambda_phi_ratio(0.25);

        left.merge(right);
        assert_eq!(left.lambda_phi_ratio, Some(0.25));
        assert!(left.to_string().contains("lambda / phi:        0.250000"));
    }
}
