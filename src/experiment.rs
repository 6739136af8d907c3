//! Independent encryption trials, sequential or spread across worker threads

use rand::{thread_rng, Rng};
use rayon::prelude::*;
use std::time::Instant;
use tracing::debug;

use crate::classify::FailureClassifier;
use crate::encryption::Scheme;
use crate::error::Result;
use crate::stats::{TrialOutcome, TrialStats};

/// Runs trials against one scheme instance
#[derive(Clone, Debug)]
pub struct Experiment<'a> {
    scheme: &'a Scheme,
    classifier: FailureClassifier,
}

impl<'a> Experiment<'a> {
    pub fn new(scheme: &'a Scheme) -> Self {
        let classifier = FailureClassifier::new(
            scheme.config().order_iteration_cap,
            crate::classify::DEFAULT_FACTOR_ITERATION_CAP,
        );
        Experiment { scheme, classifier }
    }

    /// Sample a message, encrypt it, decrypt it, and classify every trivial draw
    pub fn run_trial<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<TrialOutcome> {
        let message = self.scheme.random_message_with_rng(rng)?;
        let encryption = self.scheme.encrypt_detailed_with_rng(&message, rng)?;

        let start = Instant::now();
        let decrypted = self.scheme.decrypt(&encryption.ciphertext);
        let decrypt_time = start.elapsed();

        let group_order = self.scheme.group_order();
        let classifications: Vec<_> = encryption
            .trivial_draws
            .iter()
            .map(|draw| {
                let record = self.classifier.classify(&message, &draw.z, &draw.w, group_order);
                debug!(%message, classification = %record, "trivial draw classified");
                record
            })
            .collect();

        Ok(TrialOutcome {
            encrypt_time: encryption.elapsed,
            decrypt_time,
            ciphertext_bits: encryption.ciphertext.bit_length(),
            rejections: encryption.rejections,
            trivial: encryption.is_trivial(),
            round_trip_ok: decrypted == message,
            classifications,
        })
    }

    fn empty_stats(&self) -> TrialStats {
        TrialStats::new().with_lambda_phi_ratio(self.scheme.params().lambda_phi_ratio())
    }

    /// Run `count` trials on the calling thread with the given random source
    pub fn run_sequential<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Result<TrialStats> {
        let mut stats = self.empty_stats();
        for _ in 0..count {
            stats.record(&self.run_trial(rng)?);
        }
        Ok(stats)
    }

    /// Run `count` trials across the rayon pool.
    ///
    /// Each worker draws from its own thread-local RNG and accumulates into
    /// its own `TrialStats`; the partial results are merged at the end.
    pub fn run_parallel(&self, count: usize) -> Result<TrialStats> {
        (0..count)
            .into_par_iter()
            .map_init(thread_rng, |rng, _| self.run_trial(rng))
            .try_fold(|| self.empty_stats(), |mut stats, outcome| {
                stats.record(&outcome?);
                Ok(stats)
            })
            .try_reduce(|| self.empty_stats(), |mut left, right| {
                left.merge(right);
                Ok(left)
            })
    }
}
