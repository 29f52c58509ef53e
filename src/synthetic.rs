//! Deterministic synthetic bootstrap data
//!
//! Used when fewer than the configured minimum of real records exist. The
//! generating law is
//!
//! ```text
//! attendance ~ U(50, 100)
//! hours      ~ U(1, 10)
//! grade      ~ U(40, 100)
//! score      = clamp(0.3*attendance + 3*hours + 0.4*grade + N(0, 5), 0, 100)
//! ```
//!
//! so the score increases in expectation with every feature.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::data::{TrainingRecord, TrainingSet};
use crate::model::clamp_score;
use crate::{Error, Result};

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 42;

/// Sample count used when none is configured.
pub const DEFAULT_SAMPLES: usize = 100;

const ATTENDANCE_RANGE: (f64, f64) = (50.0, 100.0);
const HOURS_RANGE: (f64, f64) = (1.0, 10.0);
const GRADE_RANGE: (f64, f64) = (40.0, 100.0);

const ATTENDANCE_WEIGHT: f64 = 0.3;
const HOURS_WEIGHT: f64 = 3.0;
const GRADE_WEIGHT: f64 = 0.4;
const NOISE_STD_DEV: f64 = 5.0;

/// Seeded generator; the same seed and size always give the same set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticDataGenerator {
    seed: u64,
    samples: usize,
}

impl Default for SyntheticDataGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SEED, DEFAULT_SAMPLES)
    }
}

impl SyntheticDataGenerator {
    /// Create a generator with an explicit seed and sample count.
    #[must_use]
    pub const fn new(seed: u64, samples: usize) -> Self {
        Self { seed, samples }
    }

    /// Configured seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Configured default size.
    #[must_use]
    pub const fn samples(&self) -> usize {
        self.samples
    }

    /// Generate the configured number of records.
    ///
    /// # Errors
    ///
    /// See [`Self::generate_n`].
    pub fn generate(&self) -> Result<TrainingSet> {
        self.generate_n(self.samples)
    }

    /// Generate exactly `n` records.
    ///
    /// Columns are drawn one after another from a fresh RNG, so a prefix of a
    /// larger set is not the same as a smaller set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Generation`] if `n` is zero or a non-finite value is
    /// produced.
    pub fn generate_n(&self, n: usize) -> Result<TrainingSet> {
        if n == 0 {
            return Err(Error::Generation("sample count must be positive".into()));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let attendance = uniform_column(&mut rng, ATTENDANCE_RANGE, n);
        let hours = uniform_column(&mut rng, HOURS_RANGE, n);
        let grades = uniform_column(&mut rng, GRADE_RANGE, n);

        let noise =
            Normal::new(0.0, NOISE_STD_DEV).map_err(|e| Error::Generation(e.to_string()))?;
        let mut set = Vec::with_capacity(n);
        for i in 0..n {
            let noise = noise.sample(&mut rng);
            let raw = ATTENDANCE_WEIGHT * attendance[i]
                + HOURS_WEIGHT * hours[i]
                + GRADE_WEIGHT * grades[i]
                + noise;
            if !raw.is_finite() {
                return Err(Error::Generation(format!("non-finite score at row {i}")));
            }
            set.push(TrainingRecord::new(
                attendance[i],
                hours[i],
                grades[i],
                clamp_score(raw),
            ));
        }

        debug!(seed = self.seed, samples = n, "generated synthetic training set");
        Ok(set)
    }
}

fn uniform_column(rng: &mut StdRng, (low, high): (f64, f64), n: usize) -> Vec<f64> {
    (0..n).map(|_| rng.gen_range(low..=high)).collect()
}
