//! Predictor configuration
//!
//! Built with a consuming builder or deserialized from the host
//! application's own configuration file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::artifact::{DEFAULT_MODEL_FILE, DEFAULT_SCALER_FILE};
use crate::synthetic::{DEFAULT_SAMPLES, DEFAULT_SEED};
use crate::{Error, Result};

/// Below this many real records, training falls back to synthetic data.
pub const DEFAULT_MIN_TRAINING_RECORDS: usize = 10;

/// Settings for a [`crate::PredictorService`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Directory holding the persisted blobs
    pub artifact_dir: PathBuf,
    /// Model blob file name
    pub model_file: String,
    /// Scaler blob file name
    pub scaler_file: String,
    /// Size of the synthetic bootstrap set
    pub synthetic_samples: usize,
    /// Seed of the synthetic bootstrap set
    pub seed: u64,
    /// Minimum number of real records accepted for training
    pub min_training_records: usize,
    /// Persist artifacts to `artifact_dir` (in-memory only when false)
    pub persist: bool,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("model"),
            model_file: DEFAULT_MODEL_FILE.to_string(),
            scaler_file: DEFAULT_SCALER_FILE.to_string(),
            synthetic_samples: DEFAULT_SAMPLES,
            seed: DEFAULT_SEED,
            min_training_records: DEFAULT_MIN_TRAINING_RECORDS,
            persist: true,
        }
    }
}

impl PredictorConfig {
    /// Start a builder from the defaults.
    #[must_use]
    pub fn builder() -> PredictorConfigBuilder {
        PredictorConfigBuilder::default()
    }

    /// Parse a JSON document; missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] for malformed input and [`Error::Other`] if the
    /// result fails [`Self::validate`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would make training impossible.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Other`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.synthetic_samples == 0 {
            return Err(Error::Other("synthetic_samples must be positive".into()));
        }
        if self.model_file.is_empty() || self.scaler_file.is_empty() {
            return Err(Error::Other("artifact file names must not be empty".into()));
        }
        if self.model_file == self.scaler_file {
            return Err(Error::Other("model_file and scaler_file must differ".into()));
        }
        Ok(())
    }

    /// Full path of the model blob.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.model_file)
    }

    /// Full path of the scaler blob.
    #[must_use]
    pub fn scaler_path(&self) -> PathBuf {
        self.artifact_dir.join(&self.scaler_file)
    }
}

/// Builder for [`PredictorConfig`].
#[derive(Debug, Default)]
pub struct PredictorConfigBuilder {
    config: PredictorConfig,
}

impl PredictorConfigBuilder {
    /// Set the artifact directory.
    #[must_use]
    pub fn artifact_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.artifact_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set both blob file names.
    #[must_use]
    pub fn file_names(
        mut self,
        model_file: impl Into<String>,
        scaler_file: impl Into<String>,
    ) -> Self {
        self.config.model_file = model_file.into();
        self.config.scaler_file = scaler_file.into();
        self
    }

    /// Set the synthetic bootstrap size.
    #[must_use]
    pub fn synthetic_samples(mut self, samples: usize) -> Self {
        self.config.synthetic_samples = samples;
        self
    }

    /// Set the synthetic bootstrap seed.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Set the real-data threshold.
    #[must_use]
    pub fn min_training_records(mut self, min: usize) -> Self {
        self.config.min_training_records = min;
        self
    }

    /// Enable or disable persistence.
    #[must_use]
    pub fn persist(mut self, persist: bool) -> Self {
        self.config.persist = persist;
        self
    }

    /// Finish the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Other`] if the configuration is invalid.
    pub fn build(self) -> Result<PredictorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
