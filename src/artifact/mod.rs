//! Trained artifact: model + scaler parameters from one training run
//!
//! ## Lifecycle
//!
//! ```text
//! TrainingSet ──fit──> ModelArtifact ──save──> {model blob, scaler blob}
//!                           ^                          │
//!                           └──────────load────────────┘
//! ```
//!
//! An artifact is immutable once built. Retraining builds a new one and the
//! service swaps it in whole.

mod store;

pub use store::{
    ArtifactStore, FsArtifactStore, LoadError, MemoryArtifactStore, DEFAULT_MODEL_FILE,
    DEFAULT_SCALER_FILE,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{FeatureVector, TrainingRecord};
use crate::model::{LinearRegression, ModelParams};
use crate::scaler::{ScalerParams, StandardScaler};
use crate::Result;

/// Where the training rows came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingSource {
    /// Records supplied by the caller
    Provided,
    /// Seeded bootstrap data
    Synthetic,
}

/// Facts about the training run that produced an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// When the run finished; stamped into both persisted blobs
    pub trained_at: DateTime<Utc>,
    /// Number of training rows
    pub samples: usize,
    /// Origin of the rows
    pub source: TrainingSource,
    /// Goodness of fit on the training rows
    pub r_squared: f64,
}

/// Model and scaler parameters that always travel together.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    model: ModelParams,
    scaler: ScalerParams,
    metadata: ArtifactMetadata,
}

impl ModelArtifact {
    /// Assemble an artifact from already-fitted parts.
    #[must_use]
    pub const fn new(model: ModelParams, scaler: ScalerParams, metadata: ArtifactMetadata) -> Self {
        Self {
            model,
            scaler,
            metadata,
        }
    }

    /// Fit scaler and model on the same records.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::EmptyTrainingSet`] if `records` is empty.
    pub fn fit(records: &[TrainingRecord], source: TrainingSource) -> Result<Self> {
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(records)?;
        let targets: Vec<f64> = records.iter().map(|r| r.score).collect();

        let mut regression = LinearRegression::new();
        let model = regression.train(&scaled, &targets)?;
        let r_squared = regression.r_squared(&scaled, &targets)?;

        let scaler = *scaler
            .params()
            .ok_or(crate::Error::NotFitted("StandardScaler"))?;

        Ok(Self {
            model,
            scaler,
            metadata: ArtifactMetadata {
                trained_at: Utc::now(),
                samples: records.len(),
                source,
                r_squared,
            },
        })
    }

    /// Clamped score for one feature vector.
    #[must_use]
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        self.model.predict(&self.scaler.transform(features))
    }

    /// Model parameters.
    #[must_use]
    pub const fn model(&self) -> &ModelParams {
        &self.model
    }

    /// Scaler parameters.
    #[must_use]
    pub const fn scaler(&self) -> &ScalerParams {
        &self.scaler
    }

    /// Training run metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ArtifactMetadata {
        &self.metadata
    }
}
