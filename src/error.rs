//! Error types for the score predictor
//!
//! Persistence failures never reach the caller of `predict`/`train`; they are
//! logged and the service keeps answering from memory.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Score predictor error types
#[derive(Error, Debug)]
pub enum Error {
    /// Scaler or model used before it was fitted
    #[error("{0} is not fitted\nTrain the predictor before transforming or predicting")]
    NotFitted(&'static str),

    /// Fit called without any records
    #[error("Training set is empty")]
    EmptyTrainingSet,

    /// Feature rows and targets differ in length
    #[error("Shape mismatch: {features} feature rows but {targets} targets")]
    ShapeMismatch {
        /// Number of feature rows
        features: usize,
        /// Number of targets
        targets: usize,
    },

    /// Artifact could not be written or read back
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Synthetic bootstrap failed (no model of last resort exists below it)
    #[error("Synthetic data generation failed: {0}\nNo fallback model can be built. Please report this issue.")]
    Generation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Blob (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
