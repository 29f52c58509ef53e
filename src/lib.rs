//! # Score Predictor: embedded performance-score prediction
//!
//! Predicts a bounded score (0-100) from three features: attendance
//! percentage, weekly study hours and previous grade. The model is a plain
//! least-squares fit over standardized features; when too little real data
//! is available it bootstraps from a seeded synthetic data set.
//!
//! ## Components
//!
//! ```text
//! PredictorService ──> ModelArtifact ──> StandardScaler + LinearRegression
//!        │                   ^
//!        ├── SyntheticDataGenerator (fallback training data)
//!        └── ArtifactStore (two JSON blobs on disk)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use score_predictor::{PredictorConfig, PredictorService};
//!
//! let config = PredictorConfig::builder().artifact_dir("model").build()?;
//! let service = PredictorService::new(config)?;
//!
//! let score = service.predict_raw(90.0, 8.0, 85.0)?;
//! println!("predicted score: {score:.1}");
//! # Ok::<(), score_predictor::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod artifact;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod model;
pub mod scaler;
pub mod service;
pub mod synthetic;

pub use artifact::{ArtifactStore, FsArtifactStore, MemoryArtifactStore, ModelArtifact};
pub use config::PredictorConfig;
pub use data::{FeatureVector, TrainingRecord, TrainingSet};
pub use error::{Error, Result};
pub use service::PredictorService;
