//! Durable artifact storage
//!
//! An artifact is persisted as two independent JSON blobs: model parameters
//! (plus run metadata) and scaler parameters. Both carry the run's
//! `trained_at` stamp; a load that finds two different stamps saw blobs from
//! different runs and reports the pair as corrupt.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{ArtifactMetadata, ModelArtifact, TrainingSource};
use crate::data::FEATURE_COUNT;
use crate::model::ModelParams;
use crate::scaler::ScalerParams;
use crate::{Error, Result};

/// File name of the model blob.
pub const DEFAULT_MODEL_FILE: &str = "performance_model.json";
/// File name of the scaler blob.
pub const DEFAULT_SCALER_FILE: &str = "scaler.json";

/// Why a stored artifact could not be loaded.
///
/// Both variants lead to the same recovery (retrain); they are kept apart so
/// they can be logged differently.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Nothing has been saved yet
    #[error("no artifact at {path}")]
    Missing {
        /// Location that was checked
        path: PathBuf,
    },

    /// A blob exists but is unreadable or invalid
    #[error("corrupt artifact at {path}: {reason}")]
    Corrupt {
        /// Offending blob
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },
}

impl From<LoadError> for Error {
    fn from(err: LoadError) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Save/load contract for trained artifacts.
pub trait ArtifactStore: Send + Sync {
    /// Persist `artifact`, overwriting whatever was stored before.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if either blob cannot be written.
    fn save(&self, artifact: &ModelArtifact) -> Result<()>;

    /// Read back a complete artifact.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Missing`] when no artifact exists and
    /// [`LoadError::Corrupt`] when one exists but cannot be used.
    fn load(&self) -> std::result::Result<ModelArtifact, LoadError>;

    /// [`Self::load`], logging the failure and collapsing it to `None`.
    fn load_or_absent(&self) -> Option<ModelArtifact> {
        match self.load() {
            Ok(artifact) => {
                info!(
                    trained_at = %artifact.metadata().trained_at,
                    samples = artifact.metadata().samples,
                    "loaded persisted artifact"
                );
                Some(artifact)
            }
            Err(LoadError::Missing { path }) => {
                info!(path = %path.display(), "no persisted artifact");
                None
            }
            Err(err @ LoadError::Corrupt { .. }) => {
                warn!(error = %err, "discarding persisted artifact");
                None
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelBlob {
    coefficients: [f64; FEATURE_COUNT],
    intercept: f64,
    trained_at: DateTime<Utc>,
    samples: usize,
    source: TrainingSource,
    r_squared: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ScalerBlob {
    means: [f64; FEATURE_COUNT],
    std_devs: [f64; FEATURE_COUNT],
    trained_at: DateTime<Utc>,
}

fn to_blobs(artifact: &ModelArtifact) -> (ModelBlob, ScalerBlob) {
    let model = artifact.model();
    let scaler = artifact.scaler();
    let meta = artifact.metadata();
    (
        ModelBlob {
            coefficients: model.coefficients,
            intercept: model.intercept,
            trained_at: meta.trained_at,
            samples: meta.samples,
            source: meta.source,
            r_squared: meta.r_squared,
        },
        ScalerBlob {
            means: scaler.means,
            std_devs: scaler.std_devs,
            trained_at: meta.trained_at,
        },
    )
}

/// Validate a blob pair and join it into an artifact.
///
/// On failure returns a reason and whether the scaler blob (rather than the
/// model blob) is to blame.
fn from_blobs(
    model: ModelBlob,
    scaler: ScalerBlob,
) -> std::result::Result<ModelArtifact, (bool, String)> {
    if model.trained_at != scaler.trained_at {
        return Err((
            true,
            format!(
                "scaler from run {} does not match model from run {}",
                scaler.trained_at, model.trained_at
            ),
        ));
    }

    let params = ModelParams {
        coefficients: model.coefficients,
        intercept: model.intercept,
    };
    if !params.is_finite() {
        return Err((false, "non-finite model parameters".into()));
    }

    let scaler_params = ScalerParams {
        means: scaler.means,
        std_devs: scaler.std_devs,
    };
    if !scaler_params.is_finite() || scaler_params.std_devs.iter().any(|s| *s < 0.0) {
        return Err((true, "invalid scaler parameters".into()));
    }

    Ok(ModelArtifact::new(
        params,
        scaler_params,
        ArtifactMetadata {
            trained_at: model.trained_at,
            samples: model.samples,
            source: model.source,
            r_squared: model.r_squared,
        },
    ))
}

/// Artifact store backed by two JSON files.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    model_path: PathBuf,
    scaler_path: PathBuf,
}

impl FsArtifactStore {
    /// Store both blobs in `dir` under the default file names.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self::with_files(dir, DEFAULT_MODEL_FILE, DEFAULT_SCALER_FILE)
    }

    /// Store both blobs in `dir` under explicit file names.
    #[must_use]
    pub fn with_files(dir: impl AsRef<Path>, model_file: &str, scaler_file: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            model_path: dir.join(model_file),
            scaler_path: dir.join(scaler_file),
        }
    }

    /// Path of the model blob.
    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Path of the scaler blob.
    #[must_use]
    pub fn scaler_path(&self) -> &Path {
        &self.scaler_path
    }

    fn read_blob<T: for<'de> Deserialize<'de>>(path: &Path) -> std::result::Result<T, LoadError> {
        let bytes = fs::read(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                LoadError::Missing {
                    path: path.to_path_buf(),
                }
            } else {
                LoadError::Corrupt {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            }
        })?;
        serde_json::from_slice(&bytes).map_err(|e| LoadError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Write via a sibling temp file so readers never see a torn blob.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl ArtifactStore for FsArtifactStore {
    fn save(&self, artifact: &ModelArtifact) -> Result<()> {
        let (model, scaler) = to_blobs(artifact);
        for (path, bytes) in [
            (&self.model_path, serde_json::to_vec_pretty(&model)?),
            (&self.scaler_path, serde_json::to_vec_pretty(&scaler)?),
        ] {
            write_atomic(path, &bytes)
                .map_err(|e| Error::Persistence(format!("{}: {e}", path.display())))?;
        }
        debug!(
            model = %self.model_path.display(),
            scaler = %self.scaler_path.display(),
            "saved artifact"
        );
        Ok(())
    }

    fn load(&self) -> std::result::Result<ModelArtifact, LoadError> {
        let model: ModelBlob = Self::read_blob(&self.model_path)?;
        let scaler: ScalerBlob = Self::read_blob(&self.scaler_path)?;
        from_blobs(model, scaler).map_err(|(scaler_at_fault, reason)| LoadError::Corrupt {
            path: if scaler_at_fault {
                self.scaler_path.clone()
            } else {
                self.model_path.clone()
            },
            reason,
        })
    }
}

/// Process-local store holding the serialized blobs in memory.
///
/// Goes through the same encoding and validation as [`FsArtifactStore`].
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    blobs: Mutex<Option<(Vec<u8>, Vec<u8>)>>,
}

impl MemoryArtifactStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True until the first successful save.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.lock().is_none()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn save(&self, artifact: &ModelArtifact) -> Result<()> {
        let (model, scaler) = to_blobs(artifact);
        let encoded = (serde_json::to_vec(&model)?, serde_json::to_vec(&scaler)?);
        *self.blobs.lock() = Some(encoded);
        Ok(())
    }

    fn load(&self) -> std::result::Result<ModelArtifact, LoadError> {
        let memory = || PathBuf::from("<memory>");
        let guard = self.blobs.lock();
        let (model_bytes, scaler_bytes) = guard
            .as_ref()
            .ok_or_else(|| LoadError::Missing { path: memory() })?;
        let corrupt = |e: serde_json::Error| LoadError::Corrupt {
            path: memory(),
            reason: e.to_string(),
        };
        let model: ModelBlob = serde_json::from_slice(model_bytes).map_err(corrupt)?;
        let scaler: ScalerBlob = serde_json::from_slice(scaler_bytes).map_err(corrupt)?;
        from_blobs(model, scaler).map_err(|(_, reason)| LoadError::Corrupt {
            path: memory(),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FeatureVector;
    use crate::synthetic::SyntheticDataGenerator;

    fn trained() -> ModelArtifact {
        let records = SyntheticDataGenerator::default().generate().unwrap();
        ModelArtifact::fit(&records, TrainingSource::Synthetic).unwrap()
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryArtifactStore::new();
        assert!(store.is_empty());
        assert!(matches!(store.load(), Err(LoadError::Missing { .. })));

        let artifact = trained();
        store.save(&artifact).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, artifact);

        let input = FeatureVector::new(70.0, 5.0, 65.0);
        assert_eq!(loaded.predict(&input), artifact.predict(&input));
    }

    #[test]
    fn test_mismatched_runs_are_corrupt() {
        let artifact = trained();
        let (model, mut scaler) = to_blobs(&artifact);
        scaler.trained_at = scaler.trained_at + chrono::Duration::seconds(1);
        let (scaler_at_fault, reason) = from_blobs(model, scaler).unwrap_err();
        assert!(scaler_at_fault);
        assert!(reason.contains("does not match"));
    }

    #[test]
    fn test_negative_std_is_corrupt() {
        let (model, mut scaler) = to_blobs(&trained());
        scaler.std_devs[1] = -1.0;
        assert!(from_blobs(model, scaler).is_err());
    }

    #[test]
    fn test_load_error_into_persistence() {
        let err: Error = LoadError::Missing {
            path: PathBuf::from("model/x.json"),
        }
        .into();
        assert!(matches!(err, Error::Persistence(ref m) if m.contains("model/x.json")));
    }
}
