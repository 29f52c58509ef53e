//! Prediction service: owns the current artifact and trains it on demand
//!
//! ## Concurrency
//!
//! - `predict` clones the current `Arc<ModelArtifact>` under a short read lock
//!   and computes outside of it; concurrent predictions never contend on more
//!   than that read lock.
//! - `train` holds the training gate for the whole fit. The new artifact is
//!   built off to the side and swapped in with one write, so readers see the
//!   old artifact or the new one, never a mix.
//! - A prediction on an untrained service takes the gate and re-checks before
//!   bootstrapping, so racing first predictions train exactly once.
//! - Saves run on a dedicated persister thread. Artifacts are queued in swap
//!   order and a backlog is collapsed to its newest entry, so disk never
//!   regresses to an older run. Only `train` and `flush` wait for the disk.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, info_span, warn};

use crate::artifact::{
    ArtifactMetadata, ArtifactStore, FsArtifactStore, MemoryArtifactStore, ModelArtifact,
    TrainingSource,
};
use crate::config::PredictorConfig;
use crate::data::{FeatureVector, TrainingRecord};
use crate::synthetic::SyntheticDataGenerator;
use crate::{Error, Result};

/// Callback invoked after every completed training run.
pub type TrainHook = Arc<dyn Fn(&ArtifactMetadata) + Send + Sync>;

/// Thread-safe score predictor.
///
/// Construct once at start-up and share it (e.g. behind an `Arc`) with every
/// request handler.
///
/// # Example
///
/// ```rust
/// use score_predictor::{PredictorConfig, PredictorService};
///
/// let config = PredictorConfig::builder().persist(false).build()?;
/// let service = PredictorService::new(config)?;
///
/// // The first prediction bootstraps a model from synthetic data.
/// let score = service.predict_raw(90.0, 8.0, 85.0)?;
/// assert!((0.0..=100.0).contains(&score));
/// assert!(service.is_trained());
/// # Ok::<(), score_predictor::Error>(())
/// ```
pub struct PredictorService {
    config: PredictorConfig,
    generator: SyntheticDataGenerator,
    current: RwLock<Option<Arc<ModelArtifact>>>,
    train_gate: Mutex<()>,
    persister: Persister,
    training_runs: AtomicU64,
    on_trained: Option<TrainHook>,
}

impl PredictorService {
    /// Create a service using the store selected by `config.persist`.
    ///
    /// A previously persisted artifact is loaded if present and valid;
    /// otherwise the service starts untrained.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Other`] if `config` is invalid and [`Error::Io`] if
    /// the persister thread cannot be started.
    pub fn new(config: PredictorConfig) -> Result<Self> {
        let store: Box<dyn ArtifactStore> = if config.persist {
            Box::new(FsArtifactStore::with_files(
                &config.artifact_dir,
                &config.model_file,
                &config.scaler_file,
            ))
        } else {
            Box::new(MemoryArtifactStore::new())
        };
        Self::with_store(config, store)
    }

    /// Create a service backed by an explicit store.
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`].
    pub fn with_store(config: PredictorConfig, store: Box<dyn ArtifactStore>) -> Result<Self> {
        config.validate()?;
        let loaded = store.load_or_absent().map(Arc::new);
        let persister = Persister::spawn(store)?;
        info!(trained = loaded.is_some(), "predictor service ready");

        Ok(Self {
            generator: SyntheticDataGenerator::new(config.seed, config.synthetic_samples),
            config,
            current: RwLock::new(loaded),
            train_gate: Mutex::new(()),
            persister,
            training_runs: AtomicU64::new(0),
            on_trained: None,
        })
    }

    /// Register a callback run after each training run.
    #[must_use]
    pub fn with_train_hook(mut self, hook: TrainHook) -> Self {
        self.on_trained = Some(hook);
        self
    }

    /// Train on `data`, or on synthetic data when `data` is absent or has
    /// fewer than `min_training_records` rows.
    ///
    /// Returns once the new artifact is in use and its save has been
    /// attempted. Persistence failures are logged and do not fail the call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Generation`] if no model at all could be built.
    pub fn train(&self, data: Option<&[TrainingRecord]>) -> Result<Arc<ModelArtifact>> {
        let artifact = {
            let _gate = self.train_gate.lock();
            self.train_locked(data)?
        };
        self.persister.flush();
        Ok(artifact)
    }

    /// Clamped score in `[0, 100]` for one feature vector.
    ///
    /// Trains on synthetic data first if the service is untrained. That
    /// training is saved in the background; the prediction does not wait.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Generation`] if that first training fails.
    pub fn predict(&self, features: &FeatureVector) -> Result<f64> {
        Ok(self.ready_artifact()?.predict(features))
    }

    /// [`Self::predict`] taking the three features as plain numbers.
    ///
    /// # Errors
    ///
    /// See [`Self::predict`].
    pub fn predict_raw(
        &self,
        attendance_percentage: f64,
        study_hours: f64,
        previous_grade: f64,
    ) -> Result<f64> {
        self.predict(&FeatureVector::new(
            attendance_percentage,
            study_hours,
            previous_grade,
        ))
    }

    /// Predict a batch against one artifact snapshot.
    ///
    /// # Errors
    ///
    /// See [`Self::predict`].
    pub fn predict_many(&self, batch: &[FeatureVector]) -> Result<Vec<f64>> {
        let artifact = self.ready_artifact()?;
        Ok(batch.iter().map(|f| artifact.predict(f)).collect())
    }

    /// Block until every save queued so far has been attempted.
    pub fn flush(&self) {
        self.persister.flush();
    }

    /// True once an artifact is loaded or trained.
    #[must_use]
    pub fn is_trained(&self) -> bool {
        self.current.read().is_some()
    }

    /// Snapshot of the current artifact.
    #[must_use]
    pub fn artifact(&self) -> Option<Arc<ModelArtifact>> {
        self.current.read().clone()
    }

    /// Number of training runs completed by this instance.
    #[must_use]
    pub fn training_runs(&self) -> u64 {
        self.training_runs.load(Ordering::Acquire)
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &PredictorConfig {
        &self.config
    }

    fn ready_artifact(&self) -> Result<Arc<ModelArtifact>> {
        if let Some(artifact) = self.artifact() {
            return Ok(artifact);
        }

        let _gate = self.train_gate.lock();
        // another caller may have finished bootstrapping while we waited
        if let Some(artifact) = self.artifact() {
            return Ok(artifact);
        }
        info!("untrained on first prediction, bootstrapping");
        self.train_locked(None)
    }

    /// Caller must hold `train_gate`.
    fn train_locked(&self, data: Option<&[TrainingRecord]>) -> Result<Arc<ModelArtifact>> {
        let min = self.config.min_training_records;
        let provided = data.filter(|records| !records.is_empty() && records.len() >= min);

        let artifact = match provided {
            Some(records) => {
                let span = info_span!("train", source = "provided", samples = records.len());
                let _entered = span.enter();
                match ModelArtifact::fit(records, TrainingSource::Provided) {
                    Ok(artifact) if is_usable(&artifact) => artifact,
                    Ok(_) => {
                        warn!("provided records gave non-finite parameters, using synthetic data");
                        self.fit_synthetic()?
                    }
                    Err(err) => {
                        warn!(
                            error = %err,
                            "training on provided records failed, using synthetic data"
                        );
                        self.fit_synthetic()?
                    }
                }
            }
            None => {
                if let Some(records) = data {
                    info!(
                        samples = records.len(),
                        required = min,
                        "too few records, using synthetic data"
                    );
                }
                self.fit_synthetic()?
            }
        };

        let artifact = Arc::new(artifact);
        *self.current.write() = Some(Arc::clone(&artifact));
        self.training_runs.fetch_add(1, Ordering::AcqRel);
        // queued under the gate so saves follow swap order
        self.persister.enqueue(Arc::clone(&artifact));

        let meta = artifact.metadata();
        info!(
            samples = meta.samples,
            source = ?meta.source,
            r_squared = meta.r_squared,
            "model trained"
        );
        if let Some(hook) = &self.on_trained {
            hook(meta);
        }
        Ok(artifact)
    }

    fn fit_synthetic(&self) -> Result<ModelArtifact> {
        let span = info_span!("train", source = "synthetic", seed = self.generator.seed());
        let _entered = span.enter();
        let records = self.generator.generate()?;
        let artifact = ModelArtifact::fit(&records, TrainingSource::Synthetic)
            .map_err(|e| Error::Generation(e.to_string()))?;
        if !is_usable(&artifact) {
            return Err(Error::Generation(
                "synthetic fit produced non-finite parameters".into(),
            ));
        }
        Ok(artifact)
    }
}

fn is_usable(artifact: &ModelArtifact) -> bool {
    artifact.model().is_finite() && artifact.scaler().is_finite()
}

impl fmt::Debug for PredictorService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredictorService")
            .field("config", &self.config)
            .field("trained", &self.is_trained())
            .field("training_runs", &self.training_runs())
            .finish_non_exhaustive()
    }
}

enum PersistRequest {
    Save(Arc<ModelArtifact>),
    Flush(Sender<()>),
}

/// Owns the store and the thread that writes to it.
///
/// Dropping it closes the queue and waits for pending saves.
struct Persister {
    requests: Option<Sender<PersistRequest>>,
    worker: Option<JoinHandle<()>>,
}

impl Persister {
    fn spawn(store: Box<dyn ArtifactStore>) -> Result<Self> {
        let (requests, inbox) = channel::unbounded();
        let worker = thread::Builder::new()
            .name("artifact-persister".into())
            .spawn(move || persist_loop(store.as_ref(), &inbox))?;
        Ok(Self {
            requests: Some(requests),
            worker: Some(worker),
        })
    }

    fn enqueue(&self, artifact: Arc<ModelArtifact>) {
        let sent = self
            .requests
            .as_ref()
            .is_some_and(|tx| tx.send(PersistRequest::Save(artifact)).is_ok());
        if !sent {
            warn!("persister stopped, artifact kept in memory only");
        }
    }

    fn flush(&self) {
        let (done, wait) = channel::bounded(1);
        let Some(tx) = self.requests.as_ref() else {
            return;
        };
        if tx.send(PersistRequest::Flush(done)).is_ok() {
            // an error means the worker is gone; nothing left to wait for
            let _ = wait.recv();
        }
    }
}

impl Drop for Persister {
    fn drop(&mut self) {
        drop(self.requests.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("persister thread panicked");
            }
        }
    }
}

fn persist_loop(store: &dyn ArtifactStore, inbox: &Receiver<PersistRequest>) {
    while let Ok(first) = inbox.recv() {
        let mut latest = None;
        let mut waiters = Vec::new();
        for request in std::iter::once(first).chain(inbox.try_iter()) {
            match request {
                PersistRequest::Save(artifact) => latest = Some(artifact),
                PersistRequest::Flush(done) => waiters.push(done),
            }
        }

        if let Some(artifact) = latest {
            match store.save(&artifact) {
                Ok(()) => {
                    debug!(trained_at = %artifact.metadata().trained_at, "artifact persisted");
                }
                Err(err) => {
                    warn!(error = %err, "failed to persist artifact, continuing in memory");
                }
            }
        }
        for done in waiters {
            let _ = done.send(());
        }
    }
}
