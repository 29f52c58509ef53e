//! Predictor service behaviour: lazy bootstrap, clamping, monotonicity,
//! persistence round trips and concurrent first use.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use score_predictor::artifact::{ArtifactMetadata, ArtifactStore, LoadError, TrainingSource};
use score_predictor::{
    FeatureVector, ModelArtifact, PredictorConfig, PredictorService, TrainingRecord,
};
use tempfile::TempDir;

fn sample_inputs() -> Vec<FeatureVector> {
    vec![
        FeatureVector::new(0.0, 0.0, 0.0),
        FeatureVector::new(100.0, 10.0, 100.0),
        FeatureVector::new(50.0, 4.0, 60.0),
        FeatureVector::new(90.0, 8.0, 85.0),
        FeatureVector::new(72.5, 5.5, 68.0),
    ]
}

fn in_memory() -> PredictorService {
    let config = PredictorConfig::builder().persist(false).build().unwrap();
    PredictorService::new(config).unwrap()
}

/// Score depends on study hours only (score = 10 * hours)
fn hours_only_records() -> Vec<TrainingRecord> {
    (0..40)
        .map(|i| {
            let i = f64::from(i);
            let hours = 1.0 + (i * 0.37) % 9.0;
            TrainingRecord::new(
                60.0 + (i * 1.3) % 40.0,
                hours,
                45.0 + (i * 2.9) % 55.0,
                10.0 * hours,
            )
        })
        .collect()
}

/// Store that takes a long time to write and never has anything to load
struct SlowStore {
    delay: Duration,
    saves: Arc<AtomicUsize>,
}

impl ArtifactStore for SlowStore {
    fn save(&self, _artifact: &ModelArtifact) -> score_predictor::Result<()> {
        thread::sleep(self.delay);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load(&self) -> Result<ModelArtifact, LoadError> {
        Err(LoadError::Missing {
            path: PathBuf::from("<slow>"),
        })
    }
}

fn on_disk(dir: &TempDir) -> PredictorService {
    let config = PredictorConfig::builder()
        .artifact_dir(dir.path())
        .build()
        .unwrap();
    PredictorService::new(config).unwrap()
}

// =============================================================================
// Scenario
// =============================================================================

#[test]
fn test_strong_student_outscores_weak_student() {
    let service = in_memory();
    service.train(None).unwrap();

    let strong = service.predict_raw(90.0, 8.0, 85.0).unwrap();
    let weak = service.predict_raw(50.0, 4.0, 60.0).unwrap();

    assert!(strong > weak, "strong {strong} <= weak {weak}");
    assert!((0.0..=100.0).contains(&strong));
    assert!((0.0..=100.0).contains(&weak));
}

#[test]
fn test_boundary_inputs_in_range() {
    let service = in_memory();
    for input in sample_inputs() {
        let score = service.predict(&input).unwrap();
        assert!((0.0..=100.0).contains(&score), "{input:?} -> {score}");
    }
}

#[test]
fn test_extreme_inputs_are_clamped() {
    let service = in_memory();
    assert_eq!(service.predict_raw(1_000.0, 100.0, 1_000.0).unwrap(), 100.0);
    assert_eq!(service.predict_raw(-1_000.0, -100.0, -1_000.0).unwrap(), 0.0);
}

#[test]
fn test_each_feature_increases_score() {
    let service = in_memory();
    let base = service.predict_raw(70.0, 5.0, 70.0).unwrap();

    assert!(service.predict_raw(90.0, 5.0, 70.0).unwrap() > base);
    assert!(service.predict_raw(70.0, 8.0, 70.0).unwrap() > base);
    assert!(service.predict_raw(70.0, 5.0, 85.0).unwrap() > base);
}

// =============================================================================
// Training
// =============================================================================

#[test]
fn test_retrain_is_deterministic() {
    let service = in_memory();
    let first = service.train(None).unwrap();
    let second = service.train(None).unwrap();

    for input in sample_inputs() {
        assert_eq!(first.predict(&input), second.predict(&input));
    }
}

#[test]
fn test_separate_services_agree() {
    let a = in_memory();
    let b = in_memory();
    for input in sample_inputs() {
        assert_eq!(a.predict(&input).unwrap(), b.predict(&input).unwrap());
    }
}

#[test]
fn test_real_records_drive_the_model() {
    let records = hours_only_records();
    let service = in_memory();
    let artifact = service.train(Some(records.as_slice())).unwrap();
    assert_eq!(artifact.metadata().source, TrainingSource::Provided);

    let score = service.predict_raw(75.0, 6.0, 70.0).unwrap();
    assert!((score - 60.0).abs() < 1e-6, "score {score}");
}

#[test]
fn test_nine_records_are_not_enough() {
    let records = vec![TrainingRecord::new(80.0, 5.0, 70.0, 75.0); 9];
    let service = in_memory();
    let artifact = service.train(Some(records.as_slice())).unwrap();
    assert_eq!(artifact.metadata().source, TrainingSource::Synthetic);
}

#[test]
fn test_min_records_is_configurable() {
    let config = PredictorConfig::builder()
        .persist(false)
        .min_training_records(3)
        .build()
        .unwrap();
    let service = PredictorService::new(config).unwrap();
    let records = vec![
        TrainingRecord::new(60.0, 2.0, 50.0, 40.0),
        TrainingRecord::new(80.0, 5.0, 70.0, 65.0),
        TrainingRecord::new(95.0, 9.0, 90.0, 92.0),
    ];
    let artifact = service.train(Some(records.as_slice())).unwrap();
    assert_eq!(artifact.metadata().source, TrainingSource::Provided);
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn test_restart_loads_persisted_artifact() {
    let dir = TempDir::new().unwrap();

    let first = on_disk(&dir);
    let trained = first.train(None).unwrap();
    assert!(dir.path().join("performance_model.json").exists());
    assert!(dir.path().join("scaler.json").exists());

    let restarted = on_disk(&dir);
    assert!(restarted.is_trained());
    assert_eq!(restarted.training_runs(), 0);
    for input in sample_inputs() {
        assert_eq!(restarted.predict(&input).unwrap(), trained.predict(&input));
    }
    assert_eq!(restarted.training_runs(), 0);
}

#[test]
fn test_missing_scaler_blob_means_untrained() {
    let dir = TempDir::new().unwrap();
    on_disk(&dir).train(None).unwrap();
    std::fs::remove_file(dir.path().join("scaler.json")).unwrap();

    let restarted = on_disk(&dir);
    assert!(!restarted.is_trained());
    restarted.predict_raw(70.0, 5.0, 70.0).unwrap();
    assert_eq!(restarted.training_runs(), 1);
}

#[test]
fn test_corrupt_model_blob_means_untrained() {
    let dir = TempDir::new().unwrap();
    on_disk(&dir).train(None).unwrap();
    std::fs::write(dir.path().join("performance_model.json"), b"{ not json").unwrap();

    let restarted = on_disk(&dir);
    assert!(!restarted.is_trained());
    let score = restarted.predict_raw(70.0, 5.0, 70.0).unwrap();
    assert!((0.0..=100.0).contains(&score));
}

#[test]
fn test_first_prediction_does_not_wait_for_save() {
    let saves = Arc::new(AtomicUsize::new(0));
    let store = SlowStore {
        delay: Duration::from_secs(2),
        saves: Arc::clone(&saves),
    };
    let config = PredictorConfig::builder().persist(false).build().unwrap();
    let service = PredictorService::with_store(config, Box::new(store)).unwrap();

    let started = Instant::now();
    let score = service.predict_raw(90.0, 8.0, 85.0).unwrap();
    let elapsed = started.elapsed();

    assert!((0.0..=100.0).contains(&score));
    assert!(elapsed < Duration::from_secs(1), "predict took {elapsed:?}");
    assert_eq!(saves.load(Ordering::SeqCst), 0);

    service.flush();
    assert_eq!(saves.load(Ordering::SeqCst), 1);
}

#[test]
fn test_train_waits_for_save() {
    let saves = Arc::new(AtomicUsize::new(0));
    let store = SlowStore {
        delay: Duration::from_millis(50),
        saves: Arc::clone(&saves),
    };
    let config = PredictorConfig::builder().persist(false).build().unwrap();
    let service = PredictorService::with_store(config, Box::new(store)).unwrap();

    service.train(None).unwrap();
    assert_eq!(saves.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unwritable_store_keeps_serving() {
    let dir = TempDir::new().unwrap();
    // A regular file where the artifact directory should be
    let blocker = dir.path().join("model");
    std::fs::write(&blocker, b"").unwrap();

    let config = PredictorConfig::builder()
        .artifact_dir(&blocker)
        .build()
        .unwrap();
    let service = PredictorService::new(config).unwrap();

    service.train(None).unwrap();
    assert!(service.is_trained());
    let score = service.predict_raw(85.0, 7.0, 80.0).unwrap();
    assert!((0.0..=100.0).contains(&score));
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_first_predictions_train_once() {
    const THREADS: usize = 16;

    let hook_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hook_calls);
    let service = Arc::new(in_memory().with_train_hook(Arc::new(
        move |_meta: &ArtifactMetadata| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
    )));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let service = Arc::clone(&service);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                #[allow(clippy::cast_precision_loss)]
                let attendance = 50.0 + i as f64;
                service.predict_raw(attendance, 5.0, 70.0).unwrap()
            })
        })
        .collect();

    for handle in handles {
        let score = handle.join().unwrap();
        assert!((0.0..=100.0).contains(&score));
    }
    assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.training_runs(), 1);
}

#[test]
fn test_predictions_during_retrain_see_whole_artifacts() {
    let records = Arc::new(hours_only_records());
    let query = FeatureVector::new(75.0, 6.0, 70.0);

    let service = Arc::new(in_memory());
    let from_records = service
        .train(Some(records.as_slice()))
        .unwrap()
        .predict(&query);
    let from_synthetic = service.train(None).unwrap().predict(&query);
    // The two fits must disagree, or a torn read would go unnoticed
    assert!(
        (from_records - from_synthetic).abs() > 1.0,
        "{from_records} vs {from_synthetic}"
    );

    let trainer = {
        let service = Arc::clone(&service);
        let records = Arc::clone(&records);
        thread::spawn(move || {
            for round in 0..20 {
                if round % 2 == 0 {
                    service.train(Some(records.as_slice())).unwrap();
                } else {
                    service.train(None).unwrap();
                }
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for _ in 0..200 {
                    let score = service.predict(&query).unwrap();
                    assert!(
                        score == from_records || score == from_synthetic,
                        "mixed artifact produced {score}"
                    );
                }
            })
        })
        .collect();

    trainer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(service.training_runs(), 22);
}
