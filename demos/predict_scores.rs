//! Score Prediction Example
//!
//! Starts a predictor against an artifact directory, lets the first
//! prediction bootstrap a model from synthetic data, then scores a few
//! students. Run it twice to see the persisted artifact being reused.
//!
//! Run with: cargo run --example predict_scores

use score_predictor::logging::init_tracing;
use score_predictor::{FeatureVector, PredictorConfig, PredictorService};

fn main() -> anyhow::Result<()> {
    init_tracing();
    println!("=== Score Predictor ===\n");

    let dir = std::env::temp_dir().join("score-predictor-demo");
    let config = PredictorConfig::builder().artifact_dir(&dir).build()?;
    let service = PredictorService::new(config)?;
    println!("Artifact dir: {}", dir.display());
    println!("Trained at start-up: {}\n", service.is_trained());

    let students = [
        ("steady", FeatureVector::new(90.0, 8.0, 85.0)),
        ("struggling", FeatureVector::new(50.0, 4.0, 60.0)),
        ("average", FeatureVector::new(75.0, 5.5, 70.0)),
        ("out of range", FeatureVector::new(150.0, 40.0, 120.0)),
    ];

    for (label, features) in &students {
        let score = service.predict(features)?;
        println!(
            "   {label:<13} attendance={:>5.1} hours={:>4.1} grade={:>5.1} -> {score:>5.1}",
            features.attendance_percentage, features.study_hours, features.previous_grade
        );
    }

    if let Some(artifact) = service.artifact() {
        let meta = artifact.metadata();
        println!("\nModel:");
        println!("   Source: {:?} ({} samples)", meta.source, meta.samples);
        println!("   Trained: {}", meta.trained_at);
        println!("   R²: {:.3}", meta.r_squared);
        println!("   Coefficients: {:?}", artifact.model().coefficients);
        println!("   Intercept: {:.3}", artifact.model().intercept);
    }
    println!("Training runs this process: {}", service.training_runs());

    Ok(())
}
