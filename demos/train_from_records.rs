//! Training From Records Example
//!
//! Parses records the way the web layer would receive them (JSON), trains
//! on them, and shows the fallback to synthetic data when too few exist.
//!
//! Run with: cargo run --example train_from_records

use score_predictor::artifact::TrainingSource;
use score_predictor::logging::init_tracing;
use score_predictor::{PredictorConfig, PredictorService, TrainingRecord};

const RECORDS: &str = r#"[
    {"attendance_percentage": 95, "study_hours": 9,   "previous_grade": 88, "score": 91},
    {"attendance_percentage": 88, "study_hours": 7,   "previous_grade": 80, "score": 84},
    {"attendance_percentage": 72, "study_hours": 4,   "previous_grade": 65, "score": 63},
    {"attendance_percentage": 60, "study_hours": 2,   "previous_grade": 55, "score": 49},
    {"attendance_percentage": 81, "study_hours": 6,   "previous_grade": 77, "score": 76},
    {"attendance_percentage": 99, "study_hours": 8.5, "previous_grade": 93, "score": 95},
    {"attendance_percentage": 55, "study_hours": 3,   "previous_grade": 48, "score": 45},
    {"attendance_percentage": 67, "study_hours": 5,   "previous_grade": 70, "score": 66},
    {"attendance_percentage": 90, "study_hours": 6.5, "previous_grade": 72, "score": 79},
    {"attendance_percentage": 76, "study_hours": 3.5, "previous_grade": 83, "score": 71},
    {"attendance_percentage": 84, "study_hours": 8,   "previous_grade": 61, "score": 74},
    {"attendance_percentage": 58, "study_hours": 6,   "previous_grade": 59, "score": 57}
]"#;

fn main() -> anyhow::Result<()> {
    init_tracing();
    println!("=== Training From Records ===\n");

    let records: Vec<TrainingRecord> = serde_json::from_str(RECORDS)?;
    let config = PredictorConfig::builder().persist(false).build()?;
    let service = PredictorService::new(config)?;

    // -------------------------------------------------------------------------
    // 1. Enough real records
    // -------------------------------------------------------------------------
    let artifact = service.train(Some(records.as_slice()))?;
    report("real records", artifact.metadata().source, &service)?;

    // -------------------------------------------------------------------------
    // 2. Too few records: synthetic fallback
    // -------------------------------------------------------------------------
    let artifact = service.train(Some(&records[..5]))?;
    report("five records", artifact.metadata().source, &service)?;

    Ok(())
}

fn report(label: &str, source: TrainingSource, service: &PredictorService) -> anyhow::Result<()> {
    println!("{label}: trained on {source:?}");
    for (a, h, g) in [(90.0, 8.0, 85.0), (50.0, 4.0, 60.0)] {
        println!("   predict({a}, {h}, {g}) = {:.1}", service.predict_raw(a, h, g)?);
    }
    Ok(())
}
