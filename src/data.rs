//! Feature and training record types shared by every component.

use serde::{Deserialize, Serialize};

/// Number of predictors the model is fixed to.
pub const FEATURE_COUNT: usize = 3;

/// One subject's predictors.
///
/// Ranges are conventional only (`attendance_percentage` and `previous_grade`
/// in `[0, 100]`, `study_hours >= 0`); nothing here rejects values outside
/// them. Callers at the web boundary validate user input, the predictor only
/// clamps its output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Attendance in percent
    pub attendance_percentage: f64,
    /// Weekly study hours
    pub study_hours: f64,
    /// Grade obtained in the previous period
    pub previous_grade: f64,
}

impl FeatureVector {
    /// Create a feature vector.
    #[must_use]
    pub const fn new(attendance_percentage: f64, study_hours: f64, previous_grade: f64) -> Self {
        Self {
            attendance_percentage,
            study_hours,
            previous_grade,
        }
    }

    /// Features in column order (attendance, hours, grade).
    #[must_use]
    pub const fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.attendance_percentage,
            self.study_hours,
            self.previous_grade,
        ]
    }
}

impl From<[f64; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f64; FEATURE_COUNT]) -> Self {
        Self::new(values[0], values[1], values[2])
    }
}

/// A feature vector labelled with the observed score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    /// Predictors
    #[serde(flatten)]
    pub features: FeatureVector,
    /// Regression target, conventionally in `[0, 100]`
    pub score: f64,
}

impl TrainingRecord {
    /// Create a training record from its four columns.
    #[must_use]
    pub const fn new(
        attendance_percentage: f64,
        study_hours: f64,
        previous_grade: f64,
        score: f64,
    ) -> Self {
        Self {
            features: FeatureVector::new(attendance_percentage, study_hours, previous_grade),
            score,
        }
    }
}

/// Ordered records; order has no effect on training.
pub type TrainingSet = Vec<TrainingRecord>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_vector_column_order() {
        let v = FeatureVector::new(90.0, 8.0, 85.0);
        assert_eq!(v.to_array(), [90.0, 8.0, 85.0]);
        assert_eq!(FeatureVector::from([90.0, 8.0, 85.0]), v);
    }

    #[test]
    fn test_training_record_flat_json() {
        let json = r#"{"attendance_percentage":75.0,"study_hours":5.5,"previous_grade":70.0,"score":68.0}"#;
        let record: TrainingRecord = serde_json::from_str(json).expect("flat record parses");
        assert_eq!(record, TrainingRecord::new(75.0, 5.5, 70.0, 68.0));
    }
}
