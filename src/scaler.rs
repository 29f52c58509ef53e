//! Feature standardization (zero mean, unit variance per column)

use serde::{Deserialize, Serialize};

use crate::data::{FeatureVector, TrainingRecord, FEATURE_COUNT};
use crate::{Error, Result};

/// Divisor used in place of a zero standard deviation.
pub const MIN_STD_DEV: f64 = 1e-8;

/// A standardized feature vector, in column order.
pub type ScaledVector = [f64; FEATURE_COUNT];

/// Per-feature mean and population standard deviation.
///
/// Computed once from a training set and reused for every transform of that
/// training run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    /// Column means
    pub means: [f64; FEATURE_COUNT],
    /// Column population standard deviations (may be zero)
    pub std_devs: [f64; FEATURE_COUNT],
}

impl ScalerParams {
    /// Standardize one vector: `(x - mean) / std` per column.
    ///
    /// A zero standard deviation is replaced by [`MIN_STD_DEV`].
    #[must_use]
    pub fn transform(&self, features: &FeatureVector) -> ScaledVector {
        let raw = features.to_array();
        let mut scaled = [0.0; FEATURE_COUNT];
        for (i, out) in scaled.iter_mut().enumerate() {
            *out = (raw[i] - self.means[i]) / effective_std(self.std_devs[i]);
        }
        scaled
    }

    /// True when every parameter is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.means.iter().chain(self.std_devs.iter()).all(|v| v.is_finite())
    }
}

fn effective_std(std: f64) -> f64 {
    if std < MIN_STD_DEV {
        MIN_STD_DEV
    } else {
        std
    }
}

/// Stateful standard scaler.
///
/// `fit` replaces the stored parameters; `transform` fails with
/// [`Error::NotFitted`] until the first fit.
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    params: Option<ScalerParams>,
}

impl StandardScaler {
    /// Create an unfitted scaler.
    #[must_use]
    pub const fn new() -> Self {
        Self { params: None }
    }

    /// Wrap previously fitted parameters (e.g. loaded from disk).
    #[must_use]
    pub const fn from_params(params: ScalerParams) -> Self {
        Self {
            params: Some(params),
        }
    }

    /// Compute mean and population standard deviation per feature.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyTrainingSet`] if `records` is empty.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(&mut self, records: &[TrainingRecord]) -> Result<ScalerParams> {
        if records.is_empty() {
            return Err(Error::EmptyTrainingSet);
        }
        let n = records.len() as f64;

        let mut means = [0.0; FEATURE_COUNT];
        for record in records {
            for (mean, value) in means.iter_mut().zip(record.features.to_array()) {
                *mean += value;
            }
        }
        for mean in &mut means {
            *mean /= n;
        }

        let mut variances = [0.0; FEATURE_COUNT];
        for record in records {
            for (i, value) in record.features.to_array().into_iter().enumerate() {
                let d = value - means[i];
                variances[i] += d * d;
            }
        }
        let std_devs = variances.map(|v| (v / n).sqrt());

        let params = ScalerParams { means, std_devs };
        self.params = Some(params);
        Ok(params)
    }

    /// Standardize one vector with the fitted parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFitted`] if `fit` was never called.
    pub fn transform(&self, features: &FeatureVector) -> Result<ScaledVector> {
        self.params
            .as_ref()
            .map(|p| p.transform(features))
            .ok_or(Error::NotFitted("StandardScaler"))
    }

    /// Fit on `records` and return every record's scaled features.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyTrainingSet`] if `records` is empty.
    pub fn fit_transform(&mut self, records: &[TrainingRecord]) -> Result<Vec<ScaledVector>> {
        let params = self.fit(records)?;
        Ok(records.iter().map(|r| params.transform(&r.features)).collect())
    }

    /// Fitted parameters, if any.
    #[must_use]
    pub const fn params(&self) -> Option<&ScalerParams> {
        self.params.as_ref()
    }
}
