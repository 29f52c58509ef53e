//! Ordinary least squares over standardized features
//!
//! The fit solves the normal equations `XᵀX w = Xᵀy` with an intercept column.
//! `XᵀX` is symmetric positive semi-definite, so elimination runs without row
//! swaps; a vanishing pivot means the column is (numerically) dependent on the
//! previous ones and its coefficient is fixed at zero.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::FEATURE_COUNT;
use crate::scaler::ScaledVector;
use crate::{Error, Result};

/// Lowest score the model may return.
pub const MIN_SCORE: f64 = 0.0;
/// Highest score the model may return.
pub const MAX_SCORE: f64 = 100.0;

/// Unknowns in the normal equations: one per feature plus the intercept.
const UNKNOWNS: usize = FEATURE_COUNT + 1;
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Clamp a raw score into `[MIN_SCORE, MAX_SCORE]`.
///
/// NaN maps to `MIN_SCORE` so the range contract holds for every input.
#[must_use]
pub fn clamp_score(raw: f64) -> f64 {
    if raw.is_nan() {
        MIN_SCORE
    } else {
        raw.clamp(MIN_SCORE, MAX_SCORE)
    }
}

/// Fitted coefficients (one per scaled feature) and intercept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Weight per standardized feature
    pub coefficients: [f64; FEATURE_COUNT],
    /// Bias term
    pub intercept: f64,
}

impl ModelParams {
    /// `dot(coefficients, x) + intercept`, unclamped.
    #[must_use]
    pub fn predict_raw(&self, scaled: &ScaledVector) -> f64 {
        self.coefficients
            .iter()
            .zip(scaled)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept
    }

    /// Linear prediction clamped to the score range.
    #[must_use]
    pub fn predict(&self, scaled: &ScaledVector) -> f64 {
        clamp_score(self.predict_raw(scaled))
    }

    /// True when every parameter is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.intercept.is_finite() && self.coefficients.iter().all(|c| c.is_finite())
    }
}

/// Plain multivariate linear regression (no regularization).
#[derive(Debug, Clone, Default)]
pub struct LinearRegression {
    params: Option<ModelParams>,
}

impl LinearRegression {
    /// Create an unfitted model.
    #[must_use]
    pub const fn new() -> Self {
        Self { params: None }
    }

    /// Wrap previously fitted parameters.
    #[must_use]
    pub const fn from_params(params: ModelParams) -> Self {
        Self {
            params: Some(params),
        }
    }

    /// Fit coefficients and intercept minimizing the sum of squared errors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyTrainingSet`] for no rows and
    /// [`Error::ShapeMismatch`] when `features` and `targets` differ in length.
    pub fn train(&mut self, features: &[ScaledVector], targets: &[f64]) -> Result<ModelParams> {
        if features.len() != targets.len() {
            return Err(Error::ShapeMismatch {
                features: features.len(),
                targets: targets.len(),
            });
        }
        if features.is_empty() {
            return Err(Error::EmptyTrainingSet);
        }

        let (mut gram, mut moment) = normal_equations(features, targets);
        let solution = solve_psd(&mut gram, &mut moment);

        let mut coefficients = [0.0; FEATURE_COUNT];
        coefficients.copy_from_slice(&solution[..FEATURE_COUNT]);
        let params = ModelParams {
            coefficients,
            intercept: solution[FEATURE_COUNT],
        };
        debug!(
            coefficients = ?params.coefficients,
            intercept = params.intercept,
            "fitted linear model"
        );

        self.params = Some(params);
        Ok(params)
    }

    /// Clamped prediction for one scaled vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFitted`] if `train` was never called.
    pub fn predict(&self, scaled: &ScaledVector) -> Result<f64> {
        self.params
            .as_ref()
            .map(|p| p.predict(scaled))
            .ok_or(Error::NotFitted("LinearRegression"))
    }

    /// Coefficient of determination on the given rows (unclamped predictions).
    ///
    /// A constant target gives 1.0 on a perfect fit and 0.0 otherwise.
    ///
    /// # Errors
    ///
    /// Same as [`Self::train`], plus [`Error::NotFitted`].
    #[allow(clippy::cast_precision_loss)]
    pub fn r_squared(&self, features: &[ScaledVector], targets: &[f64]) -> Result<f64> {
        let params = self.params.as_ref().ok_or(Error::NotFitted("LinearRegression"))?;
        if features.len() != targets.len() {
            return Err(Error::ShapeMismatch {
                features: features.len(),
                targets: targets.len(),
            });
        }
        if targets.is_empty() {
            return Err(Error::EmptyTrainingSet);
        }

        let mean = targets.iter().sum::<f64>() / targets.len() as f64;
        let mut ss_res = 0.0;
        let mut ss_tot = 0.0;
        for (x, y) in features.iter().zip(targets) {
            ss_res += (y - params.predict_raw(x)).powi(2);
            ss_tot += (y - mean).powi(2);
        }

        if ss_tot == 0.0 {
            return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
        }
        Ok(1.0 - ss_res / ss_tot)
    }

    /// Fitted parameters, if any.
    #[must_use]
    pub const fn params(&self) -> Option<&ModelParams> {
        self.params.as_ref()
    }
}

type Gram = [[f64; UNKNOWNS]; UNKNOWNS];

/// Accumulate `XᵀX` and `Xᵀy`, with the last column of X fixed at 1.
fn normal_equations(features: &[ScaledVector], targets: &[f64]) -> (Gram, [f64; UNKNOWNS]) {
    let mut gram = [[0.0; UNKNOWNS]; UNKNOWNS];
    let mut moment = [0.0; UNKNOWNS];

    for (x, &y) in features.iter().zip(targets) {
        let mut row = [1.0; UNKNOWNS];
        row[..FEATURE_COUNT].copy_from_slice(x);
        for i in 0..UNKNOWNS {
            moment[i] += row[i] * y;
            for j in 0..UNKNOWNS {
                gram[i][j] += row[i] * row[j];
            }
        }
    }
    (gram, moment)
}

/// Gaussian elimination on a symmetric PSD system; dependent columns get 0.
fn solve_psd(gram: &mut Gram, rhs: &mut [f64; UNKNOWNS]) -> [f64; UNKNOWNS] {
    let scale = (0..UNKNOWNS).map(|i| gram[i][i]).fold(0.0_f64, f64::max);
    let tolerance = PIVOT_TOLERANCE * scale.max(1.0);
    let mut dependent = [false; UNKNOWNS];

    for k in 0..UNKNOWNS {
        let pivot = gram[k][k];
        if pivot.abs() <= tolerance {
            dependent[k] = true;
            continue;
        }
        for i in (k + 1)..UNKNOWNS {
            let factor = gram[i][k] / pivot;
            if factor == 0.0 {
                continue;
            }
            for j in k..UNKNOWNS {
                gram[i][j] -= factor * gram[k][j];
            }
            rhs[i] -= factor * rhs[k];
        }
    }

    let mut solution = [0.0; UNKNOWNS];
    for k in (0..UNKNOWNS).rev() {
        if dependent[k] {
            continue;
        }
        let tail: f64 = ((k + 1)..UNKNOWNS).map(|j| gram[k][j] * solution[j]).sum();
        solution[k] = (rhs[k] - tail) / gram[k][k];
    }
    solution
}
