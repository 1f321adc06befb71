//! Posterior-predictive distributions for new observation matrices.
//!
//! Given a posterior `(mean, cov)` over the state and a new observation
//! matrix `H_new` (for regression: the design row of a new covariate
//! point), the predictive observation distribution is Gaussian:
//!
//! `y_new ~ N(H_new mean, H_new cov H_new^T + R)`

use nalgebra::{DMatrix, DVector};
use ssm_core::{Error, Result};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::internal::symmetrize;
use crate::model::StateSpaceModel;

/// Predictive observation distribution.
#[derive(Debug, Clone)]
pub struct Predictive {
    /// Predictive mean (n_obs).
    pub mean: DVector<f64>,
    /// Predictive covariance (n_obs x n_obs).
    pub cov: DMatrix<f64>,
}

/// Marginal two-sided normal intervals for a predictive distribution.
#[derive(Debug, Clone)]
pub struct PredictiveIntervals {
    /// Alpha for the two-sided interval (e.g. 0.05 means 95% interval).
    pub alpha: f64,
    /// Standard normal z-value for `1 - alpha/2`.
    pub z: f64,
    /// Lower bounds (n_obs).
    pub lower: DVector<f64>,
    /// Upper bounds (n_obs).
    pub upper: DVector<f64>,
}

/// Posterior predictive at a new observation matrix.
///
/// `mean`/`cov` are a state posterior (typically the filter's final step or
/// a batch posterior's mean/covariance); `h_new` must be `n_obs x n_state`
/// for the model's noise covariance to apply.
pub fn posterior_predictive(
    model: &StateSpaceModel,
    h_new: &DMatrix<f64>,
    mean: &DVector<f64>,
    cov: &DMatrix<f64>,
) -> Result<Predictive> {
    let n = model.n_state();
    let m = model.n_obs();
    if h_new.nrows() != m || h_new.ncols() != n {
        return Err(Error::DimensionMismatch(format!(
            "H_new must be {} x {}, got {} x {}",
            m,
            n,
            h_new.nrows(),
            h_new.ncols()
        )));
    }
    if mean.len() != n {
        return Err(Error::DimensionMismatch("mean must have length n_state".to_string()));
    }
    if cov.nrows() != n || cov.ncols() != n {
        return Err(Error::DimensionMismatch("cov must be n_state x n_state".to_string()));
    }

    let y_mean = h_new * mean;
    let y_cov = h_new * cov * h_new.transpose() + &model.r;
    Ok(Predictive { mean: y_mean, cov: symmetrize(&y_cov) })
}

/// Compute marginal normal prediction intervals for `pred`.
pub fn predictive_intervals(pred: &Predictive, alpha: f64) -> Result<PredictiveIntervals> {
    if !(alpha.is_finite() && alpha > 0.0 && alpha < 1.0) {
        return Err(Error::Validation("alpha must be in (0, 1)".to_string()));
    }
    let m = pred.mean.len();
    if pred.cov.nrows() != m || pred.cov.ncols() != m {
        return Err(Error::DimensionMismatch("predictive cov has wrong shape".to_string()));
    }

    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| Error::Validation(format!("failed to construct normal distribution: {e}")))?;
    let z = normal.inverse_cdf(1.0 - 0.5 * alpha);
    if !z.is_finite() || z <= 0.0 {
        return Err(Error::numerical("invalid z for alpha"));
    }

    let mut lower = DVector::<f64>::zeros(m);
    let mut upper = DVector::<f64>::zeros(m);
    for i in 0..m {
        let mu = pred.mean[i];
        let var = pred.cov[(i, i)];
        if !mu.is_finite() || !var.is_finite() {
            return Err(Error::numerical("predictive intervals: non-finite mean/variance"));
        }
        if var < 0.0 {
            return Err(Error::numerical("predictive intervals: negative marginal variance"));
        }
        let sd = var.sqrt();
        lower[i] = mu - z * sd;
        upper[i] = mu + z * sd;
    }

    Ok(PredictiveIntervals { alpha, z, lower, upper })
}
