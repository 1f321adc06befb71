//! Closed-form batch posterior for static-parameter regression.
//!
//! For the static-parameter, scalar-noise special case (`F = I`, `Q = 0`,
//! `n_obs = 1`, `R = [sigma^2]`) the exact posterior is available in one
//! normal-equations solve over all observations at once:
//!
//! precision = P0^{-1} + X^T X / sigma^2
//! mean      = solve(precision, P0^{-1} m0 + X^T y / sigma^2)
//!
//! where `X` stacks the per-step observation matrices (the design matrix).
//! This exists as an independent cross-check of the filter's final output,
//! not as a general-purpose solver.

use nalgebra::{DMatrix, DVector};
use ssm_core::{Error, Result};

use crate::internal::{spd_inverse, symmetrize};
use crate::model::StateSpaceModel;

/// Exact posterior in information form.
#[derive(Debug, Clone)]
pub struct BatchPosterior {
    /// Posterior mean.
    pub mean: DVector<f64>,
    /// Posterior precision (inverse covariance).
    pub precision: DMatrix<f64>,
}

impl BatchPosterior {
    /// Posterior covariance, via a solve-based inverse of the precision.
    pub fn covariance(&self) -> Result<DMatrix<f64>> {
        spd_inverse(&self.precision, "batch posterior covariance")
    }
}

/// Compute the exact batch posterior for a static-parameter regression model.
///
/// Fails with [`Error::Validation`] if the model is outside the special
/// case this solver covers, and with [`Error::Numerical`] if `P0` (or the
/// resulting precision) is singular.
pub fn batch_posterior(model: &StateSpaceModel, ys: &[DVector<f64>]) -> Result<BatchPosterior> {
    let n = model.n_state();

    if model.n_obs() != 1 {
        return Err(Error::Validation(
            "batch posterior requires scalar observations (n_obs = 1)".to_string(),
        ));
    }
    if model.f != DMatrix::identity(n, n) {
        return Err(Error::Validation(
            "batch posterior requires F = I (static parameter)".to_string(),
        ));
    }
    if model.q.iter().any(|&v| v != 0.0) {
        return Err(Error::Validation(
            "batch posterior requires Q = 0 (static parameter)".to_string(),
        ));
    }
    let sigma2 = model.r[(0, 0)];
    if !(sigma2.is_finite() && sigma2 > 0.0) {
        return Err(Error::Validation("batch posterior requires R = [sigma^2] > 0".to_string()));
    }

    if ys.is_empty() {
        return Err(Error::Validation("ys must be non-empty".to_string()));
    }
    if let Some(steps) = model.obs.n_steps() {
        if steps != ys.len() {
            return Err(Error::DimensionMismatch(format!(
                "observation matrix sequence has {} steps, got {} observations",
                steps,
                ys.len()
            )));
        }
    }

    // Stack the per-step observation rows into the T x n design matrix.
    let t_max = ys.len();
    let mut x = DMatrix::<f64>::zeros(t_max, n);
    let mut yv = DVector::<f64>::zeros(t_max);
    for (t, y) in ys.iter().enumerate() {
        if y.len() != 1 {
            return Err(Error::DimensionMismatch(format!(
                "y[{}] has wrong length: expected 1, got {}",
                t,
                y.len()
            )));
        }
        if !y[0].is_finite() {
            return Err(Error::Validation(format!("y[{}] must be finite", t)));
        }
        let h_t = model.obs.at(t)?;
        for j in 0..n {
            x[(t, j)] = h_t[(0, j)];
        }
        yv[t] = y[0];
    }

    let p0_inv = spd_inverse(&model.p0, "batch posterior: initial covariance")?;

    // precision = P0^{-1} + X^T X / sigma^2
    let xtx = x.transpose() * &x;
    let precision = symmetrize(&(&p0_inv + xtx / sigma2));

    // mean = precision^{-1} (P0^{-1} m0 + X^T y / sigma^2)
    let rhs = &p0_inv * &model.m0 + x.transpose() * yv / sigma2;
    let chol = precision
        .clone()
        .cholesky()
        .ok_or_else(|| Error::numerical("batch posterior: precision not SPD"))?;
    let mean = chol.solve(&rhs);

    Ok(BatchPosterior { mean, precision })
}
