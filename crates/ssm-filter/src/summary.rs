//! Bridges from posterior (mean, covariance) pairs to the serializable
//! [`PosteriorSummary`] consumed by presentation layers.

use nalgebra::{DMatrix, DVector};
use ssm_core::{Error, PosteriorSummary, Result};

/// Flatten a Gaussian posterior into a [`PosteriorSummary`].
///
/// `n_observations` records how many observations the posterior absorbed
/// (for a filter run, the number of steps processed).
pub fn summarize_posterior(
    mean: &DVector<f64>,
    cov: &DMatrix<f64>,
    n_observations: usize,
) -> Result<PosteriorSummary> {
    let n = mean.len();
    if cov.nrows() != n || cov.ncols() != n {
        return Err(Error::DimensionMismatch("cov must be n_state x n_state".to_string()));
    }

    let mut uncertainties = Vec::with_capacity(n);
    for i in 0..n {
        let var = cov[(i, i)];
        if !var.is_finite() || var < 0.0 {
            return Err(Error::numerical(format!("invalid marginal variance at index {i}")));
        }
        uncertainties.push(var.sqrt());
    }

    let mut covariance = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            covariance.push(cov[(i, j)]);
        }
    }

    Ok(PosteriorSummary::new(mean.iter().copied().collect(), uncertainties, covariance, n_observations))
}
