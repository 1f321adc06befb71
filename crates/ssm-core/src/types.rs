//! Common data types for the ssm crates.

use serde::{Deserialize, Serialize};

/// Flattened Gaussian posterior summary for presentation layers.
///
/// Means and marginal standard deviations are per-parameter; the covariance
/// is stored row-major so the type stays serializable without a
/// linear-algebra dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosteriorSummary {
    /// Posterior means, one per state dimension.
    pub means: Vec<f64>,

    /// Marginal standard deviations (sqrt of covariance diagonal).
    pub uncertainties: Vec<f64>,

    /// Posterior covariance matrix (row-major, N×N).
    pub covariance: Vec<f64>,

    /// Number of observations absorbed into this posterior.
    pub n_observations: usize,
}

impl PosteriorSummary {
    /// Create a new posterior summary.
    pub fn new(
        means: Vec<f64>,
        uncertainties: Vec<f64>,
        covariance: Vec<f64>,
        n_observations: usize,
    ) -> Self {
        Self { means, uncertainties, covariance, n_observations }
    }

    /// Number of state dimensions.
    pub fn dim(&self) -> usize {
        self.means.len()
    }

    /// Get correlation matrix element (i, j). Returns `None` if out of range
    /// or a marginal standard deviation is not strictly positive.
    pub fn correlation(&self, i: usize, j: usize) -> Option<f64> {
        let n = self.means.len();
        if i >= n || j >= n {
            return None;
        }
        let sigma_i = self.uncertainties[i];
        let sigma_j = self.uncertainties[j];
        if sigma_i <= 0.0 || sigma_j <= 0.0 {
            return None;
        }
        Some(self.covariance[i * n + j] / (sigma_i * sigma_j))
    }
}
