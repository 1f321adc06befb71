//! Simulation utilities for linear-Gaussian state-space models.
//!
//! Generates a latent trajectory and corresponding observations:
//! - x_t = F x_{t-1} + w_t, w_t ~ N(0, Q)
//! - y_t = H_t x_t    + v_t, v_t ~ N(0, R)

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use ssm_core::{Error, Result};

use crate::model::StateSpaceModel;

/// Simulation output.
#[derive(Debug, Clone)]
pub struct SimResult {
    /// Latent states (length T, each is n_state).
    pub xs: Vec<DVector<f64>>,
    /// Observations (length T, each is n_obs).
    pub ys: Vec<DVector<f64>>,
}

fn sample_mvn_zero(rng: &mut StdRng, cov: &DMatrix<f64>) -> Result<DVector<f64>> {
    let n = cov.nrows();
    if cov.ncols() != n || n == 0 {
        return Err(Error::DimensionMismatch("cov must be square and non-empty".to_string()));
    }

    // A zero covariance contributes zero noise; Cholesky would reject it.
    if cov.iter().all(|&v| v == 0.0) {
        return Ok(DVector::zeros(n));
    }

    let chol = cov
        .clone()
        .cholesky()
        .ok_or_else(|| Error::numerical("covariance not SPD (Cholesky failed)"))?;
    let l = chol.l();

    let mut z = DVector::<f64>::zeros(n);
    for i in 0..n {
        z[i] = StandardNormal.sample(rng);
    }
    Ok(l * z)
}

/// Simulate T steps from the model starting at the initial prior mean `m0`.
///
/// For a time-varying observation sequence, `t_max` must not exceed the
/// number of steps the model covers. Returns (xs, ys) of length T.
pub fn simulate(model: &StateSpaceModel, t_max: usize, seed: u64) -> Result<SimResult> {
    if t_max == 0 {
        return Err(Error::Validation("t_max must be > 0".to_string()));
    }

    let mut rng = StdRng::seed_from_u64(seed);

    let mut xs = Vec::with_capacity(t_max);
    let mut ys = Vec::with_capacity(t_max);

    let mut x = model.m0.clone();
    for t in 0..t_max {
        let h_t = model.obs.at(t)?;

        // State evolution
        let w = sample_mvn_zero(&mut rng, &model.q)?;
        x = &model.f * x + w;

        // Observation
        let v = sample_mvn_zero(&mut rng, &model.r)?;
        let y = h_t * &x + v;

        xs.push(x.clone());
        ys.push(y);
    }

    Ok(SimResult { xs, ys })
}
