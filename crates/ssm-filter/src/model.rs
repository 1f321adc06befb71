//! Linear-Gaussian state-space model specification.
//!
//! State:
//! `x_t = F x_{t-1} + w_t`,  `w_t ~ N(0, Q)`
//!
//! Observation:
//! `y_t = H_t x_t + v_t`,    `v_t ~ N(0, R)`
//!
//! Initial prior:
//! `x_0 ~ N(m0, P0)`
//!
//! The observation matrix may vary per time step; this is how regression
//! covariates enter the model (each step's `H_t` is one row of the design
//! matrix).

use nalgebra::{DMatrix, DVector};
use ssm_core::{Error, Result};

use crate::internal::is_symmetric;

const SYMMETRY_TOL: f64 = 1e-9;

/// Observation matrices for a model: one fixed matrix, or one per time step.
#[derive(Debug, Clone)]
pub enum ObservationMatrices {
    /// A single `H` used at every step.
    TimeInvariant(DMatrix<f64>),
    /// One `H_t` per step; indexing past the end is a dimension error.
    TimeVarying(Vec<DMatrix<f64>>),
}

impl ObservationMatrices {
    /// Observation matrix for step `t`.
    ///
    /// For a time-varying sequence, `t` past the end is a
    /// [`Error::DimensionMismatch`] (the model does not cover that step),
    /// never a silent truncation.
    pub fn at(&self, t: usize) -> Result<&DMatrix<f64>> {
        match self {
            ObservationMatrices::TimeInvariant(h) => Ok(h),
            ObservationMatrices::TimeVarying(hs) => hs.get(t).ok_or_else(|| {
                Error::DimensionMismatch(format!(
                    "observation matrix sequence has {} steps, step {} requested",
                    hs.len(),
                    t
                ))
            }),
        }
    }

    /// Number of steps covered, or `None` for a time-invariant matrix.
    pub fn n_steps(&self) -> Option<usize> {
        match self {
            ObservationMatrices::TimeInvariant(_) => None,
            ObservationMatrices::TimeVarying(hs) => Some(hs.len()),
        }
    }

    fn first(&self) -> Option<&DMatrix<f64>> {
        match self {
            ObservationMatrices::TimeInvariant(h) => Some(h),
            ObservationMatrices::TimeVarying(hs) => hs.first(),
        }
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &DMatrix<f64>> + '_> {
        match self {
            ObservationMatrices::TimeInvariant(h) => Box::new(std::iter::once(h)),
            ObservationMatrices::TimeVarying(hs) => Box::new(hs.iter()),
        }
    }
}

/// Linear-Gaussian state-space model with a possibly time-varying
/// observation matrix.
#[derive(Debug, Clone)]
pub struct StateSpaceModel {
    /// State transition matrix `F` (n_state x n_state).
    pub f: DMatrix<f64>,
    /// Process noise covariance `Q` (n_state x n_state). May be exactly
    /// zero: the static-parameter case needs no special handling in the
    /// recursion.
    pub q: DMatrix<f64>,
    /// Observation matrices `H_t` (each n_obs x n_state).
    pub obs: ObservationMatrices,
    /// Observation noise covariance `R` (n_obs x n_obs).
    pub r: DMatrix<f64>,
    /// Initial state mean `m0` (n_state).
    pub m0: DVector<f64>,
    /// Initial state covariance `P0` (n_state x n_state).
    pub p0: DMatrix<f64>,
}

impl StateSpaceModel {
    /// Create a new model and validate matrix/vector dimensions.
    ///
    /// All shapes must be mutually conformant, all entries finite, and the
    /// covariance inputs `Q`, `R`, `P0` symmetric. Positive-definiteness is
    /// not factored here; a non-SPD covariance surfaces as a
    /// [`Error::Numerical`] at the solve that needs it.
    pub fn new(
        f: DMatrix<f64>,
        q: DMatrix<f64>,
        obs: ObservationMatrices,
        r: DMatrix<f64>,
        m0: DVector<f64>,
        p0: DMatrix<f64>,
    ) -> Result<Self> {
        let n = f.nrows();
        if n == 0 || f.ncols() != n {
            return Err(Error::DimensionMismatch("F must be square with n_state>0".to_string()));
        }
        if q.nrows() != n || q.ncols() != n {
            return Err(Error::DimensionMismatch("Q must be n_state x n_state".to_string()));
        }
        if p0.nrows() != n || p0.ncols() != n {
            return Err(Error::DimensionMismatch("P0 must be n_state x n_state".to_string()));
        }
        if m0.len() != n {
            return Err(Error::DimensionMismatch("m0 must have length n_state".to_string()));
        }

        let first = obs.first().ok_or_else(|| {
            Error::DimensionMismatch("observation matrix sequence must be non-empty".to_string())
        })?;
        let m = first.nrows();
        if m == 0 {
            return Err(Error::DimensionMismatch("H must have n_obs>0".to_string()));
        }
        for (t, h) in obs.iter().enumerate() {
            if h.nrows() != m || h.ncols() != n {
                return Err(Error::DimensionMismatch(format!(
                    "H[{}] must be n_obs x n_state ({} x {}), got {} x {}",
                    t,
                    m,
                    n,
                    h.nrows(),
                    h.ncols()
                )));
            }
        }
        if r.nrows() != m || r.ncols() != m {
            return Err(Error::DimensionMismatch("R must be n_obs x n_obs".to_string()));
        }

        if f.iter().any(|v| !v.is_finite())
            || q.iter().any(|v| !v.is_finite())
            || obs.iter().any(|h| h.iter().any(|v| !v.is_finite()))
            || r.iter().any(|v| !v.is_finite())
            || m0.iter().any(|v| !v.is_finite())
            || p0.iter().any(|v| !v.is_finite())
        {
            return Err(Error::Validation("model matrices/vectors must be finite".to_string()));
        }

        if !is_symmetric(&q, SYMMETRY_TOL) {
            return Err(Error::Validation("Q must be symmetric".to_string()));
        }
        if !is_symmetric(&r, SYMMETRY_TOL) {
            return Err(Error::Validation("R must be symmetric".to_string()));
        }
        if !is_symmetric(&p0, SYMMETRY_TOL) {
            return Err(Error::Validation("P0 must be symmetric".to_string()));
        }

        Ok(Self { f, q, obs, r, m0, p0 })
    }

    /// Static-parameter Bayesian regression model.
    ///
    /// The coefficients are constant over time (`F = I`, `Q = 0`) and each
    /// step observes one noisy linear functional of them:
    ///
    /// `y_t = H_t theta + v_t`, `v_t ~ N(0, obs_noise_var)`
    ///
    /// `rows` holds one `1 x n_state` observation matrix per step (see
    /// [`crate::design::design_rows`] for building them from covariates).
    pub fn static_regression(
        rows: Vec<DMatrix<f64>>,
        obs_noise_var: f64,
        m0: DVector<f64>,
        p0: DMatrix<f64>,
    ) -> Result<Self> {
        if !obs_noise_var.is_finite() || obs_noise_var <= 0.0 {
            return Err(Error::Validation("obs_noise_var must be finite and > 0".to_string()));
        }
        let n = m0.len();
        StateSpaceModel::new(
            DMatrix::identity(n, n),
            DMatrix::zeros(n, n),
            ObservationMatrices::TimeVarying(rows),
            DMatrix::from_row_slice(1, 1, &[obs_noise_var]),
            m0,
            p0,
        )
    }

    /// Local level model (random walk) with 1D state and 1D observations.
    ///
    /// State:
    /// `x_t = x_{t-1} + w_t`, `w_t ~ N(0, q)`
    ///
    /// Observation:
    /// `y_t = x_t + v_t`, `v_t ~ N(0, r)`
    pub fn local_level(q: f64, r: f64, m0: f64, p0: f64) -> Result<Self> {
        if !q.is_finite() || q < 0.0 {
            return Err(Error::Validation("q must be finite and >= 0".to_string()));
        }
        if !r.is_finite() || r <= 0.0 {
            return Err(Error::Validation("r must be finite and > 0".to_string()));
        }
        if !m0.is_finite() {
            return Err(Error::Validation("m0 must be finite".to_string()));
        }
        if !p0.is_finite() || p0 <= 0.0 {
            return Err(Error::Validation("p0 must be finite and > 0".to_string()));
        }

        StateSpaceModel::new(
            DMatrix::from_row_slice(1, 1, &[1.0]),
            DMatrix::from_row_slice(1, 1, &[q]),
            ObservationMatrices::TimeInvariant(DMatrix::from_row_slice(1, 1, &[1.0])),
            DMatrix::from_row_slice(1, 1, &[r]),
            DVector::from_row_slice(&[m0]),
            DMatrix::from_row_slice(1, 1, &[p0]),
        )
    }

    /// Number of latent state dimensions.
    pub fn n_state(&self) -> usize {
        self.f.nrows()
    }

    /// Number of observation dimensions.
    pub fn n_obs(&self) -> usize {
        self.r.nrows()
    }
}
