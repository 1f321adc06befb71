//! Estimator traits.
//!
//! Callers that only need "a sequence of filtered posteriors" or "an exact
//! batch posterior" can depend on these traits instead of the concrete
//! routines; any implementation satisfying the contracts is substitutable.

use nalgebra::DVector;
use ssm_core::Result;

use crate::batch::{batch_posterior, BatchPosterior};
use crate::filter::{filter, FilterResult};
use crate::model::StateSpaceModel;

/// Sequential filtering engine: one posterior per observation.
pub trait FilterEngine: Send + Sync {
    /// Produce the full sequence of filtered posteriors for `ys`.
    fn run(&self, model: &StateSpaceModel, ys: &[DVector<f64>]) -> Result<FilterResult>;
}

/// One-shot exact posterior solver for the static-parameter case.
pub trait BatchSolver: Send + Sync {
    /// Compute the exact posterior over all of `ys` at once.
    fn solve(&self, model: &StateSpaceModel, ys: &[DVector<f64>]) -> Result<BatchPosterior>;
}

/// The Kalman recursion of [`crate::filter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct KalmanEngine;

impl FilterEngine for KalmanEngine {
    fn run(&self, model: &StateSpaceModel, ys: &[DVector<f64>]) -> Result<FilterResult> {
        filter(model, ys)
    }
}

/// The normal-equations solver of [`crate::batch`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalEquationsSolver;

impl BatchSolver for NormalEquationsSolver {
    fn solve(&self, model: &StateSpaceModel, ys: &[DVector<f64>]) -> Result<BatchPosterior> {
        batch_posterior(model, ys)
    }
}
