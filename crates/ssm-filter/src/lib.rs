//! # ssm-filter
//!
//! Sequential Bayesian inference for linear-Gaussian state-space models.
//!
//! This crate provides:
//! - a model specification with per-step (time-varying) observation
//!   matrices, which is how regression covariates are injected,
//! - the Kalman filter recursion (recursive least squares) producing the
//!   full sequence of filtered posteriors,
//! - a closed-form batch posterior for the static-parameter regression
//!   case, used as an independent cross-check of the filter,
//! - posterior-predictive and simulation utilities.
//!
//! The filter is a strict left-to-right fold over the observations; any
//! prefix of its output is a valid posterior sequence. All covariance
//! updates go through symmetric (Cholesky) solves and the Joseph form so
//! covariances stay symmetric positive-semidefinite over long runs.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Closed-form batch posterior for static-parameter regression.
pub mod batch;
/// Design-matrix packing for the regression view.
pub mod design;
/// Kalman filter recursion.
pub mod filter;
/// Model specification and builders.
pub mod model;
/// Posterior-predictive distributions and intervals.
pub mod predict;
/// Trajectory and observation simulation.
pub mod simulate;
/// Bridges to serializable posterior summaries.
pub mod summary;
/// Substitutable estimator traits.
pub mod traits;

mod internal;

pub use batch::{batch_posterior, BatchPosterior};
pub use design::{design_rows, stack_design};
pub use filter::{filter, FilterResult};
pub use model::{ObservationMatrices, StateSpaceModel};
pub use predict::{posterior_predictive, predictive_intervals, Predictive, PredictiveIntervals};
pub use simulate::{simulate, SimResult};
pub use summary::summarize_posterior;
pub use traits::{BatchSolver, FilterEngine, KalmanEngine, NormalEquationsSolver};
