//! Error types for the ssm crates.

use thiserror::Error;

fn fmt_step(step: &Option<usize>) -> String {
    match step {
        Some(t) => format!(" at step {t}"),
        None => String::new(),
    }
}

/// ssm error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Matrix/vector shape inconsistent with the model specification.
    ///
    /// Detected eagerly at model construction and at each per-step
    /// observation-matrix lookup.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Singular or ill-conditioned matrix where a solve/inverse is required.
    ///
    /// `step` identifies the offending time index when the failure occurs
    /// inside the filtering recursion.
    #[error("numerical error{}: {message}", fmt_step(.step))]
    Numerical {
        /// Time step at which the failure occurred, if inside a recursion.
        step: Option<usize>,
        /// Human-readable description of the failure.
        message: String,
    },

    /// Input contract violation (non-finite values, empty sequences, ...).
    #[error("validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Numerical error with no associated time step.
    pub fn numerical(message: impl Into<String>) -> Self {
        Error::Numerical { step: None, message: message.into() }
    }

    /// Numerical error attributed to time step `step`.
    pub fn numerical_at(step: usize, message: impl Into<String>) -> Self {
        Error::Numerical { step: Some(step), message: message.into() }
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
