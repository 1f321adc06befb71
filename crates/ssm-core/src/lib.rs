//! # ssm-core
//!
//! Core types for the ssm state-space crates.
//!
//! This crate holds the error taxonomy and the presentation-facing summary
//! types. It carries no algorithms and no linear-algebra dependency, so the
//! inference crates can depend on it without cycles.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error taxonomy and `Result` alias.
pub mod error;
/// Serializable summary types.
pub mod types;

pub use error::{Error, Result};
pub use types::PosteriorSummary;
