//! Unified error type for the microgrid simulation core.
//!
//! Mirrors the three error kinds the core distinguishes: configuration
//! errors (caught before any numeric work), numeric failures (carried in a
//! result so the caller can fall back), and contract violations (a bug,
//! always fatal). Only the first and third surface through [`CoreError`];
//! numeric failures live in each subsystem's result type instead
//! (`PowerFlowResult::converged`, etc.) per the propagation policy.

use thiserror::Error;

/// Unified error type for all microgrid-core and microgrid-algo operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid shape, out-of-range parameter, missing field, or contradictory
    /// thresholds in a component/network configuration.
    #[error("configuration error in `{field}`: {message}")]
    Config { field: String, message: String },

    /// A time series does not have the required 8,760-sample shape.
    #[error("time series `{name}` has {actual} samples, expected {expected}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// A solver reported a hard failure with no meaningful fallback
    /// (e.g. LP non-optimality).
    #[error("solver error: {0}")]
    Solver(String),

    /// An invariant the core guarantees internally was violated; always a
    /// bug, never a caller mistake.
    #[error("contract violation: {0}")]
    Contract(String),

    /// Network topology error (missing slack bus, dangling branch index).
    #[error("network error: {0}")]
    Network(String),

    /// Generic wrapper for errors crossing from a dependency.
    #[error("{0}")]
    Other(String),
}

/// Convenience alias for results using [`CoreError`].
pub type CoreResult<T> = Result<T, CoreError>;

impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        CoreError::Other(err.to_string())
    }
}

impl From<String> for CoreError {
    fn from(s: String) -> Self {
        CoreError::Other(s)
    }
}

impl From<&str> for CoreError {
    fn from(s: &str) -> Self {
        CoreError::Other(s.to_string())
    }
}

impl CoreError {
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn shape(name: impl Into<String>, expected: usize, actual: usize) -> Self {
        CoreError::ShapeMismatch {
            name: name.into(),
            expected,
            actual,
        }
    }
}
