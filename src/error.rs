//! Error types for loss model calculations
//!
//! Numerical shortfalls are never errors (they are reported through
//! [`crate::diagnostics`]). Errors are reserved for inputs that make a
//! calculation meaningless.

use thiserror::Error;

/// Errors raised by distribution constructors, discretizers and aggregators
#[derive(Debug, Error)]
pub enum LossModelError {
    /// A distribution was constructed with parameters outside its domain
    #[error("invalid {distribution} parameters: {reason}")]
    InvalidParameter {
        distribution: &'static str,
        reason: String,
    },

    /// The discretized severity does not fit on the aggregate grid
    #[error(
        "discretized severity has {severity_nodes} masses but the aggregate grid only has {aggregate_nodes} nodes"
    )]
    GridTooSmall {
        severity_nodes: usize,
        aggregate_nodes: usize,
    },

    /// A node count or simulation count of zero
    #[error("{0} must be at least 1")]
    EmptyGrid(&'static str),

    /// Discretization step that is not a positive finite number
    #[error("discretization step must be positive and finite, got {0}")]
    InvalidStep(f64),

    /// Negative deductible or non-positive cover
    #[error("invalid policy layer: {0}")]
    InvalidLayer(String),

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse loss model request: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read layers: {0}")]
    Csv(#[from] csv::Error),
}

impl LossModelError {
    /// Shorthand for [`LossModelError::InvalidParameter`]
    pub fn invalid(distribution: &'static str, reason: impl ToString) -> Self {
        LossModelError::InvalidParameter {
            distribution,
            reason: reason.to_string(),
        }
    }
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, LossModelError>;
