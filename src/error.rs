//! Input errors.
//!
//! Numerical trouble during a run (singular Hessians, exhausted line searches,
//! divergence) is never an error: it is recorded in the trace. Only invalid
//! input is rejected, before the first iteration.

use thiserror::Error;

use crate::options::Algorithm;

/// Errors raised when a run cannot be started.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptimError {
    /// The initial point has no coordinates.
    #[error("initial point is empty")]
    EmptyPoint,

    /// The initial point does not match the objective's dimension.
    #[error("initial point has {got} coordinates, objective expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    /// `max_iter` must be at least 1.
    #[error("max_iter must be positive")]
    InvalidMaxIter,

    /// L-BFGS memory size must be at least 1.
    #[error("L-BFGS memory size must be positive")]
    InvalidMemory,

    /// The algorithm needs second derivatives but the objective has none.
    #[error("{algorithm} requires a Hessian but the objective does not provide one")]
    MissingHessian { algorithm: Algorithm },

    /// A scalar option is out of range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
}
