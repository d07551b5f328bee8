use std::fmt;

use crate::error::OptimError;
use crate::float::Float;

/// Convergence tolerances.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tolerances<F> {
    /// Gradient norm tolerance: stop when `||g|| < gtol` (default: 1e-6).
    pub gtol: F,
    /// Function change tolerance: stop when `|f_new - f_old| < ftol` (default: 1e-12).
    pub ftol: F,
    /// Step tolerance: stop when `||w_new - w_old|| < xtol` (default: 1e-12).
    pub xtol: F,
}

impl Default for Tolerances<f64> {
    fn default() -> Self {
        Tolerances {
            gtol: 1e-6,
            ftol: 1e-12,
            xtol: 1e-12,
        }
    }
}

impl Default for Tolerances<f32> {
    fn default() -> Self {
        Tolerances {
            gtol: 1e-4,
            ftol: 1e-7,
            xtol: 1e-7,
        }
    }
}

impl<F: Float> Tolerances<F> {
    pub(crate) fn validate(&self) -> Result<(), OptimError> {
        for (name, tol) in [("gtol", self.gtol), ("ftol", self.ftol), ("xtol", self.xtol)] {
            if tol.is_nan() || tol < F::zero() {
                return Err(OptimError::InvalidParameter {
                    name,
                    reason: "tolerance must be non-negative",
                });
            }
        }
        Ok(())
    }
}

/// The full set of stopping rules, checked after every iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminationCriteria<F> {
    /// Stop when the new gradient norm drops below this.
    pub gtol: F,
    /// Stop when the loss changes by less than this.
    pub ftol: F,
    /// Stop when the step is shorter than this.
    pub xtol: F,
    /// Stop after this many iterations.
    pub max_iter: usize,
}

/// Quantities measured at the end of an iteration.
#[derive(Debug, Clone, Copy)]
pub struct Progress<F> {
    /// `||∇f(w_new)||`.
    pub grad_norm: F,
    /// `|f(w_new) - f(w_old)|`.
    pub loss_change: F,
    /// `||w_new - w_old||`.
    pub step_norm: F,
    /// Iterations completed so far.
    pub iterations: usize,
}

/// Why a driver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminationReason {
    /// Gradient norm fell below `gtol`.
    GradientNorm,
    /// Change in loss fell below `ftol`.
    FunctionChange,
    /// Step length fell below `xtol`.
    StepSize,
    /// Reached `max_iter`.
    MaxIterations,
}

impl TerminationReason {
    /// `true` for every tolerance-based criterion, `false` for `MaxIterations`.
    pub fn is_converged(self) -> bool {
        !matches!(self, TerminationReason::MaxIterations)
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::GradientNorm => write!(f, "converged: gradient norm below tolerance"),
            TerminationReason::FunctionChange => {
                write!(f, "converged: loss change below tolerance")
            }
            TerminationReason::StepSize => write!(f, "converged: step size below tolerance"),
            TerminationReason::MaxIterations => write!(f, "maximum iterations reached"),
        }
    }
}

impl<F: Float> TerminationCriteria<F> {
    /// Return the first criterion satisfied by `progress`, in priority order:
    /// gradient norm, loss change, step size, iteration count.
    ///
    /// NaN never satisfies a tolerance, so a diverging run stops on
    /// `max_iter`.
    pub fn evaluate(&self, progress: &Progress<F>) -> Option<TerminationReason> {
        if progress.grad_norm < self.gtol {
            Some(TerminationReason::GradientNorm)
        } else if progress.loss_change < self.ftol {
            Some(TerminationReason::FunctionChange)
        } else if progress.step_norm < self.xtol {
            Some(TerminationReason::StepSize)
        } else if progress.iterations >= self.max_iter {
            Some(TerminationReason::MaxIterations)
        } else {
            None
        }
    }
}
