//! Iteration traces: the read-only output of every driver.
//!
//! Under the `serde` feature every float is written as a JSON number when
//! finite and as `"NaN"`, `"inf"` or `"-inf"` otherwise, so diverged runs
//! survive a round trip.

use crate::float::Float;
use crate::line_search::LineSearchTrial;
use crate::linalg::{dot, norm, sub, SolveMethod};
use crate::options::Algorithm;
use crate::termination::TerminationReason;

/// The line-search trials behind one step.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound = "F: Float")
)]
pub struct LineSearchLog<F> {
    /// Every candidate step, in evaluation order.
    pub trials: Vec<LineSearchTrial<F>>,
    /// `false` when the search ran out of trials and the smallest step was
    /// taken anyway.
    pub satisfied: bool,
}

/// Where a curvature-scaled direction came from.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound = "F: Float")
)]
pub enum DirectionSource<F> {
    /// Solution of the damped Newton system.
    Solve(SolveMethod<F>),
    /// Inverse of the damped Hessian diagonal. `fallback_entries` counts the
    /// coordinates whose damped diagonal was zero or non-finite and got a unit
    /// scale instead.
    Preconditioner { fallback_entries: usize },
    /// Every solve failed; the direction is `-g`.
    SteepestDescentFallback,
}

/// Hessian information recorded by Newton and the diagonal preconditioner.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound = "F: Float")
)]
pub struct CurvatureDiagnostics<F> {
    /// The undamped Hessian at `w_old`.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::matrix"))]
    pub hessian: Vec<Vec<F>>,
    /// Eigenvalues of `hessian`, descending; only for dimension <= 3.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::option_vec"))]
    pub eigenvalues: Option<Vec<F>>,
    /// `max |lambda| / min |lambda|`, when eigenvalues are available.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::option"))]
    pub condition_number: Option<F>,
    /// Damping added to the diagonal before solving.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::scalar"))]
    pub damping: F,
    /// How the direction was obtained from the Hessian.
    pub source: DirectionSource<F>,
    /// `diag(1 / (H_ii + damping))` for the diagonal preconditioner.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::option_vec"))]
    pub preconditioner: Option<Vec<F>>,
}

impl<F: Float> CurvatureDiagnostics<F> {
    /// Mixed-sign eigenvalues: `w_old` sits in a saddle region.
    pub fn is_saddle(&self) -> bool {
        self.eigenvalues.as_ref().is_some_and(|ev| {
            ev.iter().any(|&v| v > F::zero()) && ev.iter().any(|&v| v < F::zero())
        })
    }

    /// Condition number above `threshold` (or infinite).
    pub fn is_ill_conditioned(&self, threshold: F) -> bool {
        self.condition_number.is_some_and(|c| !(c <= threshold))
    }
}

/// One stored L-BFGS curvature pair.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound = "F: Float")
)]
pub struct MemoryPair<F> {
    /// `w_new - w_old`.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::vector"))]
    pub s: Vec<F>,
    /// `g_new - g_old`.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::vector"))]
    pub y: Vec<F>,
    /// `1 / (s . y)`.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::scalar"))]
    pub rho: F,
}

/// One step of either loop of the two-loop recursion.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound = "F: Float")
)]
pub struct TwoLoopStep<F> {
    /// Position of the pair in [`LbfgsDiagnostics::memory`] (0 = oldest).
    pub pair: usize,
    /// `alpha_i` in the backward loop, `beta_i` in the forward loop.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::scalar"))]
    pub coefficient: F,
    /// `q` after the backward update, `r` after the forward update.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::vector"))]
    pub vector: Vec<F>,
}

/// Intermediate values of the two-loop recursion.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound = "F: Float")
)]
pub struct TwoLoopDiagnostics<F> {
    /// Newest to oldest.
    pub backward: Vec<TwoLoopStep<F>>,
    /// `(s . y) / (y . y)` of the newest pair.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::scalar"))]
    pub gamma: F,
    /// Oldest to newest.
    pub forward: Vec<TwoLoopStep<F>>,
}

/// What happened to the curvature pair produced by a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MemoryUpdate {
    Stored,
    /// Stored after evicting the oldest pair.
    StoredEvictingOldest,
    /// `s . y` was not sufficiently positive; memory left unchanged.
    SkippedCurvature,
}

/// L-BFGS state behind one step.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound = "F: Float")
)]
pub struct LbfgsDiagnostics<F> {
    /// Pairs used to build this step's direction, oldest first.
    pub memory: Vec<MemoryPair<F>>,
    /// `None` on iterations with empty memory (direction `-g`).
    pub two_loop: Option<TwoLoopDiagnostics<F>>,
    /// Fate of the pair this step produced.
    pub update: MemoryUpdate,
}

/// One iteration: the move from `w_old` to `w_new` and everything that led to it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound = "F: Float")
)]
pub struct IterationRecord<F> {
    /// Zero-based iteration number.
    pub index: usize,
    /// Point at the start of the iteration.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::vector"))]
    pub w_old: Vec<F>,
    /// Point after the step.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::vector"))]
    pub w_new: Vec<F>,
    /// `f(w_old)`.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::scalar"))]
    pub loss: F,
    /// `f(w_new)`.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::scalar"))]
    pub new_loss: F,
    /// `∇f(w_old)`.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::vector"))]
    pub gradient: Vec<F>,
    /// `||∇f(w_old)||`.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::scalar"))]
    pub grad_norm: F,
    /// `||∇f(w_new)||`.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::scalar"))]
    pub new_grad_norm: F,
    /// Search direction `p`; `w_new = w_old + step_size * p`.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::vector"))]
    pub direction: Vec<F>,
    /// Step length actually taken along `direction`.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::scalar"))]
    pub step_size: F,
    /// Armijo trials, for steps chosen by line search.
    pub line_search: Option<LineSearchLog<F>>,
    /// Hessian diagnostics, for Newton and the diagonal preconditioner.
    pub curvature: Option<CurvatureDiagnostics<F>>,
    /// Memory and two-loop state, for L-BFGS.
    pub lbfgs: Option<LbfgsDiagnostics<F>>,
}

impl<F: Float> IterationRecord<F> {
    /// `||w_new - w_old||`.
    pub fn step_norm(&self) -> F {
        norm(&sub(&self.w_new, &self.w_old))
    }

    /// `g . p < 0`.
    pub fn is_descent_direction(&self) -> bool {
        dot(&self.gradient, &self.direction) < F::zero()
    }

    /// The line search ran out of trials on this step.
    pub fn line_search_degraded(&self) -> bool {
        self.line_search.as_ref().is_some_and(|ls| !ls.satisfied)
    }
}

/// Every iteration of one driver call and the reason it stopped.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound = "F: Float")
)]
pub struct OptimizationTrace<F> {
    /// The driver that produced the trace.
    pub algorithm: Algorithm,
    /// One record per iteration, in order; never more than `max_iter`.
    pub iterations: Vec<IterationRecord<F>>,
    /// Why the run stopped.
    pub termination: TerminationReason,
    /// Callback invocation counts over the whole run, line searches included.
    pub evaluations: EvaluationCounts,
}

/// How often each callback was invoked during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvaluationCounts {
    /// Calls to [`Objective::value`](crate::Objective::value).
    pub objective: usize,
    /// Calls to [`Objective::gradient`](crate::Objective::gradient).
    pub gradient: usize,
    /// Calls to [`Objective::hessian`](crate::Objective::hessian).
    pub hessian: usize,
}

impl<F: Float> OptimizationTrace<F> {
    /// Number of iterations performed.
    pub fn len(&self) -> usize {
        self.iterations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iterations.is_empty()
    }

    /// The last iterate.
    pub fn final_point(&self) -> Option<&[F]> {
        self.iterations.last().map(|r| r.w_new.as_slice())
    }

    /// Loss at the last iterate.
    pub fn final_loss(&self) -> Option<F> {
        self.iterations.last().map(|r| r.new_loss)
    }

    /// Gradient norm at the last iterate.
    pub fn final_grad_norm(&self) -> Option<F> {
        self.iterations.last().map(|r| r.new_grad_norm)
    }

    /// Loss at the start point followed by the loss after every iteration.
    pub fn losses(&self) -> Vec<F> {
        let mut out = Vec::with_capacity(self.iterations.len() + 1);
        if let Some(first) = self.iterations.first() {
            out.push(first.loss);
        }
        out.extend(self.iterations.iter().map(|r| r.new_loss));
        out
    }

    /// Every loss and gradient norm in the trace is finite.
    pub fn is_finite(&self) -> bool {
        self.iterations.iter().all(|r| {
            r.loss.is_finite()
                && r.new_loss.is_finite()
                && r.grad_norm.is_finite()
                && r.new_grad_norm.is_finite()
        })
    }

    /// Stopped on a tolerance with a finite final loss.
    pub fn converged(&self) -> bool {
        self.termination.is_converged() && self.is_finite()
    }

    /// Indices of iterations whose line search ran out of trials.
    pub fn degraded_line_searches(&self) -> Vec<usize> {
        self.iterations
            .iter()
            .filter(|r| r.line_search_degraded())
            .map(|r| r.index)
            .collect()
    }
}
