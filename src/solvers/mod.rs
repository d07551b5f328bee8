//! The five drivers and the loop machinery they share.
//!
//! Every driver follows the same shape: validate the options, evaluate the
//! start point, then repeatedly pick a direction, take a step, and hand the
//! step to [`advance`], which evaluates the new gradient, builds the
//! [`IterationRecord`] and checks the termination criteria.

pub mod diagonal;
pub mod gradient_descent;
pub mod lbfgs;
pub mod line_search_descent;
pub mod newton;

use std::cell::Cell;

use tracing::{debug, trace, warn};

use crate::error::OptimError;
use crate::float::Float;
use crate::line_search::{backtracking_armijo, ArmijoParams};
use crate::linalg::{axpy, norm, sub};
use crate::objective::Objective;
use crate::options::{Algorithm, AlgorithmOptions, LineSearchMode};
use crate::termination::{Progress, TerminationCriteria, TerminationReason};
use crate::trace::{EvaluationCounts, IterationRecord, LineSearchLog, OptimizationTrace};

/// Run `algorithm` on `obj`.
pub fn run<F: Float, O: Objective<F> + ?Sized>(
    algorithm: Algorithm,
    obj: &O,
    options: &AlgorithmOptions<F>,
) -> Result<OptimizationTrace<F>, OptimError> {
    match algorithm {
        Algorithm::GradientDescent => gradient_descent::gradient_descent(obj, options),
        Algorithm::GradientDescentLineSearch => {
            line_search_descent::gradient_descent_line_search(obj, options)
        }
        Algorithm::DiagonalPreconditioner => diagonal::diagonal_preconditioner(obj, options),
        Algorithm::Newton => newton::newton(obj, options),
        Algorithm::Lbfgs => lbfgs::lbfgs(obj, options),
    }
}

/// Objective wrapper that counts callback invocations.
pub(crate) struct Counted<'a, O: ?Sized> {
    inner: &'a O,
    objective: Cell<usize>,
    gradient: Cell<usize>,
    hessian: Cell<usize>,
}

impl<'a, O: ?Sized> Counted<'a, O> {
    pub(crate) fn new(inner: &'a O) -> Self {
        Counted {
            inner,
            objective: Cell::new(0),
            gradient: Cell::new(0),
            hessian: Cell::new(0),
        }
    }

    pub(crate) fn counts(&self) -> EvaluationCounts {
        EvaluationCounts {
            objective: self.objective.get(),
            gradient: self.gradient.get(),
            hessian: self.hessian.get(),
        }
    }
}

impl<F: Float, O: Objective<F> + ?Sized> Objective<F> for Counted<'_, O> {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn value(&self, w: &[F]) -> F {
        self.objective.set(self.objective.get() + 1);
        self.inner.value(w)
    }

    fn gradient(&self, w: &[F]) -> Vec<F> {
        self.gradient.set(self.gradient.get() + 1);
        self.inner.gradient(w)
    }

    fn hessian(&self, w: &[F]) -> Option<Vec<Vec<F>>> {
        self.hessian.set(self.hessian.get() + 1);
        self.inner.hessian(w)
    }

    fn has_hessian(&self) -> bool {
        self.inner.has_hessian()
    }
}

/// Current iterate with its loss and gradient.
pub(crate) struct Iterate<F> {
    pub(crate) w: Vec<F>,
    pub(crate) loss: F,
    pub(crate) gradient: Vec<F>,
}

impl<F: Float> Iterate<F> {
    pub(crate) fn start<O: Objective<F> + ?Sized>(obj: &O, w0: &[F]) -> Self {
        let w = w0.to_vec();
        let loss = obj.value(&w);
        let gradient = obj.gradient(&w);
        Iterate { w, loss, gradient }
    }
}

/// A step along a direction: `point = w + alpha * p`.
pub(crate) struct Step<F> {
    pub(crate) alpha: F,
    pub(crate) point: Vec<F>,
    pub(crate) value: F,
    pub(crate) line_search: Option<LineSearchLog<F>>,
}

/// Step of fixed length `alpha`, no line search.
pub(crate) fn fixed_step<F: Float, O: Objective<F> + ?Sized>(
    obj: &O,
    w: &[F],
    p: &[F],
    alpha: F,
) -> Step<F> {
    let point = axpy(w, alpha, p);
    let value = obj.value(&point);
    Step {
        alpha,
        point,
        value,
        line_search: None,
    }
}

/// Armijo-backtracked step. Exhaustion is logged and kept in the record.
pub(crate) fn armijo_step<F: Float, O: Objective<F> + ?Sized>(
    obj: &O,
    current: &Iterate<F>,
    p: &[F],
    params: &ArmijoParams<F>,
) -> Step<F> {
    let ls = backtracking_armijo(obj, &current.w, p, current.loss, &current.gradient, params);
    if !ls.satisfied {
        warn!(
            trials = ls.trials.len(),
            alpha = ?ls.alpha,
            "line search exhausted; taking the smallest step tried"
        );
    }
    Step {
        alpha: ls.alpha,
        point: ls.point,
        value: ls.value,
        line_search: Some(LineSearchLog {
            trials: ls.trials,
            satisfied: ls.satisfied,
        }),
    }
}

/// Step under a [`LineSearchMode`]: Armijo, or the full step `alpha = 1`.
pub(crate) fn step_with_mode<F: Float, O: Objective<F> + ?Sized>(
    obj: &O,
    current: &Iterate<F>,
    p: &[F],
    mode: LineSearchMode,
    params: &ArmijoParams<F>,
) -> Step<F> {
    match mode {
        LineSearchMode::Armijo => armijo_step(obj, current, p, params),
        LineSearchMode::None => fixed_step(obj, &current.w, p, F::one()),
    }
}

/// Move `current` to the step's point, record the iteration and check the
/// termination criteria.
///
/// The returned record has no algorithm-specific diagnostics; drivers attach
/// those before pushing it.
pub(crate) fn advance<F: Float, O: Objective<F> + ?Sized>(
    obj: &O,
    criteria: &TerminationCriteria<F>,
    index: usize,
    current: &mut Iterate<F>,
    direction: Vec<F>,
    step: Step<F>,
) -> (IterationRecord<F>, Option<TerminationReason>) {
    let new_gradient = obj.gradient(&step.point);
    let grad_norm = norm(&current.gradient);
    let new_grad_norm = norm(&new_gradient);

    let w_old = std::mem::replace(&mut current.w, step.point.clone());
    let gradient = std::mem::replace(&mut current.gradient, new_gradient);
    let loss = current.loss;
    current.loss = step.value;

    let progress = Progress {
        grad_norm: new_grad_norm,
        loss_change: (step.value - loss).abs(),
        step_norm: norm(&sub(&step.point, &w_old)),
        iterations: index + 1,
    };
    trace!(
        index,
        loss = ?step.value,
        grad_norm = ?new_grad_norm,
        step_size = ?step.alpha,
        "iteration"
    );

    let record = IterationRecord {
        index,
        w_old,
        w_new: step.point,
        loss,
        new_loss: step.value,
        gradient,
        grad_norm,
        new_grad_norm,
        direction,
        step_size: step.alpha,
        line_search: step.line_search,
        curvature: None,
        lbfgs: None,
    };
    (record, criteria.evaluate(&progress))
}

pub(crate) fn finish<F: Float, O: ?Sized>(
    algorithm: Algorithm,
    iterations: Vec<IterationRecord<F>>,
    termination: TerminationReason,
    obj: &Counted<'_, O>,
) -> OptimizationTrace<F> {
    let evaluations = obj.counts();
    debug!(
        %algorithm,
        iterations = iterations.len(),
        %termination,
        objective_evals = evaluations.objective,
        gradient_evals = evaluations.gradient,
        "run finished"
    );
    OptimizationTrace {
        algorithm,
        iterations,
        termination,
        evaluations,
    }
}

/// Initial capacity for the record vector; `max_iter` may be huge.
pub(crate) fn trace_capacity(max_iter: usize) -> usize {
    max_iter.min(1024)
}
