use crate::float::Float;
use crate::linalg::{axpy, dot};
use crate::objective::Objective;

/// Parameters for the backtracking Armijo line search.
#[derive(Debug, Clone)]
pub struct ArmijoParams<F> {
    /// Sufficient decrease parameter (default: 1e-4).
    pub c1: F,
    /// Backtracking factor (default: 0.5).
    pub rho: F,
    /// Initial step size (default: 1.0).
    pub alpha_init: F,
    /// Trials before giving up (default: 20).
    pub max_trials: usize,
}

impl Default for ArmijoParams<f64> {
    fn default() -> Self {
        ArmijoParams {
            c1: 1e-4,
            rho: 0.5,
            alpha_init: 1.0,
            max_trials: 20,
        }
    }
}

impl Default for ArmijoParams<f32> {
    fn default() -> Self {
        ArmijoParams {
            c1: 1e-4,
            rho: 0.5,
            alpha_init: 1.0,
            max_trials: 20,
        }
    }
}

/// One candidate step evaluated by the line search.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound = "F: Float")
)]
pub struct LineSearchTrial<F> {
    /// Candidate step size.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::scalar"))]
    pub alpha: F,
    /// `f(w + alpha * p)`.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::scalar"))]
    pub loss: F,
    /// Right-hand side `f(w) + c1 * alpha * g^T p`.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_float::scalar"))]
    pub threshold: F,
    /// Whether `loss <= threshold`.
    pub satisfied: bool,
}

/// Outcome of a line search. Never fails: on exhaustion the last (smallest)
/// step is returned with `satisfied == false`.
#[derive(Debug, Clone)]
pub struct LineSearchResult<F> {
    /// The accepted step size.
    pub alpha: F,
    /// `w + alpha * p`.
    pub point: Vec<F>,
    /// Objective value at `point`.
    pub value: F,
    /// Every trial, in evaluation order.
    pub trials: Vec<LineSearchTrial<F>>,
    /// `false` when no trial met the Armijo condition.
    pub satisfied: bool,
}

/// Backtracking line search satisfying the Armijo (sufficient decrease) condition.
///
/// Searches for `alpha` such that `f(w + alpha*p) <= f(w) + c1 * alpha * g^T p`,
/// starting at `alpha_init` and multiplying by `rho` after each rejection.
///
/// `p` is expected to be a descent direction (`g^T p < 0`). That is not checked:
/// along an ascent direction every trial fails and the smallest step is
/// returned flagged as unsatisfied.
pub fn backtracking_armijo<F: Float, O: Objective<F> + ?Sized>(
    obj: &O,
    w: &[F],
    p: &[F],
    f_w: F,
    grad_w: &[F],
    params: &ArmijoParams<F>,
) -> LineSearchResult<F> {
    let slope = dot(grad_w, p);
    let mut alpha = params.alpha_init;
    let mut trials = Vec::with_capacity(params.max_trials);

    loop {
        let point = axpy(w, alpha, p);
        let value = obj.value(&point);
        let threshold = f_w + params.c1 * alpha * slope;
        let satisfied = value <= threshold;
        trials.push(LineSearchTrial {
            alpha,
            loss: value,
            threshold,
            satisfied,
        });

        if satisfied || trials.len() >= params.max_trials {
            return LineSearchResult {
                alpha,
                point,
                value,
                trials,
                satisfied,
            };
        }

        alpha = alpha * params.rho;
    }
}
