use std::fmt;

use crate::error::OptimError;
use crate::float::Float;
use crate::line_search::ArmijoParams;
use crate::termination::{TerminationCriteria, Tolerances};

/// The solvers this crate provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Algorithm {
    /// Gradient descent with a fixed step size.
    GradientDescent,
    /// Steepest descent with Armijo backtracking.
    GradientDescentLineSearch,
    /// Steepest descent scaled by the inverse Hessian diagonal.
    DiagonalPreconditioner,
    /// Damped Newton's method.
    Newton,
    /// Limited-memory BFGS.
    Lbfgs,
}

impl Algorithm {
    /// All algorithms, in increasing order of curvature information used.
    pub const ALL: [Algorithm; 5] = [
        Algorithm::GradientDescent,
        Algorithm::GradientDescentLineSearch,
        Algorithm::DiagonalPreconditioner,
        Algorithm::Lbfgs,
        Algorithm::Newton,
    ];

    /// Whether the algorithm evaluates the Hessian.
    pub fn needs_hessian(self) -> bool {
        matches!(self, Algorithm::Newton | Algorithm::DiagonalPreconditioner)
    }

    /// Whether the Armijo line search runs under the given mode.
    pub fn uses_line_search(self, mode: LineSearchMode) -> bool {
        match self {
            Algorithm::GradientDescent => false,
            Algorithm::GradientDescentLineSearch | Algorithm::Lbfgs => true,
            Algorithm::Newton | Algorithm::DiagonalPreconditioner => {
                mode == LineSearchMode::Armijo
            }
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::GradientDescent => write!(f, "gradient descent (fixed step)"),
            Algorithm::GradientDescentLineSearch => write!(f, "gradient descent (line search)"),
            Algorithm::DiagonalPreconditioner => write!(f, "diagonal preconditioner"),
            Algorithm::Newton => write!(f, "Newton's method"),
            Algorithm::Lbfgs => write!(f, "L-BFGS"),
        }
    }
}

/// Step-size policy for Newton and the diagonal preconditioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineSearchMode {
    /// Backtracking Armijo search starting at `alpha = 1`.
    #[default]
    Armijo,
    /// Always take the full step (`alpha = 1`).
    None,
}

/// Options shared by every driver. Each driver reads only the fields it needs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlgorithmOptions<F> {
    /// Maximum number of iterations (default: 100).
    pub max_iter: usize,
    /// Starting point. Must match the objective's dimension.
    pub initial_point: Vec<F>,
    /// Fixed step size for plain gradient descent (default: 0.1).
    pub alpha: F,
    /// Armijo sufficient-decrease constant (default: 1e-4).
    pub c1: F,
    /// Number of `(s, y)` pairs L-BFGS keeps (default: 5).
    pub memory: usize,
    /// `lambda` added to the Hessian diagonal by Newton and the diagonal
    /// preconditioner (default: 0.01).
    pub hessian_damping: F,
    /// Step-size policy for Newton and the diagonal preconditioner.
    pub line_search: LineSearchMode,
    /// Backtracking trials before the line search gives up (default: 20).
    pub max_line_search_trials: usize,
    /// Convergence tolerances.
    pub termination: Tolerances<F>,
}

impl Default for AlgorithmOptions<f64> {
    fn default() -> Self {
        AlgorithmOptions {
            max_iter: 100,
            initial_point: Vec::new(),
            alpha: 0.1,
            c1: 1e-4,
            memory: 5,
            hessian_damping: 0.01,
            line_search: LineSearchMode::Armijo,
            max_line_search_trials: 20,
            termination: Tolerances::default(),
        }
    }
}

impl Default for AlgorithmOptions<f32> {
    fn default() -> Self {
        AlgorithmOptions {
            max_iter: 100,
            initial_point: Vec::new(),
            alpha: 0.1,
            c1: 1e-4,
            memory: 5,
            hessian_damping: 0.01,
            line_search: LineSearchMode::Armijo,
            max_line_search_trials: 20,
            termination: Tolerances::default(),
        }
    }
}

impl<F: Float> AlgorithmOptions<F> {
    /// Termination criteria derived from `max_iter` and the tolerances.
    pub fn criteria(&self) -> TerminationCriteria<F> {
        TerminationCriteria {
            gtol: self.termination.gtol,
            ftol: self.termination.ftol,
            xtol: self.termination.xtol,
            max_iter: self.max_iter,
        }
    }

    /// Armijo parameters derived from `c1` and `max_line_search_trials`.
    pub fn armijo(&self) -> ArmijoParams<F> {
        ArmijoParams {
            c1: self.c1,
            rho: F::constant(0.5),
            alpha_init: F::one(),
            max_trials: self.max_line_search_trials,
        }
    }

    /// Reject inputs that make a run meaningless before it starts.
    pub fn validate(
        &self,
        algorithm: Algorithm,
        dim: usize,
        has_hessian: bool,
    ) -> Result<(), OptimError> {
        if self.initial_point.is_empty() {
            return Err(OptimError::EmptyPoint);
        }
        if self.initial_point.len() != dim {
            return Err(OptimError::DimensionMismatch {
                expected: dim,
                got: self.initial_point.len(),
            });
        }
        if self.max_iter == 0 {
            return Err(OptimError::InvalidMaxIter);
        }
        if algorithm == Algorithm::Lbfgs && self.memory == 0 {
            return Err(OptimError::InvalidMemory);
        }
        if algorithm.needs_hessian() {
            if !has_hessian {
                return Err(OptimError::MissingHessian { algorithm });
            }
            if !self.hessian_damping.is_finite() || self.hessian_damping < F::zero() {
                return Err(OptimError::InvalidParameter {
                    name: "hessian_damping",
                    reason: "must be finite and non-negative",
                });
            }
        }
        if algorithm == Algorithm::GradientDescent
            && (!self.alpha.is_finite() || self.alpha <= F::zero())
        {
            return Err(OptimError::InvalidParameter {
                name: "alpha",
                reason: "must be finite and positive",
            });
        }
        if algorithm.uses_line_search(self.line_search) {
            if !(self.c1 > F::zero() && self.c1 < F::one()) {
                return Err(OptimError::InvalidParameter {
                    name: "c1",
                    reason: "must lie in (0, 1)",
                });
            }
            if self.max_line_search_trials == 0 {
                return Err(OptimError::InvalidParameter {
                    name: "max_line_search_trials",
                    reason: "must be positive",
                });
            }
        }
        self.termination.validate()
    }
}
