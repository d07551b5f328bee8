//! Instrumented first- and second-order optimizers.
//!
//! Every driver returns an [`OptimizationTrace`] recording each iteration in
//! full: the point before and after, loss, gradient, direction, step size and
//! the algorithm-specific state behind the step (line-search trials, Hessian
//! eigenvalues, L-BFGS memory and two-loop intermediates).

pub mod cache;
pub mod error;
pub mod float;
pub mod line_search;
pub mod linalg;
pub mod objective;
pub mod options;
#[cfg(feature = "serde")]
mod serde_float;
pub mod solvers;
pub mod termination;
pub mod trace;

pub use cache::{TraceCache, TraceKey};
pub use error::OptimError;
pub use float::Float;
pub use line_search::{backtracking_armijo, ArmijoParams, LineSearchResult, LineSearchTrial};
pub use linalg::{SolveMethod, SymmetricSolve};
pub use objective::{Objective, ObjectiveFunctions};
pub use options::{Algorithm, AlgorithmOptions, LineSearchMode};
pub use solvers::diagonal::diagonal_preconditioner;
pub use solvers::gradient_descent::gradient_descent;
pub use solvers::lbfgs::lbfgs;
pub use solvers::line_search_descent::gradient_descent_line_search;
pub use solvers::newton::newton;
pub use solvers::run;
pub use termination::{Progress, TerminationCriteria, TerminationReason, Tolerances};
pub use trace::{
    CurvatureDiagnostics, DirectionSource, EvaluationCounts, IterationRecord, LbfgsDiagnostics,
    LineSearchLog, MemoryPair, MemoryUpdate, OptimizationTrace, TwoLoopDiagnostics, TwoLoopStep,
};
