use tracing::{debug_span, warn};

use crate::error::OptimError;
use crate::float::Float;
use crate::linalg::{add_diagonal, condition_number, neg, solve_symmetric, symmetric_eigenvalues};
use crate::objective::Objective;
use crate::options::{Algorithm, AlgorithmOptions};
use crate::trace::{CurvatureDiagnostics, DirectionSource, OptimizationTrace};

use super::{advance, finish, step_with_mode, trace_capacity, Counted, Iterate};

/// Damped Newton's method.
///
/// At each iteration solves `(H + damping * I) p = -g` with
/// [`solve_symmetric`] (Cholesky, then LU, then regularized LU; the matrix is
/// never inverted). With [`LineSearchMode::Armijo`](crate::LineSearchMode) the
/// step length is backtracked along `p`; with `None` the full Newton step is
/// taken.
///
/// An indefinite damped Hessian yields a direction that may point uphill. It
/// is not corrected: with the line search off the step goes uphill, with it on
/// the search exhausts and the record says so. Only when every solve fails does
/// the direction fall back to `-g`.
pub fn newton<F: Float, O: Objective<F> + ?Sized>(
    obj: &O,
    options: &AlgorithmOptions<F>,
) -> Result<OptimizationTrace<F>, OptimError> {
    options.validate(Algorithm::Newton, obj.dim(), obj.has_hessian())?;
    let _span = debug_span!(
        "newton",
        dim = obj.dim(),
        damping = ?options.hessian_damping,
        line_search = ?options.line_search
    )
    .entered();

    let obj = Counted::new(obj);
    let criteria = options.criteria();
    let params = options.armijo();
    let damping = options.hessian_damping;
    let mut current = Iterate::start(&obj, &options.initial_point);
    let mut iterations = Vec::with_capacity(trace_capacity(criteria.max_iter));

    let termination = loop {
        let hessian = obj.hessian(&current.w).ok_or(OptimError::MissingHessian {
            algorithm: Algorithm::Newton,
        })?;

        let damped = add_diagonal(&hessian, damping);
        let (direction, source) = match solve_symmetric(&damped, &neg(&current.gradient)) {
            Some(solve) => (solve.solution, DirectionSource::Solve(solve.method)),
            None => {
                warn!(
                    index = iterations.len(),
                    "damped Hessian unsolvable; falling back to steepest descent"
                );
                (neg(&current.gradient), DirectionSource::SteepestDescentFallback)
            }
        };

        let eigenvalues = symmetric_eigenvalues(&hessian);
        let curvature = CurvatureDiagnostics {
            condition_number: eigenvalues.as_deref().map(condition_number),
            eigenvalues,
            hessian,
            damping,
            source,
            preconditioner: None,
        };

        let step = step_with_mode(&obj, &current, &direction, options.line_search, &params);
        let (mut record, stop) =
            advance(&obj, &criteria, iterations.len(), &mut current, direction, step);
        record.curvature = Some(curvature);
        iterations.push(record);
        if let Some(reason) = stop {
            break reason;
        }
    };

    Ok(finish(Algorithm::Newton, iterations, termination, &obj))
}
