use tracing::{debug_span, warn};

use crate::error::OptimError;
use crate::float::Float;
use crate::linalg::{condition_number, symmetric_eigenvalues};
use crate::objective::Objective;
use crate::options::{Algorithm, AlgorithmOptions};
use crate::trace::{CurvatureDiagnostics, DirectionSource, OptimizationTrace};

use super::{advance, finish, step_with_mode, trace_capacity, Counted, Iterate};

/// Diagonal-Hessian preconditioned descent.
///
/// `D = diag(1 / (H_ii + damping))`, direction `p = -D g`. Costs O(n) per
/// iteration beyond the Hessian evaluation and is exact only when the Hessian
/// is diagonal: off-diagonal (rotational) curvature is ignored entirely, so on
/// a rotated ill-conditioned bowl it degrades to scaled steepest descent.
pub fn diagonal_preconditioner<F: Float, O: Objective<F> + ?Sized>(
    obj: &O,
    options: &AlgorithmOptions<F>,
) -> Result<OptimizationTrace<F>, OptimError> {
    options.validate(
        Algorithm::DiagonalPreconditioner,
        obj.dim(),
        obj.has_hessian(),
    )?;
    let _span = debug_span!(
        "diagonal_preconditioner",
        dim = obj.dim(),
        damping = ?options.hessian_damping
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
            algorithm: Algorithm::DiagonalPreconditioner,
        })?;
        let (preconditioner, fallback_entries) = inverse_diagonal(&hessian, damping);
        if fallback_entries > 0 {
            warn!(
                index = iterations.len(),
                fallback_entries, "zero or non-finite damped diagonal; using unit scale"
            );
        }
        let direction: Vec<F> = preconditioner
            .iter()
            .zip(&current.gradient)
            .map(|(&d, &g)| -(d * g))
            .collect();

        let eigenvalues = symmetric_eigenvalues(&hessian);
        let curvature = CurvatureDiagnostics {
            condition_number: eigenvalues.as_deref().map(condition_number),
            eigenvalues,
            hessian,
            damping,
            source: DirectionSource::Preconditioner { fallback_entries },
            preconditioner: Some(preconditioner),
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

    Ok(finish(
        Algorithm::DiagonalPreconditioner,
        iterations,
        termination,
        &obj,
    ))
}

/// `1 / (H_ii + damping)`, with unit entries where that is undefined.
fn inverse_diagonal<F: Float>(hessian: &[Vec<F>], damping: F) -> (Vec<F>, usize) {
    let mut fallback = 0;
    let inv = hessian
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let d = row[i] + damping;
            let inv = F::one() / d;
            if d == F::zero() || !inv.is_finite() {
                fallback += 1;
                F::one()
            } else {
                inv
            }
        })
        .collect();
    (inv, fallback)
}
