use tracing::debug_span;

use crate::error::OptimError;
use crate::float::Float;
use crate::linalg::neg;
use crate::objective::Objective;
use crate::options::{Algorithm, AlgorithmOptions};
use crate::trace::OptimizationTrace;

use super::{advance, finish, fixed_step, trace_capacity, Counted, Iterate};

/// Gradient descent with a fixed step: `w_new = w - alpha * ∇f(w)`.
///
/// `alpha` is never adapted and nothing guards against divergence: a step
/// size above `2 / L` oscillates and blows up, and the trace shows it.
pub fn gradient_descent<F: Float, O: Objective<F> + ?Sized>(
    obj: &O,
    options: &AlgorithmOptions<F>,
) -> Result<OptimizationTrace<F>, OptimError> {
    options.validate(Algorithm::GradientDescent, obj.dim(), obj.has_hessian())?;
    let _span = debug_span!("gradient_descent", dim = obj.dim(), alpha = ?options.alpha).entered();

    let obj = Counted::new(obj);
    let criteria = options.criteria();
    let mut current = Iterate::start(&obj, &options.initial_point);
    let mut iterations = Vec::with_capacity(trace_capacity(criteria.max_iter));

    let termination = loop {
        let direction = neg(&current.gradient);
        let step = fixed_step(&obj, &current.w, &direction, options.alpha);
        let (record, stop) = advance(&obj, &criteria, iterations.len(), &mut current, direction, step);
        iterations.push(record);
        if let Some(reason) = stop {
            break reason;
        }
    };

    Ok(finish(Algorithm::GradientDescent, iterations, termination, &obj))
}
