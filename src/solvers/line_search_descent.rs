use tracing::debug_span;

use crate::error::OptimError;
use crate::float::Float;
use crate::linalg::neg;
use crate::objective::Objective;
use crate::options::{Algorithm, AlgorithmOptions};
use crate::trace::OptimizationTrace;

use super::{advance, armijo_step, finish, trace_capacity, Counted, Iterate};

/// Steepest descent with backtracking Armijo line search.
///
/// Direction `p = -∇f(w)` every iteration; the step size comes from
/// [`backtracking_armijo`](crate::line_search::backtracking_armijo) starting
/// at `alpha = 1`, which keeps progress robust to the objective's scale.
pub fn gradient_descent_line_search<F: Float, O: Objective<F> + ?Sized>(
    obj: &O,
    options: &AlgorithmOptions<F>,
) -> Result<OptimizationTrace<F>, OptimError> {
    options.validate(
        Algorithm::GradientDescentLineSearch,
        obj.dim(),
        obj.has_hessian(),
    )?;
    let _span = debug_span!("gradient_descent_line_search", dim = obj.dim()).entered();

    let obj = Counted::new(obj);
    let criteria = options.criteria();
    let params = options.armijo();
    let mut current = Iterate::start(&obj, &options.initial_point);
    let mut iterations = Vec::with_capacity(trace_capacity(criteria.max_iter));

    let termination = loop {
        let direction = neg(&current.gradient);
        let step = armijo_step(&obj, &current, &direction, &params);
        let (record, stop) = advance(&obj, &criteria, iterations.len(), &mut current, direction, step);
        iterations.push(record);
        if let Some(reason) = stop {
            break reason;
        }
    };

    Ok(finish(
        Algorithm::GradientDescentLineSearch,
        iterations,
        termination,
        &obj,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::ObjectiveFunctions;

    /// f(w) = 50 * w^2; a unit steepest-descent step overshoots.
    fn steep() -> ObjectiveFunctions<f64> {
        ObjectiveFunctions::new(1, |w: &[f64]| 50.0 * w[0] * w[0], |w: &[f64]| vec![100.0 * w[0]])
    }

    #[test]
    fn every_accepted_step_satisfies_armijo() {
        let options = AlgorithmOptions {
            initial_point: vec![1.0],
            max_iter: 50,
            ..Default::default()
        };
        let trace = gradient_descent_line_search(&steep(), &options).unwrap();
        assert!(trace.converged());
        for r in &trace.iterations {
            let ls = r.line_search.as_ref().unwrap();
            assert!(ls.satisfied);
            let last = ls.trials.last().unwrap();
            assert_eq!(last.alpha, r.step_size);
            let slope = r.gradient[0] * r.direction[0];
            assert!(r.new_loss <= r.loss + options.c1 * r.step_size * slope);
            assert!(r.new_loss < r.loss);
        }
    }

    #[test]
    fn loss_is_monotone() {
        let options = AlgorithmOptions {
            initial_point: vec![-3.0],
            ..Default::default()
        };
        let trace = gradient_descent_line_search(&steep(), &options).unwrap();
        let losses = trace.losses();
        assert!(losses.windows(2).all(|w| w[1] <= w[0]));
    }
}
