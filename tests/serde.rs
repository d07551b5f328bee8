#![cfg(feature = "serde")]

use optitrace::{
    gradient_descent, lbfgs, newton, AlgorithmOptions, ObjectiveFunctions, OptimizationTrace,
};
use optitrace_problems::AnalyticProblem;

fn options(problem: AnalyticProblem) -> AlgorithmOptions<f64> {
    AlgorithmOptions {
        initial_point: problem.initial_point(),
        max_iter: 10,
        ..Default::default()
    }
}

#[test]
fn roundtrip_newton_trace_json() {
    let problem = AnalyticProblem::Rosenbrock;
    let trace = newton(&problem, &options(problem)).unwrap();

    let json = serde_json::to_string(&trace).unwrap();
    let back: OptimizationTrace<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, trace);
    assert!(back.iterations.iter().all(|r| r.curvature.is_some()));
}

#[test]
fn roundtrip_lbfgs_trace_json() {
    let problem = AnalyticProblem::ThreeHumpCamel;
    let trace = lbfgs(&problem, &options(problem)).unwrap();

    let json = serde_json::to_string(&trace).unwrap();
    let back: OptimizationTrace<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(back.len(), trace.len());
    assert_eq!(back.termination, trace.termination);
    for (a, b) in back.iterations.iter().zip(&trace.iterations) {
        assert_eq!(a.w_new, b.w_new);
        assert_eq!(a.lbfgs, b.lbfgs);
    }
}

#[test]
fn trace_json_names_fields() {
    let problem = AnalyticProblem::Quadratic;
    let trace = newton(&problem, &options(problem)).unwrap();
    let value = serde_json::to_value(&trace).unwrap();
    let first = &value["iterations"][0];
    for key in ["w_old", "w_new", "loss", "gradient", "direction", "step_size"] {
        assert!(first.get(key).is_some(), "missing {key}");
    }
    assert_eq!(value["algorithm"], "Newton");
}

#[test]
fn roundtrip_diverged_trace_json() {
    // alpha = 2.5 is far past 2 / L on w0^2 + 100 w1^2
    let obj = ObjectiveFunctions::new(
        2,
        |w: &[f64]| w[0] * w[0] + 100.0 * w[1] * w[1],
        |w: &[f64]| vec![2.0 * w[0], 200.0 * w[1]],
    );
    let options = AlgorithmOptions {
        initial_point: vec![2.0, 2.0],
        alpha: 2.5,
        max_iter: 200,
        ..Default::default()
    };
    let trace = gradient_descent(&obj, &options).unwrap();
    assert!(!trace.is_finite());

    let json = serde_json::to_string(&trace).unwrap();
    assert!(json.contains(r#""NaN""#) && json.contains(r#""inf""#));
    let back: OptimizationTrace<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(back.len(), trace.len());
    assert!(!back.is_finite());
    for (a, b) in back.iterations.iter().zip(&trace.iterations) {
        for (&x, &y) in a.w_new.iter().zip(&b.w_new) {
            assert!(x == y || (x.is_nan() && y.is_nan()));
        }
        assert!(a.new_loss == b.new_loss || (a.new_loss.is_nan() && b.new_loss.is_nan()));
    }
}

#[test]
fn roundtrip_infinite_condition_number() {
    let obj = ObjectiveFunctions::new(
        2,
        |w: &[f64]| w[0] * w[0] + w[1] * w[1],
        |w: &[f64]| vec![2.0 * w[0], 2.0 * w[1]],
    )
    .with_hessian(|_: &[f64]| vec![vec![1.0, 1.0], vec![1.0, 1.0]]);
    let options = AlgorithmOptions {
        initial_point: vec![2.0, 3.0],
        hessian_damping: 0.0,
        max_iter: 1,
        ..Default::default()
    };
    let trace = newton(&obj, &options).unwrap();
    let json = serde_json::to_string(&trace).unwrap();
    let back: OptimizationTrace<f64> = serde_json::from_str(&json).unwrap();
    let kappa = back.iterations[0]
        .curvature
        .as_ref()
        .and_then(|c| c.condition_number)
        .unwrap();
    assert_eq!(kappa, f64::INFINITY);
    assert_eq!(back, trace);
}
