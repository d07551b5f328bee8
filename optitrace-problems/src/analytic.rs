//! Closed-form test objectives with exact gradients and Hessians.

use std::f64::consts::FRAC_PI_4;
use std::fmt;
use std::str::FromStr;

use optitrace::linalg::{dot, lu_solve};
use optitrace::Objective;

use crate::error::ProblemError;

/// The named two-dimensional reference problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalyticProblem {
    /// `w0^2 + w1^2`.
    Quadratic,
    /// `w0^2 + 100 w1^2`, condition number 100.
    IllConditioned,
    /// `(1 - w0)^2 + 100 (w1 - w0^2)^2`.
    Rosenbrock,
    /// `w0^2 - w1^2`, unbounded below.
    Saddle,
    /// `2 w0^2 - 1.05 w0^4 + w0^6 / 6 + w0 w1 + w1^2`: one global and two
    /// local minima.
    ThreeHumpCamel,
    /// `IllConditioned` rotated by 45 degrees, so all of its curvature sits
    /// off the diagonal axes.
    RotatedQuadratic,
}

impl AnalyticProblem {
    pub const ALL: [AnalyticProblem; 6] = [
        AnalyticProblem::Quadratic,
        AnalyticProblem::IllConditioned,
        AnalyticProblem::Rosenbrock,
        AnalyticProblem::Saddle,
        AnalyticProblem::ThreeHumpCamel,
        AnalyticProblem::RotatedQuadratic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AnalyticProblem::Quadratic => "quadratic",
            AnalyticProblem::IllConditioned => "ill-conditioned-quadratic",
            AnalyticProblem::Rosenbrock => "rosenbrock",
            AnalyticProblem::Saddle => "non-convex-saddle",
            AnalyticProblem::ThreeHumpCamel => "three-hump-camel",
            AnalyticProblem::RotatedQuadratic => "rotated-quadratic",
        }
    }

    /// A conventional starting point.
    pub fn initial_point(self) -> Vec<f64> {
        match self {
            AnalyticProblem::Rosenbrock => vec![-1.2, 1.0],
            AnalyticProblem::Saddle => vec![1.0, 0.1],
            AnalyticProblem::ThreeHumpCamel => vec![1.5, 1.5],
            _ => vec![2.0, 2.0],
        }
    }

    /// The global minimizer, if the problem is bounded below.
    pub fn minimizer(self) -> Option<Vec<f64>> {
        match self {
            AnalyticProblem::Rosenbrock => Some(vec![1.0, 1.0]),
            AnalyticProblem::Saddle => None,
            _ => Some(vec![0.0, 0.0]),
        }
    }
}

impl fmt::Display for AnalyticProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnalyticProblem {
    type Err = ProblemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalyticProblem::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| ProblemError::UnknownProblem(s.to_owned()))
    }
}

/// Look up an analytic problem by its name.
pub fn problem_by_name(name: &str) -> Result<AnalyticProblem, ProblemError> {
    name.parse()
}

impl Objective<f64> for AnalyticProblem {
    fn dim(&self) -> usize {
        2
    }

    fn value(&self, w: &[f64]) -> f64 {
        let (x, y) = (w[0], w[1]);
        match self {
            AnalyticProblem::Quadratic => x * x + y * y,
            AnalyticProblem::IllConditioned => x * x + 100.0 * y * y,
            AnalyticProblem::Rosenbrock => {
                let a = 1.0 - x;
                let b = y - x * x;
                a * a + 100.0 * b * b
            }
            AnalyticProblem::Saddle => x * x - y * y,
            AnalyticProblem::ThreeHumpCamel => {
                let x2 = x * x;
                2.0 * x2 - 1.05 * x2 * x2 + x2 * x2 * x2 / 6.0 + x * y + y * y
            }
            AnalyticProblem::RotatedQuadratic => rotated().value(w),
        }
    }

    fn gradient(&self, w: &[f64]) -> Vec<f64> {
        let (x, y) = (w[0], w[1]);
        match self {
            AnalyticProblem::Quadratic => vec![2.0 * x, 2.0 * y],
            AnalyticProblem::IllConditioned => vec![2.0 * x, 200.0 * y],
            AnalyticProblem::Rosenbrock => {
                let b = y - x * x;
                vec![-2.0 * (1.0 - x) - 400.0 * x * b, 200.0 * b]
            }
            AnalyticProblem::Saddle => vec![2.0 * x, -2.0 * y],
            AnalyticProblem::ThreeHumpCamel => {
                let x2 = x * x;
                vec![4.0 * x - 4.2 * x2 * x + x2 * x2 * x + y, x + 2.0 * y]
            }
            AnalyticProblem::RotatedQuadratic => rotated().gradient(w),
        }
    }

    fn hessian(&self, w: &[f64]) -> Option<Vec<Vec<f64>>> {
        let (x, y) = (w[0], w[1]);
        let h = match self {
            AnalyticProblem::Quadratic => vec![vec![2.0, 0.0], vec![0.0, 2.0]],
            AnalyticProblem::IllConditioned => vec![vec![2.0, 0.0], vec![0.0, 200.0]],
            AnalyticProblem::Rosenbrock => {
                let h00 = 2.0 - 400.0 * (y - x * x) + 800.0 * x * x;
                let h01 = -400.0 * x;
                vec![vec![h00, h01], vec![h01, 200.0]]
            }
            AnalyticProblem::Saddle => vec![vec![2.0, 0.0], vec![0.0, -2.0]],
            AnalyticProblem::ThreeHumpCamel => {
                let x2 = x * x;
                vec![vec![4.0 - 12.6 * x2 + 5.0 * x2 * x2, 1.0], vec![1.0, 2.0]]
            }
            AnalyticProblem::RotatedQuadratic => return rotated().hessian(w),
        };
        Some(h)
    }

    fn has_hessian(&self) -> bool {
        true
    }
}

fn rotated() -> QuadraticForm {
    QuadraticForm::rotated(2.0, 200.0, FRAC_PI_4)
}

/// `f(w) = 0.5 w^T A w - b^T w` for a symmetric `A`.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticForm {
    a: Vec<Vec<f64>>,
    b: Vec<f64>,
}

impl QuadraticForm {
    /// # Panics
    /// If `a` is not square or `b` has the wrong length.
    pub fn new(a: Vec<Vec<f64>>, b: Vec<f64>) -> Self {
        let n = a.len();
        assert!(a.iter().all(|row| row.len() == n), "matrix must be square");
        assert_eq!(b.len(), n, "linear term must match the matrix dimension");
        QuadraticForm { a, b }
    }

    /// `0.5 w^T A w` with `A = R diag(lambda1, lambda2) R^T`, `R` the
    /// rotation by `theta`.
    pub fn rotated(lambda1: f64, lambda2: f64, theta: f64) -> Self {
        let (s, c) = theta.sin_cos();
        let off = (lambda1 - lambda2) * c * s;
        QuadraticForm {
            a: vec![
                vec![lambda1 * c * c + lambda2 * s * s, off],
                vec![off, lambda1 * s * s + lambda2 * c * c],
            ],
            b: vec![0.0, 0.0],
        }
    }

    pub fn matrix(&self) -> &[Vec<f64>] {
        &self.a
    }

    /// Solution of `A w = b`; the minimizer when `A` is positive definite.
    pub fn minimizer(&self) -> Option<Vec<f64>> {
        lu_solve(&self.a, &self.b)
    }

    fn apply(&self, w: &[f64]) -> Vec<f64> {
        self.a.iter().map(|row| dot(row, w)).collect()
    }
}

impl Objective<f64> for QuadraticForm {
    fn dim(&self) -> usize {
        self.b.len()
    }

    fn value(&self, w: &[f64]) -> f64 {
        0.5 * dot(w, &self.apply(w)) - dot(&self.b, w)
    }

    fn gradient(&self, w: &[f64]) -> Vec<f64> {
        self.apply(w)
            .into_iter()
            .zip(&self.b)
            .map(|(aw, &b)| aw - b)
            .collect()
    }

    fn hessian(&self, _w: &[f64]) -> Option<Vec<Vec<f64>>> {
        Some(self.a.clone())
    }

    fn has_hessian(&self) -> bool {
        true
    }
}
