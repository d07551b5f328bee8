//! Classifier objectives over labelled two-dimensional points.
//!
//! Each point `(x1, x2)` is lifted to the feature vector `(x1, x2, 1)`, so the
//! weights are `(w0, w1, bias)` and every objective has dimension 3. The bias
//! is never regularized.

use std::path::Path;

use optitrace::linalg::dot;
use optitrace::Objective;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProblemError;

/// Sigmoid inputs are clipped to this magnitude before `exp`.
const SIGMOID_CLIP: f64 = 500.0;
/// Probabilities are clamped to `[EPS, 1 - EPS]` before `ln`.
const PROB_EPS: f64 = 1e-10;

/// One labelled point. `y` is 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// First feature.
    pub x1: f64,
    /// Second feature.
    pub x2: f64,
    /// Class label, 0 or 1.
    pub y: u8,
}

/// A binary classification dataset, as stored on disk:
/// `{"points": [{"x1": .., "x2": .., "y": 0}, ...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// The labelled points, in file order.
    pub points: Vec<DataPoint>,
}

impl Dataset {
    pub fn new(points: Vec<DataPoint>) -> Result<Self, ProblemError> {
        let dataset = Dataset { points };
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn from_json(json: &str) -> Result<Self, ProblemError> {
        let dataset: Dataset = serde_json::from_str(json)?;
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ProblemError> {
        let path = path.as_ref();
        let dataset = Self::from_json(&std::fs::read_to_string(path)?)?;
        debug!(path = %path.display(), points = dataset.len(), "loaded dataset");
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn validate(&self) -> Result<(), ProblemError> {
        if self.points.is_empty() {
            return Err(ProblemError::EmptyDataset);
        }
        if let Some((index, p)) = self.points.iter().enumerate().find(|(_, p)| p.y > 1) {
            return Err(ProblemError::InvalidLabel { index, label: p.y });
        }
        Ok(())
    }

    fn features(&self) -> Vec<[f64; 3]> {
        self.points.iter().map(|p| [p.x1, p.x2, 1.0]).collect()
    }

    /// Labels mapped from `{0, 1}` to `{-1, +1}`.
    fn signed_labels(&self) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| 2.0 * f64::from(p.y) - 1.0)
            .collect()
    }
}

fn sigmoid(z: f64) -> f64 {
    let z = z.clamp(-SIGMOID_CLIP, SIGMOID_CLIP);
    1.0 / (1.0 + (-z).exp())
}

fn zero_hessian() -> Vec<Vec<f64>> {
    vec![vec![0.0; 3]; 3]
}

fn add_outer(h: &mut [Vec<f64>], x: &[f64; 3], weight: f64) {
    for (row, &xi) in h.iter_mut().zip(x) {
        for (hij, &xj) in row.iter_mut().zip(x) {
            *hij += weight * xi * xj;
        }
    }
}

/// L2-regularized logistic regression:
/// `-mean(y ln s + (1 - y) ln(1 - s)) + lambda / 2 (w0^2 + w1^2)`.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    features: Vec<[f64; 3]>,
    labels: Vec<f64>,
    lambda: f64,
}

impl LogisticRegression {
    pub fn new(dataset: &Dataset, lambda: f64) -> Self {
        LogisticRegression {
            features: dataset.features(),
            labels: dataset.points.iter().map(|p| f64::from(p.y)).collect(),
            lambda,
        }
    }

    fn n(&self) -> f64 {
        self.labels.len() as f64
    }
}

impl Objective<f64> for LogisticRegression {
    fn dim(&self) -> usize {
        3
    }

    fn value(&self, w: &[f64]) -> f64 {
        let cross_entropy: f64 = self
            .features
            .iter()
            .zip(&self.labels)
            .map(|(x, &y)| {
                let s = sigmoid(dot(x, w)).clamp(PROB_EPS, 1.0 - PROB_EPS);
                y * s.ln() + (1.0 - y) * (1.0 - s).ln()
            })
            .sum();
        -cross_entropy / self.n() + 0.5 * self.lambda * (w[0] * w[0] + w[1] * w[1])
    }

    fn gradient(&self, w: &[f64]) -> Vec<f64> {
        let mut g = vec![0.0; 3];
        for (x, &y) in self.features.iter().zip(&self.labels) {
            let err = sigmoid(dot(x, w)) - y;
            for (gi, &xi) in g.iter_mut().zip(x) {
                *gi += err * xi;
            }
        }
        let n = self.n();
        for gi in &mut g {
            *gi /= n;
        }
        g[0] += self.lambda * w[0];
        g[1] += self.lambda * w[1];
        g
    }

    fn hessian(&self, w: &[f64]) -> Option<Vec<Vec<f64>>> {
        let n = self.n();
        let mut h = zero_hessian();
        for x in &self.features {
            let s = sigmoid(dot(x, w));
            add_outer(&mut h, x, s * (1.0 - s) / n);
        }
        h[0][0] += self.lambda;
        h[1][1] += self.lambda;
        Some(h)
    }

    fn has_hessian(&self) -> bool {
        true
    }
}

/// Smooth soft-margin SVM:
/// `(w0^2 + w1^2) / 2 + lambda * sum(max(0, 1 - y z)^2)` with `y` in `{-1, +1}`.
#[derive(Debug, Clone)]
pub struct SquaredHingeSvm {
    features: Vec<[f64; 3]>,
    labels: Vec<f64>,
    lambda: f64,
}

impl SquaredHingeSvm {
    pub fn new(dataset: &Dataset, lambda: f64) -> Self {
        SquaredHingeSvm {
            features: dataset.features(),
            labels: dataset.signed_labels(),
            lambda,
        }
    }

    /// `(x, y, 1 - y z)` for every point violating the margin.
    fn violations<'a>(
        &'a self,
        w: &'a [f64],
    ) -> impl Iterator<Item = (&'a [f64; 3], f64, f64)> + 'a {
        self.features
            .iter()
            .zip(&self.labels)
            .map(move |(x, &y)| (x, y, 1.0 - y * dot(x, w)))
            .filter(|&(_, _, margin)| margin > 0.0)
    }
}

impl Objective<f64> for SquaredHingeSvm {
    fn dim(&self) -> usize {
        3
    }

    fn value(&self, w: &[f64]) -> f64 {
        let hinge: f64 = self.violations(w).map(|(_, _, m)| m * m).sum();
        0.5 * (w[0] * w[0] + w[1] * w[1]) + self.lambda * hinge
    }

    fn gradient(&self, w: &[f64]) -> Vec<f64> {
        let mut g = vec![w[0], w[1], 0.0];
        for (x, y, margin) in self.violations(w) {
            let scale = 2.0 * self.lambda * margin * y;
            for (gi, &xi) in g.iter_mut().zip(x) {
                *gi -= scale * xi;
            }
        }
        g
    }

    fn hessian(&self, w: &[f64]) -> Option<Vec<Vec<f64>>> {
        let mut h = zero_hessian();
        h[0][0] = 1.0;
        h[1][1] = 1.0;
        for (x, _, _) in self.violations(w) {
            add_outer(&mut h, x, 2.0 * self.lambda);
        }
        Some(h)
    }

    fn has_hessian(&self) -> bool {
        true
    }
}

/// Soft-margin SVM with the plain hinge loss:
/// `(w0^2 + w1^2) / 2 + lambda * sum(max(0, 1 - y z))`.
///
/// Not differentiable where a margin is exactly zero; the gradient there is
/// the subgradient that leaves that point out. No Hessian.
#[derive(Debug, Clone)]
pub struct SoftMarginSvm {
    features: Vec<[f64; 3]>,
    labels: Vec<f64>,
    lambda: f64,
}

impl SoftMarginSvm {
    pub fn new(dataset: &Dataset, lambda: f64) -> Self {
        SoftMarginSvm {
            features: dataset.features(),
            labels: dataset.signed_labels(),
            lambda,
        }
    }

    /// `(x, y, 1 - y z)` for every point strictly inside the margin.
    fn violations<'a>(
        &'a self,
        w: &'a [f64],
    ) -> impl Iterator<Item = (&'a [f64; 3], f64, f64)> + 'a {
        self.features
            .iter()
            .zip(&self.labels)
            .map(move |(x, &y)| (x, y, 1.0 - y * dot(x, w)))
            .filter(|&(_, _, margin)| margin > 0.0)
    }
}

impl Objective<f64> for SoftMarginSvm {
    fn dim(&self) -> usize {
        3
    }

    fn value(&self, w: &[f64]) -> f64 {
        let hinge: f64 = self.violations(w).map(|(_, _, m)| m).sum();
        0.5 * (w[0] * w[0] + w[1] * w[1]) + self.lambda * hinge
    }

    fn gradient(&self, w: &[f64]) -> Vec<f64> {
        let mut g = vec![w[0], w[1], 0.0];
        for (x, y, _) in self.violations(w) {
            for (gi, &xi) in g.iter_mut().zip(x) {
                *gi -= self.lambda * y * xi;
            }
        }
        g
    }
}

/// Regularized perceptron criterion:
/// `sum(max(0, -y z)) + lambda / 2 (w0^2 + w1^2)`.
///
/// Only strictly misclassified points contribute, so `w = 0` is a stationary
/// point of the loss term. No Hessian.
#[derive(Debug, Clone)]
pub struct PerceptronSvm {
    features: Vec<[f64; 3]>,
    labels: Vec<f64>,
    lambda: f64,
}

impl PerceptronSvm {
    pub fn new(dataset: &Dataset, lambda: f64) -> Self {
        PerceptronSvm {
            features: dataset.features(),
            labels: dataset.signed_labels(),
            lambda,
        }
    }

    /// `(x, y, y z)` for every misclassified point.
    fn misclassified<'a>(
        &'a self,
        w: &'a [f64],
    ) -> impl Iterator<Item = (&'a [f64; 3], f64, f64)> + 'a {
        self.features
            .iter()
            .zip(&self.labels)
            .map(move |(x, &y)| (x, y, y * dot(x, w)))
            .filter(|&(_, _, yz)| yz < 0.0)
    }
}

impl Objective<f64> for PerceptronSvm {
    fn dim(&self) -> usize {
        3
    }

    fn value(&self, w: &[f64]) -> f64 {
        let loss: f64 = self.misclassified(w).map(|(_, _, yz)| -yz).sum();
        loss + 0.5 * self.lambda * (w[0] * w[0] + w[1] * w[1])
    }

    fn gradient(&self, w: &[f64]) -> Vec<f64> {
        let mut g = vec![self.lambda * w[0], self.lambda * w[1], 0.0];
        for (x, y, _) in self.misclassified(w) {
            for (gi, &xi) in g.iter_mut().zip(x) {
                *gi -= y * xi;
            }
        }
        g
    }
}

pub const LOGISTIC_REGRESSION: &str = "logistic-regression";
pub const SEPARATING_HYPERPLANE: &str = "separating-hyperplane";

/// Build a dataset objective by name.
///
/// `logistic-regression` ignores `variant`; `separating-hyperplane` needs one
/// of `soft-margin`, `perceptron` or `squared-hinge`.
pub fn data_problem_by_name(
    problem: &str,
    variant: Option<&str>,
    dataset: &Dataset,
    lambda: f64,
) -> Result<Box<dyn Objective<f64>>, ProblemError> {
    match problem {
        LOGISTIC_REGRESSION => Ok(Box::new(LogisticRegression::new(dataset, lambda))),
        SEPARATING_HYPERPLANE => match variant {
            Some("soft-margin") => Ok(Box::new(SoftMarginSvm::new(dataset, lambda))),
            Some("perceptron") => Ok(Box::new(PerceptronSvm::new(dataset, lambda))),
            Some("squared-hinge") => Ok(Box::new(SquaredHingeSvm::new(dataset, lambda))),
            Some(other) => Err(ProblemError::UnknownVariant {
                problem: problem.to_owned(),
                variant: other.to_owned(),
            }),
            None => Err(ProblemError::MissingVariant(problem.to_owned())),
        },
        _ => Err(ProblemError::UnknownProblem(problem.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dataset() -> Dataset {
        Dataset::from_json(
            r#"{"points": [
                {"x1": 1.0, "x2": 2.0, "y": 1},
                {"x1": 2.0, "x2": 1.5, "y": 1},
                {"x1": -1.0, "x2": -0.5, "y": 0},
                {"x1": -2.0, "x2": 0.5, "y": 0},
                {"x1": 0.5, "x2": -1.0, "y": 1},
                {"x1": 0.2, "x2": 0.1, "y": 0}
            ]}"#,
        )
        .unwrap()
    }

    fn check_gradient(obj: &impl Objective<f64>, w: &[f64]) {
        let h = 1e-6;
        let g = obj.gradient(w);
        for i in 0..w.len() {
            let mut plus = w.to_vec();
            let mut minus = w.to_vec();
            plus[i] += h;
            minus[i] -= h;
            let fd = (obj.value(&plus) - obj.value(&minus)) / (2.0 * h);
            assert_relative_eq!(g[i], fd, epsilon = 1e-6, max_relative = 1e-5);
        }
    }

    #[test]
    fn logistic_at_zero_weights() {
        let obj = LogisticRegression::new(&dataset(), 0.01);
        // sigmoid(0) = 0.5 for every point
        let loss = obj.value(&[0.0, 0.0, 0.0]);
        assert_relative_eq!(loss, std::f64::consts::LN_2, epsilon = 1e-12);
        let h = obj.hessian(&[0.0, 0.0, 0.0]).unwrap();
        // bias entry: mean of 0.25 * 1 * 1
        assert_relative_eq!(h[2][2], 0.25, epsilon = 1e-12);
        assert_eq!(h[0][1], h[1][0]);
    }

    #[test]
    fn logistic_gradient_matches_finite_differences() {
        let obj = LogisticRegression::new(&dataset(), 0.01);
        check_gradient(&obj, &[0.3, -0.2, 0.1]);
        check_gradient(&obj, &[1.5, 0.7, -0.4]);
    }

    #[test]
    fn logistic_saturates_without_overflow() {
        let obj = LogisticRegression::new(&dataset(), 0.0);
        let w = [1e4, 1e4, 0.0];
        assert!(obj.value(&w).is_finite());
        assert!(obj.gradient(&w).iter().all(|g| g.is_finite()));
    }

    #[test]
    fn svm_gradient_matches_finite_differences() {
        let obj = SquaredHingeSvm::new(&dataset(), 0.1);
        check_gradient(&obj, &[0.3, -0.2, 0.1]);
        check_gradient(&obj, &[0.8, 0.6, -0.1]);
    }

    #[test]
    fn svm_hessian_counts_only_violations() {
        let obj = SquaredHingeSvm::new(&dataset(), 0.1);
        // At w = 0 every point sits exactly one unit inside the margin
        let h0 = obj.hessian(&[0.0, 0.0, 0.0]).unwrap();
        assert_relative_eq!(h0[2][2], 2.0 * 0.1 * 6.0, epsilon = 1e-12);
        assert_relative_eq!(h0[0][0], 1.0 + 0.2 * 10.29, epsilon = 1e-12);

        // Only (0.5, -1) and (0.2, 0.1) violate here
        let w = [0.8, 0.6, -0.1];
        assert_eq!(obj.violations(&w).count(), 2);
        let h = obj.hessian(&w).unwrap();
        assert_relative_eq!(h[2][2], 2.0 * 0.1 * 2.0, epsilon = 1e-12);
        assert_relative_eq!(h[0][0], 1.0 + 0.2 * (0.25 + 0.04), epsilon = 1e-12);
    }

    #[test]
    fn soft_margin_gradient_matches_finite_differences() {
        let obj = SoftMarginSvm::new(&dataset(), 0.1);
        // no margin within 1e-6 of zero at either point
        check_gradient(&obj, &[0.3, -0.2, 0.1]);
        check_gradient(&obj, &[1.0, 0.5, -0.3]);
        assert!(!obj.has_hessian());
    }

    #[test]
    fn soft_margin_at_zero_weights() {
        let obj = SoftMarginSvm::new(&dataset(), 0.1);
        // every point has margin exactly 1
        assert_relative_eq!(obj.value(&[0.0, 0.0, 0.0]), 0.6, epsilon = 1e-12);
        // three positives and three negatives cancel on the bias
        let g = obj.gradient(&[0.0, 0.0, 0.0]);
        assert_relative_eq!(g[2], 0.0, epsilon = 1e-12);
        assert_relative_eq!(g[0], -0.1 * (1.0 + 2.0 + 1.0 + 2.0 + 0.5 - 0.2), epsilon = 1e-12);
    }

    #[test]
    fn perceptron_gradient_matches_finite_differences() {
        let obj = PerceptronSvm::new(&dataset(), 0.1);
        check_gradient(&obj, &[0.3, -0.2, 0.15]);
        check_gradient(&obj, &[-0.5, 0.4, 0.2]);
        assert_eq!(obj.misclassified(&[0.3, -0.2, 0.15]).count(), 1);
    }

    #[test]
    fn perceptron_is_flat_at_zero_weights() {
        let obj = PerceptronSvm::new(&dataset(), 0.1);
        assert_eq!(obj.value(&[0.0, 0.0, 0.0]), 0.0);
        assert_eq!(obj.gradient(&[0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn data_problems_by_name() {
        let data = dataset();
        let w = [0.3, -0.2, 0.15];
        let cases: [(&str, Option<&str>, Box<dyn Objective<f64>>); 4] = [
            (
                "logistic-regression",
                None,
                Box::new(LogisticRegression::new(&data, 0.1)),
            ),
            (
                "separating-hyperplane",
                Some("soft-margin"),
                Box::new(SoftMarginSvm::new(&data, 0.1)),
            ),
            (
                "separating-hyperplane",
                Some("perceptron"),
                Box::new(PerceptronSvm::new(&data, 0.1)),
            ),
            (
                "separating-hyperplane",
                Some("squared-hinge"),
                Box::new(SquaredHingeSvm::new(&data, 0.1)),
            ),
        ];
        for (problem, variant, expected) in cases {
            let obj = data_problem_by_name(problem, variant, &data, 0.1).unwrap();
            assert_eq!((*obj).dim(), 3);
            assert_eq!((*obj).value(&w), (*expected).value(&w), "{problem} {variant:?}");
            assert_eq!((*obj).has_hessian(), (*expected).has_hessian());
        }
    }

    #[test]
    fn data_problem_lookup_errors() {
        let data = dataset();
        assert!(matches!(
            data_problem_by_name("separating-hyperplane", Some("hard-margin"), &data, 0.1),
            Err(ProblemError::UnknownVariant { variant, .. }) if variant == "hard-margin"
        ));
        assert!(matches!(
            data_problem_by_name("separating-hyperplane", None, &data, 0.1),
            Err(ProblemError::MissingVariant(_))
        ));
        assert!(matches!(
            data_problem_by_name("k-means", None, &data, 0.1),
            Err(ProblemError::UnknownProblem(name)) if name == "k-means"
        ));
    }

    #[test]
    fn rejects_bad_datasets() {
        assert!(matches!(
            Dataset::from_json(r#"{"points": []}"#),
            Err(ProblemError::EmptyDataset)
        ));
        assert!(matches!(
            Dataset::from_json(r#"{"points": [{"x1": 0.0, "x2": 0.0, "y": 2}]}"#),
            Err(ProblemError::InvalidLabel { index: 0, label: 2 })
        ));
        assert!(matches!(
            Dataset::from_json("not json"),
            Err(ProblemError::Json(_))
        ));
    }
}
