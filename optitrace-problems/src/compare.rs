//! Cross-checking two runs of the same problem.
//!
//! Used to compare a trace against a reference run (another algorithm,
//! another precision, or an external optimizer's result).

use std::fmt;

use optitrace::linalg::{norm, sub};
use optitrace::OptimizationTrace;
use serde::{Deserialize, Serialize};

use crate::analytic::AnalyticProblem;

/// Relative final-loss difference above which runs disagree.
const LOSS_FAIL: f64 = 0.10;
/// Relative final-loss difference above which runs are suspicious.
const LOSS_WARN: f64 = 0.01;
/// Final-point distance above which runs disagree.
const POINT_FAIL: f64 = 1.0;
/// Final-point distance above which runs are suspicious.
const POINT_WARN: f64 = 0.1;
/// Iteration-count ratio above which runs are suspicious.
const ITERATION_RATIO_WARN: f64 = 3.0;

/// The outcome of one run, reduced to what comparisons look at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Stopped on a tolerance with finite losses.
    pub converged: bool,
    /// Number of iterations recorded.
    pub iterations: usize,
    /// Loss at the last iterate.
    pub final_loss: f64,
    /// The last iterate.
    pub final_point: Vec<f64>,
    /// Gradient norm at the last iterate.
    pub final_grad_norm: f64,
}

impl RunSummary {
    pub fn from_trace(trace: &OptimizationTrace<f64>) -> Self {
        RunSummary {
            converged: trace.converged(),
            iterations: trace.len(),
            final_loss: trace.final_loss().unwrap_or(f64::NAN),
            final_point: trace.final_point().map(<[f64]>::to_vec).unwrap_or_default(),
            final_grad_norm: trace.final_grad_norm().unwrap_or(f64::NAN),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonStatus {
    Pass,
    Suspicious,
    Fail,
}

impl fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonStatus::Pass => write!(f, "PASS"),
            ComparisonStatus::Suspicious => write!(f, "SUSPICIOUS"),
            ComparisonStatus::Fail => write!(f, "FAIL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Overall verdict.
    pub status: ComparisonStatus,
    /// Human-readable findings; never empty.
    pub issues: Vec<String>,
}

impl Comparison {
    fn new(status: ComparisonStatus, issue: impl Into<String>) -> Self {
        Comparison {
            status,
            issues: vec![issue.into()],
        }
    }
}

/// Compare two runs of the problem named `problem`.
///
/// Checks run in order of severity and the first failure wins: convergence
/// disagreement, non-finite loss, a final-loss gap above 10%, final points
/// more than 1.0 apart. Below that, a 1-10% loss gap, a more than threefold
/// iteration ratio and final points 0.1-1.0 apart are each reported as
/// suspicious. Both runs failing to converge on the unbounded saddle is the
/// expected outcome and passes.
pub fn compare_runs(a: &RunSummary, b: &RunSummary, problem: &str) -> Comparison {
    if problem == AnalyticProblem::Saddle.name() && !a.converged && !b.converged {
        return Comparison::new(
            ComparisonStatus::Pass,
            "both runs diverged, as expected on an unbounded problem",
        );
    }

    if a.converged != b.converged {
        return Comparison::new(
            ComparisonStatus::Fail,
            format!(
                "convergence mismatch: first {}, second {}",
                outcome(a.converged),
                outcome(b.converged)
            ),
        );
    }
    if !a.converged {
        return Comparison::new(
            ComparisonStatus::Suspicious,
            "both runs diverged on a problem expected to converge",
        );
    }

    if !a.final_loss.is_finite() || !b.final_loss.is_finite() {
        return Comparison::new(
            ComparisonStatus::Fail,
            format!("non-finite loss: {} vs {}", a.final_loss, b.final_loss),
        );
    }

    let relative_loss = (a.final_loss - b.final_loss).abs() / (a.final_loss.abs() + 1e-10);
    if relative_loss > LOSS_FAIL {
        return Comparison::new(
            ComparisonStatus::Fail,
            format!(
                "loss differs by {:.1}%: {:.6e} vs {:.6e}",
                relative_loss * 100.0,
                a.final_loss,
                b.final_loss
            ),
        );
    }

    if a.final_point.len() != b.final_point.len() {
        return Comparison::new(
            ComparisonStatus::Fail,
            format!(
                "final points have different dimensions: {} vs {}",
                a.final_point.len(),
                b.final_point.len()
            ),
        );
    }
    let distance = norm(&sub(&a.final_point, &b.final_point));
    if distance > POINT_FAIL {
        return Comparison::new(
            ComparisonStatus::Fail,
            format!("final points differ by {distance:.4}"),
        );
    }

    let mut issues = Vec::new();
    if relative_loss > LOSS_WARN {
        issues.push(format!(
            "loss differs by {:.2}%: {:.6e} vs {:.6e}",
            relative_loss * 100.0,
            a.final_loss,
            b.final_loss
        ));
    }
    if a.iterations > 0 && b.iterations > 0 {
        let (lo, hi) = if a.iterations < b.iterations {
            (a.iterations, b.iterations)
        } else {
            (b.iterations, a.iterations)
        };
        let ratio = hi as f64 / lo.max(1) as f64;
        if ratio > ITERATION_RATIO_WARN {
            issues.push(format!(
                "iteration counts differ {ratio:.1}x: {} vs {}",
                a.iterations, b.iterations
            ));
        }
    }
    if distance > POINT_WARN {
        issues.push(format!("final points differ by {distance:.4}"));
    }

    if issues.is_empty() {
        Comparison::new(ComparisonStatus::Pass, "all metrics within tolerance")
    } else {
        Comparison {
            status: ComparisonStatus::Suspicious,
            issues,
        }
    }
}

fn outcome(converged: bool) -> &'static str {
    if converged {
        "converged"
    } else {
        "diverged"
    }
}
