//! Reference objectives for `optitrace`: closed-form two-dimensional test
//! functions, classifier losses over small labelled datasets, and a run
//! comparator for cross-checking results.

pub mod analytic;
pub mod compare;
pub mod data;
pub mod error;

pub use analytic::{problem_by_name, AnalyticProblem, QuadraticForm};
pub use compare::{compare_runs, Comparison, ComparisonStatus, RunSummary};
pub use data::{
    data_problem_by_name, DataPoint, Dataset, LogisticRegression, PerceptronSvm, SoftMarginSvm,
    SquaredHingeSvm, LOGISTIC_REGRESSION, SEPARATING_HYPERPLANE,
};
pub use error::ProblemError;
