use thiserror::Error;

/// Errors raised while building a reference problem.
#[derive(Error, Debug)]
pub enum ProblemError {
    /// No problem has this name.
    #[error("unknown problem: {0}")]
    UnknownProblem(String),

    /// The problem exists but has no such variant.
    #[error("problem {problem} has no variant {variant}")]
    UnknownVariant { problem: String, variant: String },

    /// The problem needs a variant and none was given.
    #[error("problem {0} requires a variant")]
    MissingVariant(String),

    /// The dataset has no points.
    #[error("dataset is empty")]
    EmptyDataset,

    /// A label outside `{0, 1}`.
    #[error("point {index} has label {label}, expected 0 or 1")]
    InvalidLabel { index: usize, label: u8 },

    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed dataset: {0}")]
    Json(#[from] serde_json::Error),
}
