use thiserror::Error;

use crate::solver::SolverStatus;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, FairnessError>;

/// Errors raised while configuring, fitting or evaluating fair classifiers.
#[derive(Error, Debug)]
pub enum FairnessError {
    /// An invalid hyper-parameter or configuration key.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Inputs that are malformed, mismatched or outside the supported domain.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The optimization problem could not be solved.
    #[error("problem was found to be {status}")]
    SolverStatus { status: SolverStatus },

    #[error("{0} is not implemented")]
    NotImplemented(String),

    #[error("This {0} instance is not fitted yet. Call `fit` before using this estimator.")]
    NotFitted(String),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl FairnessError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        FairnessError::Validation(msg.into())
    }

    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        FairnessError::Configuration(msg.into())
    }
}
