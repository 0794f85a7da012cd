//! Test error types.

/// Result type alias for test operations.
pub type Result<T> = std::result::Result<T, TestError>;

/// Testing errors.
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    /// Harness error.
    #[error("harness error: {0}")]
    Harness(String),

    /// The run did not finish within its duration plus grace.
    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Error from the harness core.
    #[error("run error: {0}")]
    Run(#[from] churn_core::ChurnError),
}

impl TestError {
    /// Creates a harness error.
    #[must_use]
    pub fn harness(msg: impl Into<String>) -> Self {
        Self::Harness(msg.into())
    }
}
