// Error types for the outbreak detection pipeline

use thiserror::Error;

/// Result type alias for detection pipeline operations
pub type Result<T> = std::result::Result<T, SurveillanceError>;

/// Errors that can occur during cluster evaluation, outbreak upsert, or
/// alert dispatch. The background evaluation task logs and swallows all of
/// these; none of them ever reach the report-submission caller.
#[derive(Debug, Error)]
pub enum SurveillanceError {
    /// Store read/write error
    #[error("store error: {0}")]
    Store(String),

    /// Alert dispatch error (outbreak stays committed)
    #[error("dispatch error: {0}")]
    Dispatch(String),

    /// Report rejected at the ingestion boundary. Constructed by the API
    /// layer in front of this crate; inside the pipeline an ineligible
    /// report is a skip, not an error.
    #[error("invalid report: {0}")]
    InvalidReport(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SurveillanceError {
    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        SurveillanceError::Store(msg.into())
    }

    /// Create a dispatch error
    pub fn dispatch(msg: impl Into<String>) -> Self {
        SurveillanceError::Dispatch(msg.into())
    }

    /// Create an invalid report error
    pub fn invalid_report(msg: impl Into<String>) -> Self {
        SurveillanceError::InvalidReport(msg.into())
    }
}
