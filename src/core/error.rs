//! Error types for policy compilation and task execution.

use thiserror::Error;

/// Errors produced by the churn engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChurnError {
    /// Policy specification text is malformed.
    #[error("parse error: {0}")]
    Parse(String),
    /// A resource name could not be mapped to exactly one resource type.
    #[error("resolution error: {0}")]
    Resolution(String),
    /// A policy is invalid (duplicate resource, unknown parameter or operation, interval
    /// below the minimum).
    #[error("config error: {0}")]
    Config(String),
    /// A collaborator failed while a task was running.
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl ChurnError {
    /// True for errors that are detected before any task starts.
    pub const fn is_startup(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Resolution(_) | Self::Config(_))
    }
}

/// Result alias for churn engine operations.
pub type ChurnResult<T> = Result<T, ChurnError>;

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_errors_are_classified() {
        assert!(ChurnError::Parse("x".into()).is_startup());
        assert!(ChurnError::Resolution("x".into()).is_startup());
        assert!(ChurnError::Config("x".into()).is_startup());
        assert!(!ChurnError::Runtime("x".into()).is_startup());
    }
}
