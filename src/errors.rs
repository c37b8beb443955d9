//! Error types for repo-analyst
//!
//! Provides the crate-wide error enum with context propagation.
//! Tool-level failures have their own [`ToolError`] type because they are
//! recovered locally by the workflow engine instead of propagated.

use crate::tools::ToolError;
use thiserror::Error;

/// Main error type for the analysis system
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Bad caller input, surfaced before any workflow starts
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation attempted on an uninitialized or misused component
    #[error("State error: {0}")]
    State(String),

    /// State machine transition errors
    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    /// Conversation protocol violations (dangling tool results, second system message)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Context cannot be kept below the hard ceiling
    #[error("Context budget exceeded: {current} tokens exceeds maximum {max} tokens")]
    BudgetExceeded { current: usize, max: usize },

    /// Tool gateway errors
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Cooperative cancellation requested by the caller
    #[error("Analysis cancelled")]
    Cancelled,

    /// Workflow loop bound reached
    #[error("Maximum iterations ({limit}) reached without a final answer")]
    MaxIterations { limit: usize },

    /// Result requested from a workflow that has not terminated
    #[error("Workflow state is not terminal: {0}")]
    IncompleteState(String),

    /// Model provider errors
    #[error("Model API error: {0}")]
    ModelApi(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timeout errors
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

impl AnalysisError {
    /// Whether retrying the failed operation may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            AnalysisError::Timeout { .. } => true,
            AnalysisError::Http(_) => true,
            AnalysisError::ModelApi(_) => true,
            AnalysisError::Tool(err) => err.is_transient(),
            _ => false,
        }
    }
}

/// Result type alias for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolErrorKind;

    #[test]
    fn test_error_display() {
        let err = AnalysisError::BudgetExceeded {
            current: 1200,
            max: 1000,
        };
        assert!(err.to_string().contains("1200"));
        assert!(err.to_string().contains("1000"));
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = AnalysisError::InvalidTransition {
            from: "ToolTurn".to_string(),
            to: "Init".to_string(),
            reason: "Cannot go backwards".to_string(),
        };
        assert!(err.to_string().contains("ToolTurn"));
        assert!(err.to_string().contains("Init"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(AnalysisError::Timeout { duration_ms: 10 }.is_transient());
        assert!(AnalysisError::ModelApi("503".to_string()).is_transient());
        assert!(AnalysisError::Tool(ToolError::new(ToolErrorKind::RemoteFailure, "boom")).is_transient());
        assert!(!AnalysisError::Tool(ToolError::new(ToolErrorKind::NotFound, "gone")).is_transient());
        assert!(!AnalysisError::Validation("bad".to_string()).is_transient());
        assert!(!AnalysisError::Cancelled.is_transient());
    }

    #[test]
    fn test_tool_error_is_transparent() {
        let err: AnalysisError = ToolError::new(ToolErrorKind::Timeout, "slow").into();
        assert!(err.to_string().contains("slow"));
    }
}
