//! Tool invocation types
//!
//! Results, error kinds and schemas shared by the gateway and the workflow.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Successful output of a tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool name that was invoked
    pub tool: String,

    /// Structured text content fed back to the model
    pub content: String,

    /// Whether the remote operation reported success
    pub success: bool,

    /// Invocation duration in milliseconds
    pub duration_ms: u64,
}

impl ToolResult {
    /// Create successful result
    pub fn success(tool: impl Into<String>, content: impl Into<String>, duration: Duration) -> Self {
        Self {
            tool: tool.into(),
            content: content.into(),
            success: true,
            duration_ms: duration.as_millis() as u64,
        }
    }
}

/// Outcome of one gateway invocation
pub type ToolOutcome = std::result::Result<ToolResult, ToolError>;

/// Classification of tool failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// Repository, path or tool does not exist
    NotFound,

    /// Missing or malformed arguments
    InvalidArguments,

    /// Credentials missing, rejected or lacking access
    Unauthorized,

    /// Remote service failed
    RemoteFailure,

    /// Request exceeded its timeout
    Timeout,
}

impl ToolErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorKind::NotFound => "NotFound",
            ToolErrorKind::InvalidArguments => "InvalidArguments",
            ToolErrorKind::Unauthorized => "Unauthorized",
            ToolErrorKind::RemoteFailure => "RemoteFailure",
            ToolErrorKind::Timeout => "Timeout",
        }
    }
}

impl fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tool failure reported by the gateway
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound, message)
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidArguments, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Unauthorized, message)
    }

    pub fn remote_failure(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::RemoteFailure, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Timeout, message)
    }

    /// Only remote failures and timeouts are worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, ToolErrorKind::RemoteFailure | ToolErrorKind::Timeout)
    }

    /// Model-visible rendering of the failure
    pub fn to_model_text(&self, tool: &str) -> String {
        format!("Error from tool '{}' ({}): {}", tool, self.kind, self.message)
    }
}

/// Tool schema definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name
    pub name: String,

    /// Tool description
    pub description: String,

    /// Parameter schema (JSON Schema)
    pub parameters: serde_json::Value,
}

impl ToolSchema {
    /// Create new tool schema
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// OpenAI-style function descriptor
    pub fn to_function_json(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_success() {
        let result = ToolResult::success("list_files", "README.md", Duration::from_millis(100));

        assert!(result.success);
        assert_eq!(result.tool, "list_files");
        assert_eq!(result.content, "README.md");
        assert_eq!(result.duration_ms, 100);
    }

    #[test]
    fn test_transient_kinds() {
        assert!(ToolError::remote_failure("503").is_transient());
        assert!(ToolError::timeout("slow").is_transient());
        assert!(!ToolError::not_found("missing").is_transient());
        assert!(!ToolError::invalid_arguments("bad").is_transient());
        assert!(!ToolError::unauthorized("Requires authentication").is_transient());
    }

    #[test]
    fn test_error_display_includes_message() {
        let err = ToolError::not_found("path 'src/x.rs' does not exist");
        assert_eq!(err.to_string(), "NotFound: path 'src/x.rs' does not exist");
        assert!(err.to_model_text("get_file_content").contains("get_file_content"));
    }

    #[test]
    fn test_function_descriptor() {
        let schema = ToolSchema::new("search_code", "Search", serde_json::json!({"type": "object"}));
        let json = schema.to_function_json();

        assert_eq!(json["type"], "function");
        assert_eq!(json["function"]["name"], "search_code");
        assert_eq!(json["function"]["parameters"]["type"], "object");
    }
}
