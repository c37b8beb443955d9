//! Tool invocation system
//!
//! Provides the repository tools the model can call:
//! - 4 GitHub tools (metadata, listing, contents, search)
//! - Gateway trait the workflow engine invokes through
//! - Retry policy (exponential backoff) applied by the engine

pub mod gateway;
pub mod github;
pub mod registry;
pub mod retry;
pub mod types;

// Re-export commonly used types
pub use gateway::ToolGateway;
pub use github::{GitHubConfig, GitHubGateway};
pub use registry::ToolRegistry;
pub use retry::{RetryFailure, RetryPolicy, Transient};
pub use types::{ToolError, ToolErrorKind, ToolOutcome, ToolResult, ToolSchema};
