//! Tool invocation gateway
//!
//! The workflow engine calls remote repository operations through this seam.
//! A gateway never retries and never caches; each invocation is independent.

use crate::tools::types::{ToolOutcome, ToolSchema};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Executes named tools with structured arguments
#[async_trait]
pub trait ToolGateway: Send + Sync {
    /// Descriptors offered to the model
    fn schemas(&self) -> Vec<ToolSchema>;

    /// Invoke one tool; a single operation in flight per call
    async fn invoke(&self, name: &str, arguments: &Map<String, Value>) -> ToolOutcome;
}
