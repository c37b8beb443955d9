//! Type definitions module
//!
//! Core types for conversation messages and analysis kinds.

pub mod analysis;
pub mod messages;

// Re-export commonly used types
pub use analysis::AnalysisType;
pub use messages::{AssistantTurn, Message, Role, TokenUsage, ToolCall, SUMMARY_PREFIX};
