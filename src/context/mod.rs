//! Context management module
//!
//! Handles token estimation, the conversation history, and budget-driven
//! compaction of the context window.

pub mod budget;
pub mod counter;
pub mod history;
pub mod summarizer;
pub mod window;

// Re-export commonly used types
pub use budget::{ContextBudget, DEFAULT_KEEP_LAST, DEFAULT_MAX_TOKENS, DEFAULT_SUMMARY_THRESHOLD};
pub use counter::{TokenCounter, TokenEstimate, MESSAGE_OVERHEAD_TOKENS};
pub use history::ConversationHistory;
pub use summarizer::{fallback_digest, render_transcript, Summarizer};
pub use window::{CompactionStats, ContextWindow};
