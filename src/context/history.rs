//! Conversation history with protocol invariants
//!
//! Append-only from the caller's side. The only rewrites are the compaction
//! splice and last-resort truncation performed by the context window.
//!
//! Invariants:
//! - the first message, if any, is the single system message
//! - every tool-result answers exactly one unanswered call of the
//!   immediately preceding assistant message

use crate::errors::{AnalysisError, Result};
use crate::types::{Message, Role, ToolCall};
use serde::Serialize;
use std::collections::HashSet;
use std::ops::Range;

/// Ordered conversation messages
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    /// Start a history with its system message
    pub fn new(system: Message) -> Result<Self> {
        if system.role != Role::System {
            return Err(AnalysisError::Protocol(format!(
                "history must start with a system message, got {:?}",
                system.role
            )));
        }
        Ok(Self {
            messages: vec![system],
        })
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The leading system message, if present
    pub fn system_message(&self) -> Option<&Message> {
        self.messages.first().filter(|m| m.is_system())
    }

    /// Number of leading system messages (0 or 1)
    pub fn leading_system_len(&self) -> usize {
        usize::from(self.system_message().is_some())
    }

    /// Append a message, enforcing the correlation protocol
    pub fn push(&mut self, message: Message) -> Result<()> {
        match message.role {
            Role::System => {
                return Err(AnalysisError::Protocol(
                    "at most one system message may be active".to_string(),
                ));
            }
            Role::ToolResult => self.check_tool_result(&message)?,
            _ => {
                let pending = self.pending_tool_calls();
                if !pending.is_empty() {
                    return Err(AnalysisError::Protocol(format!(
                        "cannot append {:?} message while {} tool call(s) are unanswered",
                        message.role,
                        pending.len()
                    )));
                }
                if message.role == Role::Assistant {
                    check_unique_ids(&message.tool_calls)?;
                }
            }
        }

        self.messages.push(message);
        Ok(())
    }

    /// Calls of the last assistant message that have no result yet
    pub fn pending_tool_calls(&self) -> Vec<&ToolCall> {
        let Some((index, answered)) = self.open_tool_turn() else {
            return Vec::new();
        };

        self.messages[index]
            .tool_calls
            .iter()
            .filter(|call| !answered.contains(call.id.as_str()))
            .collect()
    }

    /// Index of the first message in the kept tail
    ///
    /// The tail holds at least the last `keep_last` non-system messages and
    /// is widened backwards so it never begins with a tool result whose
    /// assistant message would be cut off.
    pub fn kept_tail_start(&self, keep_last: usize) -> usize {
        let lead = self.leading_system_len();
        let mut start = self.messages.len().saturating_sub(keep_last).max(lead);

        while start > lead && self.messages[start].role == Role::ToolResult {
            start -= 1;
        }

        start
    }

    /// Replace `range` with a single summary message
    pub(crate) fn splice_summary(&mut self, range: Range<usize>, summary: Message) {
        self.messages.splice(range, std::iter::once(summary));
    }

    /// Drop the oldest non-system turn, including results answering it
    ///
    /// A turn that contains the newest message is kept. Returns the number
    /// of messages removed.
    pub(crate) fn drop_oldest_turn(&mut self) -> usize {
        let lead = self.leading_system_len();
        let mut end = lead + 1;

        while end < self.messages.len() && self.messages[end].role == Role::ToolResult {
            end += 1;
        }

        if end >= self.messages.len() {
            return 0;
        }

        self.messages.drain(lead..end);
        end - lead
    }

    /// Locate the assistant message whose tool calls are still being answered
    fn open_tool_turn(&self) -> Option<(usize, HashSet<&str>)> {
        let mut answered = HashSet::new();

        for (index, message) in self.messages.iter().enumerate().rev() {
            match message.role {
                Role::ToolResult => {
                    if let Some(id) = message.tool_call_id.as_deref() {
                        answered.insert(id);
                    }
                }
                Role::Assistant if message.has_tool_calls() => return Some((index, answered)),
                _ => return None,
            }
        }

        None
    }

    fn check_tool_result(&self, message: &Message) -> Result<()> {
        let id = message.tool_call_id.as_deref().ok_or_else(|| {
            AnalysisError::Protocol("tool result is missing its tool_call_id".to_string())
        })?;

        let Some((index, answered)) = self.open_tool_turn() else {
            return Err(AnalysisError::Protocol(format!(
                "dangling tool result '{}': no preceding assistant tool call",
                id
            )));
        };

        if answered.contains(id) {
            return Err(AnalysisError::Protocol(format!(
                "duplicate tool result for call '{}'",
                id
            )));
        }

        if !self.messages[index].tool_calls.iter().any(|c| c.id == id) {
            return Err(AnalysisError::Protocol(format!(
                "dangling tool result '{}': no matching call in the preceding assistant message",
                id
            )));
        }

        Ok(())
    }
}

fn check_unique_ids(calls: &[ToolCall]) -> Result<()> {
    let mut seen = HashSet::new();
    for call in calls {
        if !seen.insert(call.id.as_str()) {
            return Err(AnalysisError::Protocol(format!(
                "duplicate tool call id '{}'",
                call.id
            )));
        }
    }
    Ok(())
}
