//! Message types for agent communication
//!
//! Defines the conversation messages exchanged between the workflow engine,
//! the model, and the tool gateway.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lead-in sent ahead of a compaction summary
pub const SUMMARY_PREFIX: &str = "Previous conversation summary:";

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The single active system prompt
    System,

    /// Caller request
    User,

    /// Model output, optionally carrying tool calls
    Assistant,

    /// Result of one tool invocation
    #[serde(rename = "tool-result")]
    ToolResult,

    /// Synthetic summary produced by compaction
    Summary,
}

impl Role {
    /// Label used when rendering transcripts
    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::ToolResult => "Tool",
            Role::Summary => "Summary",
        }
    }
}

/// A model-requested tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation id echoed by the matching tool-result message
    pub id: String,

    /// Tool name
    pub name: String,

    /// Structured arguments
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// One turn in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,

    /// Text content, empty when an assistant message only carries tool calls
    #[serde(default)]
    pub content: String,

    /// Requested tool invocations, in model order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Present only on tool-result messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Assistant message requesting tool invocations
    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Tool-result message answering `tool_call_id`
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::ToolResult,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Synthetic compaction summary
    pub fn summary(content: impl Into<String>) -> Self {
        Self::plain(Role::Summary, content)
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Render as a single transcript line for summarization
    pub fn transcript_line(&self) -> String {
        if self.has_tool_calls() {
            let calls: Vec<String> = self
                .tool_calls
                .iter()
                .map(|c| format!("{}({})", c.name, Value::Object(c.arguments.clone())))
                .collect();
            if self.content.is_empty() {
                format!("{}: [tool calls] {}", self.role.label(), calls.join(", "))
            } else {
                format!("{}: {} [tool calls] {}", self.role.label(), self.content, calls.join(", "))
            }
        } else {
            format!("{}: {}", self.role.label(), self.content)
        }
    }
}

/// Provider-reported token usage for one completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Model output for one turn: a final answer or a tool-call request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<TokenUsage>,
}

impl AssistantTurn {
    /// Final textual answer
    pub fn answer(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
            usage: None,
        }
    }

    /// Tool-call request
    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls,
            usage: None,
        }
    }

    pub fn requests_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::ToolResult).unwrap(), "\"tool-result\"");
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
    }

    #[test]
    fn test_tool_result_carries_id() {
        let msg = Message::tool_result("call_1", "ok");
        assert_eq!(msg.role, Role::ToolResult);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert!(msg.tool_calls.is_empty());
    }

    #[test]
    fn test_transcript_line_with_tool_calls() {
        let msg = Message::assistant_with_tool_calls(
            "",
            vec![ToolCall::new("c1", "get_repository", args(json!({"owner": "a", "repo": "b"})))],
        );
        let line = msg.transcript_line();
        assert!(line.starts_with("Assistant: [tool calls]"));
        assert!(line.contains("get_repository"));
        assert!(line.contains("\"owner\":\"a\""));
    }

    #[test]
    fn test_assistant_turn_constructors() {
        assert!(!AssistantTurn::answer("done").requests_tools());
        let turn = AssistantTurn::tool_calls(vec![ToolCall::new("c1", "list_files", Map::new())]);
        assert!(turn.requests_tools());
        assert!(turn.content.is_none());
    }
}
