//! Condensation of compacted conversation spans
//!
//! The model performs the real summarization through the [`Summarizer`]
//! seam. When it fails, [`fallback_digest`] produces a bounded plain-text
//! condensation so compaction never blocks.

use crate::errors::Result;
use crate::types::{Message, Role};
use async_trait::async_trait;

/// Lines kept from each end of long tool output in the fallback digest
const DIGEST_EDGE_LINES: usize = 3;

/// Lower bound on the per-message share of the digest
const MIN_LINE_CHARS: usize = 80;

/// Condenses a transcript of older messages into summary text
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, transcript: &str) -> Result<String>;
}

/// Render messages as a role-prefixed transcript
pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(Message::transcript_line)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Lossy plain-text condensation bounded by `max_chars`
///
/// Tool output keeps its first and last three lines; each message gets an
/// equal share of the budget.
pub fn fallback_digest(messages: &[Message], max_chars: usize) -> String {
    let header = format!(
        "Condensed transcript of {} earlier messages (automatic summary unavailable):",
        messages.len()
    );

    let share = (max_chars / messages.len().max(1)).max(MIN_LINE_CHARS);

    let lines: Vec<String> = messages
        .iter()
        .map(|m| {
            let line = if m.role == Role::ToolResult {
                format!("{}: {}", m.role.label(), compress_tool_output(&m.content))
            } else {
                m.transcript_line()
            };
            truncate_chars(&line, share)
        })
        .collect();

    let digest = format!("{}\n{}", header, lines.join("\n"));
    truncate_chars(&digest, max_chars.max(MIN_LINE_CHARS))
}

/// Keep the first and last lines of long output
fn compress_tool_output(output: &str) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= DIGEST_EDGE_LINES * 2 {
        return lines.join(" / ");
    }

    let omitted = lines.len() - DIGEST_EDGE_LINES * 2;
    format!(
        "{} / ... ({} lines omitted) ... / {}",
        lines[..DIGEST_EDGE_LINES].join(" / "),
        omitted,
        lines[lines.len() - DIGEST_EDGE_LINES..].join(" / ")
    )
}

/// Truncate on a char boundary, marking the cut
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let marker = "…[truncated]";
    let keep = max_chars.saturating_sub(marker.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(marker);
    out
}
