//! Context window manager
//!
//! Owns the conversation history and the token budget, and compacts older
//! messages into one summary before the budget is exceeded:
//!
//! ```text
//! [system] [m1 .. mk] [t1 .. tK]   →   [system] [summary(m1 .. mk)] [t1 .. tK]
//! ```
//!
//! - Preserves: leading system message and the last `keep_last` non-system
//!   messages, verbatim and in order
//! - Condenses: everything between them, via the model or the fallback digest
//! - Reports `BudgetExceeded` instead of truncating silently

use crate::context::budget::ContextBudget;
use crate::context::counter::TokenCounter;
use crate::context::history::ConversationHistory;
use crate::context::summarizer::{fallback_digest, render_transcript, Summarizer};
use crate::errors::{AnalysisError, Result};
use crate::types::{Message, Role, ToolCall};
use tracing::{debug, info, warn};

/// Floor for the fallback digest size (tokens)
const MIN_DIGEST_TOKENS: usize = 64;

/// Context window with budget-driven compaction
#[derive(Debug, Clone)]
pub struct ContextWindow {
    budget: ContextBudget,
    counter: TokenCounter,
    history: Option<ConversationHistory>,
    reserved_tokens: usize,
    compactions: usize,
    last_compaction: Option<CompactionStats>,
}

impl ContextWindow {
    /// Create an uninitialized window
    pub fn new(budget: ContextBudget) -> Self {
        Self {
            budget,
            counter: TokenCounter::new(),
            history: None,
            reserved_tokens: 0,
            compactions: 0,
            last_compaction: None,
        }
    }

    /// Install the system message, starting a fresh history
    pub fn initialize(&mut self, system: Message) -> Result<()> {
        self.history = Some(ConversationHistory::new(system)?);
        self.compactions = 0;
        self.last_compaction = None;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.history.is_some()
    }

    pub fn budget(&self) -> &ContextBudget {
        &self.budget
    }

    /// Charge a fixed per-request cost (tool descriptors) against the budget
    pub fn reserve_tokens(&mut self, tokens: usize) {
        self.reserved_tokens = tokens;
    }

    pub fn reserved_tokens(&self) -> usize {
        self.reserved_tokens
    }

    /// Live history, if initialized
    pub fn history(&self) -> Option<&ConversationHistory> {
        self.history.as_ref()
    }

    /// Live messages (empty when uninitialized)
    pub fn messages(&self) -> &[Message] {
        self.history.as_ref().map(|h| h.messages()).unwrap_or(&[])
    }

    /// Number of compactions performed
    pub fn compactions(&self) -> usize {
        self.compactions
    }

    /// Statistics of the most recent compaction
    pub fn last_compaction(&self) -> Option<&CompactionStats> {
        self.last_compaction.as_ref()
    }

    /// Unanswered calls of the last assistant message
    pub fn pending_tool_calls(&self) -> Vec<&ToolCall> {
        self.history
            .as_ref()
            .map(|h| h.pending_tool_calls())
            .unwrap_or_default()
    }

    /// Append a message to the history
    pub fn append(&mut self, message: Message) -> Result<()> {
        self.history_mut()?.push(message)
    }

    /// Estimated request size: live history plus reserved tokens
    pub fn current_token_estimate(&self) -> usize {
        self.reserved_tokens + self.counter.estimate_messages(self.messages())
    }

    /// Whether the soft threshold has been reached
    pub fn needs_compaction(&self) -> bool {
        self.current_token_estimate() >= self.budget.summary_threshold()
    }

    /// Compact when at or above the threshold
    ///
    /// Returns whether a compaction happened. Fails with `BudgetExceeded`
    /// when the history is still above `max_tokens` afterwards.
    pub async fn maybe_compact(&mut self, summarizer: &dyn Summarizer) -> Result<bool> {
        if !self.is_initialized() {
            return Err(AnalysisError::State(
                "context window used before initialization".to_string(),
            ));
        }

        if !self.needs_compaction() {
            return Ok(false);
        }

        let compacted = self.compact(summarizer).await?;
        self.check_hard_limit()?;
        Ok(compacted)
    }

    /// Replace the compactable middle with a single summary message
    ///
    /// No-op (returns false) when only the system message, an existing
    /// summary and the kept tail remain.
    pub async fn compact(&mut self, summarizer: &dyn Summarizer) -> Result<bool> {
        let keep_last = self.budget.keep_last();
        let history = self
            .history
            .as_ref()
            .ok_or_else(|| AnalysisError::State("context window used before initialization".to_string()))?;

        let lead = history.leading_system_len();
        let tail_start = history.kept_tail_start(keep_last);
        let middle = &history.messages()[lead..tail_start];

        if is_minimal(middle) {
            debug!(
                messages = history.len(),
                keep_last,
                "nothing to compact beyond protected messages"
            );
            return Ok(false);
        }

        let tokens_before = self.current_token_estimate();
        let messages_before = history.len();
        let middle_tokens = self.counter.estimate_messages(middle);
        let transcript = render_transcript(middle);

        let (text, used_fallback) = match summarizer.summarize(&transcript).await {
            Ok(text) if !text.trim().is_empty() && self.summary_tokens(&text) < middle_tokens => {
                (text.trim().to_string(), false)
            }
            Ok(_) => {
                warn!("model summary was empty or not smaller than its input, using digest");
                (fallback_digest(middle, self.digest_char_budget()), true)
            }
            Err(e) => {
                warn!(error = %e, "summarization failed, using digest");
                (fallback_digest(middle, self.digest_char_budget()), true)
            }
        };

        // A digest of a small middle can outweigh it
        if used_fallback && self.summary_tokens(&text) >= middle_tokens {
            debug!(middle_tokens, "digest would not shrink the history, skipping compaction");
            return Ok(false);
        }

        let summarized = middle.len();
        self.history_mut()?
            .splice_summary(lead..tail_start, Message::summary(text));

        let stats = CompactionStats::new(
            tokens_before,
            self.current_token_estimate(),
            messages_before,
            self.messages().len(),
            summarized,
            used_fallback,
        );

        info!(
            tokens_before = stats.tokens_before,
            tokens_after = stats.tokens_after,
            summarized = stats.summarized_messages,
            fallback = stats.used_fallback,
            "context compacted ({:.1}% reduction)",
            stats.token_reduction_percent
        );

        self.compactions += 1;
        self.last_compaction = Some(stats);
        Ok(true)
    }

    /// Last resort: drop oldest turns until under `max_tokens`
    ///
    /// Never removes the system message or the most recent message.
    /// Returns the number of messages dropped.
    pub fn force_truncate(&mut self) -> Result<usize> {
        let max = self.budget.max_tokens();
        let mut dropped = 0;

        while self.current_token_estimate() > max {
            let removed = self.history_mut()?.drop_oldest_turn();
            if removed == 0 {
                break;
            }
            dropped += removed;
        }

        if dropped > 0 {
            warn!(dropped, tokens = self.current_token_estimate(), "force-truncated context");
        }

        Ok(dropped)
    }

    /// Fail when the live history exceeds the hard ceiling
    pub fn check_hard_limit(&self) -> Result<()> {
        let current = self.current_token_estimate();
        if current > self.budget.max_tokens() {
            return Err(AnalysisError::BudgetExceeded {
                current,
                max: self.budget.max_tokens(),
            });
        }
        Ok(())
    }

    /// Cost of `text` once spliced in as a summary message
    fn summary_tokens(&self, text: &str) -> usize {
        self.counter.estimate_message(&Message::summary(text.trim()))
    }

    fn digest_char_budget(&self) -> usize {
        (self.budget.summary_threshold() / 4).max(MIN_DIGEST_TOKENS) * 4
    }

    fn history_mut(&mut self) -> Result<&mut ConversationHistory> {
        self.history
            .as_mut()
            .ok_or_else(|| AnalysisError::State("context window used before initialization".to_string()))
    }
}

/// A middle that is empty or only the previous summary cannot shrink further
fn is_minimal(middle: &[Message]) -> bool {
    match middle {
        [] => true,
        [only] => only.role == Role::Summary,
        _ => false,
    }
}

/// Compaction statistics
#[derive(Debug, Clone, PartialEq)]
pub struct CompactionStats {
    pub tokens_before: usize,
    pub tokens_after: usize,
    pub messages_before: usize,
    pub messages_after: usize,
    pub summarized_messages: usize,
    pub used_fallback: bool,
    pub token_reduction_percent: f64,
}

impl CompactionStats {
    fn new(
        tokens_before: usize,
        tokens_after: usize,
        messages_before: usize,
        messages_after: usize,
        summarized_messages: usize,
        used_fallback: bool,
    ) -> Self {
        let reduction = tokens_before.saturating_sub(tokens_after);
        let token_reduction_percent = if tokens_before > 0 {
            reduction as f64 / tokens_before as f64 * 100.0
        } else {
            0.0
        };

        Self {
            tokens_before,
            tokens_after,
            messages_before,
            messages_after,
            summarized_messages,
            used_fallback,
            token_reduction_percent,
        }
    }
}
