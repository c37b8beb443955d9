//! Token estimation without a provider tokenizer
//!
//! Provides fast token estimation using a character-based heuristic with a
//! conservative safety margin, so the budget errs on the side of compacting
//! early.
//!
//! # Algorithm
//!
//! Base estimate: 1 token ≈ 4 ASCII characters (English)
//! Non-ASCII characters: 1 token each
//! Budget estimate: ASCII part × 1.10, computed in integer arithmetic
//! Per-message framing: +4 tokens (role and separators)
//!
//! # Complexity
//! O(n) where n = text length

use crate::tools::ToolSchema;
use crate::types::{Message, Role, SUMMARY_PREFIX};

/// Fixed framing cost charged for every message
pub const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Characters per token for the base heuristic
const CHARS_PER_TOKEN: usize = 4;

/// Token counter with heuristic-based estimation
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCounter;

impl TokenCounter {
    /// Create new token counter
    pub fn new() -> Self {
        Self
    }

    /// Raw heuristic: ⌈ascii / 4⌉ + non_ascii
    pub fn base_estimate(&self, text: &str) -> usize {
        let (ascii, non_ascii) = split_counts(text);
        (ascii + CHARS_PER_TOKEN - 1) / CHARS_PER_TOKEN + non_ascii
    }

    /// Budget estimate for text
    ///
    /// ```text
    /// estimate(text) = ⌈ascii × 11 / 40⌉ + non_ascii   (≈ ⌈ascii / 4⌉ × 1.10)
    /// ```
    ///
    /// # Examples
    ///
    /// ```
    /// # use repo_analyst::context::TokenCounter;
    /// let counter = TokenCounter::new();
    /// assert_eq!(counter.estimate(&"a".repeat(100)), 28);
    /// assert_eq!(counter.estimate("日本語"), 3);
    /// assert_eq!(counter.estimate(""), 0);
    /// ```
    pub fn estimate(&self, text: &str) -> usize {
        let (ascii, non_ascii) = split_counts(text);
        (ascii * 11 + 39) / 40 + non_ascii
    }

    /// Estimate for a single message including framing overhead
    pub fn estimate_message(&self, message: &Message) -> usize {
        let mut total = MESSAGE_OVERHEAD_TOKENS + self.estimate(&message.content);

        // Summaries go out behind a fixed lead-in
        if message.role == Role::Summary {
            total += self.estimate(SUMMARY_PREFIX) + 1;
        }

        for call in &message.tool_calls {
            let args = serde_json::to_string(&call.arguments).unwrap_or_default();
            total += self.estimate(&call.id) + self.estimate(&call.name) + self.estimate(&args);
        }

        if let Some(id) = &message.tool_call_id {
            total += self.estimate(id);
        }

        total
    }

    /// Sum of per-message estimates
    ///
    /// Strictly monotonic: every message contributes at least
    /// [`MESSAGE_OVERHEAD_TOKENS`].
    pub fn estimate_messages<'a, I>(&self, messages: I) -> usize
    where
        I: IntoIterator<Item = &'a Message>,
    {
        messages.into_iter().map(|m| self.estimate_message(m)).sum()
    }

    /// Estimate for the tool descriptors sent with every model call
    pub fn estimate_schemas(&self, schemas: &[ToolSchema]) -> usize {
        schemas
            .iter()
            .map(|schema| self.estimate(&schema.to_function_json().to_string()))
            .sum()
    }

    /// Estimate with detailed breakdown
    pub fn estimate_detailed(&self, text: &str) -> TokenEstimate {
        TokenEstimate {
            char_count: text.chars().count(),
            base: self.base_estimate(text),
            estimate: self.estimate(text),
        }
    }
}

/// (ASCII, non-ASCII) character counts
fn split_counts(text: &str) -> (usize, usize) {
    text.chars().fold((0, 0), |(ascii, other), c| {
        if c.is_ascii() {
            (ascii + 1, other)
        } else {
            (ascii, other + 1)
        }
    })
}

/// Detailed token estimate with breakdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEstimate {
    /// Character count in text
    pub char_count: usize,

    /// Raw heuristic (ascii / 4 + non_ascii)
    pub base: usize,

    /// Budget estimate (ASCII part × 1.10)
    pub estimate: usize,
}

impl TokenEstimate {
    /// Safety margin added on top of the raw heuristic
    pub fn margin(&self) -> usize {
        self.estimate.saturating_sub(self.base)
    }
}
