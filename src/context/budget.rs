//! Context budget thresholds (tokens)

use crate::errors::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Default hard ceiling
pub const DEFAULT_MAX_TOKENS: usize = 200_000;

/// Default compaction trigger
pub const DEFAULT_SUMMARY_THRESHOLD: usize = 180_000;

/// Default number of trailing messages preserved verbatim
pub const DEFAULT_KEEP_LAST: usize = 5;

/// Immutable token budget injected into the context window
///
/// Invariant: `0 < summary_threshold < max_tokens` and `keep_last >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBudget {
    max_tokens: usize,
    summary_threshold: usize,
    keep_last: usize,
}

impl ContextBudget {
    /// Create a validated budget
    pub fn new(max_tokens: usize, summary_threshold: usize, keep_last: usize) -> Result<Self> {
        if summary_threshold == 0 {
            return Err(AnalysisError::Config(
                "summary threshold must be greater than zero".to_string(),
            ));
        }
        if summary_threshold >= max_tokens {
            return Err(AnalysisError::Config(format!(
                "summary threshold ({}) must be less than max tokens ({})",
                summary_threshold, max_tokens
            )));
        }
        if keep_last == 0 {
            return Err(AnalysisError::Config(
                "keep_last must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            max_tokens,
            summary_threshold,
            keep_last,
        })
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn summary_threshold(&self) -> usize {
        self.summary_threshold
    }

    pub fn keep_last(&self) -> usize {
        self.keep_last
    }
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            summary_threshold: DEFAULT_SUMMARY_THRESHOLD,
            keep_last: DEFAULT_KEEP_LAST,
        }
    }
}
