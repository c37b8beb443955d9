//! Retry policy with exponential backoff
//!
//! Bounded retry strategy used by the workflow engine around gateway and
//! model calls:
//! - Attempts: 1 + `max_retries`
//! - Delay: `base * 2^attempt`, capped at `max_delay_ms`
//! - Jitter: optional ±25% random variation
//! - Permanent errors are returned immediately

use crate::errors::AnalysisError;
use crate::tools::types::ToolError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Default retry budget
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default base delay for exponential backoff
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;

/// Default maximum delay cap
pub const DEFAULT_MAX_DELAY_MS: u64 = 8000;

/// Errors that can tell whether a retry may succeed
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for ToolError {
    fn is_transient(&self) -> bool {
        ToolError::is_transient(self)
    }
}

impl Transient for AnalysisError {
    fn is_transient(&self) -> bool {
        AnalysisError::is_transient(self)
    }
}

/// Why a retried operation gave up
#[derive(Debug, Clone, PartialEq)]
pub enum RetryFailure<E> {
    /// Non-retryable error on the given attempt
    Permanent(E),

    /// Transient errors on every attempt
    Exhausted { attempts: u32, last: E },
}

impl<E> RetryFailure<E> {
    /// The underlying error
    pub fn into_inner(self) -> E {
        match self {
            RetryFailure::Permanent(e) => e,
            RetryFailure::Exhausted { last, .. } => last,
        }
    }

    pub fn error(&self) -> &E {
        match self {
            RetryFailure::Permanent(e) => e,
            RetryFailure::Exhausted { last, .. } => last,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryFailure::Exhausted { .. })
    }
}

/// Retry policy with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    max_retries: u32,

    /// Base delay in milliseconds
    base_delay_ms: u64,

    /// Maximum delay cap in milliseconds
    max_delay_ms: u64,

    /// Enable jitter
    jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY_MS)
    }
}

impl RetryPolicy {
    /// Create retry policy with jitter enabled
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter: true,
        }
    }

    /// Policy that never retries
    pub fn none() -> Self {
        Self::new(0, 0)
    }

    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run `operation` until it succeeds, fails permanently, or the budget
    /// is spent
    ///
    /// `on_retry(attempt, error, delay)` is called before each backoff sleep.
    pub async fn run<T, E, F, Fut, R>(&self, mut operation: F, mut on_retry: R) -> Result<T, RetryFailure<E>>
    where
        E: Transient,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: FnMut(u32, &E, Duration),
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(RetryFailure::Permanent(e)),
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(RetryFailure::Exhausted {
                            attempts: attempt + 1,
                            last: e,
                        });
                    }

                    let delay = self.delay_for(attempt);
                    attempt += 1;
                    on_retry(attempt, &e, delay);
                    sleep(delay).await;
                }
            }
        }
    }

    /// Delay before retry number `attempt + 1`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        let delay_ms = exponential.min(self.max_delay_ms);

        let final_delay = if self.jitter && delay_ms > 0 {
            let jitter = (delay_ms / 4) as f64;
            let offset = (rand::random::<f64>() * 2.0 - 1.0) * jitter;
            (delay_ms as f64 + offset).max(0.0) as u64
        } else {
            delay_ms
        };

        Duration::from_millis(final_delay)
    }

    /// Upper bound on total backoff without jitter
    pub fn max_total_wait_time(&self) -> Duration {
        let total_ms: u64 = (0..self.max_retries)
            .map(|attempt| {
                self.base_delay_ms
                    .saturating_mul(2u64.saturating_pow(attempt))
                    .min(self.max_delay_ms)
            })
            .sum();

        Duration::from_millis(total_ms)
    }
}
