//! Telemetry for analysis runs
//!
//! Structured workflow events delivered to a fire-and-forget sink. Recording
//! never fails and never influences control flow.

use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Telemetry event types
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    // Workflow events
    PhaseTransition {
        from: String,
        to: String,
    },
    ModelInvoked {
        iteration: usize,
        prompt_tokens_estimate: usize,
        duration_ms: u64,
        requested_tools: usize,
    },
    ContextCompaction {
        tokens_before: usize,
        tokens_after: usize,
        summarized_messages: usize,
        used_fallback: bool,
    },

    // Tool events
    ToolStarted {
        tool: String,
        call_id: String,
    },
    ToolCompleted {
        tool: String,
        call_id: String,
        duration_ms: u64,
        success: bool,
        error_kind: Option<String>,
    },
    RetryAttempt {
        operation: String,
        attempt: u32,
        delay_ms: u64,
        error: String,
    },

    AnalysisFinished {
        analysis_id: String,
        succeeded: bool,
        turns: usize,
        tool_calls: usize,
    },
}

/// Receives telemetry events
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: TelemetryEvent);
}

/// Discards all events
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn record(&self, _event: TelemetryEvent) {}
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn record(&self, event: TelemetryEvent) {
        match event {
            TelemetryEvent::PhaseTransition { from, to } => {
                debug!(%from, %to, "phase transition");
            }
            TelemetryEvent::ModelInvoked {
                iteration,
                prompt_tokens_estimate,
                duration_ms,
                requested_tools,
            } => {
                info!(iteration, prompt_tokens_estimate, duration_ms, requested_tools, "model invoked");
            }
            TelemetryEvent::ContextCompaction {
                tokens_before,
                tokens_after,
                summarized_messages,
                used_fallback,
            } => {
                info!(tokens_before, tokens_after, summarized_messages, used_fallback, "context compaction");
            }
            TelemetryEvent::ToolStarted { tool, call_id } => {
                debug!(%tool, %call_id, "tool started");
            }
            TelemetryEvent::ToolCompleted {
                tool,
                call_id,
                duration_ms,
                success,
                error_kind,
            } => {
                info!(%tool, %call_id, duration_ms, success, error_kind = error_kind.as_deref().unwrap_or("-"), "tool completed");
            }
            TelemetryEvent::RetryAttempt {
                operation,
                attempt,
                delay_ms,
                error,
            } => {
                warn!(%operation, attempt, delay_ms, %error, "retrying");
            }
            TelemetryEvent::AnalysisFinished {
                analysis_id,
                succeeded,
                turns,
                tool_calls,
            } => {
                info!(%analysis_id, succeeded, turns, tool_calls, "analysis finished");
            }
        }
    }
}

/// Telemetry statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetryStats {
    pub phase_transitions: usize,
    pub model_invocations: usize,
    pub tools_executed: usize,
    pub tools_succeeded: usize,
    pub tools_failed: usize,
    pub retry_attempts: usize,
    pub compaction_events: usize,
}

/// In-memory collector
#[derive(Debug, Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// All recorded events
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        match self.events.lock() {
            Ok(events) => {
                let start = events.len().saturating_sub(n);
                events[start..].to_vec()
            }
            Err(_) => Vec::new(),
        }
    }

    /// Calculate tool success rate
    pub fn tool_success_rate(&self) -> f64 {
        let stats = self.get_stats();
        let total = stats.tools_succeeded + stats.tools_failed;
        if total == 0 {
            1.0
        } else {
            stats.tools_succeeded as f64 / total as f64
        }
    }
}

impl TelemetrySink for TelemetryCollector {
    fn record(&self, event: TelemetryEvent) {
        // Poisoned locks are ignored: telemetry must not affect the run
        if let Ok(mut stats) = self.stats.lock() {
            match &event {
                TelemetryEvent::PhaseTransition { .. } => stats.phase_transitions += 1,
                TelemetryEvent::ModelInvoked { .. } => stats.model_invocations += 1,
                TelemetryEvent::ContextCompaction { .. } => stats.compaction_events += 1,
                TelemetryEvent::ToolStarted { .. } => stats.tools_executed += 1,
                TelemetryEvent::ToolCompleted { success, .. } => {
                    if *success {
                        stats.tools_succeeded += 1;
                    } else {
                        stats.tools_failed += 1;
                    }
                }
                TelemetryEvent::RetryAttempt { .. } => stats.retry_attempts += 1,
                TelemetryEvent::AnalysisFinished { .. } => {}
            }
        }

        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Fan-out to several sinks
#[derive(Clone, Default)]
pub struct MultiSink {
    sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl MultiSink {
    pub fn new(sinks: Vec<Arc<dyn TelemetrySink>>) -> Self {
        Self { sinks }
    }
}

impl TelemetrySink for MultiSink {
    fn record(&self, event: TelemetryEvent) {
        for sink in &self.sinks {
            sink.record(event.clone());
        }
    }
}
