//! Analysis workflow engine
//!
//! Drives one state machine instance per analysis:
//!
//! ```text
//! INIT → MODEL_TURN → (TOOL_TURN → MODEL_TURN)* → DONE
//!        any non-terminal phase ──────────────→ FAILED
//! ```
//!
//! Each [`AnalysisEngine::step`] applies exactly one transition, so a run can
//! be inspected and resumed between steps. Tool calls within a turn run
//! sequentially in the order the model requested them. Cancellation is
//! checked at the top of every model and tool turn.

use crate::agent::result::{AnalysisResult, ResultBuilder};
use crate::agent::state::{StateEvent, WorkflowPhase};
use crate::agent::workflow::{FailureKind, WorkflowError, WorkflowState};
use crate::context::{ContextBudget, TokenCounter};
use crate::errors::{AnalysisError, Result};
use crate::models::{ModelClient, ModelSummarizer};
use crate::request::AnalysisRequest;
use crate::telemetry::{TelemetryEvent, TelemetrySink, TracingSink};
use crate::tools::{RetryFailure, RetryPolicy, ToolError, ToolGateway, ToolResult};
use crate::types::{Message, ToolCall};
use chrono::Utc;
use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Default bound on model invocations per analysis
pub const DEFAULT_MAX_ITERATIONS: usize = 25;

const SKIPPED_CANCELLED: &str = "Tool call skipped: analysis cancelled";
const SKIPPED_FAILED: &str = "Tool call skipped: analysis failed";

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum model invocations before failing
    pub max_iterations: usize,

    /// Retry policy for gateway calls
    pub tool_retry: RetryPolicy,

    /// Retry policy for model calls
    pub model_retry: RetryPolicy,

    /// Drop oldest turns instead of failing when over the hard ceiling
    pub truncate_on_overflow: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tool_retry: RetryPolicy::default(),
            model_retry: RetryPolicy::default(),
            truncate_on_overflow: false,
        }
    }
}

/// Workflow engine shared by concurrent analyses
///
/// Holds no per-analysis state; every run owns its [`WorkflowState`].
pub struct AnalysisEngine {
    model: Arc<dyn ModelClient>,
    gateway: Arc<dyn ToolGateway>,
    budget: ContextBudget,
    config: EngineConfig,
    telemetry: Arc<dyn TelemetrySink>,
}

impl AnalysisEngine {
    /// Create engine with an injected budget
    pub fn new(
        model: Arc<dyn ModelClient>,
        gateway: Arc<dyn ToolGateway>,
        budget: ContextBudget,
        config: EngineConfig,
    ) -> Result<Self> {
        if config.max_iterations == 0 {
            return Err(AnalysisError::Config(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            model,
            gateway,
            budget,
            config,
            telemetry: Arc::new(TracingSink),
        })
    }

    /// Replace the telemetry sink
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn budget(&self) -> &ContextBudget {
        &self.budget
    }

    /// Fresh workflow state in `Init`
    pub fn start(&self, request: AnalysisRequest) -> WorkflowState {
        WorkflowState::new(request, self.budget)
    }

    /// Run to a terminal phase and build the result
    ///
    /// Every reachable failure yields a non-successful result rather than
    /// an error.
    pub async fn run(&self, request: AnalysisRequest, cancel: &CancellationToken) -> Result<AnalysisResult> {
        let mut state = self.start(request);
        let span = info_span!("analysis", id = %state.id, repository = %state.repository());

        async {
            info!(analysis_type = %state.analysis_type(), "analysis started");
            while !state.is_terminal() {
                self.step(&mut state, cancel).await?;
            }
            ResultBuilder::build(&state)
        }
        .instrument(span)
        .await
    }

    /// Apply one transition; terminal states are left unchanged
    pub async fn step(&self, state: &mut WorkflowState, cancel: &CancellationToken) -> Result<()> {
        match state.phase {
            WorkflowPhase::Init => self.init(state),
            WorkflowPhase::ModelTurn => self.model_turn(state, cancel).await,
            WorkflowPhase::ToolTurn => self.tool_turn(state, cancel).await,
            WorkflowPhase::Done | WorkflowPhase::Failed => Ok(()),
        }
    }

    fn init(&self, state: &mut WorkflowState) -> Result<()> {
        let system = Message::system(state.request.system_message());
        let user = Message::user(state.request.user_message());

        let installed = state
            .context
            .initialize(system)
            .and_then(|_| state.context.append(user));

        if let Err(e) = installed {
            return self.fail(state, FailureKind::Protocol, e.to_string());
        }

        // Tool descriptors ride along with every model call
        let schema_tokens = TokenCounter::new().estimate_schemas(&self.gateway.schemas());
        state.context.reserve_tokens(schema_tokens);

        self.advance(state, StateEvent::Started)
    }

    async fn model_turn(&self, state: &mut WorkflowState, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            let detail = format!("{} before model turn", AnalysisError::Cancelled);
            return self.fail(state, FailureKind::Cancelled, detail);
        }

        if state.iteration_count >= self.config.max_iterations {
            let error = AnalysisError::MaxIterations {
                limit: self.config.max_iterations,
            };
            return self.fail(state, FailureKind::MaxIterations, error.to_string());
        }

        if let Err(e) = self.ensure_budget(state).await {
            let kind = match e {
                AnalysisError::BudgetExceeded { .. } => FailureKind::BudgetExceeded,
                _ => FailureKind::Protocol,
            };
            return self.fail(state, kind, e.to_string());
        }

        let prompt_tokens = state.context.current_token_estimate();
        state.iteration_count += 1;
        state.tokens_used_estimate += prompt_tokens;

        let schemas = self.gateway.schemas();
        let model = &*self.model;
        let history = state.context.messages();
        let started = Instant::now();

        let outcome = self
            .config
            .model_retry
            .run(
                || model.complete(history, &schemas),
                |attempt, error: &AnalysisError, delay| self.record_retry("model", attempt, error, delay),
            )
            .await;

        let turn = match outcome {
            Ok(turn) => turn,
            Err(failure) => {
                let attempts = match &failure {
                    RetryFailure::Exhausted { attempts, .. } => *attempts,
                    RetryFailure::Permanent(_) => 1,
                };
                let error = failure.into_inner();
                let kind = match error {
                    AnalysisError::Timeout { .. } => FailureKind::Timeout,
                    _ => FailureKind::ModelFailure,
                };
                let detail = format!("model call failed after {} attempt(s): {}", attempts, error);
                return self.fail(state, kind, detail);
            }
        };

        self.telemetry.record(TelemetryEvent::ModelInvoked {
            iteration: state.iteration_count,
            prompt_tokens_estimate: prompt_tokens,
            duration_ms: started.elapsed().as_millis() as u64,
            requested_tools: turn.tool_calls.len(),
        });

        if let Some(usage) = turn.usage {
            state.provider_tokens += usage.total_tokens;
        }

        if turn.requests_tools() {
            let calls = assign_call_ids(turn.tool_calls);
            debug!(
                iteration = state.iteration_count,
                tools = ?calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                "model requested tools"
            );

            let message = Message::assistant_with_tool_calls(turn.content.unwrap_or_default(), calls);
            if let Err(e) = state.context.append(message) {
                return self.fail(state, FailureKind::Protocol, e.to_string());
            }
            return self.advance(state, StateEvent::ToolCallsRequested);
        }

        let answer = turn.content.unwrap_or_default();
        if answer.trim().is_empty() {
            warn!(iteration = state.iteration_count, "model returned an empty final answer");
        }

        if let Err(e) = state.context.append(Message::assistant(answer.clone())) {
            return self.fail(state, FailureKind::Protocol, e.to_string());
        }
        state.final_answer = Some(answer);
        self.advance(state, StateEvent::FinalAnswer)
    }

    async fn tool_turn(&self, state: &mut WorkflowState, cancel: &CancellationToken) -> Result<()> {
        let calls: Vec<ToolCall> = state.context.pending_tool_calls().into_iter().cloned().collect();

        for (index, call) in calls.iter().enumerate() {
            if cancel.is_cancelled() {
                self.answer_skipped(state, &calls[index..], SKIPPED_CANCELLED);
                let detail = format!(
                    "{} during tool turn, {} call(s) skipped",
                    AnalysisError::Cancelled,
                    calls.len() - index
                );
                return self.fail(state, FailureKind::Cancelled, detail);
            }

            let outcome = self.invoke_tool(call).await;
            state.tool_calls_made += 1;

            let content = match &outcome {
                Ok(result) if result.content.is_empty() => "(no output)".to_string(),
                Ok(result) => result.content.clone(),
                Err(failure) => failure.error().to_model_text(&call.name),
            };

            if let Err(e) = state.context.append(Message::tool_result(&call.id, content)) {
                return self.fail(state, FailureKind::Protocol, e.to_string());
            }

            if let Err(RetryFailure::Exhausted { attempts, last }) = outcome {
                self.answer_skipped(state, &calls[index + 1..], SKIPPED_FAILED);
                let kind = FailureKind::from_tool(last.kind);
                let error = AnalysisError::Tool(last);
                let detail = format!("tool '{}' failed after {} attempts: {}", call.name, attempts, error);
                return self.fail(state, kind, detail);
            }
        }

        self.advance(state, StateEvent::ToolsAnswered)
    }

    /// Compact if needed, truncating as a last resort when configured
    async fn ensure_budget(&self, state: &mut WorkflowState) -> Result<()> {
        let summarizer = ModelSummarizer::new(&*self.model);
        let before = state.context.compactions();
        let outcome = state.context.maybe_compact(&summarizer).await;

        if state.context.compactions() > before {
            if let Some(stats) = state.context.last_compaction() {
                self.telemetry.record(TelemetryEvent::ContextCompaction {
                    tokens_before: stats.tokens_before,
                    tokens_after: stats.tokens_after,
                    summarized_messages: stats.summarized_messages,
                    used_fallback: stats.used_fallback,
                });
            }
        }

        match outcome {
            Ok(_) => Ok(()),
            Err(AnalysisError::BudgetExceeded { current, max }) if self.config.truncate_on_overflow => {
                let dropped = state.context.force_truncate()?;
                warn!(current, max, dropped, "context over budget, dropped oldest turns");
                state.context.check_hard_limit()
            }
            Err(e) => Err(e),
        }
    }

    async fn invoke_tool(&self, call: &ToolCall) -> std::result::Result<ToolResult, RetryFailure<ToolError>> {
        self.telemetry.record(TelemetryEvent::ToolStarted {
            tool: call.name.clone(),
            call_id: call.id.clone(),
        });

        let gateway = &*self.gateway;
        let operation = format!("tool:{}", call.name);
        let started = Instant::now();

        let outcome = self
            .config
            .tool_retry
            .run(
                || gateway.invoke(&call.name, &call.arguments),
                |attempt, error: &ToolError, delay| self.record_retry(&operation, attempt, error, delay),
            )
            .await;

        self.telemetry.record(TelemetryEvent::ToolCompleted {
            tool: call.name.clone(),
            call_id: call.id.clone(),
            duration_ms: started.elapsed().as_millis() as u64,
            success: outcome.is_ok(),
            error_kind: outcome.as_ref().err().map(|f| f.error().kind.to_string()),
        });

        outcome
    }

    /// Keep the history well-formed when a turn is abandoned
    fn answer_skipped(&self, state: &mut WorkflowState, calls: &[ToolCall], reason: &str) {
        for call in calls {
            if let Err(e) = state.context.append(Message::tool_result(&call.id, reason)) {
                warn!(call_id = %call.id, error = %e, "could not record skipped tool call");
            }
        }
    }

    fn record_retry(&self, operation: &str, attempt: u32, error: &dyn Display, delay: Duration) {
        self.telemetry.record(TelemetryEvent::RetryAttempt {
            operation: operation.to_string(),
            attempt,
            delay_ms: delay.as_millis() as u64,
            error: error.to_string(),
        });
    }

    fn advance(&self, state: &mut WorkflowState, event: StateEvent) -> Result<()> {
        let from = state.phase;
        let to = from.transition(event)?;
        state.phase = to;

        if from != to {
            self.telemetry.record(TelemetryEvent::PhaseTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        if to.is_terminal() && !from.is_terminal() {
            state.finished_at = Some(Utc::now());
            self.telemetry.record(TelemetryEvent::AnalysisFinished {
                analysis_id: state.id.to_string(),
                succeeded: to == WorkflowPhase::Done,
                turns: state.iteration_count,
                tool_calls: state.tool_calls_made,
            });
        }

        Ok(())
    }

    fn fail(&self, state: &mut WorkflowState, kind: FailureKind, detail: impl Into<String>) -> Result<()> {
        let error = WorkflowError::new(kind, detail);
        warn!(kind = %error.kind, detail = %error.detail, "analysis failed");
        state.error = Some(error);
        self.advance(state, StateEvent::Fail)
    }
}

/// Give every call a non-empty id unique within the turn
fn assign_call_ids(calls: Vec<ToolCall>) -> Vec<ToolCall> {
    let mut seen = HashSet::new();

    calls
        .into_iter()
        .map(|mut call| {
            if call.id.trim().is_empty() || !seen.insert(call.id.clone()) {
                call.id = format!("call_{}", Uuid::new_v4().simple());
                seen.insert(call.id.clone());
            }
            call
        })
        .collect()
}
