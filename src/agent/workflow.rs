//! Workflow state threaded through the engine
//!
//! Exclusively owned by one in-flight analysis. The engine mutates it once
//! per step; the result builder consumes it once it is terminal.

use crate::agent::state::WorkflowPhase;
use crate::context::{ContextBudget, ContextWindow};
use crate::request::{AnalysisRequest, RepositoryRef};
use crate::tools::ToolErrorKind;
use crate::types::{AnalysisType, Message};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Why a workflow ended in `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Cancelled,
    MaxIterations,
    BudgetExceeded,
    RemoteFailure,
    Timeout,
    ModelFailure,
    Protocol,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Cancelled => "Cancelled",
            FailureKind::MaxIterations => "MaxIterations",
            FailureKind::BudgetExceeded => "BudgetExceeded",
            FailureKind::RemoteFailure => "RemoteFailure",
            FailureKind::Timeout => "Timeout",
            FailureKind::ModelFailure => "ModelFailure",
            FailureKind::Protocol => "Protocol",
        }
    }

    /// Failure kind for a tool whose retry budget ran out
    pub fn from_tool(kind: ToolErrorKind) -> Self {
        match kind {
            ToolErrorKind::Timeout => FailureKind::Timeout,
            _ => FailureKind::RemoteFailure,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal error recorded on the workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowError {
    pub kind: FailureKind,
    pub detail: String,
}

impl WorkflowError {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

/// Mutable record of one analysis
#[derive(Debug)]
pub struct WorkflowState {
    /// Analysis identifier
    pub id: Uuid,

    /// Validated caller request
    pub request: AnalysisRequest,

    /// Current phase
    pub phase: WorkflowPhase,

    /// Conversation history and its budget
    pub context: ContextWindow,

    /// Model invocations so far
    pub iteration_count: usize,

    /// Tool calls answered (retries not counted)
    pub tool_calls_made: usize,

    /// Sum of estimated prompt tokens over all model calls
    pub tokens_used_estimate: usize,

    /// Sum of provider-reported tokens, when available
    pub provider_tokens: u64,

    /// Final answer, set only on `Done`
    pub final_answer: Option<String>,

    /// Failure, set only on `Failed`
    pub error: Option<WorkflowError>,

    /// Start of the run
    pub created_at: DateTime<Utc>,

    /// Set when the workflow reaches a terminal phase
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowState {
    /// Fresh state in `Init`
    pub fn new(request: AnalysisRequest, budget: ContextBudget) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            phase: WorkflowPhase::Init,
            context: ContextWindow::new(budget),
            iteration_count: 0,
            tool_calls_made: 0,
            tokens_used_estimate: 0,
            provider_tokens: 0,
            final_answer: None,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Wall-clock duration, up to now while still running
    pub fn elapsed_ms(&self) -> u64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.created_at).num_milliseconds().max(0) as u64
    }

    pub fn analysis_type(&self) -> AnalysisType {
        self.request.analysis_type
    }

    pub fn repository(&self) -> &RepositoryRef {
        &self.request.repository
    }

    /// Live conversation history
    pub fn history(&self) -> &[Message] {
        self.context.messages()
    }
}
