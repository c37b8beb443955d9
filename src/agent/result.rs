//! Analysis result builder

use crate::agent::state::WorkflowPhase;
use crate::agent::workflow::WorkflowState;
use crate::errors::{AnalysisError, Result};
use crate::request::RepositoryRef;
use crate::types::AnalysisType;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Immutable snapshot of a finished analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub id: Uuid,
    pub repository: RepositoryRef,
    pub analysis_type: AnalysisType,

    /// Final textual answer (empty on failure)
    pub summary: String,

    pub turns_taken: usize,
    pub tokens_used_estimate: usize,
    pub tool_calls_made: usize,
    pub succeeded: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,

    /// Compactions performed during the run
    pub compactions: usize,

    /// Estimated size of the history at the end of the run
    pub context_tokens: usize,

    /// Provider-reported token total, when the provider reports usage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_tokens: Option<u64>,

    pub duration_ms: u64,
    pub completed_at: DateTime<Utc>,
}

/// Builds results from terminal workflow states
pub struct ResultBuilder;

impl ResultBuilder {
    /// Snapshot a terminal state
    ///
    /// Fails with `IncompleteState` when the workflow has not terminated.
    /// Pure: the same state always yields the same result.
    pub fn build(state: &WorkflowState) -> Result<AnalysisResult> {
        let (succeeded, summary) = match state.phase {
            WorkflowPhase::Done => (true, state.final_answer.clone().unwrap_or_default()),
            WorkflowPhase::Failed => (false, String::new()),
            phase => {
                return Err(AnalysisError::IncompleteState(format!(
                    "analysis {} is still in {}",
                    state.id, phase
                )));
            }
        };

        let completed_at = state.finished_at.unwrap_or(state.created_at);

        Ok(AnalysisResult {
            id: state.id,
            repository: state.repository().clone(),
            analysis_type: state.analysis_type(),
            summary,
            turns_taken: state.iteration_count,
            tokens_used_estimate: state.tokens_used_estimate,
            tool_calls_made: state.tool_calls_made,
            succeeded,
            error_kind: state.error.as_ref().map(|e| e.kind.to_string()),
            error_detail: state.error.as_ref().map(|e| e.to_string()),
            compactions: state.context.compactions(),
            context_tokens: state.context.current_token_estimate(),
            provider_tokens: (state.provider_tokens > 0).then_some(state.provider_tokens),
            duration_ms: completed_at
                .signed_duration_since(state.created_at)
                .num_milliseconds()
                .max(0) as u64,
            completed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::workflow::{FailureKind, WorkflowError};
    use crate::context::ContextBudget;
    use crate::request::AnalysisRequest;

    fn state() -> WorkflowState {
        let request = AnalysisRequest::new("https://github.com/a/b", AnalysisType::Summary, None, None).unwrap();
        WorkflowState::new(request, ContextBudget::default())
    }

    #[test]
    fn test_non_terminal_is_incomplete() {
        let mut state = state();
        assert!(matches!(ResultBuilder::build(&state), Err(AnalysisError::IncompleteState(_))));

        state.phase = WorkflowPhase::ToolTurn;
        assert!(matches!(ResultBuilder::build(&state), Err(AnalysisError::IncompleteState(_))));
    }

    #[test]
    fn test_done_result() {
        let mut state = state();
        state.phase = WorkflowPhase::Done;
        state.final_answer = Some("A small CLI.".to_string());
        state.iteration_count = 3;
        state.tool_calls_made = 4;

        let result = ResultBuilder::build(&state).unwrap();
        assert!(result.succeeded);
        assert_eq!(result.summary, "A small CLI.");
        assert_eq!(result.turns_taken, 3);
        assert_eq!(result.tool_calls_made, 4);
        assert!(result.error_detail.is_none());
        assert!(result.provider_tokens.is_none());
        assert_eq!(result.repository.full_name(), "a/b");
    }

    #[test]
    fn test_failed_result_carries_error() {
        let mut state = state();
        state.phase = WorkflowPhase::Failed;
        state.error = Some(WorkflowError::new(FailureKind::RemoteFailure, "list_files: 502"));

        let result = ResultBuilder::build(&state).unwrap();
        assert!(!result.succeeded);
        assert!(result.summary.is_empty());
        assert_eq!(result.error_kind.as_deref(), Some("RemoteFailure"));
        assert!(result.error_detail.as_deref().unwrap().contains("RemoteFailure"));

        // Deterministic
        assert_eq!(ResultBuilder::build(&state).unwrap(), result);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["analysis_type"], "summary");
        assert_eq!(json["succeeded"], false);
    }
}
