//! Workflow state machine
//!
//! Deterministic finite state machine for one analysis run:
//! - Safety: invalid edges are rejected, never applied
//! - Liveness: every non-terminal phase can reach Done or Failed
//! - Determinism: unique next phase per (phase, event)

use crate::errors::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Workflow phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    /// Prompt not built yet
    Init,

    /// Next step invokes the model
    ModelTurn,

    /// Next step answers the pending tool calls
    ToolTurn,

    /// Final answer received (terminal)
    Done,

    /// Unrecoverable failure (terminal)
    Failed,
}

/// Events that trigger phase transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEvent {
    /// Initial messages installed
    Started,

    /// Model asked for one or more tools
    ToolCallsRequested,

    /// Model produced a final answer
    FinalAnswer,

    /// Every pending call has a result
    ToolsAnswered,

    /// Non-recoverable error, cancellation or iteration limit
    Fail,
}

impl WorkflowPhase {
    /// Check if this is a terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowPhase::Done | WorkflowPhase::Failed)
    }

    /// Attempt phase transition with validation
    ///
    /// Valid transitions:
    /// 1. Init      → ModelTurn (on: Started)
    /// 2. ModelTurn → ToolTurn  (on: ToolCallsRequested)
    /// 3. ModelTurn → Done      (on: FinalAnswer)
    /// 4. ToolTurn  → ModelTurn (on: ToolsAnswered)
    /// 5. \*        → Failed    (on: Fail, from any non-terminal phase)
    /// 6. Done, Failed self-loop on every event
    pub fn transition(&self, event: StateEvent) -> Result<WorkflowPhase> {
        use StateEvent::*;
        use WorkflowPhase::*;

        let next = match (self, event) {
            // Terminal phases (self-loops)
            (Done, _) => Done,
            (Failed, _) => Failed,

            (_, Fail) => Failed,

            (Init, Started) => ModelTurn,
            (ModelTurn, ToolCallsRequested) => ToolTurn,
            (ModelTurn, FinalAnswer) => Done,
            (ToolTurn, ToolsAnswered) => ModelTurn,

            (from, event) => {
                return Err(AnalysisError::InvalidTransition {
                    from: from.to_string(),
                    to: format!("(via {:?})", event),
                    reason: format!("No valid transition from {} on {:?}", from, event),
                });
            }
        };

        Ok(next)
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowPhase::Init => "INIT",
            WorkflowPhase::ModelTurn => "MODEL_TURN",
            WorkflowPhase::ToolTurn => "TOOL_TURN",
            WorkflowPhase::Done => "DONE",
            WorkflowPhase::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_PHASES: [WorkflowPhase; 5] = [
        WorkflowPhase::Init,
        WorkflowPhase::ModelTurn,
        WorkflowPhase::ToolTurn,
        WorkflowPhase::Done,
        WorkflowPhase::Failed,
    ];

    const ALL_EVENTS: [StateEvent; 5] = [
        StateEvent::Started,
        StateEvent::ToolCallsRequested,
        StateEvent::FinalAnswer,
        StateEvent::ToolsAnswered,
        StateEvent::Fail,
    ];

    #[test]
    fn test_valid_transitions() {
        assert_eq!(
            WorkflowPhase::Init.transition(StateEvent::Started).unwrap(),
            WorkflowPhase::ModelTurn
        );
        assert_eq!(
            WorkflowPhase::ModelTurn.transition(StateEvent::ToolCallsRequested).unwrap(),
            WorkflowPhase::ToolTurn
        );
        assert_eq!(
            WorkflowPhase::ModelTurn.transition(StateEvent::FinalAnswer).unwrap(),
            WorkflowPhase::Done
        );
        assert_eq!(
            WorkflowPhase::ToolTurn.transition(StateEvent::ToolsAnswered).unwrap(),
            WorkflowPhase::ModelTurn
        );
    }

    #[test]
    fn test_fail_from_any_phase() {
        for phase in ALL_PHASES {
            let next = phase.transition(StateEvent::Fail).unwrap();
            if phase == WorkflowPhase::Done {
                assert_eq!(next, WorkflowPhase::Done);
            } else {
                assert_eq!(next, WorkflowPhase::Failed);
            }
        }
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(WorkflowPhase::ToolTurn.transition(StateEvent::FinalAnswer).is_err());
        assert!(WorkflowPhase::Init.transition(StateEvent::ToolsAnswered).is_err());
        assert!(WorkflowPhase::ModelTurn.transition(StateEvent::Started).is_err());
    }

    #[test]
    fn test_terminal_self_loops() {
        for event in ALL_EVENTS {
            assert_eq!(WorkflowPhase::Done.transition(event).unwrap(), WorkflowPhase::Done);
            assert_eq!(WorkflowPhase::Failed.transition(event).unwrap(), WorkflowPhase::Failed);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(WorkflowPhase::ModelTurn.to_string(), "MODEL_TURN");
        assert!(WorkflowPhase::Failed.is_terminal());
        assert!(!WorkflowPhase::ToolTurn.is_terminal());
    }
}
