//! Agent orchestration module
//!
//! Workflow state machine, per-analysis state, the engine that drives it,
//! and the result builder.

pub mod engine;
pub mod result;
pub mod state;
pub mod workflow;

// Re-export commonly used types
pub use engine::{AnalysisEngine, EngineConfig, DEFAULT_MAX_ITERATIONS};
pub use result::{AnalysisResult, ResultBuilder};
pub use state::{StateEvent, WorkflowPhase};
pub use workflow::{FailureKind, WorkflowError, WorkflowState};
