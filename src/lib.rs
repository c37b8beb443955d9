//! repo-analyst - GitHub repository analysis agent
//!
//! Drives a tool-using language model through a bounded workflow that
//! inspects a repository over the GitHub API and produces a report.
//!
//! # Architecture
//!
//! - **context**: token estimation, bounded history, compaction
//! - **tools**: tool gateway, GitHub implementation, retry policy
//! - **agent**: workflow state machine, engine, result builder
//! - **models**: model client trait and OpenAI-compatible client
//! - **telemetry**: fire-and-forget event sinks

pub mod agent;
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod context;
pub mod errors;
pub mod models;
pub mod request;
pub mod telemetry;
pub mod tools;
pub mod types;

// Re-export commonly used types
pub use agent::{AnalysisEngine, AnalysisResult, EngineConfig, WorkflowPhase, WorkflowState};
pub use analyzer::RepoAnalyzer;
pub use config::Config;
pub use errors::{AnalysisError, Result};
pub use request::{AnalysisRequest, RepositoryRef};
pub use types::AnalysisType;
