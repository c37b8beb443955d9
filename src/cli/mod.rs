//! CLI module for repo-analyst
//!
//! Handles command-line argument parsing, the interactive prompt and
//! terminal output.

pub mod args;
pub mod display;
pub mod interactive;

pub use args::{Args, Verbosity};
pub use display::{print_analysis_types, print_report, ProgressSpinner};
pub use interactive::{InteractivePrompt, InteractiveRequest};
