//! Terminal output for the analyze command
//!
//! Spinner driven by telemetry events, and the coloured final report.

use crate::agent::AnalysisResult;
use crate::telemetry::{TelemetryEvent, TelemetrySink};
use crate::types::AnalysisType;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Spinner that follows workflow progress
#[derive(Clone)]
pub struct ProgressSpinner {
    bar: ProgressBar,
}

impl ProgressSpinner {
    /// Start a spinner for one analysis
    pub fn start(repository: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(format!("Analyzing {}", repository));
        bar.enable_steady_tick(TICK_INTERVAL);
        Self { bar }
    }

    /// Hidden spinner for quiet and JSON output
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl TelemetrySink for ProgressSpinner {
    fn record(&self, event: TelemetryEvent) {
        let message = match event {
            TelemetryEvent::ModelInvoked { iteration, .. } => {
                format!("Model turn {} complete", iteration)
            }
            TelemetryEvent::ToolStarted { tool, .. } => format!("Running {}", tool),
            TelemetryEvent::RetryAttempt { operation, attempt, .. } => {
                format!("Retrying {} (attempt {})", operation, attempt + 1)
            }
            TelemetryEvent::ContextCompaction { tokens_before, tokens_after, .. } => {
                format!("Compacted context {} → {} tokens", tokens_before, tokens_after)
            }
            TelemetryEvent::PhaseTransition { to, .. } if to == "MODEL_TURN" => "Consulting model".to_string(),
            _ => return,
        };
        self.bar.set_message(message);
    }
}

/// Print the available analysis types
pub fn print_analysis_types() {
    println!("{}", "Available analysis types:".bold());
    for kind in AnalysisType::all() {
        let note = if kind == AnalysisType::Custom {
            " (requires --system-prompt or --user-prompt)"
        } else {
            ""
        };
        println!("  {} {}{}", "•".cyan(), kind.as_str().green(), note.dimmed());
    }
}

/// Print the human-readable report
pub fn print_report(result: &AnalysisResult) {
    let width = 64;
    let rule = "=".repeat(width);

    println!("\n{}", rule.cyan());
    println!(
        "{}",
        format!("  {} analysis of {}", result.analysis_type, result.repository).bold().cyan()
    );
    println!("{}\n", rule.cyan());

    if result.succeeded {
        println!("{}\n", result.summary);
    } else {
        let kind = result.error_kind.as_deref().unwrap_or("Unknown");
        println!("{} {}", "✗ Analysis failed:".red().bold(), kind.red());
        if let Some(detail) = &result.error_detail {
            println!("  {}", detail.dimmed());
        }
        println!();
    }

    println!("{}", "-".repeat(width).dimmed());
    println!("  {:<18} {}", "Turns:".dimmed(), result.turns_taken);
    println!("  {:<18} {}", "Tool calls:".dimmed(), result.tool_calls_made);
    println!("  {:<18} ~{}", "Prompt tokens:".dimmed(), result.tokens_used_estimate);
    if let Some(tokens) = result.provider_tokens {
        println!("  {:<18} {}", "Provider tokens:".dimmed(), tokens);
    }
    if result.compactions > 0 {
        println!(
            "  {:<18} {} (context now ~{} tokens)",
            "Compactions:".dimmed(),
            result.compactions.to_string().yellow(),
            result.context_tokens
        );
    }
    println!("  {:<18} {:.1}s", "Duration:".dimmed(), result.duration_ms as f64 / 1000.0);

    let status = if result.succeeded {
        "✓ Completed".green().bold()
    } else {
        "✗ Failed".red().bold()
    };
    println!("  {:<18} {}", "Status:".dimmed(), status);
    println!();
}
