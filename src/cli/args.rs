//! Command-line argument parsing for repo-analyst
//!
//! Provides clap-based CLI with verbosity control. No URL starts the
//! interactive prompt; several URLs run one after another.

use crate::types::AnalysisType;
use clap::Parser;
use std::path::PathBuf;

/// repo-analyst - Analyze GitHub repositories with a tool-using language model
#[derive(Parser, Debug)]
#[command(name = "repo-analyst")]
#[command(version)]
#[command(about = "Analyze a GitHub repository with a tool-using language model", long_about = None)]
pub struct Args {
    /// Repository URLs, e.g. https://github.com/owner/repo (none: interactive)
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    /// Analysis type
    #[arg(short = 't', long = "type", default_value = "summary")]
    pub analysis_type: AnalysisType,

    /// Extra instructions appended to the system prompt
    #[arg(short, long)]
    pub system_prompt: Option<String>,

    /// Replace the default request with your own question
    #[arg(short, long)]
    pub user_prompt: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the configured iteration limit
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// List analysis types and exit
    #[arg(long)]
    pub list_types: bool,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress everything except the final report)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Prompt for requests instead of taking them from the command line
    pub fn is_interactive(&self) -> bool {
        self.urls.is_empty() && !self.list_types
    }

    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Verbosity {
    /// Log filter forced by the flags, if any
    pub fn log_filter(&self) -> Option<&'static str> {
        match self {
            Verbosity::Quiet => Some("error"),
            Verbosity::Normal => None,
            Verbosity::Verbose => Some("repo_analyst=debug,info"),
            Verbosity::VeryVerbose => Some("repo_analyst=trace,debug"),
        }
    }

    /// Check if should show the spinner
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["repo-analyst", "https://github.com/a/b"]).unwrap();
        assert_eq!(args.urls, vec!["https://github.com/a/b"]);
        assert!(!args.is_interactive());
        assert_eq!(args.analysis_type, AnalysisType::Summary);
        assert_eq!(args.verbosity(), Verbosity::Normal);
        assert!(!args.json);
    }

    #[test]
    fn test_full_flags() {
        let args = Args::try_parse_from([
            "repo-analyst",
            "https://github.com/a/b",
            "-t",
            "code-review",
            "-s",
            "be brief",
            "--max-iterations",
            "4",
            "--json",
            "-vv",
        ])
        .unwrap();

        assert_eq!(args.analysis_type, AnalysisType::CodeReview);
        assert_eq!(args.system_prompt.as_deref(), Some("be brief"));
        assert_eq!(args.max_iterations, Some(4));
        assert_eq!(args.verbosity(), Verbosity::VeryVerbose);
        assert_eq!(args.verbosity().log_filter(), Some("repo_analyst=trace,debug"));
    }

    #[test]
    fn test_no_url_is_interactive() {
        let args = Args::try_parse_from(["repo-analyst"]).unwrap();
        assert!(args.urls.is_empty());
        assert!(args.is_interactive());

        let args = Args::try_parse_from(["repo-analyst", "-t", "security"]).unwrap();
        assert!(args.is_interactive());
        assert_eq!(args.analysis_type, AnalysisType::Security);

        let args = Args::try_parse_from(["repo-analyst", "--list-types"]).unwrap();
        assert!(!args.is_interactive());
    }

    #[test]
    fn test_several_urls_in_order() {
        let args = Args::try_parse_from([
            "repo-analyst",
            "https://github.com/a/one",
            "https://github.com/b/two",
            "https://github.com/c/three",
            "-t",
            "dependencies",
            "--json",
        ])
        .unwrap();

        assert_eq!(
            args.urls,
            vec!["https://github.com/a/one", "https://github.com/b/two", "https://github.com/c/three"]
        );
        assert_eq!(args.analysis_type, AnalysisType::Dependencies);
        assert!(args.json);
        assert!(!args.is_interactive());
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(Args::try_parse_from(["repo-analyst", "https://github.com/a/b", "-t", "vibes"]).is_err());
    }

    #[test]
    fn test_quiet() {
        let args = Args::try_parse_from(["repo-analyst", "-q", "https://github.com/a/b"]).unwrap();
        assert_eq!(args.verbosity(), Verbosity::Quiet);
        assert!(!args.verbosity().show_progress());
    }
}
