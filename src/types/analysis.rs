//! Analysis types and their system-prompt templates
//!
//! Each analysis type maps to exactly one template. New types are added by
//! extending the enum and [`AnalysisType::focus`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of report requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Summary,
    Security,
    CodeReview,
    Documentation,
    Dependencies,
    Custom,
}

impl AnalysisType {
    /// All analysis types in display order
    pub fn all() -> [AnalysisType; 6] {
        [
            AnalysisType::Summary,
            AnalysisType::Security,
            AnalysisType::CodeReview,
            AnalysisType::Documentation,
            AnalysisType::Dependencies,
            AnalysisType::Custom,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::Summary => "summary",
            AnalysisType::Security => "security",
            AnalysisType::CodeReview => "code_review",
            AnalysisType::Documentation => "documentation",
            AnalysisType::Dependencies => "dependencies",
            AnalysisType::Custom => "custom",
        }
    }

    /// Type-specific instructions appended to the base system prompt
    pub fn focus(&self) -> &'static str {
        match self {
            AnalysisType::Summary => {
                "Produce a concise overview: purpose of the project, main components, \
                 primary languages and frameworks, and how the pieces fit together."
            }
            AnalysisType::Security => {
                "Look for security weaknesses: hard-coded secrets, unsafe input handling, \
                 injection risks, insecure defaults, and risky dependency usage. \
                 Rank findings by severity."
            }
            AnalysisType::CodeReview => {
                "Review code quality: structure, error handling, naming, test coverage, \
                 and maintainability. Cite files and give concrete recommendations."
            }
            AnalysisType::Documentation => {
                "Assess the documentation: README completeness, setup instructions, API docs, \
                 and inline comments. Point out what is missing or outdated."
            }
            AnalysisType::Dependencies => {
                "Inventory the dependencies from manifest and lock files, note outdated or \
                 abandoned packages, licensing concerns, and unnecessary dependencies."
            }
            AnalysisType::Custom => "Follow the additional instructions exactly.",
        }
    }

    /// Build the system prompt for a repository
    pub fn system_prompt(&self, repository: &str, extra: Option<&str>) -> String {
        let mut prompt = format!(
            "You are an expert GitHub repository analyst. Your task is to analyze the \
             repository {repository} and produce a {kind} report.\n\n\
             Use the available tools to fetch repository metadata, list files, read file \
             contents and search code. Gather evidence before drawing conclusions and stop \
             calling tools once you have enough information.\n\n{focus}",
            kind = self.as_str(),
            focus = self.focus(),
        );

        if let Some(extra) = extra.filter(|s| !s.trim().is_empty()) {
            prompt.push_str("\n\nAdditional Instructions: ");
            prompt.push_str(extra.trim());
        }

        prompt
    }

    /// Default user request when the caller supplies none
    pub fn default_request(&self, repository: &str) -> String {
        format!(
            "Analyze the GitHub repository {} and write the {} report.",
            repository,
            self.as_str()
        )
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        AnalysisType::all()
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown analysis type '{}'", s))
    }
}
