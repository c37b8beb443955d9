//! Analysis requests and repository references
//!
//! Caller input is validated here, before any workflow starts. Failures are
//! `Validation` errors and never reach the state machine.

use crate::errors::{AnalysisError, Result};
use crate::types::AnalysisType;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a caller-supplied prompt (characters)
pub const MAX_PROMPT_CHARS: usize = 10_000;

/// Maximum length of an owner or repository name
const MAX_NAME_LEN: usize = 39;

/// Branch assumed when the URL does not name one
const DEFAULT_BRANCH: &str = "main";

/// A GitHub repository parsed from its URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
    pub branch: String,
}

impl RepositoryRef {
    /// Parse `https://github.com/<owner>/<repo>[.git][/tree/<branch>]`
    pub fn parse(url: &str) -> Result<Self> {
        let trimmed = url.trim();
        let parsed = Url::parse(trimmed)
            .map_err(|e| AnalysisError::Validation(format!("invalid URL '{}': {}", trimmed, e)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AnalysisError::Validation(format!(
                "unsupported URL scheme '{}'",
                parsed.scheme()
            )));
        }

        match parsed.host_str() {
            Some("github.com") | Some("www.github.com") => {}
            other => {
                return Err(AnalysisError::Validation(format!(
                    "not a GitHub URL (host {})",
                    other.unwrap_or("missing")
                )));
            }
        }

        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let (owner, repo) = match segments.as_slice() {
            [owner, repo, ..] => (*owner, repo.strip_suffix(".git").unwrap_or(*repo)),
            _ => {
                return Err(AnalysisError::Validation(format!(
                    "URL '{}' does not name a repository (expected github.com/<owner>/<repo>)",
                    trimmed
                )));
            }
        };

        if !is_valid_owner(owner) {
            return Err(AnalysisError::Validation(format!("invalid repository owner '{}'", owner)));
        }
        if !is_valid_repo(repo) {
            return Err(AnalysisError::Validation(format!("invalid repository name '{}'", repo)));
        }

        let branch = match segments.as_slice() {
            [_, _, "tree", branch, ..] => branch.to_string(),
            _ => DEFAULT_BRANCH.to_string(),
        };

        Ok(Self {
            owner: owner.to_string(),
            name: repo.to_string(),
            branch,
        })
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Canonical web URL
    pub fn url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Alphanumerics and hyphens, not starting or ending with a hyphen
fn is_valid_owner(name: &str) -> bool {
    is_valid_name(name, |c| c.is_ascii_alphanumeric() || c == '-')
}

/// Owner rules plus `_` and `.`
fn is_valid_repo(name: &str) -> bool {
    is_valid_name(name, |c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && name != "."
        && name != ".."
}

fn is_valid_name(name: &str, allowed: impl Fn(char) -> bool) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name.chars().all(allowed)
}

/// Validated analysis request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub repository: RepositoryRef,
    pub analysis_type: AnalysisType,
    pub system_prompt: Option<String>,
    pub user_prompt: Option<String>,
}

impl AnalysisRequest {
    /// Validate caller input into a request
    ///
    /// Prompts are trimmed; blank prompts count as absent.
    pub fn new(
        url: &str,
        analysis_type: AnalysisType,
        system_prompt: Option<&str>,
        user_prompt: Option<&str>,
    ) -> Result<Self> {
        let repository = RepositoryRef::parse(url)?;
        let system_prompt = clean_prompt("system prompt", system_prompt)?;
        let user_prompt = clean_prompt("user prompt", user_prompt)?;

        if analysis_type == AnalysisType::Custom && system_prompt.is_none() && user_prompt.is_none() {
            return Err(AnalysisError::Validation(
                "custom analysis requires a system prompt or a user prompt".to_string(),
            ));
        }

        Ok(Self {
            repository,
            analysis_type,
            system_prompt,
            user_prompt,
        })
    }

    /// Initial system message content
    pub fn system_message(&self) -> String {
        self.analysis_type
            .system_prompt(&self.repository.full_name(), self.system_prompt.as_deref())
    }

    /// Initial user message content
    pub fn user_message(&self) -> String {
        let target = format!(
            "{} (owner '{}', repo '{}', branch '{}')",
            self.repository.url(),
            self.repository.owner,
            self.repository.name,
            self.repository.branch
        );

        match &self.user_prompt {
            Some(prompt) => format!("Repository: {}\n\n{}", target, prompt),
            None => self.analysis_type.default_request(&target),
        }
    }
}

fn clean_prompt(label: &str, prompt: Option<&str>) -> Result<Option<String>> {
    let Some(prompt) = prompt.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(None);
    };

    let length = prompt.chars().count();
    if length > MAX_PROMPT_CHARS {
        return Err(AnalysisError::Validation(format!(
            "{} is too long ({} characters, maximum {})",
            label, length, MAX_PROMPT_CHARS
        )));
    }

    Ok(Some(prompt.to_string()))
}
