//! Configuration management for repo-analyst
//!
//! Provides TOML-based configuration with defaults, environment overrides
//! and validation.
//! Location: ~/.repo-analyst/config.toml

use crate::agent::EngineConfig;
use crate::context::{ContextBudget, DEFAULT_KEEP_LAST, DEFAULT_MAX_TOKENS, DEFAULT_SUMMARY_THRESHOLD};
use crate::errors::{AnalysisError, Result};
use crate::models::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::models::OpenAiConfig;
use crate::tools::github::DEFAULT_API_URL;
use crate::tools::{GitHubConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete configuration for repo-analyst
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub github: GitHubSettings,
    pub context: ContextConfig,
    pub agent: AgentConfig,
    pub logging: LoggingConfig,
}

/// Model provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// GitHub API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubSettings {
    pub api_url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
    pub max_output_bytes: usize,
}

/// Context window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub max_tokens: usize,
    pub summary_threshold: usize,
    pub keep_last: usize,
}

/// Workflow behavior configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_iterations: usize,
    pub max_tool_retries: u32,
    pub retry_base_delay_ms: u64,
    pub truncate_on_overflow: bool,
}

/// Log output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            api_key: None,
            timeout_secs: 120,
        }
    }
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout_secs: 30,
            max_output_bytes: 65_536,
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            summary_threshold: DEFAULT_SUMMARY_THRESHOLD,
            keep_last: DEFAULT_KEEP_LAST,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: crate::agent::DEFAULT_MAX_ITERATIONS,
            max_tool_retries: crate::tools::retry::DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: crate::tools::retry::DEFAULT_BASE_DELAY_MS,
            truncate_on_overflow: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from a file, the default location, or built-in defaults,
    /// then apply process environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_default()?,
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        toml::from_str(&contents)
            .map_err(|e| AnalysisError::Config(format!("Failed to parse config {}: {}", path.display(), e)))
    }

    /// Load from the standard location, or defaults when it does not exist
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => Ok(Config::default()),
        }
    }

    /// `~/.repo-analyst/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".repo-analyst").join("config.toml"))
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.model.model = model;
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.model.base_url = url;
        }
        if let Some(value) = get("OPENAI_TEMPERATURE") {
            self.model.temperature = parse_env("OPENAI_TEMPERATURE", &value)?;
        }
        if let Some(token) = get("GITHUB_PERSONAL_ACCESS_TOKEN") {
            self.github.token = Some(token);
        }
        if let Some(value) = get("MAX_CONTEXT_TOKENS") {
            self.context.max_tokens = parse_env("MAX_CONTEXT_TOKENS", &value)?;
        }
        if let Some(value) = get("SUMMARY_TOKEN_THRESHOLD") {
            self.context.summary_threshold = parse_env("SUMMARY_TOKEN_THRESHOLD", &value)?;
        }
        if let Some(value) = get("KEEP_LAST_MESSAGES") {
            self.context.keep_last = parse_env("KEEP_LAST_MESSAGES", &value)?;
        }
        if let Some(value) = get("MAX_ITERATIONS") {
            self.agent.max_iterations = parse_env("MAX_ITERATIONS", &value)?;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.logging.level = level.to_lowercase();
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.context.max_tokens == 0 {
            return Err(AnalysisError::Config(
                "context.max_tokens must be greater than 0".to_string(),
            ));
        }

        if self.context.summary_threshold == 0 || self.context.summary_threshold >= self.context.max_tokens {
            return Err(AnalysisError::Config(format!(
                "context.summary_threshold must be between 1 and {} (got {})",
                self.context.max_tokens - 1,
                self.context.summary_threshold
            )));
        }

        if self.context.keep_last == 0 {
            return Err(AnalysisError::Config(
                "context.keep_last must be at least 1".to_string(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(AnalysisError::Config(
                "agent.max_iterations must be at least 1".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(AnalysisError::Config(format!(
                "model.temperature must be between 0.0 and 2.0 (got {})",
                self.model.temperature
            )));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(AnalysisError::Config(format!("Invalid log level: {}", other)));
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| AnalysisError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AnalysisError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| AnalysisError::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Immutable budget injected into the engine
    pub fn context_budget(&self) -> Result<ContextBudget> {
        ContextBudget::new(
            self.context.max_tokens,
            self.context.summary_threshold,
            self.context.keep_last,
        )
    }

    pub fn openai_config(&self) -> Result<OpenAiConfig> {
        let api_key = self.model.api_key.clone().ok_or_else(|| {
            AnalysisError::Config("no model API key configured (set OPENAI_API_KEY)".to_string())
        })?;

        Ok(OpenAiConfig {
            api_key,
            model: self.model.model.clone(),
            base_url: self.model.base_url.clone(),
            temperature: self.model.temperature,
            max_tokens: None,
            timeout: Duration::from_secs(self.model.timeout_secs),
        })
    }

    pub fn github_config(&self) -> GitHubConfig {
        GitHubConfig {
            api_url: self.github.api_url.clone(),
            token: self.github.token.clone(),
            timeout: Duration::from_secs(self.github.timeout_secs),
            max_output_bytes: self.github.max_output_bytes,
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        let retry = RetryPolicy::new(self.agent.max_tool_retries, self.agent.retry_base_delay_ms);

        EngineConfig {
            max_iterations: self.agent.max_iterations,
            tool_retry: retry.clone(),
            model_retry: retry,
            truncate_on_overflow: self.agent.truncate_on_overflow,
        }
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| AnalysisError::Config(format!("Invalid value for {}: '{}' ({})", key, value, e)))
}
