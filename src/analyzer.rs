//! Repository analyzer
//!
//! Wires configuration to the concrete collaborators (OpenAI-compatible
//! model, GitHub gateway) and exposes a one-call analysis entry point.

use crate::agent::{AnalysisEngine, AnalysisResult};
use crate::config::Config;
use crate::errors::Result;
use crate::models::{ModelClient, OpenAiClient};
use crate::request::AnalysisRequest;
use crate::telemetry::TelemetrySink;
use crate::tools::{GitHubGateway, ToolGateway};
use crate::types::AnalysisType;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Configured analysis entry point
pub struct RepoAnalyzer {
    engine: AnalysisEngine,
}

impl RepoAnalyzer {
    /// Build from a validated configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let model: Arc<dyn ModelClient> = Arc::new(OpenAiClient::new(config.openai_config()?)?);
        let gateway: Arc<dyn ToolGateway> = Arc::new(GitHubGateway::new(config.github_config())?);

        debug!(
            model = %config.model.model,
            github = %config.github.api_url,
            authenticated = config.github.token.is_some(),
            "analyzer configured"
        );

        Self::with_collaborators(config, model, gateway)
    }

    /// Build with injected model and gateway
    pub fn with_collaborators(
        config: &Config,
        model: Arc<dyn ModelClient>,
        gateway: Arc<dyn ToolGateway>,
    ) -> Result<Self> {
        let engine = AnalysisEngine::new(model, gateway, config.context_budget()?, config.engine_config())?;
        Ok(Self { engine })
    }

    /// Replace the telemetry sink
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.engine = self.engine.with_telemetry(telemetry);
        self
    }

    pub fn engine(&self) -> &AnalysisEngine {
        &self.engine
    }

    /// Validate input and run one analysis to completion
    ///
    /// Invalid input is returned as a `Validation` error before any
    /// workflow starts; every other failure is a non-successful result.
    pub async fn analyze(
        &self,
        url: &str,
        analysis_type: AnalysisType,
        system_prompt: Option<&str>,
        user_prompt: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult> {
        let request = AnalysisRequest::new(url, analysis_type, system_prompt, user_prompt)?;
        self.engine.run(request, cancel).await
    }
}
