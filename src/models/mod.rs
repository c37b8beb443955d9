//! Language model integration
//!
//! This module provides the model seam used by the workflow engine:
//! - [`ModelClient`]: one completion over the history plus tool schemas
//! - [`OpenAiClient`]: OpenAI-compatible chat completions over HTTP
//! - [`ModelSummarizer`]: adapter letting compaction use the model

pub mod openai;

pub use openai::{OpenAiClient, OpenAiConfig};

use crate::context::Summarizer;
use crate::errors::Result;
use crate::tools::ToolSchema;
use crate::types::{AssistantTurn, Message};
use async_trait::async_trait;

/// Instructions for condensing older conversation turns
pub const SUMMARY_PROMPT: &str = "Provide a concise but comprehensive summary of the following \
conversation about a GitHub repository analysis.
Include:
1. Key topics discussed
2. Important findings or insights
3. Technical details that must be preserved (file paths, names, versions)
4. Current context and state of the analysis

Keep the summary focused and preserve important technical information.";

/// A language model that answers or requests tools
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Complete one turn given the full history and the offered tools
    async fn complete(&self, history: &[Message], tools: &[ToolSchema]) -> Result<AssistantTurn>;

    /// Summarize a transcript with a tool-less completion
    async fn summarize(&self, transcript: &str) -> Result<String> {
        let history = [
            Message::system(SUMMARY_PROMPT),
            Message::user(format!("Conversation to summarize:\n{}\n\nSummary:", transcript)),
        ];
        let turn = self.complete(&history, &[]).await?;
        Ok(turn.content.unwrap_or_default())
    }
}

/// Uses a model client as the compaction summarizer
pub struct ModelSummarizer<'a> {
    model: &'a dyn ModelClient,
}

impl<'a> ModelSummarizer<'a> {
    pub fn new(model: &'a dyn ModelClient) -> Self {
        Self { model }
    }
}

#[async_trait]
impl<'a> Summarizer for ModelSummarizer<'a> {
    async fn summarize(&self, transcript: &str) -> Result<String> {
        self.model.summarize(transcript).await
    }
}
