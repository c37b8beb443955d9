//! Scripted in-memory collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use repo_analyst::errors::Result;
use repo_analyst::models::ModelClient;
use repo_analyst::tools::{ToolError, ToolGateway, ToolOutcome, ToolRegistry, ToolResult, ToolSchema};
use repo_analyst::types::{AssistantTurn, Message, Role, ToolCall};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Model that replays a script, then repeats a fallback turn
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<AssistantTurn>>>,
    fallback: AssistantTurn,
    histories: Mutex<Vec<Vec<Message>>>,
    summaries: AtomicUsize,
}

impl ScriptedModel {
    /// Replays `script`, then answers "Analysis complete."
    pub fn new(script: Vec<Result<AssistantTurn>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: AssistantTurn::answer("Analysis complete."),
            histories: Mutex::new(Vec::new()),
            summaries: AtomicUsize::new(0),
        }
    }

    /// Returns `turn` forever
    pub fn looping(turn: AssistantTurn) -> Self {
        Self {
            fallback: turn,
            ..Self::new(Vec::new())
        }
    }

    /// Number of `complete` calls
    pub fn calls(&self) -> usize {
        self.histories.lock().unwrap().len()
    }

    /// History passed to each `complete` call
    pub fn histories(&self) -> Vec<Vec<Message>> {
        self.histories.lock().unwrap().clone()
    }

    pub fn summaries(&self) -> usize {
        self.summaries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn complete(&self, history: &[Message], _tools: &[ToolSchema]) -> Result<AssistantTurn> {
        self.histories.lock().unwrap().push(history.to_vec());
        match self.script.lock().unwrap().pop_front() {
            Some(turn) => turn,
            None => Ok(self.fallback.clone()),
        }
    }

    async fn summarize(&self, _transcript: &str) -> Result<String> {
        self.summaries.fetch_add(1, Ordering::SeqCst);
        Ok("Summary: earlier turns listed the repository files.".to_string())
    }
}

/// Gateway answering from per-tool queues, else with a default output
///
/// Advertises no schemas unless built `with_registry`, so small budgets
/// are spent on the conversation alone.
pub struct ScriptedGateway {
    advertise: bool,
    queued: Mutex<HashMap<String, VecDeque<ToolOutcome>>>,
    always: Mutex<HashMap<String, ToolError>>,
    output_len: usize,
    invocations: Mutex<Vec<String>>,
    cancel_on_invoke: Mutex<Option<CancellationToken>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            advertise: false,
            queued: Mutex::new(HashMap::new()),
            always: Mutex::new(HashMap::new()),
            output_len: 0,
            invocations: Mutex::new(Vec::new()),
            cancel_on_invoke: Mutex::new(None),
        }
    }

    /// Advertise the repository tool schemas
    pub fn with_registry(mut self) -> Self {
        self.advertise = true;
        self
    }

    /// Pad default outputs to `len` characters
    pub fn with_output_len(mut self, len: usize) -> Self {
        self.output_len = len;
        self
    }

    /// Queue one outcome for `tool`
    pub fn queue(self, tool: &str, outcome: ToolOutcome) -> Self {
        self.queued
            .lock()
            .unwrap()
            .entry(tool.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    /// Fail every call to `tool`
    pub fn always_fail(self, tool: &str, error: ToolError) -> Self {
        self.always.lock().unwrap().insert(tool.to_string(), error);
        self
    }

    /// Cancel `token` during the first invocation
    pub fn cancel_on_invoke(self, token: CancellationToken) -> Self {
        *self.cancel_on_invoke.lock().unwrap() = Some(token);
        self
    }

    /// Tool names in invocation order (retries included)
    pub fn invocations(&self) -> Vec<String> {
        self.invocations.lock().unwrap().clone()
    }

    /// Default successful output for a tool
    pub fn output_for(&self, tool: &str) -> String {
        let base = format!("output of {}", tool);
        if base.len() >= self.output_len {
            base
        } else {
            format!("{}{}", base, ".".repeat(self.output_len - base.len()))
        }
    }
}

#[async_trait]
impl ToolGateway for ScriptedGateway {
    fn schemas(&self) -> Vec<ToolSchema> {
        if self.advertise {
            ToolRegistry::new().schemas()
        } else {
            Vec::new()
        }
    }

    async fn invoke(&self, name: &str, _arguments: &Map<String, Value>) -> ToolOutcome {
        self.invocations.lock().unwrap().push(name.to_string());

        if let Some(token) = self.cancel_on_invoke.lock().unwrap().take() {
            token.cancel();
        }

        if let Some(error) = self.always.lock().unwrap().get(name) {
            return Err(error.clone());
        }

        if let Some(outcome) = self.queued.lock().unwrap().get_mut(name).and_then(|q| q.pop_front()) {
            return outcome;
        }

        Ok(ToolResult::success(name, self.output_for(name), Duration::ZERO))
    }
}

pub fn call(id: &str, name: &str) -> ToolCall {
    let mut args = Map::new();
    args.insert("owner".to_string(), Value::String("octo".to_string()));
    args.insert("repo".to_string(), Value::String("demo".to_string()));
    ToolCall::new(id, name, args)
}

pub fn request_tools(calls: Vec<ToolCall>) -> Result<AssistantTurn> {
    Ok(AssistantTurn::tool_calls(calls))
}

/// Every tool result answers exactly one call of the nearest preceding
/// assistant message, and no call is left unanswered
pub fn assert_correlated(history: &[Message]) {
    let mut open: Option<(Vec<String>, HashSet<String>)> = None;

    for message in history {
        match message.role {
            Role::ToolResult => {
                let (calls, answered) = open.as_mut().expect("tool result without a preceding tool call");
                let id = message.tool_call_id.clone().expect("tool result without id");
                assert!(calls.contains(&id), "dangling tool result {}", id);
                assert!(answered.insert(id.clone()), "duplicate tool result {}", id);
            }
            _ => {
                if let Some((calls, answered)) = open.take() {
                    assert_eq!(calls.len(), answered.len(), "unanswered tool calls before {:?}", message.role);
                }
                if message.role == Role::Assistant && message.has_tool_calls() {
                    let ids: Vec<String> = message.tool_calls.iter().map(|c| c.id.clone()).collect();
                    let unique: HashSet<&String> = ids.iter().collect();
                    assert_eq!(unique.len(), ids.len(), "duplicate call ids in one turn");
                    open = Some((ids, HashSet::new()));
                }
            }
        }
    }

    if let Some((calls, answered)) = open {
        assert_eq!(calls.len(), answered.len(), "unanswered tool calls at end of history");
    }
}
