//! OpenAI chat-completions client with function calling

use crate::errors::{AnalysisError, Result};
use crate::models::ModelClient;
use crate::tools::ToolSchema;
use crate::types::{AssistantTurn, Message, Role, TokenUsage, ToolCall, SUMMARY_PREFIX};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Default API base (without `/chat/completions`)
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model name
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Client configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.1,
            max_tokens: None,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Model client for OpenAI-compatible endpoints
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn request_body(&self, history: &[Message], tools: &[ToolSchema]) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": serialize_messages(history),
            "temperature": self.config.temperature,
        });

        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.iter().map(ToolSchema::to_function_json).collect());
            body["tool_choice"] = json!("auto");
        }
        if let Some(max_tokens) = self.config.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        body
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn complete(&self, history: &[Message], tools: &[ToolSchema]) -> Result<AssistantTurn> {
        debug!(
            model = %self.config.model,
            messages = history.len(),
            tools = tools.len(),
            "requesting completion"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(history, tools))
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AnalysisError::ModelApi(format!("{} returned {}: {}", self.endpoint, status, text)));
        }

        let body: CompletionResponse = response.json().await.map_err(|e| self.map_transport_error(e))?;
        parse_completion(body)
    }
}

impl OpenAiClient {
    fn map_transport_error(&self, error: reqwest::Error) -> AnalysisError {
        if error.is_timeout() {
            AnalysisError::Timeout {
                duration_ms: self.config.timeout.as_millis() as u64,
            }
        } else {
            AnalysisError::ModelApi(error.to_string())
        }
    }
}

/// Convert history to the chat-completions message array
pub fn serialize_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| match m.role {
            Role::System => json!({"role": "system", "content": m.content}),
            Role::User => json!({"role": "user", "content": m.content}),
            Role::Summary => json!({
                "role": "system",
                "content": format!("{} {}", SUMMARY_PREFIX, m.content),
            }),
            Role::ToolResult => json!({
                "role": "tool",
                "tool_call_id": m.tool_call_id,
                "content": m.content,
            }),
            Role::Assistant if m.has_tool_calls() => {
                let calls: Vec<Value> = m
                    .tool_calls
                    .iter()
                    .map(|c| {
                        json!({
                            "id": c.id,
                            "type": "function",
                            "function": {
                                "name": c.name,
                                "arguments": Value::Object(c.arguments.clone()).to_string(),
                            }
                        })
                    })
                    .collect();
                // Content must be null on tool-call-only assistant messages
                let content = if m.content.is_empty() {
                    Value::Null
                } else {
                    json!(m.content)
                };
                json!({"role": "assistant", "content": content, "tool_calls": calls})
            }
            Role::Assistant => json!({"role": "assistant", "content": m.content}),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ResponseToolCall>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    #[serde(default)]
    id: String,
    function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ResponseFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn parse_completion(body: CompletionResponse) -> Result<AssistantTurn> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AnalysisError::ModelApi("completion contained no choices".to_string()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|call| ToolCall::new(call.id, &call.function.name, parse_arguments(&call.function.name, &call.function.arguments)))
        .collect();

    Ok(AssistantTurn {
        content: choice.message.content,
        tool_calls,
        usage: body.usage,
    })
}

/// Decode JSON-encoded arguments; anything else becomes an empty map
fn parse_arguments(tool: &str, raw: &str) -> Map<String, Value> {
    if raw.trim().is_empty() {
        return Map::new();
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            warn!(tool, arguments = %other, "tool arguments are not an object");
            Map::new()
        }
        Err(e) => {
            warn!(tool, error = %e, "undecodable tool arguments");
            Map::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRegistry;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenAiClient {
        OpenAiClient::new(OpenAiConfig {
            api_key: "sk-test".to_string(),
            base_url: format!("{}/v1", server.uri()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_serialize_roles() {
        let mut args = Map::new();
        args.insert("owner".to_string(), json!("octocat"));
        let history = vec![
            Message::system("sys"),
            Message::summary("earlier work"),
            Message::user("go"),
            Message::assistant_with_tool_calls("", vec![ToolCall::new("c1", "get_repository", args)]),
            Message::tool_result("c1", "Repository: octocat/hello"),
        ];

        let json = serialize_messages(&history);

        assert_eq!(json[1]["role"], "system");
        assert_eq!(json[1]["content"], "Previous conversation summary: earlier work");
        assert!(json[3]["content"].is_null());
        assert_eq!(json[3]["tool_calls"][0]["function"]["arguments"], "{\"owner\":\"octocat\"}");
        assert_eq!(json[4]["role"], "tool");
        assert_eq!(json[4]["tool_call_id"], "c1");
    }

    #[test]
    fn test_parse_arguments_fallbacks() {
        assert!(parse_arguments("t", "").is_empty());
        assert!(parse_arguments("t", "not json").is_empty());
        assert!(parse_arguments("t", "[1,2]").is_empty());
        assert_eq!(parse_arguments("t", r#"{"path":"src"}"#)["path"], "src");
    }

    #[tokio::test]
    async fn test_complete_final_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "All good."}}],
                "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
            })))
            .mount(&server)
            .await;

        let turn = client(&server).complete(&[Message::system("s")], &[]).await.unwrap();

        assert_eq!(turn.content.as_deref(), Some("All good."));
        assert!(!turn.requests_tools());
        assert_eq!(turn.usage.unwrap().total_tokens, 13);
    }

    #[tokio::test]
    async fn test_complete_tool_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "call_a", "type": "function", "function": {"name": "list_files", "arguments": "{\"owner\":\"o\",\"repo\":\"r\"}"}},
                        {"id": "call_b", "type": "function", "function": {"name": "get_repository", "arguments": "{oops"}}
                    ]
                }}]
            })))
            .mount(&server)
            .await;

        let schemas = ToolRegistry::new().schemas();
        let turn = client(&server).complete(&[Message::system("s")], &schemas).await.unwrap();

        assert!(turn.content.is_none());
        assert_eq!(turn.tool_calls.len(), 2);
        assert_eq!(turn.tool_calls[0].id, "call_a");
        assert_eq!(turn.tool_calls[0].arguments["repo"], "r");
        assert!(turn.tool_calls[1].arguments.is_empty());

        let requests = server.received_requests().await.unwrap();
        let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(sent["tools"].as_array().unwrap().len(), 4);
        assert_eq!(sent["tools"][0]["type"], "function");
    }

    #[tokio::test]
    async fn test_http_error_maps_to_model_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = client(&server).complete(&[Message::system("s")], &[]).await.unwrap_err();
        assert!(matches!(err, AnalysisError::ModelApi(ref m) if m.contains("overloaded")));
        assert!(err.is_transient());
    }
}
