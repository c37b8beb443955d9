//! Full analysis against mocked OpenAI and GitHub HTTP APIs

use repo_analyst::config::Config;
use repo_analyst::telemetry::TelemetryCollector;
use repo_analyst::types::AnalysisType;
use repo_analyst::{AnalysisError, RepoAnalyzer};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.model.api_key = Some("sk-test".to_string());
    config.model.base_url = format!("{}/v1", server.uri());
    config.github.api_url = server.uri();
    config.github.token = Some("ghp_test".to_string());
    config.agent.retry_base_delay_ms = 1;
    config
}

async fn mount_model(server: &MockServer) {
    // Once a tool result is in the history, answer
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("\"role\":\"tool\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "demo is a small Rust CLI."}}],
            "usage": {"prompt_tokens": 400, "completion_tokens": 12, "total_tokens": 412}
        })))
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_meta",
                    "type": "function",
                    "function": {"name": "get_repository", "arguments": "{\"owner\":\"octo\",\"repo\":\"demo\"}"}
                }]
            }}],
            "usage": {"prompt_tokens": 300, "completion_tokens": 20, "total_tokens": 320}
        })))
        .with_priority(2)
        .mount(server)
        .await;
}

#[tokio::test]
async fn analyze_over_http() {
    let server = MockServer::start().await;
    mount_model(&server).await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/demo"))
        .and(header("authorization", "Bearer ghp_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "full_name": "octo/demo",
            "description": "Demo CLI",
            "language": "Rust",
            "stargazers_count": 42
        })))
        .expect(1)
        .mount(&server)
        .await;

    let collector = TelemetryCollector::new();
    let analyzer = RepoAnalyzer::from_config(&config(&server))
        .unwrap()
        .with_telemetry(Arc::new(collector.clone()));

    let result = analyzer
        .analyze(
            "https://github.com/octo/demo",
            AnalysisType::Summary,
            None,
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(result.succeeded, "{:?}", result.error_detail);
    assert_eq!(result.summary, "demo is a small Rust CLI.");
    assert_eq!(result.turns_taken, 2);
    assert_eq!(result.tool_calls_made, 1);
    assert_eq!(result.provider_tokens, Some(732));
    assert_eq!(collector.get_stats().tools_succeeded, 1);

    // The tool output reached the model correlated with its call
    let requests = server.received_requests().await.unwrap();
    let last_completion = requests
        .iter()
        .filter(|r| r.url.path() == "/v1/chat/completions")
        .last()
        .unwrap();
    let body: Value = serde_json::from_slice(&last_completion.body).unwrap();
    let messages = body["messages"].as_array().unwrap();
    let tool = messages.iter().find(|m| m["role"] == "tool").unwrap();
    assert_eq!(tool["tool_call_id"], "call_meta");
    assert!(tool["content"].as_str().unwrap().contains("Stars: 42"));
}

#[tokio::test]
async fn github_outage_fails_analysis_with_remote_failure() {
    let server = MockServer::start().await;
    mount_model(&server).await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/demo"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(3)
        .mount(&server)
        .await;

    let analyzer = RepoAnalyzer::from_config(&config(&server)).unwrap();
    let result = analyzer
        .analyze(
            "https://github.com/octo/demo",
            AnalysisType::Security,
            Some("focus on secrets"),
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!result.succeeded);
    assert_eq!(result.error_kind.as_deref(), Some("RemoteFailure"));
    assert!(result.summary.is_empty());
}

#[tokio::test]
async fn invalid_input_never_reaches_the_network() {
    let server = MockServer::start().await;
    let analyzer = RepoAnalyzer::from_config(&config(&server)).unwrap();

    let err = analyzer
        .analyze("https://gitlab.com/a/b", AnalysisType::Summary, None, None, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Validation(_)));

    let err = analyzer
        .analyze("https://github.com/a/b", AnalysisType::Custom, None, None, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Validation(_)));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[test]
fn missing_api_key_is_config_error() {
    let config = Config::default();
    assert!(matches!(RepoAnalyzer::from_config(&config), Err(AnalysisError::Config(_))));
}
