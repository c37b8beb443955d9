//! GitHub REST gateway
//!
//! Implements the repository tools over the GitHub REST API. Responses are
//! rendered as compact text for the model and truncated to a byte cap.

use crate::errors::Result;
use crate::tools::gateway::ToolGateway;
use crate::tools::registry::{ToolRegistry, GET_FILE_CONTENT, GET_REPOSITORY, LIST_FILES, SEARCH_CODE};
use crate::tools::types::{ToolError, ToolOutcome, ToolResult, ToolSchema};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::debug;

/// Public GitHub API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";
const API_VERSION: &str = "2022-11-28";

/// Maximum search hits rendered
const MAX_SEARCH_RESULTS: usize = 30;

/// GitHub gateway configuration
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// API base URL
    pub api_url: String,

    /// Personal access token
    pub token: Option<String>,

    /// Per-request timeout
    pub timeout: Duration,

    /// Cap on text returned to the model
    pub max_output_bytes: usize,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(30),
            max_output_bytes: 65_536,
        }
    }
}

/// Tool gateway backed by the GitHub REST API
pub struct GitHubGateway {
    client: Client,
    config: GitHubConfig,
    registry: ToolRegistry,
}

impl GitHubGateway {
    /// Create gateway with its own HTTP client
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            config,
            registry: ToolRegistry::new(),
        })
    }

    async fn get_repository(&self, args: &Map<String, Value>) -> std::result::Result<String, ToolError> {
        let (owner, repo) = owner_and_repo(args)?;
        let url = self.url(&["repos", owner, repo], &[])?;
        let body: Value = self.get_json(url).await?;

        let mut lines = vec![format!("Repository: {}", text_field(&body, "full_name"))];
        for (label, key) in [
            ("Description", "description"),
            ("Default branch", "default_branch"),
            ("Language", "language"),
            ("Homepage", "homepage"),
            ("Stars", "stargazers_count"),
            ("Forks", "forks_count"),
            ("Open issues", "open_issues_count"),
            ("Created", "created_at"),
            ("Last push", "pushed_at"),
        ] {
            if let Some(value) = body.get(key).filter(|v| !v.is_null()) {
                lines.push(format!("{}: {}", label, plain(value)));
            }
        }
        if let Some(license) = body.pointer("/license/spdx_id").and_then(Value::as_str) {
            lines.push(format!("License: {}", license));
        }
        if let Some(topics) = body.get("topics").and_then(Value::as_array) {
            if !topics.is_empty() {
                let topics: Vec<String> = topics.iter().map(plain).collect();
                lines.push(format!("Topics: {}", topics.join(", ")));
            }
        }
        if body.get("archived").and_then(Value::as_bool) == Some(true) {
            lines.push("Archived: yes".to_string());
        }

        Ok(lines.join("\n"))
    }

    async fn list_files(&self, args: &Map<String, Value>) -> std::result::Result<String, ToolError> {
        let (owner, repo) = owner_and_repo(args)?;
        let path = optional_str(args, "path")?.unwrap_or("");
        let reference = optional_str(args, "ref")?;

        let url = self.contents_url(owner, repo, path, reference)?;
        let body: Value = self.get_json(url).await?;

        let entries = match &body {
            Value::Array(entries) => entries.clone(),
            other => vec![other.clone()],
        };

        let display_path = if path.is_empty() { "/" } else { path };
        let mut lines = vec![format!("{} entries in {}", entries.len(), display_path)];
        for entry in &entries {
            let name = text_field(entry, "path");
            match entry.get("type").and_then(Value::as_str) {
                Some("dir") => lines.push(format!("dir   {}/", name)),
                Some("file") => lines.push(format!(
                    "file  {} ({} bytes)",
                    name,
                    entry.get("size").and_then(Value::as_u64).unwrap_or(0)
                )),
                Some(kind) => lines.push(format!("{:<5} {}", kind, name)),
                None => lines.push(format!("?     {}", name)),
            }
        }

        Ok(lines.join("\n"))
    }

    async fn get_file_content(&self, args: &Map<String, Value>) -> std::result::Result<(String, usize), ToolError> {
        let (owner, repo) = owner_and_repo(args)?;
        let path = required_str(args, "path")?;
        let reference = optional_str(args, "ref")?;

        let url = self.contents_url(owner, repo, path, reference)?;
        let response = self.send(url, RAW_MEDIA_TYPE).await?;
        self.read_capped(response).await
    }

    /// Read at most one byte past the output cap; returns text and full size
    async fn read_capped(&self, mut response: reqwest::Response) -> std::result::Result<(String, usize), ToolError> {
        let cap = self.config.max_output_bytes;
        let declared = response.content_length().and_then(|n| usize::try_from(n).ok());

        let mut body: Vec<u8> = Vec::new();
        while body.len() <= cap {
            match response
                .chunk()
                .await
                .map_err(|e| map_transport_error(e, "reading file content"))?
            {
                Some(chunk) => body.extend_from_slice(&chunk),
                None => break,
            }
        }

        let total = declared.unwrap_or(0).max(body.len());
        Ok((String::from_utf8_lossy(&body).into_owned(), total))
    }

    async fn search_code(&self, args: &Map<String, Value>) -> std::result::Result<String, ToolError> {
        let (owner, repo) = owner_and_repo(args)?;
        let query = required_str(args, "query")?;

        let q = format!("{} repo:{}/{}", query, owner, repo);
        let per_page = MAX_SEARCH_RESULTS.to_string();
        let url = self.url(&["search", "code"], &[("q", q.as_str()), ("per_page", per_page.as_str())])?;
        let body: Value = self.get_json(url).await?;

        let total = body.get("total_count").and_then(Value::as_u64).unwrap_or(0);
        let items = body.get("items").and_then(Value::as_array).cloned().unwrap_or_default();

        let mut lines = vec![format!("{} matches for '{}'", total, query)];
        lines.extend(items.iter().map(|item| format!("- {}", text_field(item, "path"))));
        if total as usize > items.len() {
            lines.push(format!("({} more not shown)", total as usize - items.len()));
        }

        Ok(lines.join("\n"))
    }

    fn contents_url(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        reference: Option<&str>,
    ) -> std::result::Result<Url, ToolError> {
        let mut segments = vec!["repos", owner, repo, "contents"];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));

        let query: Vec<(&str, &str)> = reference.map(|r| vec![("ref", r)]).unwrap_or_default();
        self.url(&segments, &query)
    }

    fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> std::result::Result<Url, ToolError> {
        let mut url = Url::parse(&self.config.api_url)
            .map_err(|e| ToolError::remote_failure(format!("invalid API URL '{}': {}", self.config.api_url, e)))?;

        url.path_segments_mut()
            .map_err(|_| ToolError::remote_failure(format!("API URL '{}' cannot be a base", self.config.api_url)))?
            .pop_if_empty()
            .extend(segments);

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    async fn get_json(&self, url: Url) -> std::result::Result<Value, ToolError> {
        self.send(url, JSON_MEDIA_TYPE)
            .await?
            .json()
            .await
            .map_err(|e| map_transport_error(e, "decoding response"))
    }

    async fn send(&self, url: Url, accept: &str) -> std::result::Result<reqwest::Response, ToolError> {
        debug!(%url, "GitHub request");

        let mut request = self
            .client
            .get(url)
            .header(USER_AGENT, concat!("repo-analyst/", env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, accept)
            .header("X-GitHub-Api-Version", API_VERSION);

        if let Some(token) = &self.config.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_transport_error(e, "sending request"))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown status").to_string());

        Err(map_status(status, &detail))
    }

    fn truncate_output(&self, mut text: String, total: usize) -> String {
        let max = self.config.max_output_bytes;
        if text.len() <= max {
            return text;
        }

        let mut cut = max;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str(&format!("\n…[output truncated: showing {} of {} bytes]", cut, total));
        text
    }
}

#[async_trait]
impl ToolGateway for GitHubGateway {
    fn schemas(&self) -> Vec<ToolSchema> {
        self.registry.schemas()
    }

    async fn invoke(&self, name: &str, arguments: &Map<String, Value>) -> ToolOutcome {
        let start = Instant::now();

        let (content, total) = match name {
            GET_REPOSITORY => self.get_repository(arguments).await.map(with_len),
            LIST_FILES => self.list_files(arguments).await.map(with_len),
            GET_FILE_CONTENT => self.get_file_content(arguments).await,
            SEARCH_CODE => self.search_code(arguments).await.map(with_len),
            other => Err(ToolError::not_found(format!("unknown tool '{}'", other))),
        }?;

        Ok(ToolResult::success(name, self.truncate_output(content, total), start.elapsed()))
    }
}

fn with_len(text: String) -> (String, usize) {
    let len = text.len();
    (text, len)
}

fn map_status(status: StatusCode, detail: &str) -> ToolError {
    match status {
        StatusCode::NOT_FOUND => ToolError::not_found(format!("{} ({})", detail, status)),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ToolError::invalid_arguments(format!("{} ({})", detail, status))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ToolError::unauthorized(format!("{} ({})", detail, status))
        }
        _ => ToolError::remote_failure(format!("{} ({})", detail, status)),
    }
}

fn map_transport_error(error: reqwest::Error, context: &str) -> ToolError {
    if error.is_timeout() {
        ToolError::timeout(format!("{}: {}", context, error))
    } else {
        ToolError::remote_failure(format!("{}: {}", context, error))
    }
}

fn owner_and_repo(args: &Map<String, Value>) -> std::result::Result<(&str, &str), ToolError> {
    Ok((required_str(args, "owner")?, required_str(args, "repo")?))
}

fn required_str<'a>(args: &'a Map<String, Value>, key: &str) -> std::result::Result<&'a str, ToolError> {
    match optional_str(args, key)? {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ToolError::invalid_arguments(format!("missing required argument '{}'", key))),
    }
}

fn optional_str<'a>(args: &'a Map<String, Value>, key: &str) -> std::result::Result<Option<&'a str>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(ToolError::invalid_arguments(format!(
            "argument '{}' must be a string, got {}",
            key, other
        ))),
    }
}

fn text_field(value: &Value, key: &str) -> String {
    value.get(key).map(plain).unwrap_or_default()
}

/// Strings without quotes, everything else as JSON
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
