//! Tool registry with JSON schemas
//!
//! Maintains the repository tools offered to the model.
//!
//! Tools:
//! - get_repository: Repository metadata
//! - list_files: Directory listing at a path
//! - get_file_content: File contents at a path
//! - search_code: Code search within the repository

use crate::tools::types::ToolSchema;
use serde_json::json;
use std::collections::BTreeMap;

pub const GET_REPOSITORY: &str = "get_repository";
pub const LIST_FILES: &str = "list_files";
pub const GET_FILE_CONTENT: &str = "get_file_content";
pub const SEARCH_CODE: &str = "search_code";

/// Tool registry
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    /// Map of tool name to schema, ordered by name
    tools: BTreeMap<String, ToolSchema>,
}

impl ToolRegistry {
    /// Registry with the repository tools
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register(ToolSchema::new(
            GET_REPOSITORY,
            "Get repository metadata: description, default branch, language, topics, stars, license",
            repo_params(json!({}), &[]),
        ));
        registry.register(ToolSchema::new(
            LIST_FILES,
            "List files and directories at a path in the repository",
            repo_params(
                json!({
                    "path": {
                        "type": "string",
                        "description": "Directory path relative to the repository root (empty for root)",
                        "default": ""
                    },
                    "ref": {
                        "type": "string",
                        "description": "Branch, tag or commit (default branch when omitted)"
                    }
                }),
                &[],
            ),
        ));
        registry.register(ToolSchema::new(
            GET_FILE_CONTENT,
            "Read the contents of a file in the repository",
            repo_params(
                json!({
                    "path": {
                        "type": "string",
                        "description": "File path relative to the repository root"
                    },
                    "ref": {
                        "type": "string",
                        "description": "Branch, tag or commit (default branch when omitted)"
                    }
                }),
                &["path"],
            ),
        ));
        registry.register(ToolSchema::new(
            SEARCH_CODE,
            "Search code in the repository",
            repo_params(
                json!({
                    "query": {
                        "type": "string",
                        "description": "Search terms"
                    }
                }),
                &["query"],
            ),
        ));

        registry
    }

    /// Registry without tools
    pub fn empty() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register or replace a tool schema
    pub fn register(&mut self, schema: ToolSchema) {
        self.tools.insert(schema.name.clone(), schema);
    }

    /// Get tool schema by name
    pub fn get(&self, name: &str) -> Option<&ToolSchema> {
        self.tools.get(name)
    }

    /// Check if tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool names
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Get all tool schemas
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().cloned().collect()
    }

    /// Get total number of tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Object schema with `owner` and `repo` plus tool-specific properties
fn repo_params(extra: serde_json::Value, required: &[&str]) -> serde_json::Value {
    let mut properties = serde_json::Map::new();
    properties.insert(
        "owner".to_string(),
        json!({"type": "string", "description": "Repository owner (user or organization)"}),
    );
    properties.insert(
        "repo".to_string(),
        json!({"type": "string", "description": "Repository name"}),
    );
    if let serde_json::Value::Object(extra) = extra {
        properties.extend(extra);
    }

    let mut all_required = vec!["owner", "repo"];
    all_required.extend_from_slice(required);

    json!({
        "type": "object",
        "properties": properties,
        "required": all_required
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_tools_registered() {
        let registry = ToolRegistry::new();

        assert_eq!(registry.len(), 4);
        assert!(registry.contains(GET_REPOSITORY));
        assert!(registry.contains(LIST_FILES));
        assert!(registry.contains(GET_FILE_CONTENT));
        assert!(registry.contains(SEARCH_CODE));
    }

    #[test]
    fn test_required_arguments() {
        let registry = ToolRegistry::new();

        let schema = registry.get(GET_FILE_CONTENT).unwrap();
        let required = schema.parameters["required"].as_array().unwrap();
        assert_eq!(required.len(), 3);
        assert!(required.iter().any(|v| v == "path"));

        let schema = registry.get(GET_REPOSITORY).unwrap();
        assert_eq!(schema.parameters["required"].as_array().unwrap().len(), 2);
        assert!(schema.parameters["properties"]["owner"].is_object());
    }

    #[test]
    fn test_names_are_sorted() {
        let names = ToolRegistry::new().tool_names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_nonexistent_tool() {
        let registry = ToolRegistry::new();

        assert!(!registry.contains("run_command"));
        assert!(registry.get("run_command").is_none());
        assert!(ToolRegistry::empty().is_empty());
    }
}
