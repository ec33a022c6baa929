//! Tools for listing, searching, and retrieving knowledge-base documents

use crate::errors::LibrarianError;
use crate::store::{format, DocumentStore, SearchMode};
use crate::tools::{required_str, string_array, Tool, ToolMetadata};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

fn depth_arg(arguments: &Value) -> Option<usize> {
    arguments
        .get("depth")
        .and_then(|v| v.as_u64())
        .map(|depth| depth as usize)
}

fn directory_arg(arguments: &Value) -> &str {
    arguments
        .get("directory")
        .and_then(|v| v.as_str())
        .unwrap_or("/")
}

pub struct ListDocumentsTool {
    store: Arc<DocumentStore>,
}

impl ListDocumentsTool {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListDocumentsTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "listDocuments".to_string(),
            description: "Lists markdown documents in the knowledge base, optionally filtered by directory, tags, and depth.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "directory": {
                        "type": "string",
                        "description": "Directory to list, e.g. `/rust/`. Defaults to the root."
                    },
                    "tags": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Keep only documents carrying any of these tags."
                    },
                    "depth": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Maximum number of path segments below the directory."
                    }
                }
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String, LibrarianError> {
        let directory = directory_arg(&arguments);
        let tags = string_array(&arguments, "tags");
        let documents = self
            .store
            .filter(directory, &tags, depth_arg(&arguments))
            .await;
        let listed: Vec<_> = documents.iter().map(|doc| doc.without_contents()).collect();
        Ok(format::format_document_list(&listed))
    }
}

pub struct SearchDocumentsTool {
    store: Arc<DocumentStore>,
}

impl SearchDocumentsTool {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for SearchDocumentsTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "searchDocuments".to_string(),
            description: "Searches document contents by string or regex query, optionally scoped to a directory and tags.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The text or pattern to search for."
                    },
                    "directory": {
                        "type": "string",
                        "description": "Directory to search within. Defaults to the root."
                    },
                    "tags": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Keep only documents carrying any of these tags."
                    },
                    "mode": {
                        "type": "string",
                        "enum": ["string", "regex"],
                        "description": "How to interpret the query. Defaults to `string`."
                    },
                    "caseSensitive": {
                        "type": "boolean",
                        "description": "Match case-sensitively. Defaults to false."
                    },
                    "includeContents": {
                        "type": "boolean",
                        "description": "Include full document contents in the results."
                    },
                    "depth": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Maximum number of path segments below the directory."
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String, LibrarianError> {
        let query = required_str(&arguments, "searchDocuments", "query")?;
        let directory = directory_arg(&arguments);
        let tags = string_array(&arguments, "tags");
        let mode = match arguments.get("mode").and_then(|v| v.as_str()) {
            Some("regex") => SearchMode::Regex,
            _ => SearchMode::Literal,
        };
        let case_sensitive = arguments
            .get("caseSensitive")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let include_contents = arguments
            .get("includeContents")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let documents = self
            .store
            .search(
                query,
                directory,
                &tags,
                mode,
                case_sensitive,
                include_contents,
                depth_arg(&arguments),
            )
            .await;

        if include_contents {
            Ok(format::format_document_list_with_contents(&documents))
        } else {
            Ok(format::format_document_list(&documents))
        }
    }
}

pub struct GetDocumentTool {
    store: Arc<DocumentStore>,
}

impl GetDocumentTool {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetDocumentTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "getDocument".to_string(),
            description: "Retrieves one markdown document with its tags and contents.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "filepath": {
                        "type": "string",
                        "description": "Path of the document relative to the docs root."
                    }
                },
                "required": ["filepath"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String, LibrarianError> {
        let filepath = required_str(&arguments, "getDocument", "filepath")?;
        let document = self
            .store
            .get(filepath)
            .await
            .ok_or_else(|| LibrarianError::DocumentNotFound(filepath.to_string()))?;
        Ok(format::format_document(&document))
    }
}

pub struct ListTagsTool {
    store: Arc<DocumentStore>,
}

impl ListTagsTool {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListTagsTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "listTags".to_string(),
            description: "Lists tags used within a directory with usage counts, sorted by count.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "directory": {
                        "type": "string",
                        "description": "Directory to inspect. Defaults to the root."
                    },
                    "includeFilepaths": {
                        "type": "boolean",
                        "description": "Include the filepaths carrying each tag."
                    },
                    "depth": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Maximum number of path segments below the directory."
                    }
                }
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String, LibrarianError> {
        let directory = directory_arg(&arguments);
        let include_filepaths = arguments
            .get("includeFilepaths")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let tags = self
            .store
            .tags_in_directory(directory, include_filepaths, depth_arg(&arguments))
            .await;
        Ok(format::format_tag_list(&tags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    async fn store_with_fixture() -> (tempfile::TempDir, Arc<DocumentStore>) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("rust")).unwrap();
        fs::write(
            dir.path().join("index.md"),
            "---\ntags: [\"kb\"]\n---\nWelcome",
        )
        .unwrap();
        fs::write(
            dir.path().join("rust/ownership.md"),
            "---\ntags: [\"memory\"]\n---\nOwnership rules",
        )
        .unwrap();

        let store = Arc::new(DocumentStore::new(dir.path()));
        store.reload().await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_list_documents_tool() {
        let (_dir, store) = store_with_fixture().await;
        let tool = ListDocumentsTool::new(store);

        let result = tool.execute(json!({})).await.unwrap();
        assert!(result.contains("- index.md"));
        assert!(result.contains("- rust/ownership.md"));
        assert!(result.contains("tags: kb, memory"));

        let result = tool.execute(json!({"tags": ["memory"]})).await.unwrap();
        assert!(!result.contains("- index.md"));
        assert!(result.contains("- rust/ownership.md"));
    }

    #[tokio::test]
    async fn test_search_documents_tool() {
        let (_dir, store) = store_with_fixture().await;
        let tool = SearchDocumentsTool::new(store);

        let result = tool.execute(json!({"query": "ownership"})).await.unwrap();
        assert!(result.contains("rust/ownership.md"));

        let result = tool
            .execute(json!({"query": "ownership", "caseSensitive": true}))
            .await
            .unwrap();
        assert_eq!(result, "No documents found.");
    }

    #[tokio::test]
    async fn test_get_document_tool() {
        let (_dir, store) = store_with_fixture().await;
        let tool = GetDocumentTool::new(store);

        let result = tool
            .execute(json!({"filepath": "rust/ownership.md"}))
            .await
            .unwrap();
        assert!(result.contains("Ownership rules"));

        let err = tool
            .execute(json!({"filepath": "missing.md"}))
            .await
            .unwrap_err();
        assert!(matches!(err, LibrarianError::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn test_list_tags_tool() {
        let (_dir, store) = store_with_fixture().await;
        let tool = ListTagsTool::new(store);

        let result = tool.execute(json!({})).await.unwrap();
        assert!(result.starts_with("- kb (2)"));

        let result = tool
            .execute(json!({"includeFilepaths": true}))
            .await
            .unwrap();
        assert!(result.contains("  - files:"));
    }
}
