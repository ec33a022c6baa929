//! Tools exposing the knowledge structuring session protocol
//!
//! Five tools cover the session lifecycle: request a pending session for a
//! source document, commit a file plan, inspect windows of the source, write
//! batches of composed sections, and end the session. All of them share one
//! `SessionManager`.

use crate::errors::LibrarianError;
use crate::structuring::{SectionInput, SessionManager, MAX_SECTIONS_PER_CALL};
use crate::tools::{required_str, string_array, Tool, ToolMetadata};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

fn session_token_schema() -> Value {
    json!({
        "type": "string",
        "description": "The token for this session, provided in the prompt."
    })
}

pub struct StartPendingSessionTool {
    manager: Arc<SessionManager>,
}

impl StartPendingSessionTool {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Tool for StartPendingSessionTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "startKnowledgeStructuringSession".to_string(),
            description: "Fetches a source document and opens a pending structuring session for it. Returns instructions and a session token.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "documentName": {
                        "type": "string",
                        "description": "The name of the document to be structured. Determines the destination subtree."
                    },
                    "documentSource": {
                        "type": "string",
                        "description": "The source of the document. Only HTTP(S) URLs are supported."
                    }
                },
                "required": ["documentName", "documentSource"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String, LibrarianError> {
        let name = required_str(&arguments, "startKnowledgeStructuringSession", "documentName")?;
        let source = required_str(
            &arguments,
            "startKnowledgeStructuringSession",
            "documentSource",
        )?;
        self.manager.start_pending_session(name, source).await
    }
}

pub struct StartSessionTool {
    manager: Arc<SessionManager>,
}

impl StartSessionTool {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Tool for StartSessionTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "knowledgeStructuringSession.start".to_string(),
            description: "Commits the file plan for a pending session and activates it.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "sessionToken": session_token_schema(),
                    "sectionFilepaths": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "The files to be written in the session, as markdown filepaths."
                    }
                },
                "required": ["sessionToken", "sectionFilepaths"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String, LibrarianError> {
        let token = required_str(&arguments, "knowledgeStructuringSession.start", "sessionToken")?;
        let filepaths = string_array(&arguments, "sectionFilepaths");
        self.manager.start_session(token, &filepaths).await
    }
}

pub struct ShowSourceDocumentTool {
    manager: Arc<SessionManager>,
}

impl ShowSourceDocumentTool {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Tool for ShowSourceDocumentTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "knowledgeStructuringSession.showSourceDocument".to_string(),
            description: "Shows a window of the source document with line numbers.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "sessionToken": session_token_schema(),
                    "sourceDocumentRange": {
                        "type": "string",
                        "description": "The lines to show, like `L123` or `L123-L456`. Omit for the leading window."
                    }
                },
                "required": ["sessionToken"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String, LibrarianError> {
        let token = required_str(
            &arguments,
            "knowledgeStructuringSession.showSourceDocument",
            "sessionToken",
        )?;
        let range = arguments
            .get("sourceDocumentRange")
            .and_then(|v| v.as_str());
        self.manager.show_source_document(token, range).await
    }
}

pub struct WriteSectionsTool {
    manager: Arc<SessionManager>,
}

impl WriteSectionsTool {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Tool for WriteSectionsTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "knowledgeStructuringSession.writeSections".to_string(),
            description: "Writes a batch of planned section files, composing each from source line ranges (`@12`, `@12-34`) and literal lines.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "sessionToken": session_token_schema(),
                    "sections": {
                        "type": "array",
                        "maxItems": MAX_SECTIONS_PER_CALL,
                        "items": {
                            "type": "object",
                            "properties": {
                                "filepath": {
                                    "type": "string",
                                    "description": "A filepath from the session's plan."
                                },
                                "tags": {
                                    "type": "array",
                                    "items": { "type": "string" },
                                    "description": "Tags for the section, in lower-kebab-case."
                                },
                                "contentSpecifiers": {
                                    "type": "array",
                                    "items": { "type": "string" },
                                    "description": "Content parts: `@12` or `@12-34` copies source lines, anything else is a literal line (a leading `=` is stripped)."
                                }
                            },
                            "required": ["filepath", "contentSpecifiers"]
                        }
                    }
                },
                "required": ["sessionToken", "sections"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String, LibrarianError> {
        let token = required_str(
            &arguments,
            "knowledgeStructuringSession.writeSections",
            "sessionToken",
        )?;
        let sections: Vec<SectionInput> = arguments
            .get("sections")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| LibrarianError::ToolError {
                tool_name: "knowledgeStructuringSession.writeSections".to_string(),
                message: format!("Invalid 'sections' parameter: {}", e),
            })?
            .unwrap_or_default();
        self.manager.write_sections(token, &sections).await
    }
}

pub struct EndSessionTool {
    manager: Arc<SessionManager>,
}

impl EndSessionTool {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Tool for EndSessionTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "knowledgeStructuringSession.end".to_string(),
            description: "Ends a session once every planned file has been written.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "sessionToken": session_token_schema()
                },
                "required": ["sessionToken"]
            }),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<String, LibrarianError> {
        let token = required_str(&arguments, "knowledgeStructuringSession.end", "sessionToken")?;
        self.manager.end_session(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LibrarianConfig;
    use crate::store::DocumentStore;
    use crate::structuring::SourceFetcher;

    struct StubFetcher;

    #[async_trait]
    impl SourceFetcher for StubFetcher {
        async fn fetch(&self, _source: &str) -> Result<String, LibrarianError> {
            Ok("alpha\nbeta\ngamma".to_string())
        }
    }

    fn manager(dir: &std::path::Path) -> Arc<SessionManager> {
        Arc::new(SessionManager::new(
            LibrarianConfig::new(dir),
            Arc::new(DocumentStore::new(dir)),
            Arc::new(StubFetcher),
        ))
    }

    fn token_from(prompt: &str) -> String {
        let marker = "**Session Token:** `";
        let start = prompt.find(marker).unwrap() + marker.len();
        let end = prompt[start..].find('`').unwrap();
        prompt[start..start + end].to_string()
    }

    #[tokio::test]
    async fn test_session_tools_drive_full_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());

        let prompt = StartPendingSessionTool::new(manager.clone())
            .execute(json!({
                "documentName": "guide",
                "documentSource": "https://example.com/doc.md"
            }))
            .await
            .unwrap();
        let token = token_from(&prompt);

        let response = StartSessionTool::new(manager.clone())
            .execute(json!({
                "sessionToken": token,
                "sectionFilepaths": ["/guide/intro.md"]
            }))
            .await
            .unwrap();
        assert!(response.starts_with("Accepted."));

        let shown = ShowSourceDocumentTool::new(manager.clone())
            .execute(json!({
                "sessionToken": token,
                "sourceDocumentRange": "L2"
            }))
            .await
            .unwrap();
        assert!(shown.contains("2 | beta"));

        let response = WriteSectionsTool::new(manager.clone())
            .execute(json!({
                "sessionToken": token,
                "sections": [{
                    "filepath": "/guide/intro.md",
                    "tags": ["intro"],
                    "contentSpecifiers": ["@1-2"]
                }]
            }))
            .await
            .unwrap();
        assert!(response.contains("**Completed Files:**"));

        let response = EndSessionTool::new(manager.clone())
            .execute(json!({"sessionToken": token}))
            .await
            .unwrap();
        assert!(response.starts_with("OK. The session is finished."));
    }

    #[tokio::test]
    async fn test_missing_parameters_are_tool_errors() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());

        let err = StartSessionTool::new(manager.clone())
            .execute(json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, LibrarianError::ToolError { .. }));

        let err = WriteSectionsTool::new(manager)
            .execute(json!({"sessionToken": "tok", "sections": "nope"}))
            .await
            .unwrap_err();
        assert!(matches!(err, LibrarianError::ToolError { .. }));
    }
}
