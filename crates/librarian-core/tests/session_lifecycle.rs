//! End-to-end exercise of a knowledge structuring session through the MCP
//! request surface: pending session, plan commitment, source inspection,
//! section writes, and teardown, with the document index picking up the
//! written files.

use async_trait::async_trait;
use librarian_core::errors::LibrarianError;
use librarian_core::mcp::protocol::{JsonRpcRequest, JSONRPC_VERSION};
use librarian_core::mcp::McpServer;
use librarian_core::structuring::{SessionManager, SourceFetcher};
use librarian_core::tools::documents::{GetDocumentTool, ListDocumentsTool};
use librarian_core::tools::structuring::{
    EndSessionTool, ShowSourceDocumentTool, StartPendingSessionTool, StartSessionTool,
    WriteSectionsTool,
};
use librarian_core::{DocumentStore, LibrarianConfig, ToolRegistry};
use serde_json::{json, Value};
use std::sync::Arc;

struct StubFetcher {
    body: &'static str,
}

#[async_trait]
impl SourceFetcher for StubFetcher {
    async fn fetch(&self, source: &str) -> Result<String, LibrarianError> {
        if !source.starts_with("http://") && !source.starts_with("https://") {
            return Err(LibrarianError::UnsupportedSourceFormat);
        }
        Ok(self.body.trim().to_string())
    }
}

const SOURCE: &str = "\
# Guide

Intro paragraph one.
Intro paragraph two.

## Usage

Run the thing.
Check the output.";

fn build_server(docs_root: &std::path::Path) -> McpServer {
    let store = Arc::new(DocumentStore::new(docs_root));
    let manager = Arc::new(SessionManager::new(
        LibrarianConfig::new(docs_root),
        store.clone(),
        Arc::new(StubFetcher { body: SOURCE }),
    ));

    let mut registry = ToolRegistry::new();
    registry
        .register_tool(Arc::new(ListDocumentsTool::new(store.clone())))
        .unwrap();
    registry
        .register_tool(Arc::new(GetDocumentTool::new(store)))
        .unwrap();
    registry
        .register_tool(Arc::new(StartPendingSessionTool::new(manager.clone())))
        .unwrap();
    registry
        .register_tool(Arc::new(StartSessionTool::new(manager.clone())))
        .unwrap();
    registry
        .register_tool(Arc::new(ShowSourceDocumentTool::new(manager.clone())))
        .unwrap();
    registry
        .register_tool(Arc::new(WriteSectionsTool::new(manager.clone())))
        .unwrap();
    registry
        .register_tool(Arc::new(EndSessionTool::new(manager)))
        .unwrap();

    McpServer::new(registry)
}

async fn call_tool(server: &McpServer, name: &str, arguments: Value) -> (String, bool) {
    let request = JsonRpcRequest {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id: Some(json!(1)),
        method: "tools/call".to_string(),
        params: Some(json!({ "name": name, "arguments": arguments })),
    };
    let response = server.handle_request(request).await.expect("a response");
    let result = response.result.expect("a tool result");
    let text = result["content"][0]["text"].as_str().unwrap().to_string();
    let is_error = result["isError"].as_bool().unwrap();
    (text, is_error)
}

fn token_from(prompt: &str) -> String {
    let marker = "**Session Token:** `";
    let start = prompt.find(marker).unwrap() + marker.len();
    let end = prompt[start..].find('`').unwrap();
    prompt[start..start + end].to_string()
}

#[tokio::test]
async fn test_full_structuring_session_over_mcp() {
    let dir = tempfile::tempdir().unwrap();
    let server = build_server(dir.path());

    // Open a pending session; the prompt carries the token and the numbered
    // source document.
    let (prompt, is_error) = call_tool(
        &server,
        "startKnowledgeStructuringSession",
        json!({
            "documentName": "guide",
            "documentSource": "https://example.com/guide.md"
        }),
    )
    .await;
    assert!(!is_error);
    assert!(prompt.contains("1 | # Guide"));
    let token = token_from(&prompt);

    // Writing before the plan is committed is a state error.
    let (text, is_error) = call_tool(
        &server,
        "knowledgeStructuringSession.writeSections",
        json!({
            "sessionToken": token,
            "sections": [{ "filepath": "/guide/intro.md", "contentSpecifiers": ["@1"] }]
        }),
    )
    .await;
    assert!(is_error);
    assert!(text.contains("has not been started"));

    // Commit the plan.
    let (text, is_error) = call_tool(
        &server,
        "knowledgeStructuringSession.start",
        json!({
            "sessionToken": token,
            "sectionFilepaths": ["/guide/intro.md", "/guide/usage.md"]
        }),
    )
    .await;
    assert!(!is_error);
    assert!(text.contains("- /guide/intro.md"));
    assert!(text.contains("- /guide/usage.md"));

    // Inspect a window; an identical immediate repeat is pushed back on.
    let (text, is_error) = call_tool(
        &server,
        "knowledgeStructuringSession.showSourceDocument",
        json!({ "sessionToken": token, "sourceDocumentRange": "L6-L9" }),
    )
    .await;
    assert!(!is_error);
    assert!(text.contains("6 | ## Usage"));

    let (text, is_error) = call_tool(
        &server,
        "knowledgeStructuringSession.showSourceDocument",
        json!({ "sessionToken": token, "sourceDocumentRange": "L6-L9" }),
    )
    .await;
    assert!(is_error);
    assert!(text.contains("already shown") || text.contains("already"));

    // Write the first section from a mix of extracted and literal lines.
    let (text, is_error) = call_tool(
        &server,
        "knowledgeStructuringSession.writeSections",
        json!({
            "sessionToken": token,
            "sections": [{
                "filepath": "/guide/intro.md",
                "tags": ["guide", "intro"],
                "contentSpecifiers": ["=# Intro", "@3-4"]
            }]
        }),
    )
    .await;
    assert!(!is_error);
    assert!(text.contains("**Remaining Files:**\n\n- /guide/usage.md"));

    // Ending early reports exactly what is missing.
    let (text, is_error) = call_tool(
        &server,
        "knowledgeStructuringSession.end",
        json!({ "sessionToken": token }),
    )
    .await;
    assert!(is_error);
    assert!(text.contains("**Remaining Files:**\n\n- /guide/usage.md"));
    assert!(text.contains("**Completed Files:**\n\n- /guide/intro.md"));

    // Finish the plan and end the session.
    let (_, is_error) = call_tool(
        &server,
        "knowledgeStructuringSession.writeSections",
        json!({
            "sessionToken": token,
            "sections": [{
                "filepath": "/guide/usage.md",
                "tags": ["guide", "usage"],
                "contentSpecifiers": ["@6-9"]
            }]
        }),
    )
    .await;
    assert!(!is_error);

    let (text, is_error) = call_tool(
        &server,
        "knowledgeStructuringSession.end",
        json!({ "sessionToken": token }),
    )
    .await;
    assert!(!is_error);
    assert!(text.starts_with("OK. The session is finished."));

    // The token is dead now.
    let (text, is_error) = call_tool(
        &server,
        "knowledgeStructuringSession.end",
        json!({ "sessionToken": token }),
    )
    .await;
    assert!(is_error);
    assert!(text.contains("does not exist"));

    // The written sections are on disk with frontmatter and visible through
    // the refreshed document index.
    let intro = std::fs::read_to_string(dir.path().join("guide/intro.md")).unwrap();
    assert!(intro.starts_with("---\ntags: [\"guide\", \"intro\"]\nsource: \"https://example.com/guide.md\"\n---\n\n"));
    assert!(intro.contains("# Intro\nIntro paragraph one.\nIntro paragraph two."));

    let (text, is_error) = call_tool(&server, "listDocuments", json!({"directory": "/guide/"})).await;
    assert!(!is_error);
    assert!(text.contains("- guide/intro.md"));
    assert!(text.contains("- guide/usage.md"));

    let (text, is_error) = call_tool(&server, "getDocument", json!({"filepath": "guide/usage.md"})).await;
    assert!(!is_error);
    assert!(text.contains("## Usage"));
}

#[tokio::test]
async fn test_oversized_batch_rejected_by_schema() {
    let dir = tempfile::tempdir().unwrap();
    let server = build_server(dir.path());

    let sections: Vec<Value> = (0..26)
        .map(|i| json!({ "filepath": format!("/guide/{}.md", i), "contentSpecifiers": ["@1"] }))
        .collect();
    let (text, is_error) = call_tool(
        &server,
        "knowledgeStructuringSession.writeSections",
        json!({ "sessionToken": "whatever", "sections": sections }),
    )
    .await;
    assert!(is_error);
    assert!(text.contains("Input validation failed") || text.contains("At most"));
}
