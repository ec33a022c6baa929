//! Core library for the Librarian MCP server.
//!
//! Librarian serves a markdown knowledge base to AI agents and, through its
//! knowledge structuring sessions, lets an agent decompose a large source
//! document into a tree of tagged section files without ever holding raw
//! file-write primitives.
//!
//! The crate is organized around a few subsystems:
//!
//! - **Document store**: frontmatter-aware index of the docs root with
//!   tag inheritance, list/search/get/tag queries
//! - **Structuring sessions**: the pending → active → ended workflow that
//!   acquires a source document, validates a file plan, and composes section
//!   files from line ranges and literal insertions
//! - **Tool surface**: one schema-validated tool per protocol operation
//! - **MCP transport**: JSON-RPC 2.0 server over stdio

pub mod config;
pub mod errors;
pub mod mcp;
pub mod store;
pub mod structuring;
pub mod tools;

pub use config::LibrarianConfig;
pub use errors::LibrarianError;
pub use mcp::McpServer;
pub use store::DocumentStore;
pub use structuring::{HttpSourceFetcher, SessionManager};
pub use tools::ToolRegistry;

use std::sync::Arc;
use tools::documents::{GetDocumentTool, ListDocumentsTool, ListTagsTool, SearchDocumentsTool};
use tools::structuring::{
    EndSessionTool, ShowSourceDocumentTool, StartPendingSessionTool, StartSessionTool,
    WriteSectionsTool,
};

/// Build a fully wired MCP server for a docs root: loaded document index,
/// session manager with the HTTP fetcher, and every tool registered.
pub async fn create_server(config: LibrarianConfig) -> Result<McpServer, LibrarianError> {
    let store = Arc::new(DocumentStore::new(&config.docs_root));
    let loaded = store.reload().await?;
    log::info!(
        "Loaded {} documents from {}",
        loaded,
        config.docs_root.display()
    );

    let manager = Arc::new(SessionManager::new(
        config,
        store.clone(),
        Arc::new(HttpSourceFetcher::new()),
    ));

    let mut registry = ToolRegistry::new();
    registry.register_tool(Arc::new(ListDocumentsTool::new(store.clone())))?;
    registry.register_tool(Arc::new(SearchDocumentsTool::new(store.clone())))?;
    registry.register_tool(Arc::new(GetDocumentTool::new(store.clone())))?;
    registry.register_tool(Arc::new(ListTagsTool::new(store)))?;
    registry.register_tool(Arc::new(StartPendingSessionTool::new(manager.clone())))?;
    registry.register_tool(Arc::new(StartSessionTool::new(manager.clone())))?;
    registry.register_tool(Arc::new(ShowSourceDocumentTool::new(manager.clone())))?;
    registry.register_tool(Arc::new(WriteSectionsTool::new(manager.clone())))?;
    registry.register_tool(Arc::new(EndSessionTool::new(manager)))?;

    Ok(McpServer::new(registry))
}
