//! Error types for failure handling across the Librarian server
//!
//! All failures in this crate funnel into a single error hierarchy so that the
//! tool layer can turn any of them into a human-readable error response for
//! the calling agent. Session and plan errors carry their fully formatted
//! message (including the current session status) so the agent can
//! self-correct without another round trip.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum LibrarianError {
    #[error("Unsupported source format. Only HTTP(S) URLs are supported.")]
    UnsupportedSourceFormat,
    #[error("Failed to fetch source document: {0}")]
    FetchFailure(String),
    #[error("Source document is empty.")]
    EmptySourceDocument,
    #[error("The document '{0}' already has content under the documents root. Choose a different document name.")]
    DocumentExists(String),
    #[error("{0}")]
    SessionState(String),
    #[error("{0}")]
    SectionPlan(String),
    #[error("{0}")]
    DuplicateRangeRequest(String),
    #[error("Document not found: {0}")]
    DocumentNotFound(String),
    #[error("Tool execution failed for '{tool_name}': {message}")]
    ToolError { tool_name: String, message: String },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Protocol error: {0}")]
    ProtocolError(String),
    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for LibrarianError {
    fn from(err: std::io::Error) -> Self {
        LibrarianError::IoError(err.to_string())
    }
}

impl From<reqwest::Error> for LibrarianError {
    fn from(err: reqwest::Error) -> Self {
        LibrarianError::FetchFailure(err.to_string())
    }
}
