//! Configuration for the Librarian server
//!
//! Resolution order for the documents root: explicit value (CLI flag) first,
//! then the `LIBRARIAN_DOCS_ROOT` environment variable, then `./docs`.

use crate::errors::LibrarianError;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DOCS_ROOT_ENV: &str = "LIBRARIAN_DOCS_ROOT";
const DEFAULT_DOCS_ROOT: &str = "./docs";

/// Pending sessions older than this are swept when a new one is requested.
pub const DEFAULT_PENDING_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct LibrarianConfig {
    /// Root directory holding the markdown knowledge base.
    pub docs_root: PathBuf,
    /// Idle lifetime of a pending session before it is evicted.
    pub pending_session_ttl: Duration,
}

impl LibrarianConfig {
    pub fn new(docs_root: impl Into<PathBuf>) -> Self {
        Self {
            docs_root: docs_root.into(),
            pending_session_ttl: DEFAULT_PENDING_SESSION_TTL,
        }
    }

    /// Resolve the configuration from an optional explicit docs root.
    pub fn resolve(docs_root: Option<&str>) -> Self {
        let root = docs_root
            .map(String::from)
            .or_else(|| env::var(DOCS_ROOT_ENV).ok())
            .unwrap_or_else(|| DEFAULT_DOCS_ROOT.to_string());
        Self::new(root)
    }

    /// Fail early when the docs root does not exist or is not a directory.
    pub fn check_docs_root(&self) -> Result<(), LibrarianError> {
        if !Path::new(&self.docs_root).is_dir() {
            return Err(LibrarianError::ConfigError(format!(
                "Docs root directory does not exist: {}",
                self.docs_root.display()
            )));
        }
        Ok(())
    }
}
