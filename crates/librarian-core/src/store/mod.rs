//! Markdown document store
//!
//! The store scans the docs root for markdown files, parses their
//! frontmatter, and serves list/search/get/tag queries from an in-memory
//! index. The session engine asks for a reload after every mutating
//! operation so newly structured sections become visible immediately.

pub mod format;
pub mod frontmatter;
pub mod index;

pub use index::{Document, DocumentIndex, SearchMode, TagInfo};

use crate::errors::LibrarianError;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use walkdir::WalkDir;

pub struct DocumentStore {
    docs_root: PathBuf,
    index: RwLock<DocumentIndex>,
}

impl DocumentStore {
    pub fn new(docs_root: impl Into<PathBuf>) -> Self {
        Self {
            docs_root: docs_root.into(),
            index: RwLock::new(DocumentIndex::default()),
        }
    }

    pub fn docs_root(&self) -> &Path {
        &self.docs_root
    }

    /// Rebuild the index from disk. Files that cannot be read are logged and
    /// skipped so one broken file does not hide the rest of the knowledge
    /// base.
    pub async fn reload(&self) -> Result<usize, LibrarianError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.docs_root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().and_then(|ext| ext.to_str()) != Some("md") {
                continue;
            }

            let relative = match entry.path().strip_prefix(&self.docs_root) {
                Ok(relative) => relative.to_string_lossy().replace('\\', "/"),
                Err(_) => continue,
            };

            match tokio::fs::read_to_string(entry.path()).await {
                Ok(raw) => files.push((relative, raw)),
                Err(err) => {
                    log::warn!("Skipping unreadable document {}: {}", relative, err);
                }
            }
        }

        let index = DocumentIndex::build(files);
        let count = index.len();
        *self.index.write().await = index;
        log::debug!("Document index reloaded: {} documents", count);
        Ok(count)
    }

    pub async fn filter(
        &self,
        directory: &str,
        tags: &[String],
        depth: Option<usize>,
    ) -> Vec<Document> {
        self.index.read().await.filter(directory, tags, depth)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn search(
        &self,
        query: &str,
        directory: &str,
        tags: &[String],
        mode: SearchMode,
        case_sensitive: bool,
        include_contents: bool,
        depth: Option<usize>,
    ) -> Vec<Document> {
        self.index.read().await.search(
            query,
            directory,
            tags,
            mode,
            case_sensitive,
            include_contents,
            depth,
        )
    }

    pub async fn get(&self, filepath: &str) -> Option<Document> {
        self.index.read().await.get(filepath).cloned()
    }

    pub async fn tags_in_directory(
        &self,
        directory: &str,
        include_filepaths: bool,
        depth: Option<usize>,
    ) -> Vec<TagInfo> {
        self.index
            .read()
            .await
            .tags_in_directory(directory, include_filepaths, depth)
    }

    /// Whether the given document name already has content under the docs
    /// root. Used to reject structuring sessions that would clobber an
    /// existing subtree.
    pub async fn document_has_content(&self, document_name: &str) -> bool {
        let dir = self.docs_root.join(document_name.trim_matches('/'));
        match tokio::fs::read_dir(&dir).await {
            Ok(mut entries) => matches!(entries.next_entry().await, Ok(Some(_))),
            Err(_) => false,
        }
    }
}
