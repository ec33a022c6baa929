//! Knowledge structuring session manager
//!
//! A session walks an agent through breaking one large source document into
//! a tree of tagged markdown section files. The lifecycle is
//! pending → active → ended: a pending session holds the fetched source
//! until the agent commits to a file plan, an active session tracks which
//! planned files are still missing, and ending tears the session down once
//! the plan is fully realized.
//!
//! Calls are expected to arrive one at a time per token (the stdio transport
//! serializes requests); the internal mutex keeps the session maps coherent
//! but provides no finer-grained ordering than that.

use crate::config::LibrarianConfig;
use crate::errors::LibrarianError;
use crate::store::{frontmatter, DocumentStore};
use crate::structuring::compose::compose_content;
use crate::structuring::fetch::{source_document_to_lines, SourceFetcher};
use crate::structuring::format::{
    format_end_session_response, format_error_response, format_pending_session_prompt,
    format_session_start_response, format_source_window, format_write_sections_response,
    resolve_window,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Upper bound on section writes accepted in one call.
pub const MAX_SECTIONS_PER_CALL: usize = 25;

/// Session state before the agent has committed to a file plan.
#[derive(Debug, Clone)]
pub struct PendingSession {
    pub document_name: String,
    pub document_source: String,
    pub source_document: String,
    /// Display form: line-numbered, fixed gutter width.
    pub source_document_lines: Vec<String>,
    /// Composition form: bare lines, used only by the composer.
    pub source_document_raw_lines: Vec<String>,
    /// Last range string shown for this token; guards repeat requests.
    pub last_requested_range: String,
    pub created_at: DateTime<Utc>,
}

/// An active session: a pending session plus the committed file plan.
#[derive(Debug, Clone)]
pub struct Session {
    pub document: PendingSession,
    pub common_path_prefix: String,
    pub section_filepaths: Vec<String>,
    pub completed_filepaths: Vec<String>,
}

impl Session {
    /// Planned files not yet written. Derived so the partition invariant
    /// (remaining ∪ completed = plan) holds by construction.
    pub fn remaining_filepaths(&self) -> Vec<String> {
        self.section_filepaths
            .iter()
            .filter(|path| !self.completed_filepaths.contains(path))
            .cloned()
            .collect()
    }
}

/// One section in a write batch.
#[derive(Debug, Clone, Deserialize)]
pub struct SectionInput {
    pub filepath: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "contentSpecifiers")]
    pub content_specifiers: Vec<String>,
}

#[derive(Default)]
struct SessionStore {
    pending: HashMap<String, PendingSession>,
    active: HashMap<String, Session>,
}

impl SessionStore {
    /// The readable source for a token, whether the session is pending or
    /// already active.
    fn source_mut(&mut self, token: &str) -> Option<&mut PendingSession> {
        if self.active.contains_key(token) {
            return self.active.get_mut(token).map(|s| &mut s.document);
        }
        self.pending.get_mut(token)
    }
}

pub struct SessionManager {
    config: LibrarianConfig,
    store: Arc<DocumentStore>,
    fetcher: Arc<dyn SourceFetcher>,
    sessions: Mutex<SessionStore>,
}

impl SessionManager {
    pub fn new(
        config: LibrarianConfig,
        store: Arc<DocumentStore>,
        fetcher: Arc<dyn SourceFetcher>,
    ) -> Self {
        Self {
            config,
            store,
            fetcher,
            sessions: Mutex::new(SessionStore::default()),
        }
    }

    /// Fetch and index a source document, register a pending session for it,
    /// and return the instructional prompt carrying the session token.
    pub async fn start_pending_session(
        &self,
        document_name: &str,
        document_source: &str,
    ) -> Result<String, LibrarianError> {
        if self.store.document_has_content(document_name).await {
            return Err(LibrarianError::DocumentExists(document_name.to_string()));
        }

        // Acquire before touching session state, so a failed fetch leaves
        // nothing behind.
        let source_document = self.fetcher.fetch(document_source).await?;
        let source_document_lines = source_document_to_lines(&source_document);
        let source_document_raw_lines: Vec<String> =
            source_document.split('\n').map(String::from).collect();

        let token = Uuid::new_v4().to_string();
        let window = resolve_window(None, source_document_lines.len());
        let source_block = format_source_window(&source_document_lines, window);

        let mut sessions = self.sessions.lock().await;
        self.sweep_expired_pending(&mut sessions);
        sessions.pending.insert(
            token.clone(),
            PendingSession {
                document_name: document_name.to_string(),
                document_source: document_source.to_string(),
                source_document,
                source_document_lines,
                source_document_raw_lines,
                last_requested_range: String::new(),
                created_at: Utc::now(),
            },
        );
        log::info!(
            "Pending session {} created for document '{}'",
            token,
            document_name
        );

        Ok(format_pending_session_prompt(&token, &source_block))
    }

    /// Promote a pending session to active by committing a file plan. The
    /// plan is validated as a unit; a rejected plan leaves the pending
    /// session untouched so the agent can retry with a corrected one.
    pub async fn start_session(
        &self,
        token: &str,
        section_filepaths: &[String],
    ) -> Result<String, LibrarianError> {
        let mut sessions = self.sessions.lock().await;

        if sessions.active.contains_key(token) {
            return Err(LibrarianError::SessionState(
                "Error. Session already started.".to_string(),
            ));
        }
        if !sessions.pending.contains_key(token) {
            return Err(LibrarianError::SessionState(
                "Error. No pending session found with this token.".to_string(),
            ));
        }

        if section_filepaths.is_empty() {
            return Err(LibrarianError::SectionPlan(
                "Error. The section plan is empty. Provide at least one filepath.".to_string(),
            ));
        }

        let invalid: Vec<&String> = section_filepaths
            .iter()
            .filter(|path| !is_valid_section_filepath(path))
            .collect();
        if !invalid.is_empty() {
            let listed = invalid
                .iter()
                .map(|path| format!("- {}", path))
                .collect::<Vec<_>>()
                .join("\n");
            return Err(LibrarianError::SectionPlan(format!(
                "Error. The following filepaths are invalid:\n{}\n\nAll files must end with .md and no path segment may start or end with a dot.",
                listed
            )));
        }

        // The plan is good; consuming the pending record is now safe.
        let Some(pending) = sessions.pending.remove(token) else {
            return Err(LibrarianError::SessionState(
                "Error. No pending session found with this token.".to_string(),
            ));
        };

        let normalized: Vec<String> = section_filepaths
            .iter()
            .map(|path| normalize_path(path))
            .collect();
        let common_path_prefix = common_path_prefix(&normalized);

        let window = resolve_window(None, pending.source_document_lines.len());
        let source_block = format_source_window(&pending.source_document_lines, window);

        let session = Session {
            document: pending,
            common_path_prefix,
            section_filepaths: normalized.clone(),
            completed_filepaths: Vec::new(),
        };
        sessions.active.insert(token.to_string(), session);
        log::info!(
            "Session {} started with {} planned files",
            token,
            normalized.len()
        );

        Ok(format_session_start_response(token, &normalized, &source_block))
    }

    /// Show a window of the source document. An immediate repeat of the same
    /// range is rejected so a looping agent is nudged toward progress.
    pub async fn show_source_document(
        &self,
        token: &str,
        range: Option<&str>,
    ) -> Result<String, LibrarianError> {
        // Empty ranges mean "no range requested".
        let range = range.filter(|r| !r.is_empty());

        let mut sessions = self.sessions.lock().await;
        let Some(document) = sessions.source_mut(token) else {
            return Err(LibrarianError::SessionState(
                "Error. Session does not exist or has already been finished.".to_string(),
            ));
        };

        if let Some(range) = range {
            if range == document.last_requested_range {
                return Err(LibrarianError::DuplicateRangeRequest(format!(
                    "Error. The range `{}` was already shown in the previous response. Request a different range, or continue structuring the document.",
                    range
                )));
            }
        }

        document.last_requested_range = range.unwrap_or_default().to_string();

        let window = resolve_window(range, document.source_document_lines.len());
        Ok(format_source_window(&document.source_document_lines, window))
    }

    /// Write a batch of planned sections. The batch is validated atomically
    /// (any bad entry rejects the whole call with no side effects); the
    /// writes themselves happen sequentially and are not rolled back on a
    /// partial failure; unfinished files simply stay in the remaining set.
    pub async fn write_sections(
        &self,
        token: &str,
        sections: &[SectionInput],
    ) -> Result<String, LibrarianError> {
        if sections.len() > MAX_SECTIONS_PER_CALL {
            return Err(LibrarianError::SectionPlan(format!(
                "Error. At most {} sections can be written per call, got {}.",
                MAX_SECTIONS_PER_CALL,
                sections.len()
            )));
        }

        let mut sessions = self.sessions.lock().await;
        if sessions.pending.contains_key(token) {
            return Err(self.not_started_error(token));
        }
        let Some(session) = sessions.active.get_mut(token) else {
            return Err(LibrarianError::SessionState(
                "Error. Session does not exist or has already been finished.".to_string(),
            ));
        };

        // Validation pass over the whole batch before any write.
        let mut seen: HashSet<String> = HashSet::new();
        for section in sections {
            let filepath = normalize_path(&section.filepath);
            let reason = if !session.section_filepaths.contains(&filepath) {
                Some("is not part of the session")
            } else if session.completed_filepaths.contains(&filepath) {
                Some("has already been completed")
            } else if !seen.insert(filepath.clone()) {
                Some("appears more than once in this batch")
            } else {
                None
            };

            if let Some(reason) = reason {
                return Err(LibrarianError::SectionPlan(format_error_response(
                    &format!("The filepath `{}` {}.", section.filepath, reason),
                    token,
                    &session.remaining_filepaths(),
                    &session.completed_filepaths,
                )));
            }
        }

        let document_root = self
            .store
            .docs_root()
            .join(session.document.document_name.trim_matches('/'));

        for section in sections {
            let filepath = normalize_path(&section.filepath);
            let content = compose_content(
                &section.content_specifiers,
                &session.document.source_document_raw_lines,
            );
            let file_text = frontmatter::render(
                &section.tags,
                &session.document.document_source,
                &content,
            );

            let relative = filepath
                .strip_prefix(&session.common_path_prefix)
                .unwrap_or(&filepath)
                .trim_start_matches('/')
                .to_string();
            let destination = document_root.join(&relative);

            // Completion is recorded as the section resolves; a failed write
            // below leaves earlier files on disk and this state retryable.
            session.completed_filepaths.push(filepath.clone());

            if let Some(parent) = destination.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&destination, file_text).await?;
            log::debug!("Section written: {}", destination.display());
        }

        let response = format_write_sections_response(
            token,
            &session.remaining_filepaths(),
            &session.completed_filepaths,
        );
        drop(sessions);

        self.refresh_store().await;
        Ok(response)
    }

    /// End a session once every planned file has been written. Ending is the
    /// only destructor; afterwards the token is invalid for all operations.
    pub async fn end_session(&self, token: &str) -> Result<String, LibrarianError> {
        let mut sessions = self.sessions.lock().await;
        if sessions.pending.contains_key(token) {
            return Err(self.not_started_error(token));
        }
        let Some(session) = sessions.active.get(token) else {
            return Err(LibrarianError::SessionState(
                "Error. Session does not exist or has already been finished.".to_string(),
            ));
        };

        let remaining = session.remaining_filepaths();
        if !remaining.is_empty() {
            return Err(LibrarianError::SessionState(format_error_response(
                "The session cannot be ended because there are still sections to be completed.",
                token,
                &remaining,
                &session.completed_filepaths,
            )));
        }

        let Some(session) = sessions.active.remove(token) else {
            return Err(LibrarianError::SessionState(
                "Error. Session does not exist or has already been finished.".to_string(),
            ));
        };
        log::info!(
            "Session {} finished: {} files written for '{}'",
            token,
            session.completed_filepaths.len(),
            session.document.document_name
        );
        drop(sessions);

        self.refresh_store().await;
        Ok(format_end_session_response(
            &session.completed_filepaths,
            &session.common_path_prefix,
            &session.document.document_name,
        ))
    }

    fn not_started_error(&self, token: &str) -> LibrarianError {
        LibrarianError::SessionState(format_error_response(
            "The session has not been started yet. Call `knowledgeStructuringSession.start` with the section filepaths first.",
            token,
            &[],
            &[],
        ))
    }

    /// Index refresh after a mutating operation. A failed refresh only
    /// degrades listing freshness, so it is logged rather than surfaced.
    async fn refresh_store(&self) {
        if let Err(err) = self.store.reload().await {
            log::warn!("Document index refresh failed: {}", err);
        }
    }

    /// Drop pending sessions that were never started within the TTL.
    fn sweep_expired_pending(&self, sessions: &mut SessionStore) {
        let Ok(ttl) = chrono::Duration::from_std(self.config.pending_session_ttl) else {
            return;
        };
        let cutoff = Utc::now() - ttl;
        sessions.pending.retain(|token, pending| {
            let keep = pending.created_at > cutoff;
            if !keep {
                log::info!("Evicting abandoned pending session {}", token);
            }
            keep
        });
    }
}

/// Leading-slash form with duplicate edge slashes trimmed.
fn normalize_path(path: &str) -> String {
    format!(
        "/{}",
        path.trim_start_matches('/').trim_end_matches('/')
    )
}

/// A planned filepath must be a markdown file, and no segment of it may
/// start or end with a dot (rejects `./`, `../` and hidden files).
fn is_valid_section_filepath(path: &str) -> bool {
    if !path.ends_with(".md") {
        return false;
    }
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .all(|segment| !segment.starts_with('.') && !segment.ends_with('.'))
}

/// Longest shared leading directory-segment sequence of the normalized
/// paths. The filename segment never participates, so a single-file plan
/// keeps its parent directory as the prefix. The root prefix is the empty
/// string.
fn common_path_prefix(paths: &[String]) -> String {
    let Some(first) = paths.first() else {
        return String::new();
    };

    let parent_segments = |path: &str| -> Vec<String> {
        let mut segments: Vec<String> = path.split('/').map(String::from).collect();
        segments.pop();
        segments
    };

    // Segments keep the leading empty entry from the normalized form, so a
    // one-element prefix is the root.
    let mut prefix = parent_segments(first);
    for path in &paths[1..] {
        if prefix.len() <= 1 {
            break;
        }
        let segments = parent_segments(path);
        let shared = prefix
            .iter()
            .zip(segments.iter())
            .take_while(|(a, b)| a == b)
            .count();
        prefix.truncate(shared);
    }

    prefix.join("/")
}
