//! Source document acquisition
//!
//! The engine talks to a `SourceFetcher` trait rather than to the network
//! directly, so session behavior is testable without HTTP. The production
//! implementation accepts HTTP(S) locators only and rejects everything else
//! before any network access happens.

use crate::errors::LibrarianError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const USER_AGENT: &str = concat!("Librarian/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "text/markdown, text/plain";

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch the raw source document text for a locator. Returns the trimmed
    /// body; empty documents are an error.
    async fn fetch(&self, source: &str) -> Result<String, LibrarianError>;
}

pub struct HttpSourceFetcher {
    client: Client,
}

impl HttpSourceFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

impl Default for HttpSourceFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceFetcher for HttpSourceFetcher {
    async fn fetch(&self, source: &str) -> Result<String, LibrarianError> {
        if !source.starts_with("http://") && !source.starts_with("https://") {
            return Err(LibrarianError::UnsupportedSourceFormat);
        }

        let response = self
            .client
            .get(source)
            .header("User-Agent", USER_AGENT)
            .header("Accept", ACCEPT)
            .header("Cache-Control", "no-store")
            .send()
            .await
            .map_err(|e| LibrarianError::FetchFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LibrarianError::FetchFailure(
                status
                    .canonical_reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| status.to_string()),
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| LibrarianError::FetchFailure(e.to_string()))?;

        if text.trim().is_empty() {
            return Err(LibrarianError::EmptySourceDocument);
        }

        Ok(text.trim().to_string())
    }
}

/// Display form of the source document: each line prefixed with a
/// right-justified 1-based line number. The width is fixed by the total line
/// count so a window shown later keeps the same gutter as the full document.
pub fn source_document_to_lines(source_document: &str) -> Vec<String> {
    let lines: Vec<&str> = source_document.split('\n').collect();
    let width = lines.len().to_string().len();
    lines
        .iter()
        .enumerate()
        .map(|(index, line)| format!("{:>width$} | {}", index + 1, line, width = width))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_non_http_sources() {
        let fetcher = HttpSourceFetcher::new();
        let err = fetcher.fetch("file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, LibrarianError::UnsupportedSourceFormat));

        let err = fetcher.fetch("ftp://example.com/doc.md").await.unwrap_err();
        assert!(matches!(err, LibrarianError::UnsupportedSourceFormat));
    }

    #[test]
    fn test_line_numbering_width_is_stable() {
        let doc = (1..=12)
            .map(|i| format!("line {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let lines = source_document_to_lines(&doc);
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[0], " 1 | line 1");
        assert_eq!(lines[9], "10 | line 10");
    }

    #[test]
    fn test_single_line_document() {
        let lines = source_document_to_lines("only");
        assert_eq!(lines, vec!["1 | only"]);
    }
}
