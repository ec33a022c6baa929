//! In-memory index of the markdown knowledge base
//!
//! The index is rebuilt from disk on load and after every mutating session
//! operation. Tag inheritance follows the directory tree: the `index.md` of
//! the root and of every ancestor directory contributes its tags to each
//! document below it.

use crate::store::frontmatter;
use serde::Serialize;
use std::collections::HashMap;

/// A markdown document with its effective (inherited + own) tags.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Document {
    pub filepath: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
}

impl Document {
    /// Copy of this document without its contents, for list-shaped responses.
    pub fn without_contents(&self) -> Document {
        Document {
            filepath: self.filepath.clone(),
            tags: self.tags.clone(),
            contents: None,
        }
    }
}

/// Tag usage within a directory subtree.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TagInfo {
    pub tag: String,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filepaths: Option<Vec<String>>,
}

/// How a search query is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// The query is matched literally.
    Literal,
    /// The query is compiled as a regular expression; invalid patterns fall
    /// back to literal matching.
    Regex,
}

#[derive(Debug, Default)]
pub struct DocumentIndex {
    documents: Vec<Document>,
    document_map: HashMap<String, usize>,
}

impl DocumentIndex {
    /// Build an index from raw `(filepath, file contents)` pairs. Paths are
    /// relative to the docs root and use `/` separators.
    pub fn build(files: Vec<(String, String)>) -> Self {
        let mut raw_tags: HashMap<String, Vec<String>> = HashMap::new();
        let mut parsed: Vec<(String, Vec<String>, String)> = Vec::new();

        for (filepath, raw) in files {
            let (fm, body) = frontmatter::parse(&raw);
            raw_tags.insert(filepath.clone(), fm.tags.clone());
            parsed.push((filepath, fm.tags, body));
        }

        let mut documents = Vec::new();
        let mut document_map = HashMap::new();

        for (filepath, own_tags, body) in parsed {
            let mut tags = inherited_tags(&filepath, &raw_tags);
            for tag in own_tags {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }

            document_map.insert(filepath.clone(), documents.len());
            documents.push(Document {
                filepath,
                tags,
                contents: Some(body),
            });
        }

        Self {
            documents,
            document_map,
        }
    }

    /// Documents under `directory`, optionally narrowed by tags and depth.
    /// A document matches the tag filter when it carries any of the given
    /// tags. `depth` bounds how many path segments below the directory a
    /// document may sit; `None` means unlimited.
    pub fn filter(&self, directory: &str, tags: &[String], depth: Option<usize>) -> Vec<Document> {
        let prefix = directory_prefix(directory);

        self.documents
            .iter()
            .filter(|doc| doc.filepath.starts_with(&prefix))
            .filter(|doc| match depth {
                Some(max) => {
                    let below = &doc.filepath[prefix.len()..];
                    below.split('/').count() <= max
                }
                None => true,
            })
            .filter(|doc| tags.is_empty() || tags.iter().any(|tag| doc.tags.contains(tag)))
            .cloned()
            .collect()
    }

    /// Search document contents under `directory`.
    #[allow(clippy::too_many_arguments)]
    pub fn search(
        &self,
        query: &str,
        directory: &str,
        tags: &[String],
        mode: SearchMode,
        case_sensitive: bool,
        include_contents: bool,
        depth: Option<usize>,
    ) -> Vec<Document> {
        let pattern = build_search_pattern(query, mode, case_sensitive);

        self.filter(directory, tags, depth)
            .into_iter()
            .filter(|doc| {
                doc.contents
                    .as_deref()
                    .is_some_and(|contents| pattern.is_match(contents))
            })
            .map(|doc| {
                if include_contents {
                    doc
                } else {
                    doc.without_contents()
                }
            })
            .collect()
    }

    /// Look up one document by its path relative to the docs root. A leading
    /// slash is tolerated.
    pub fn get(&self, filepath: &str) -> Option<&Document> {
        let normalized = filepath.strip_prefix('/').unwrap_or(filepath);
        self.document_map
            .get(normalized)
            .map(|&idx| &self.documents[idx])
    }

    /// Tag usage counts within a directory, sorted by count descending.
    pub fn tags_in_directory(
        &self,
        directory: &str,
        include_filepaths: bool,
        depth: Option<usize>,
    ) -> Vec<TagInfo> {
        let documents = self.filter(directory, &[], depth);

        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut filepaths: HashMap<String, Vec<String>> = HashMap::new();

        for doc in &documents {
            for tag in &doc.tags {
                *counts.entry(tag.clone()).or_insert(0) += 1;
                if include_filepaths {
                    filepaths
                        .entry(tag.clone())
                        .or_default()
                        .push(doc.filepath.clone());
                }
            }
        }

        let mut tags: Vec<TagInfo> = counts
            .into_iter()
            .map(|(tag, count)| {
                let files = include_filepaths.then(|| filepaths.remove(&tag).unwrap_or_default());
                TagInfo {
                    tag,
                    count,
                    filepaths: files,
                }
            })
            .collect();

        // Stable order for equal counts keeps responses deterministic.
        tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
        tags
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Tags inherited from `index.md` files at the root and in every ancestor
/// directory of `filepath`, in root-to-leaf order, deduplicated.
fn inherited_tags(filepath: &str, raw_tags: &HashMap<String, Vec<String>>) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut push_all = |index_path: &str| {
        if let Some(index_tags) = raw_tags.get(index_path) {
            for tag in index_tags {
                if !tags.contains(tag) {
                    tags.push(tag.clone());
                }
            }
        }
    };

    push_all("index.md");

    let parts: Vec<&str> = filepath.split('/').filter(|p| !p.is_empty()).collect();
    let mut current = String::new();
    for part in parts.iter().take(parts.len().saturating_sub(1)) {
        if current.is_empty() {
            current.push_str(part);
        } else {
            current.push('/');
            current.push_str(part);
        }
        push_all(&format!("{}/index.md", current));
    }

    tags
}

/// Normalize a directory filter to a relative prefix ending in `/`, with the
/// root mapping to the empty prefix.
fn directory_prefix(directory: &str) -> String {
    let trimmed = directory.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

fn build_search_pattern(query: &str, mode: SearchMode, case_sensitive: bool) -> regex::Regex {
    let literal = regex::escape(query);
    let source = match mode {
        SearchMode::Literal => literal.clone(),
        SearchMode::Regex => query.to_string(),
    };

    regex::RegexBuilder::new(&source)
        .case_insensitive(!case_sensitive)
        .multi_line(true)
        .build()
        .unwrap_or_else(|_| {
            // Invalid user regex falls back to literal matching.
            regex::RegexBuilder::new(&literal)
                .case_insensitive(!case_sensitive)
                .multi_line(true)
                .build()
                .unwrap_or_else(|_| regex::Regex::new("$^").unwrap())
        })
}
