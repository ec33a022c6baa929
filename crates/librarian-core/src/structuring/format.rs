//! Agent-facing response formatting for knowledge structuring sessions
//!
//! Everything the calling agent reads (session status blocks, source
//! document windows, write/end results, error responses) is rendered here.
//! The formatter is a pure layer over data handed to it by the session
//! manager; it never touches session state itself.

use regex::Regex;
use std::sync::OnceLock;

/// Upper bound on source lines shown in a single response.
pub const MAX_SOURCE_LINES: usize = 4000;

/// A clamped window into the source document, in 0-based `[start, end)` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceWindow {
    pub start: usize,
    pub end: usize,
    pub total: usize,
}

impl SourceWindow {
    pub fn is_whole_document(&self) -> bool {
        self.start == 0 && self.end == self.total
    }
}

fn range_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `L123`, `L123-L456`, `L123-`; non-digit prefixes before the numbers
    // are tolerated.
    RE.get_or_init(|| Regex::new(r"^\D*(\d+)(?:(-)\D*(\d+)?)?").unwrap())
}

/// Resolve a requested range against a document of `total` lines. No range
/// (or an unparseable one, such as `all`) yields the leading window.
pub fn resolve_window(range: Option<&str>, total: usize) -> SourceWindow {
    let leading = SourceWindow {
        start: 0,
        end: total.min(MAX_SOURCE_LINES),
        total,
    };

    let Some(range) = range else {
        return leading;
    };
    let Some(caps) = range_pattern().captures(range) else {
        return leading;
    };

    let start: usize = match caps[1].parse() {
        Ok(n) => n,
        Err(_) => return leading,
    };
    let start = start.saturating_sub(1).min(total.saturating_sub(1));

    let requested_end = if caps.get(2).is_some() {
        // Open-ended ranges (`L10-`) run to the end of the document.
        caps.get(3)
            .and_then(|m| m.as_str().parse::<usize>().ok())
            .unwrap_or(total)
    } else {
        start + 1
    };

    let end = requested_end
        .clamp(start + 1, total.max(start + 1))
        .min(total)
        .min(start + MAX_SOURCE_LINES);

    SourceWindow { start, end, total }
}

/// Render a window of the numbered source lines, with a header reporting the
/// shown range and total line count whenever the window is a truncation.
pub fn format_source_window(numbered_lines: &[String], window: SourceWindow) -> String {
    let header = if window.is_whole_document() {
        "**Source Document:**".to_string()
    } else {
        format!(
            "**Source Document (L{}-L{} of {} lines):**",
            window.start + 1,
            window.end,
            window.total
        )
    };

    let shown = numbered_lines[window.start..window.end.min(numbered_lines.len())].join("\n");
    format!("{}\n\n======\n\n{}\n\n======", header, shown)
}

/// Session status block: token plus remaining/completed file lists, each
/// list omitted when empty.
pub fn format_session_status(token: &str, remaining: &[String], completed: &[String]) -> String {
    let mut blocks = vec![format!("**Session Token:** `{}`", token)];

    if !remaining.is_empty() {
        blocks.push(format!("**Remaining Files:**\n\n{}", bullet_list(remaining)));
    }
    if !completed.is_empty() {
        blocks.push(format!("**Completed Files:**\n\n{}", bullet_list(completed)));
    }

    blocks.join("\n\n")
}

/// Instructional prompt returned when a pending session is created.
pub fn format_pending_session_prompt(token: &str, source_block: &str) -> String {
    format!(
        "You are an outstanding editor, well-versed in computer science and IT, and you are good at analyzing, classifying, and structuring documents.\n\
        Our ultimate goal is to break down a large document into sections, tag them, and organize them into a hierarchy of markdown files in a file tree.\n\
        \n\
        To get started, let's understand the outline of the document. Please focus on analyzing its structure.\n\
        \n\
        1. Read the Source Document below thoroughly and understand its structure.\n\
        2. Identify the sections and subsections of the document and consider a filepath in lower-kebab-case for each (e.g. `/path/to/dir/getting-started.md`).\n\
        3. Call `knowledgeStructuringSession.start` with the session token below and the filepaths you considered.\n\
        \n\
        If you need to see other parts of the document, call `knowledgeStructuringSession.showSourceDocument` with a range like `L123-L456`.\n\
        \n\
        **Session Token:** `{}`\n\
        \n\
        {}",
        token, source_block
    )
}

pub fn format_session_start_response(
    token: &str,
    remaining: &[String],
    source_block: &str,
) -> String {
    format!(
        "Accepted. Call `knowledgeStructuringSession.writeSections` to write the structured files.\n\n{}\n\n{}",
        format_session_status(token, remaining, &[]),
        source_block
    )
}

pub fn format_write_sections_response(
    token: &str,
    remaining: &[String],
    completed: &[String],
) -> String {
    let status = if remaining.is_empty() {
        "OK. All planned files are written. Call `knowledgeStructuringSession.end` to finish the session."
    } else {
        "OK. Continue calling `knowledgeStructuringSession.writeSections` to write the remaining files."
    };

    format!(
        "{}\n\n{}",
        status,
        format_session_status(token, remaining, completed)
    )
}

pub fn format_end_session_response(
    completed: &[String],
    common_path_prefix: &str,
    document_name: &str,
) -> String {
    let mut response = format!(
        "OK. The session is finished. The following files are written:\n\n{}",
        bullet_list(completed)
    );

    let stored_prefix = format!("/{}", document_name.trim_matches('/'));
    if common_path_prefix != stored_prefix {
        response.push_str(&format!(
            "\n\nNote: the planned filepaths share the prefix `{}`, but the files are stored under `{}/`. Use the stored paths when retrieving them.",
            common_path_prefix, stored_prefix
        ));
    }

    response.push_str(&format!(
        "\n\nYou can now use these files for your work. Call `listDocuments` with `directory: \"{}/\"` to see them.",
        stored_prefix
    ));
    response
}

/// Error response with the current session status attached so the agent can
/// self-correct.
pub fn format_error_response(
    message: &str,
    token: &str,
    remaining: &[String],
    completed: &[String],
) -> String {
    format!(
        "Error. {}\n\n{}",
        message,
        format_session_status(token, remaining, completed)
    )
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_window_defaults_to_leading_lines() {
        let window = resolve_window(None, 10);
        assert_eq!(window, SourceWindow { start: 0, end: 10, total: 10 });

        let window = resolve_window(None, 5000);
        assert_eq!(window.end, MAX_SOURCE_LINES);
    }

    #[test]
    fn test_resolve_window_single_line() {
        let window = resolve_window(Some("L7"), 10);
        assert_eq!(window, SourceWindow { start: 6, end: 7, total: 10 });
    }

    #[test]
    fn test_resolve_window_inclusive_range() {
        let window = resolve_window(Some("L2-L5"), 10);
        assert_eq!(window, SourceWindow { start: 1, end: 5, total: 10 });
    }

    #[test]
    fn test_resolve_window_open_ended_range() {
        let window = resolve_window(Some("L4-"), 10);
        assert_eq!(window, SourceWindow { start: 3, end: 10, total: 10 });
    }

    #[test]
    fn test_resolve_window_clamps_to_document() {
        let window = resolve_window(Some("L8-L99"), 10);
        assert_eq!(window, SourceWindow { start: 7, end: 10, total: 10 });

        let window = resolve_window(Some("L99"), 10);
        assert_eq!(window, SourceWindow { start: 9, end: 10, total: 10 });
    }

    #[test]
    fn test_resolve_window_caps_at_max_lines() {
        let window = resolve_window(Some("L1-L9000"), 8000);
        assert_eq!(window.end - window.start, MAX_SOURCE_LINES);
    }

    #[test]
    fn test_resolve_window_unparseable_range() {
        let window = resolve_window(Some("all"), 10);
        assert_eq!(window, SourceWindow { start: 0, end: 10, total: 10 });
    }

    #[test]
    fn test_source_window_header_reports_truncation() {
        let lines: Vec<String> = (1..=5).map(|i| format!("{} | x", i)).collect();
        let window = SourceWindow { start: 1, end: 3, total: 5 };
        let rendered = format_source_window(&lines, window);
        assert!(rendered.starts_with("**Source Document (L2-L3 of 5 lines):**"));
        assert!(rendered.contains("2 | x\n3 | x"));

        let whole = SourceWindow { start: 0, end: 5, total: 5 };
        let rendered = format_source_window(&lines, whole);
        assert!(rendered.starts_with("**Source Document:**"));
    }

    #[test]
    fn test_status_omits_empty_sections() {
        let status = format_session_status("tok", &[], &[]);
        assert_eq!(status, "**Session Token:** `tok`");

        let remaining = vec!["/a/b.md".to_string()];
        let status = format_session_status("tok", &remaining, &[]);
        assert!(status.contains("**Remaining Files:**\n\n- /a/b.md"));
        assert!(!status.contains("**Completed Files:**"));
    }

    #[test]
    fn test_end_response_notes_prefix_mismatch() {
        let completed = vec!["/manual/intro.md".to_string()];
        let response = format_end_session_response(&completed, "/manual", "guide");
        assert!(response.contains("`/manual`"));
        assert!(response.contains("stored under `/guide/`"));

        let response = format_end_session_response(&completed, "/guide", "guide");
        assert!(!response.contains("Note:"));
    }
}
