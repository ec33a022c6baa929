//! Content composition from specifier lists
//!
//! A section's content is described as a sequence of specifiers, each either
//! extracting lines from the source document or inserting literal text:
//!
//! - `@12` copies source line 12 (1-based)
//! - `@12-34` copies lines 12 through 34 inclusive
//! - anything else is a literal line; a leading `=` is stripped so literal
//!   text starting with `@` can still be expressed (`=@reexport`)

use regex::Regex;
use std::sync::OnceLock;

fn line_reference() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Non-digit junk between the markers and the digits is tolerated, so
    // `@L12-L34` parses the same as `@12-34`.
    RE.get_or_init(|| Regex::new(r"^@\D*(\d+)(?:-\D*(\d+))?").unwrap())
}

/// Resolve `specifiers` against the bare source lines, concatenating the
/// results with newlines in specifier order.
pub fn compose_content<S: AsRef<str>>(specifiers: &[S], source_lines: &[String]) -> String {
    let mut lines: Vec<&str> = Vec::new();

    for specifier in specifiers {
        let specifier = specifier.as_ref();

        if let Some(caps) = line_reference().captures(specifier) {
            let start: usize = caps[1].parse().unwrap_or(1);
            let start = start.saturating_sub(1);
            let end = caps
                .get(2)
                .and_then(|m| m.as_str().parse::<usize>().ok())
                .unwrap_or(start + 1);

            let start = start.min(source_lines.len());
            let end = end.clamp(start, source_lines.len());
            lines.extend(source_lines[start..end].iter().map(String::as_str));
            continue;
        }

        lines.push(specifier.strip_prefix('=').unwrap_or(specifier));
    }

    lines.join("\n")
}
