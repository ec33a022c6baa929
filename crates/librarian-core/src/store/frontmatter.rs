//! Frontmatter parsing and rendering for knowledge-base documents
//!
//! Documents carry a YAML frontmatter block fenced by `---` lines. Only the
//! `tags` array is meaningful to the store; everything else is preserved in
//! the body untouched. Rendering is structured (JSON-quoted strings) rather
//! than interpolated, so tag and source values can never break the block.

use serde_yaml::Value;

/// Parsed frontmatter of a document. Missing or malformed frontmatter yields
/// an empty tag list and the full text as body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter {
    pub tags: Vec<String>,
}

/// Split a document into its frontmatter and body.
pub fn parse(raw: &str) -> (Frontmatter, String) {
    let Some(rest) = raw.strip_prefix("---\n").or_else(|| raw.strip_prefix("---\r\n")) else {
        return (Frontmatter::default(), raw.to_string());
    };

    let Some(end) = rest.find("\n---").map(|pos| {
        let after = &rest[pos + 4..];
        (pos, after.strip_prefix('\n').or_else(|| after.strip_prefix("\r\n")).unwrap_or(after))
    }) else {
        return (Frontmatter::default(), raw.to_string());
    };
    let (yaml_end, body) = end;

    let tags = match serde_yaml::from_str::<Value>(&rest[..yaml_end]) {
        Ok(Value::Mapping(map)) => map
            .get("tags")
            .and_then(Value::as_sequence)
            .map(|seq| {
                seq.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    (Frontmatter { tags }, body.to_string())
}

/// Render a section file: frontmatter with the tag list and the document
/// source, a blank line, then the composed content.
pub fn render(tags: &[String], source: &str, content: &str) -> String {
    let quoted_tags: Vec<String> = tags
        .iter()
        .map(|tag| serde_json::to_string(tag).unwrap_or_else(|_| "\"\"".to_string()))
        .collect();
    let quoted_source = serde_json::to_string(source).unwrap_or_else(|_| "\"\"".to_string());

    format!(
        "---\ntags: [{}]\nsource: {}\n---\n\n{}",
        quoted_tags.join(", "),
        quoted_source,
        content
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags_and_body() {
        let raw = "---\ntags: [\"rust\", \"guide\"]\n---\n\n# Hello\n";
        let (fm, body) = parse(raw);
        assert_eq!(fm.tags, vec!["rust", "guide"]);
        assert_eq!(body, "\n# Hello\n");
    }

    #[test]
    fn test_parse_without_frontmatter() {
        let raw = "# Just a heading\n";
        let (fm, body) = parse(raw);
        assert!(fm.tags.is_empty());
        assert_eq!(body, raw);
    }

    #[test]
    fn test_parse_frontmatter_without_tags() {
        let raw = "---\ntitle: something\n---\nbody";
        let (fm, body) = parse(raw);
        assert!(fm.tags.is_empty());
        assert_eq!(body, "body");
    }

    #[test]
    fn test_render_quotes_values() {
        let rendered = render(
            &["a\"b".to_string(), "intro".to_string()],
            "https://example.com/doc.md",
            "content here",
        );
        assert!(rendered.starts_with("---\ntags: [\"a\\\"b\", \"intro\"]\n"));
        assert!(rendered.contains("source: \"https://example.com/doc.md\"\n"));
        assert!(rendered.ends_with("---\n\ncontent here"));
    }

    #[test]
    fn test_render_round_trips_through_parse() {
        let rendered = render(&["intro".to_string()], "https://example.com", "# Section\n");
        let (fm, body) = parse(&rendered);
        assert_eq!(fm.tags, vec!["intro"]);
        assert_eq!(body, "\n# Section\n");
    }
}
