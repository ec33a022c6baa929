//! Plaintext rendering of document and tag listings

use crate::store::index::{Document, TagInfo};

pub fn format_document_list(documents: &[Document]) -> String {
    if documents.is_empty() {
        return "No documents found.".to_string();
    }

    documents
        .iter()
        .map(|doc| format!("- {}\n  - tags: {}", doc.filepath, doc.tags.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_document_list_with_contents(documents: &[Document]) -> String {
    if documents.is_empty() {
        return "No documents found.".to_string();
    }

    documents
        .iter()
        .map(format_document)
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn format_document(document: &Document) -> String {
    format!(
        "**{}**\n======\n{}\n======",
        document.filepath,
        document.contents.as_deref().unwrap_or("")
    )
}

pub fn format_tag_list(tags: &[TagInfo]) -> String {
    if tags.is_empty() {
        return "No tags found.".to_string();
    }

    tags.iter()
        .map(|info| {
            let mut result = format!("- {} ({})", info.tag, info.count);
            if let Some(filepaths) = &info.filepaths {
                if !filepaths.is_empty() {
                    let files = filepaths
                        .iter()
                        .map(|file| format!("    - {}", file))
                        .collect::<Vec<_>>()
                        .join("\n");
                    result.push_str(&format!("\n  - files:\n{}", files));
                }
            }
            result
        })
        .collect::<Vec<_>>()
        .join("\n")
}
