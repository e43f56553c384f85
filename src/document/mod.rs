//! Uploaded reference documents.
//!
//! Raw text arrives from an extraction adapter (see [`extract`]), is normalized,
//! capped at a fixed number of characters and kept as a [`Document`].

pub mod extract;

pub use extract::{read_document, RawDocument};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Default character cap applied to normalized document text.
pub const MAX_DOCUMENT_CHARS: usize = 15_000;

static HORIZONTAL_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\x0B\x0C\u{00A0}\u{2000}-\u{200A}\u{202F}\u{3000}]+").expect("Invalid regex"));

static LINE_EDGE_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" *\n *").expect("Invalid regex"));

static BLANK_LINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("Invalid regex"));

/// Collapse whitespace and line endings of extracted text into a canonical form.
///
/// Line endings become `\n`, runs of horizontal whitespace become one space,
/// lines lose their edge spaces, more than one blank line collapses to one,
/// and the whole text is trimmed.
pub fn normalize_text(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "\n");
    let text = HORIZONTAL_WHITESPACE.replace_all(&text, " ");
    let text = LINE_EDGE_SPACES.replace_all(&text, "\n");
    let text = BLANK_LINE_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// A document loaded into the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// File name as uploaded.
    pub name: String,
    /// Size of the uploaded file in bytes.
    pub size_bytes: u64,
    /// Normalized, possibly truncated text.
    pub content: String,
    /// Whether `content` is only a prefix of the normalized text.
    pub truncated: bool,
}

impl Document {
    /// Normalize raw extracted text and keep at most `max_chars` characters of it.
    pub fn ingest(name: &str, size_bytes: u64, raw_text: &str, max_chars: usize) -> Self {
        let normalized = normalize_text(raw_text);

        let (content, truncated) = match normalized.char_indices().nth(max_chars) {
            Some((cut, _)) => (normalized[..cut].to_string(), true),
            None => (normalized, false),
        };

        Self {
            name: name.to_string(),
            size_bytes,
            content,
            truncated,
        }
    }

    /// Build a document from the output of an extraction adapter.
    pub fn from_raw(raw: &RawDocument, max_chars: usize) -> Self {
        Self::ingest(&raw.name, raw.size_bytes, &raw.text, max_chars)
    }

    /// Whether there is any text to analyse.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Number of characters kept for analysis.
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    /// Name used in prompts and evidence references.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "Uploaded document"
        } else {
            &self.name
        }
    }

    /// One-line preview: name, size, analysed characters and truncation marker.
    pub fn summary(&self) -> String {
        let mut parts = vec![self.display_name().to_string()];

        let size = format_file_size(self.size_bytes);
        if !size.is_empty() {
            parts.push(size);
        }
        parts.push(format!("{} characters analysed", self.char_count()));

        let mut summary = parts.join(" • ");
        if self.truncated {
            summary.push_str(" (truncated for analysis)");
        }
        summary
    }
}

/// Format a byte count as `B`, `KB` or `MB` with one decimal. Zero yields an empty string.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return String::new();
    }
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let kilobytes = bytes as f64 / 1024.0;
    if kilobytes < 1024.0 {
        return format!("{:.1} KB", kilobytes);
    }
    format!("{:.1} MB", kilobytes / 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace_and_line_endings() {
        let raw = "  Title\r\n\r\n\r\n\r\nFirst   line\t\twith  tabs  \rSecond\u{00A0}line\n\n\n";
        assert_eq!(normalize_text(raw), "Title\n\nFirst line with tabs\nSecond line");
    }

    #[test]
    fn test_normalize_blank_input() {
        assert_eq!(normalize_text(" \r\n\t \n"), "");
    }

    #[test]
    fn test_ingest_truncates_on_characters() {
        let raw = "é".repeat(20);
        let doc = Document::ingest("policy.txt", 40, &raw, 15);
        assert!(doc.truncated);
        assert_eq!(doc.char_count(), 15);

        let doc = Document::ingest("policy.txt", 40, &raw, 20);
        assert!(!doc.truncated);
    }

    #[test]
    fn test_cap_applies_after_normalization() {
        let raw = format!("{}{}", "a".repeat(10), " ".repeat(100));
        let doc = Document::ingest("a.txt", 110, &raw, 10);
        assert!(!doc.truncated);
        assert_eq!(doc.content, "a".repeat(10));
    }

    #[test]
    fn test_summary() {
        let doc = Document::ingest("policy.txt", 2048, "Some text", MAX_DOCUMENT_CHARS);
        assert_eq!(doc.summary(), "policy.txt • 2.0 KB • 9 characters analysed");

        let doc = Document::ingest("", 0, "abc", 2);
        assert_eq!(
            doc.summary(),
            "Uploaded document • 2 characters analysed (truncated for analysis)"
        );
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
    }
}
