//! Text extraction adapters for uploaded files.

use crate::error::{DiligentError, Result};
use std::path::Path;
use tracing::{debug, instrument};

/// Text pulled out of a file, before normalization.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// File name without directories.
    pub name: String,
    /// Size of the file in bytes.
    pub size_bytes: u64,
    /// Extracted text.
    pub text: String,
}

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// UTF-8 text, passed through.
    PlainText,
    /// PDF, read through its text layer.
    Pdf,
}

impl SourceFormat {
    /// Pick the adapter from the file extension. Anything that is not a PDF is read as text.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("pdf") => SourceFormat::Pdf,
            _ => SourceFormat::PlainText,
        }
    }
}

/// Extract text from in-memory file contents.
pub fn extract_text(bytes: &[u8], format: SourceFormat) -> Result<String> {
    match format {
        SourceFormat::PlainText => Ok(String::from_utf8_lossy(bytes).into_owned()),
        SourceFormat::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| DiligentError::Document(format!("PDF text extraction failed: {}", e))),
    }
}

/// Read a file from disk and extract its text.
#[instrument(fields(path = %path.display()))]
pub async fn read_document(path: &Path) -> Result<RawDocument> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| DiligentError::Document(format!("{}: {}", path.display(), e)))?;

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document")
        .to_string();

    let format = SourceFormat::from_path(path);
    debug!("Extracting {} bytes as {:?}", bytes.len(), format);
    let text = extract_text(&bytes, format)?;

    Ok(RawDocument {
        name,
        size_bytes: bytes.len() as u64,
        text,
    })
}
