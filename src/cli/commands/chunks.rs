//! Chunks command implementation.

use crate::chunking::{chunk_text, ChunkingConfig};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::document::{read_document, Document};
use anyhow::Result;
use std::path::Path;

/// Normalize and chunk a document without calling any API.
pub async fn run_chunks(file: &Path, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Chunks, file, None, &settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let raw = match read_document(file).await {
        Ok(raw) => raw,
        Err(e) => {
            Output::error(&e.user_message());
            return Err(e.into());
        }
    };

    let document = Document::from_raw(&raw, settings.retrieval.max_document_chars);
    let config = ChunkingConfig::from(&settings.retrieval);
    let chunks = chunk_text(&document.content, config);

    Output::header("Document");
    Output::kv("Summary", &document.summary());
    Output::kv("Window", &format!("{} chars, {} overlap", config.size, config.overlap));
    Output::kv("Chunks", &chunks.len().to_string());

    for chunk in &chunks {
        Output::chunk(chunk);
    }

    if chunks.is_empty() {
        Output::warning("The document contains no text to analyse.");
    }
    Ok(())
}
