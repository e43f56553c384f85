//! Retrieval of evidence excerpts for a question.
//!
//! The document's chunks are embedded once into an [`EmbeddingIndex`]; each
//! question is embedded on its own and compared against that index.

pub mod context;
mod index;
pub mod similarity;

pub use context::Retriever;
pub use index::EmbeddingIndex;
pub use similarity::{cosine_similarity, rank, select_top};

use crate::document::Document;
use serde::Serialize;
use std::sync::Arc;

/// Maximum number of excerpts placed into a prompt.
pub const MAX_CONTEXT_CHUNKS: usize = 5;

/// Minimum cosine similarity for an excerpt to count as evidence.
pub const MIN_SIMILARITY_THRESHOLD: f32 = 0.18;

/// Number of chunk texts sent per embedding request.
pub const EMBEDDING_BATCH_SIZE: usize = 8;

/// A chunk selected as evidence for one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceItem {
    pub chunk_id: usize,
    pub text: String,
    pub similarity_score: f32,
    /// Position in the selection, starting at 1.
    pub rank: usize,
}

/// Evidence for one question, with the document it was taken from.
#[derive(Debug, Clone)]
pub struct Evidence {
    pub document: Arc<Document>,
    pub items: Vec<EvidenceItem>,
}

/// Retrieval tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalConfig {
    pub batch_size: usize,
    pub max_context_chunks: usize,
    pub min_similarity: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            batch_size: EMBEDDING_BATCH_SIZE,
            max_context_chunks: MAX_CONTEXT_CHUNKS,
            min_similarity: MIN_SIMILARITY_THRESHOLD,
        }
    }
}

impl RetrievalConfig {
    pub fn from_settings(settings: &crate::config::Settings) -> Self {
        Self {
            batch_size: settings.embedding.batch_size.clamp(1, EMBEDDING_BATCH_SIZE),
            max_context_chunks: settings.retrieval.max_context_chunks,
            min_similarity: settings.retrieval.min_similarity,
        }
    }
}
