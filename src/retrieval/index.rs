//! Per-document embedding index.

use serde::Serialize;

/// One vector per chunk, in chunk order, plus the model that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingIndex {
    pub model: String,
    pub vectors: Vec<Vec<f32>>,
}

impl EmbeddingIndex {
    pub fn new(model: &str, vectors: Vec<Vec<f32>>) -> Self {
        Self {
            model: model.to_string(),
            vectors,
        }
    }

    /// Whether the index still matches the current chunks and embedding model.
    pub fn is_valid_for(&self, chunk_count: usize, model: &str) -> bool {
        self.vectors.len() == chunk_count && self.model == model
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}
