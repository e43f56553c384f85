//! Embedding generation for semantic search and retrieval.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::error::Result;
use crate::openai::ApiKey;
use crate::telemetry::TokenUsage;
use async_trait::async_trait;
use serde::Serialize;

/// Body of an embedding request.
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingRequest {
    pub model: String,
    pub input: Vec<String>,
}

impl EmbeddingRequest {
    pub fn new(model: &str, input: Vec<String>) -> Self {
        Self {
            model: model.to_string(),
            input,
        }
    }

    /// Size of the serialized body in bytes.
    pub fn payload_size(&self) -> usize {
        serde_json::to_vec(self).map(|body| body.len()).unwrap_or(0)
    }
}

/// Vectors returned for one request, in input order.
#[derive(Debug, Clone)]
pub struct EmbeddingResponse {
    pub vectors: Vec<Vec<f32>>,
    pub usage: TokenUsage,
    pub http_status: u16,
}

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the model producing the vectors.
    fn model(&self) -> &str;

    /// Embed every text of the request.
    async fn embed(&self, request: &EmbeddingRequest, credential: &ApiKey) -> Result<EmbeddingResponse>;
}
