//! OpenAI embeddings implementation.

use super::{Embedder, EmbeddingRequest, EmbeddingResponse};
use crate::error::{DiligentError, Result};
use crate::openai::{ApiClient, ApiKey};
use crate::telemetry::TokenUsage;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: ApiClient,
    model: String,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder with the default model.
    pub fn new(client: ApiClient) -> Self {
        Self::with_model(client, "text-embedding-3-small")
    }

    /// Create a new OpenAI embedder with a custom model.
    pub fn with_model(client: ApiClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request, credential), fields(count = request.input.len()))]
    async fn embed(&self, request: &EmbeddingRequest, credential: &ApiKey) -> Result<EmbeddingResponse> {
        if request.input.is_empty() {
            return Ok(EmbeddingResponse {
                vectors: Vec::new(),
                usage: TokenUsage::default(),
                http_status: 200,
            });
        }

        debug!("Generating embeddings for {} texts", request.input.len());
        let reply = self.client.post_json("embeddings", credential, request).await?;
        let vectors = parse_vectors(&reply.body)?;
        debug!("Generated {} embeddings", vectors.len());

        Ok(EmbeddingResponse {
            vectors,
            usage: TokenUsage::from_response(&reply.body),
            http_status: reply.status,
        })
    }
}

/// Read `data[].embedding`, ordered by `data[].index` when present.
fn parse_vectors(body: &Value) -> Result<Vec<Vec<f32>>> {
    let data = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| DiligentError::MalformedResponse("embedding response has no data array".to_string()))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(Value::as_u64)
            .map(|i| i as usize)
            .unwrap_or(position);

        let values = item
            .get("embedding")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                DiligentError::MalformedResponse(format!("embedding {} has no vector", position))
            })?;

        let vector = values
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Option<Vec<f32>>>()
            .ok_or_else(|| {
                DiligentError::MalformedResponse(format!("embedding {} has non-numeric values", position))
            })?;

        indexed.push((index, vector));
    }

    // Sort by index to ensure correct order
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embedder_creation() {
        let client = ApiClient::new("https://api.openai.com/v1").unwrap();
        let embedder = OpenAIEmbedder::new(client.clone());
        assert_eq!(embedder.model(), "text-embedding-3-small");

        let embedder = OpenAIEmbedder::with_model(client, "text-embedding-3-large");
        assert_eq!(embedder.model(), "text-embedding-3-large");
    }

    #[test]
    fn test_parse_vectors_restores_input_order() {
        let body = json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ],
            "usage": {"prompt_tokens": 4, "total_tokens": 4}
        });
        let vectors = parse_vectors(&body).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_parse_vectors_rejects_missing_data() {
        let err = parse_vectors(&json!({"object": "list"})).unwrap_err();
        assert!(matches!(err, DiligentError::MalformedResponse(_)));

        let err = parse_vectors(&json!({"data": [{"embedding": ["x"]}]})).unwrap_err();
        assert!(matches!(err, DiligentError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_empty_request_makes_no_call() {
        // Unroutable base URL: any request would fail.
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        let embedder = OpenAIEmbedder::new(client);
        let key = ApiKey::new("sk-test").unwrap();

        let response = embedder
            .embed(&EmbeddingRequest::new("text-embedding-3-small", Vec::new()), &key)
            .await
            .unwrap();
        assert!(response.vectors.is_empty());
    }
}
