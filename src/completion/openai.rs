//! OpenAI Responses API implementation.

use super::envelope;
use super::{CompletionClient, CompletionRequest, CompletionResponse};
use crate::error::Result;
use crate::openai::{ApiClient, ApiKey};
use crate::telemetry::TokenUsage;
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

/// Client for the `/responses` endpoint.
pub struct ResponsesClient {
    client: ApiClient,
    model: String,
}

impl ResponsesClient {
    /// Create a client for the default decision model.
    pub fn new(client: ApiClient) -> Self {
        Self::with_model(client, "gpt-4.1-mini")
    }

    /// Create a client for a specific model.
    pub fn with_model(client: ApiClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl CompletionClient for ResponsesClient {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request, credential), fields(model = %request.model))]
    async fn complete(&self, request: &CompletionRequest, credential: &ApiKey) -> Result<CompletionResponse> {
        let reply = self.client.post_json("responses", credential, request).await?;

        let text = match envelope::extract_text(&reply.body) {
            Some((shape, text)) => {
                debug!("Extracted {} characters from {} envelope", text.len(), shape);
                text.trim().to_string()
            }
            None => {
                warn!("Completion response matched no known envelope");
                String::new()
            }
        };

        Ok(CompletionResponse {
            text,
            usage: TokenUsage::from_response(&reply.body),
            http_status: reply.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ApiClient::new("https://api.openai.com/v1").unwrap();
        assert_eq!(ResponsesClient::new(client.clone()).model(), "gpt-4.1-mini");
        assert_eq!(ResponsesClient::with_model(client, "gpt-4o").model(), "gpt-4o");
    }

    #[test]
    fn test_request_body_shape() {
        let request = CompletionRequest::new("gpt-4.1-mini", "prompt".to_string(), 0.25);
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], "gpt-4.1-mini");
        assert_eq!(body["input"], "prompt");
        assert_eq!(body["temperature"], 0.25);
        assert_eq!(request.payload_size(), serde_json::to_vec(&request).unwrap().len());
    }
}
