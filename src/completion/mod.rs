//! Text generation through an external model endpoint.

pub mod envelope;
mod openai;

pub use openai::ResponsesClient;

use crate::error::Result;
use crate::openai::ApiKey;
use crate::telemetry::TokenUsage;
use async_trait::async_trait;
use serde::Serialize;

/// Body of a completion request.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub input: String,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(model: &str, input: String, temperature: f32) -> Self {
        Self {
            model: model.to_string(),
            input,
            temperature,
        }
    }

    /// Size of the serialized body in bytes.
    pub fn payload_size(&self) -> usize {
        serde_json::to_vec(self).map(|body| body.len()).unwrap_or(0)
    }
}

/// Generated text and accounting for one request.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Model output, trimmed. Empty when no known envelope matched.
    pub text: String,
    pub usage: TokenUsage,
    pub http_status: u16,
}

/// Trait for completion endpoints.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Identifier of the generative model.
    fn model(&self) -> &str;

    /// Send the prompt and return the model output.
    async fn complete(&self, request: &CompletionRequest, credential: &ApiKey) -> Result<CompletionResponse>;
}
