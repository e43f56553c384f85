//! Deterministic stand-ins for the external APIs, used by unit tests.

use crate::completion::{CompletionClient, CompletionRequest, CompletionResponse};
use crate::embedding::{Embedder, EmbeddingRequest, EmbeddingResponse};
use crate::error::{DiligentError, Result};
use crate::openai::ApiKey;
use crate::telemetry::TokenUsage;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn api_key() -> ApiKey {
    ApiKey::new("sk-test").unwrap()
}

/// Letter-frequency vectors: texts sharing vocabulary score high.
pub fn letter_histogram(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; 26];
    for c in text.chars().filter(char::is_ascii_alphabetic) {
        vector[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
    }
    vector
}

pub struct StubEmbedder {
    model: String,
    calls: AtomicUsize,
    texts: AtomicUsize,
    short_reply: AtomicBool,
    fail_status: Mutex<Option<u16>>,
    inputs: Mutex<Vec<String>>,
    delay: Mutex<Duration>,
}

impl StubEmbedder {
    pub fn new() -> Self {
        Self::with_model("stub-embedding")
    }

    pub fn with_model(model: &str) -> Self {
        Self {
            model: model.to_string(),
            calls: AtomicUsize::new(0),
            texts: AtomicUsize::new(0),
            short_reply: AtomicBool::new(false),
            fail_status: Mutex::new(None),
            inputs: Mutex::new(Vec::new()),
            delay: Mutex::new(Duration::ZERO),
        }
    }

    /// Number of `embed` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of texts embedded so far.
    pub fn texts(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }

    /// Return one vector fewer than requested from now on.
    pub fn return_short_replies(&self, enabled: bool) {
        self.short_reply.store(enabled, Ordering::SeqCst);
    }

    /// Every text embedded so far, in request order.
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }

    /// Wait this long before answering each call.
    pub fn delay_replies(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Fail every call with the given HTTP status.
    pub fn fail_with(&self, status: Option<u16>) {
        *self.fail_status.lock().unwrap() = status;
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, request: &EmbeddingRequest, _credential: &ApiKey) -> Result<EmbeddingResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.fetch_add(request.input.len(), Ordering::SeqCst);
        self.inputs.lock().unwrap().extend(request.input.iter().cloned());

        let delay = *self.delay.lock().unwrap();
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }

        let fail_status = *self.fail_status.lock().unwrap();
        if let Some(status) = fail_status {
            return Err(DiligentError::Http {
                status,
                message: "stub failure".to_string(),
            });
        }

        let mut vectors: Vec<Vec<f32>> = request.input.iter().map(|t| letter_histogram(t)).collect();
        if self.short_reply.load(Ordering::SeqCst) {
            vectors.pop();
        }

        let tokens: u64 = request.input.iter().map(|t| t.split_whitespace().count() as u64).sum();
        Ok(EmbeddingResponse {
            vectors,
            usage: TokenUsage {
                input: Some(tokens),
                output: None,
                total: Some(tokens),
            },
            http_status: 200,
        })
    }
}

/// One scripted completion reply.
pub struct Scripted {
    pub delay: Duration,
    pub reply: std::result::Result<String, u16>,
}

impl Scripted {
    pub fn text(text: &str) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Ok(text.to_string()),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Err(status),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

pub struct StubCompletion {
    script: Mutex<VecDeque<Scripted>>,
    prompts: Mutex<Vec<String>>,
}

impl StubCompletion {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(vec![Scripted::text(text)])
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionClient for StubCompletion {
    fn model(&self) -> &str {
        "stub-completion"
    }

    async fn complete(&self, request: &CompletionRequest, _credential: &ApiKey) -> Result<CompletionResponse> {
        self.prompts.lock().unwrap().push(request.input.clone());
        let next = self.script.lock().unwrap().pop_front();
        let Some(scripted) = next else {
            return Err(DiligentError::Http {
                status: 500,
                message: "no scripted reply".to_string(),
            });
        };

        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }

        match scripted.reply {
            Ok(text) => Ok(CompletionResponse {
                text,
                usage: TokenUsage {
                    input: Some(100),
                    output: Some(20),
                    total: Some(120),
                },
                http_status: 200,
            }),
            Err(status) => Err(DiligentError::Http {
                status,
                message: "scripted failure".to_string(),
            }),
        }
    }
}
