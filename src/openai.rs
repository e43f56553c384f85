//! OpenAI HTTP plumbing shared by the embedding and completion clients.

use crate::error::{DiligentError, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default timeout for API requests (2 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Characters of an error body kept in [`DiligentError::Http`].
const ERROR_BODY_PREVIEW: usize = 300;

/// Bearer token supplied by the caller for the current session.
///
/// Never printed: `Debug` and `Display` are redacted.
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Wrap a token, rejecting blank input.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            None
        } else {
            Some(Self(SecretString::new(token)))
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.0.expose_secret())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// A successful JSON reply.
#[derive(Debug, Clone)]
pub struct ApiReply {
    /// HTTP status code (always 2xx).
    pub status: u16,
    /// Parsed response body.
    pub body: Value,
}

/// Thin JSON client for an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client with the default timeout.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with a custom timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        // A trailing slash makes `Url::join` append instead of replacing the last segment.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .map_err(|e| DiligentError::Config(format!("Invalid API base URL '{}': {}", base_url, e)))?;

        Ok(Self { http, base_url })
    }

    /// Build a client from the `[api]` settings.
    pub fn from_settings(settings: &crate::config::ApiSettings) -> Result<Self> {
        Self::with_timeout(&settings.base_url, Duration::from_secs(settings.timeout_secs))
    }

    /// Resolve an endpoint path against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| DiligentError::Config(format!("Invalid endpoint '{}': {}", path, e)))
    }

    /// POST a JSON body with the bearer credential.
    ///
    /// Non-2xx replies become [`DiligentError::Http`]; network failures become
    /// [`DiligentError::Transport`]; a 2xx body that is not JSON becomes
    /// [`DiligentError::MalformedResponse`].
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        credential: &ApiKey,
        body: &B,
    ) -> Result<ApiReply> {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);

        let response = self
            .http
            .post(url)
            .header(reqwest::header::AUTHORIZATION, credential.bearer())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(DiligentError::Http {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let body = serde_json::from_str(&text)
            .map_err(|e| DiligentError::MalformedResponse(format!("response body is not JSON: {}", e)))?;

        Ok(ApiReply {
            status: status.as_u16(),
            body,
        })
    }
}

/// Pull `error.message` out of an OpenAI error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.pointer("/error/message")
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    match from_json {
        Some(message) => message,
        None => body.chars().take(ERROR_BODY_PREVIEW).collect(),
    }
}
