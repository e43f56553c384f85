//! Telemetry for outbound API calls.
//!
//! Every embedding and completion request is recorded in a bounded
//! [`TelemetryLedger`], whether it succeeds or not.

mod ledger;

pub use ledger::{CallSpan, TelemetryLedger, TelemetrySummary, DEFAULT_CAPACITY};

use crate::assist::Decision;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use uuid::Uuid;

/// Kind of external API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Embedding,
    Completion,
}

impl std::fmt::Display for CallType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallType::Embedding => write!(f, "embedding"),
            CallType::Completion => write!(f, "completion"),
        }
    }
}

/// Lifecycle of a recorded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Pending,
    Success,
    Error,
}

impl CallStatus {
    /// Whether the call has reached its final state.
    pub fn is_terminal(self) -> bool {
        !matches!(self, CallStatus::Pending)
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallStatus::Pending => write!(f, "pending"),
            CallStatus::Success => write!(f, "success"),
            CallStatus::Error => write!(f, "error"),
        }
    }
}

/// Token accounting reported by the API.
///
/// `None` means the API did not report the figure, which is different from zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub input: Option<u64>,
    pub output: Option<u64>,
    pub total: Option<u64>,
}

impl TokenUsage {
    /// Normalize a `usage` object.
    ///
    /// Accepts both `input_tokens`/`output_tokens` and the older
    /// `prompt_tokens`/`completion_tokens` names. A missing total is the sum of
    /// whichever of input and output are present. Anything that is not a finite,
    /// non-negative number is treated as absent.
    pub fn from_value(usage: &Value) -> Self {
        let input = first_count(usage, &["input_tokens", "prompt_tokens"]);
        let output = first_count(usage, &["output_tokens", "completion_tokens"]);
        let total = first_count(usage, &["total_tokens"]).or_else(|| match (input, output) {
            (None, None) => None,
            (i, o) => Some(i.unwrap_or(0) + o.unwrap_or(0)),
        });

        Self { input, output, total }
    }

    /// Normalize the optional `usage` member of a response body.
    pub fn from_response(body: &Value) -> Self {
        body.get("usage").map(Self::from_value).unwrap_or_default()
    }

    /// Whether any figure was reported.
    pub fn is_reported(&self) -> bool {
        self.input.is_some() || self.output.is_some() || self.total.is_some()
    }
}

fn first_count(usage: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| {
        usage
            .get(*key)
            .and_then(Value::as_f64)
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n.round() as u64)
    })
}

/// Fields known when a call starts.
#[derive(Debug, Clone)]
pub struct CallEntry {
    pub call_type: CallType,
    /// Finer classification, e.g. `index` or `query` for embeddings.
    pub subtype: String,
    pub description: String,
    /// Question number the call was made for, if any.
    pub question_ref: Option<String>,
    /// Number of texts embedded, or evidence excerpts sent with a prompt.
    pub context_count: usize,
    /// Size of the serialized request body in bytes.
    pub payload_size: usize,
}

/// Partial update applied to a pending record.
#[derive(Debug, Clone, Default)]
pub struct TelemetryUpdate {
    pub status: Option<CallStatus>,
    pub http_status: Option<u16>,
    pub token_usage: Option<TokenUsage>,
    pub response_preview: Option<String>,
    pub error_message: Option<String>,
    pub decision: Option<Decision>,
}

/// One logged API call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub call_type: CallType,
    pub subtype: String,
    pub description: String,
    pub question_ref: Option<String>,
    pub context_count: usize,
    pub payload_size: usize,
    pub status: CallStatus,
    pub http_status: Option<u16>,
    pub token_usage: TokenUsage,
    pub response_preview: Option<String>,
    pub error_message: Option<String>,
    pub duration_ms: Option<u64>,
    pub decision: Option<Decision>,
    #[serde(skip)]
    started_at: Option<Instant>,
}

impl TelemetryRecord {
    fn pending(entry: CallEntry) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            call_type: entry.call_type,
            subtype: entry.subtype,
            description: entry.description,
            question_ref: entry.question_ref,
            context_count: entry.context_count,
            payload_size: entry.payload_size,
            status: CallStatus::Pending,
            http_status: None,
            token_usage: TokenUsage::default(),
            response_preview: None,
            error_message: None,
            duration_ms: None,
            decision: None,
            started_at: Some(Instant::now()),
        }
    }
}
