//! Bounded, append-only log of API calls.

use super::{CallEntry, CallStatus, CallType, TelemetryRecord, TelemetryUpdate, TokenUsage};
use crate::assist::Decision;
use crate::error::DiligentError;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};
use uuid::Uuid;

/// Default number of records retained.
pub const DEFAULT_CAPACITY: usize = 200;

/// Default number of response characters kept per record.
const DEFAULT_PREVIEW_CHARS: usize = 280;

/// Ring buffer of [`TelemetryRecord`]s. Oldest records are evicted first.
#[derive(Debug)]
pub struct TelemetryLedger {
    records: Mutex<VecDeque<TelemetryRecord>>,
    capacity: usize,
    preview_chars: usize,
}

impl TelemetryLedger {
    /// Create a ledger with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a ledger keeping at most `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY) + 1)),
            capacity: capacity.max(1),
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    /// Build a ledger from the `[telemetry]` settings.
    pub fn from_settings(settings: &crate::config::TelemetrySettings) -> Self {
        let mut ledger = Self::with_capacity(settings.capacity);
        ledger.preview_chars = settings.preview_chars;
        ledger
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<TelemetryRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a pending record and return its id.
    pub fn record(&self, entry: CallEntry) -> Uuid {
        let record = TelemetryRecord::pending(entry);
        let id = record.id;
        debug!(
            "Telemetry {} {} started ({} bytes)",
            record.call_type, record.subtype, record.payload_size
        );

        let mut records = self.lock();
        records.push_back(record);
        while records.len() > self.capacity {
            records.pop_front();
        }
        id
    }

    /// Apply a partial update to a record.
    ///
    /// A terminal status is accepted once; later status changes are ignored.
    /// Reaching a terminal status stamps `duration_ms`. Returns `false` when the
    /// record is unknown (possibly evicted) or already finalized.
    pub fn update(&self, id: Uuid, update: TelemetryUpdate) -> bool {
        let preview_chars = self.preview_chars;
        let mut records = self.lock();
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            debug!("Telemetry record {} no longer in the ledger", id);
            return false;
        };

        if record.status.is_terminal() {
            warn!("Telemetry record {} is already {}, update ignored", id, record.status);
            return false;
        }

        if let Some(http_status) = update.http_status {
            record.http_status = Some(http_status);
        }
        if let Some(usage) = update.token_usage {
            record.token_usage = usage;
        }
        if let Some(preview) = update.response_preview {
            record.response_preview = Some(preview.chars().take(preview_chars).collect());
        }
        if let Some(message) = update.error_message {
            record.error_message = Some(message);
        }
        if let Some(decision) = update.decision {
            record.decision = Some(decision);
        }
        if let Some(status) = update.status {
            record.status = status;
            if status.is_terminal() {
                record.duration_ms = record
                    .started_at
                    .map(|started| started.elapsed().as_millis() as u64);
            }
        }
        true
    }

    /// Start a call and get a span that finalizes the record exactly once.
    pub fn begin(&self, entry: CallEntry) -> CallSpan<'_> {
        let id = self.record(entry);
        CallSpan {
            ledger: self,
            id,
            finished: false,
        }
    }

    /// Copy of all records, oldest first.
    pub fn snapshot(&self) -> Vec<TelemetryRecord> {
        self.lock().iter().cloned().collect()
    }

    /// Look up one record.
    pub fn get(&self, id: Uuid) -> Option<TelemetryRecord> {
        self.lock().iter().find(|r| r.id == id).cloned()
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Maximum number of retained records.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Aggregate counts and token totals over the retained records.
    pub fn summary(&self) -> TelemetrySummary {
        let records = self.lock();
        let mut summary = TelemetrySummary::default();

        for record in records.iter() {
            summary.calls += 1;
            match record.call_type {
                CallType::Embedding => summary.embedding_calls += 1,
                CallType::Completion => summary.completion_calls += 1,
            }
            match record.status {
                CallStatus::Pending => summary.pending += 1,
                CallStatus::Success => summary.succeeded += 1,
                CallStatus::Error => summary.failed += 1,
            }
            if !record.token_usage.is_reported() {
                summary.calls_without_usage += 1;
            }
            summary.input_tokens = add_reported(summary.input_tokens, record.token_usage.input);
            summary.output_tokens = add_reported(summary.output_tokens, record.token_usage.output);
            summary.total_tokens = add_reported(summary.total_tokens, record.token_usage.total);
        }

        summary
    }

    /// Serialize the snapshot as pretty JSON.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }
}

impl Default for TelemetryLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn add_reported(acc: Option<u64>, value: Option<u64>) -> Option<u64> {
    match (acc, value) {
        (None, None) => None,
        (a, v) => Some(a.unwrap_or(0) + v.unwrap_or(0)),
    }
}

/// Aggregates for display.
///
/// Token totals stay `None` when no retained record reported that figure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TelemetrySummary {
    pub calls: usize,
    pub embedding_calls: usize,
    pub completion_calls: usize,
    pub pending: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub calls_without_usage: usize,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

/// An in-flight call. Finalizes its record as success or error exactly once;
/// a span dropped without being finished records an error.
#[derive(Debug)]
pub struct CallSpan<'a> {
    ledger: &'a TelemetryLedger,
    id: Uuid,
    finished: bool,
}

impl CallSpan<'_> {
    /// Id of the underlying record.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Attach fields without finalizing, e.g. the HTTP status before parsing.
    pub fn annotate(&self, update: TelemetryUpdate) {
        let update = TelemetryUpdate { status: None, ..update };
        self.ledger.update(self.id, update);
    }

    /// Finalize as success.
    pub fn succeed(mut self, usage: TokenUsage, response_preview: Option<String>, decision: Option<Decision>) {
        self.finished = true;
        self.ledger.update(
            self.id,
            TelemetryUpdate {
                status: Some(CallStatus::Success),
                token_usage: Some(usage),
                response_preview,
                decision,
                ..TelemetryUpdate::default()
            },
        );
    }

    /// Finalize as error.
    pub fn fail(mut self, error: &DiligentError) {
        self.finished = true;
        let http_status = match error {
            DiligentError::Http { status, .. } => Some(*status),
            _ => None,
        };
        self.ledger.update(
            self.id,
            TelemetryUpdate {
                status: Some(CallStatus::Error),
                http_status,
                error_message: Some(error.to_string()),
                ..TelemetryUpdate::default()
            },
        );
    }
}

impl Drop for CallSpan<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.ledger.update(
                self.id,
                TelemetryUpdate {
                    status: Some(CallStatus::Error),
                    error_message: Some("Call abandoned before completion".to_string()),
                    ..TelemetryUpdate::default()
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> CallEntry {
        CallEntry {
            call_type: CallType::Embedding,
            subtype: "index".to_string(),
            description: format!("call {}", n),
            question_ref: None,
            context_count: 1,
            payload_size: 64,
        }
    }

    #[test]
    fn test_ring_buffer_keeps_most_recent_in_order() {
        let ledger = TelemetryLedger::new();
        for n in 0..250 {
            ledger.record(entry(n));
        }

        let records = ledger.snapshot();
        assert_eq!(records.len(), 200);
        let descriptions: Vec<String> = records.iter().map(|r| r.description.clone()).collect();
        let expected: Vec<String> = (50..250).map(|n| format!("call {}", n)).collect();
        assert_eq!(descriptions, expected);
    }

    #[test]
    fn test_terminal_update_stamps_duration_once() {
        let ledger = TelemetryLedger::new();
        let id = ledger.record(entry(0));
        assert_eq!(ledger.get(id).unwrap().status, CallStatus::Pending);

        assert!(ledger.update(
            id,
            TelemetryUpdate {
                status: Some(CallStatus::Success),
                http_status: Some(200),
                ..TelemetryUpdate::default()
            }
        ));
        let record = ledger.get(id).unwrap();
        assert_eq!(record.status, CallStatus::Success);
        assert!(record.duration_ms.is_some());

        assert!(!ledger.update(
            id,
            TelemetryUpdate {
                status: Some(CallStatus::Error),
                ..TelemetryUpdate::default()
            }
        ));
        assert_eq!(ledger.get(id).unwrap().status, CallStatus::Success);
    }

    #[test]
    fn test_update_of_evicted_record_is_ignored() {
        let ledger = TelemetryLedger::with_capacity(2);
        let first = ledger.record(entry(0));
        ledger.record(entry(1));
        ledger.record(entry(2));
        assert!(!ledger.update(first, TelemetryUpdate::default()));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_dropped_span_is_finalized_as_error() {
        let ledger = TelemetryLedger::new();
        let id = {
            let span = ledger.begin(entry(0));
            span.id()
        };
        let record = ledger.get(id).unwrap();
        assert_eq!(record.status, CallStatus::Error);
        assert!(record.error_message.is_some());
    }

    #[test]
    fn test_span_failure_keeps_http_status() {
        let ledger = TelemetryLedger::new();
        let span = ledger.begin(entry(0));
        let id = span.id();
        span.fail(&DiligentError::Http {
            status: 503,
            message: "unavailable".to_string(),
        });

        let record = ledger.get(id).unwrap();
        assert_eq!(record.http_status, Some(503));
        assert_eq!(record.status, CallStatus::Error);
    }

    #[test]
    fn test_preview_is_capped() {
        let ledger = TelemetryLedger::from_settings(&crate::config::TelemetrySettings {
            capacity: 10,
            preview_chars: 5,
        });
        let span = ledger.begin(entry(0));
        let id = span.id();
        span.succeed(TokenUsage::default(), Some("abcdefghij".to_string()), None);
        assert_eq!(ledger.get(id).unwrap().response_preview.as_deref(), Some("abcde"));
    }

    #[test]
    fn test_summary_distinguishes_unreported_usage() {
        let ledger = TelemetryLedger::new();
        let span = ledger.begin(entry(0));
        span.succeed(TokenUsage::default(), None, None);

        let summary = ledger.summary();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.calls_without_usage, 1);
        assert_eq!(summary.total_tokens, None);

        let span = ledger.begin(entry(1));
        span.succeed(
            TokenUsage {
                input: Some(0),
                output: None,
                total: Some(0),
            },
            None,
            None,
        );
        let summary = ledger.summary();
        assert_eq!(summary.total_tokens, Some(0));
        assert_eq!(summary.output_tokens, None);
        assert_eq!(summary.embedding_calls, 2);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let ledger = TelemetryLedger::new();
        ledger.record(entry(0));
        let json = ledger.to_json().unwrap();
        assert!(json.contains("\"callType\": \"embedding\""));
        assert!(json.contains("\"status\": \"pending\""));
        assert!(!json.contains("started_at"));
    }
}
