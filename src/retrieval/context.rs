//! Evidence gathering for a question.

use super::{rank, select_top, EmbeddingIndex, Evidence, EvidenceItem, RetrievalConfig};
use crate::embedding::{Embedder, EmbeddingRequest};
use crate::error::{DiligentError, Result};
use crate::openai::ApiKey;
use crate::questionnaire::Question;
use crate::session::{DocumentSnapshot, DocumentStore};
use crate::telemetry::{CallEntry, CallType, TelemetryLedger, TelemetryUpdate};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Embeds documents and questions and picks the closest chunks.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    ledger: Arc<TelemetryLedger>,
    config: RetrievalConfig,
}

impl Retriever {
    /// Create a retriever with the default tuning.
    pub fn new(embedder: Arc<dyn Embedder>, ledger: Arc<TelemetryLedger>) -> Self {
        Self {
            embedder,
            ledger,
            config: RetrievalConfig::default(),
        }
    }

    /// Set the retrieval tuning.
    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> RetrievalConfig {
        self.config
    }

    /// Rank the document's chunks against the question and return the evidence.
    ///
    /// Builds the embedding index first if it is missing or stale. No items
    /// means nothing scored above the threshold. The returned document is the
    /// one the excerpts come from, even if the store was replaced meanwhile.
    #[instrument(skip(self, question, store, credential), fields(question = %question.number))]
    pub async fn gather_evidence(
        &self,
        question: &Question,
        store: &DocumentStore,
        credential: &ApiKey,
    ) -> Result<Evidence> {
        let snapshot = store
            .snapshot()
            .ok_or_else(|| DiligentError::EmptyDocument("no document loaded".to_string()))?;
        if snapshot.chunks.is_empty() {
            return Err(DiligentError::EmptyDocument(format!(
                "{} produced no chunks",
                snapshot.document.display_name()
            )));
        }

        let index = self.ensure_index(&snapshot, store, &question.number, credential).await?;

        let query = format!("{}: {}", question.number, question.text);
        let query_vector = self.embed_query(query, &question.number, credential).await?;

        let ranked = rank(&query_vector, &index.vectors);
        let selected = select_top(&ranked, self.config.max_context_chunks, self.config.min_similarity);
        debug!(
            "{} of {} chunks selected (best score {:.2})",
            selected.len(),
            ranked.len(),
            ranked.first().map(|(_, s)| *s).unwrap_or(0.0)
        );

        let items = selected
            .into_iter()
            .enumerate()
            .map(|(position, (index, score))| {
                let chunk = &snapshot.chunks[index];
                EvidenceItem {
                    chunk_id: chunk.id,
                    text: chunk.text.clone(),
                    similarity_score: score,
                    rank: position + 1,
                }
            })
            .collect();

        Ok(Evidence {
            document: snapshot.document,
            items,
        })
    }

    /// Return the snapshot's index if still valid, otherwise build and install a new one.
    ///
    /// Batches are sent one after another, in chunk order.
    pub async fn ensure_index(
        &self,
        snapshot: &DocumentSnapshot,
        store: &DocumentStore,
        question_ref: &str,
        credential: &ApiKey,
    ) -> Result<Arc<EmbeddingIndex>> {
        let model = self.embedder.model();

        if let Some(index) = &snapshot.index {
            if index.is_valid_for(snapshot.chunks.len(), model) {
                return Ok(Arc::clone(index));
            }
            debug!("Embedding index is stale, rebuilding");
        }

        let batch_size = self.config.batch_size.max(1);
        let batch_count = snapshot.chunks.len().div_ceil(batch_size);
        let mut vectors = Vec::with_capacity(snapshot.chunks.len());

        for (n, batch) in snapshot.chunks.chunks(batch_size).enumerate() {
            let request = EmbeddingRequest::new(model, batch.iter().map(|c| c.text.clone()).collect());
            let entry = CallEntry {
                call_type: CallType::Embedding,
                subtype: "index".to_string(),
                description: format!(
                    "Index {} batch {}/{}",
                    snapshot.document.display_name(),
                    n + 1,
                    batch_count
                ),
                question_ref: Some(question_ref.to_string()),
                context_count: batch.len(),
                payload_size: request.payload_size(),
            };

            match self.embed_recorded(entry, &request, credential).await {
                Ok(batch_vectors) => vectors.extend(batch_vectors),
                Err(e) => {
                    if matches!(e, DiligentError::EmbeddingMismatch { .. }) {
                        warn!("Dropping embedding index after count mismatch");
                        store.drop_index(snapshot.generation);
                    }
                    return Err(e);
                }
            }
        }

        let index = Arc::new(EmbeddingIndex::new(model, vectors));
        if store.install_index(snapshot.generation, Arc::clone(&index)) {
            info!("Embedded {} chunks in {} batches", index.len(), batch_count);
        } else {
            debug!("Document changed while indexing, index not installed");
        }
        Ok(index)
    }

    async fn embed_query(&self, query: String, question_ref: &str, credential: &ApiKey) -> Result<Vec<f32>> {
        let request = EmbeddingRequest::new(self.embedder.model(), vec![query]);
        let entry = CallEntry {
            call_type: CallType::Embedding,
            subtype: "query".to_string(),
            description: format!("Embed question {}", question_ref),
            question_ref: Some(question_ref.to_string()),
            context_count: 1,
            payload_size: request.payload_size(),
        };

        let mut vectors = self.embed_recorded(entry, &request, credential).await?;
        vectors.pop().ok_or(DiligentError::EmbeddingMismatch {
            expected: 1,
            actual: 0,
        })
    }

    /// One embedding call wrapped in a telemetry span. The reply must carry
    /// exactly one vector per input text.
    async fn embed_recorded(
        &self,
        entry: CallEntry,
        request: &EmbeddingRequest,
        credential: &ApiKey,
    ) -> Result<Vec<Vec<f32>>> {
        let span = self.ledger.begin(entry);

        let response = match self.embedder.embed(request, credential).await {
            Ok(response) => response,
            Err(e) => {
                span.fail(&e);
                return Err(e);
            }
        };

        span.annotate(TelemetryUpdate {
            http_status: Some(response.http_status),
            ..TelemetryUpdate::default()
        });

        if response.vectors.len() != request.input.len() {
            let err = DiligentError::EmbeddingMismatch {
                expected: request.input.len(),
                actual: response.vectors.len(),
            };
            span.fail(&err);
            return Err(err);
        }

        let dimensions = response.vectors.first().map(Vec::len).unwrap_or(0);
        span.succeed(
            response.usage,
            Some(format!("{} vectors x {} dimensions", response.vectors.len(), dimensions)),
            None,
        );
        Ok(response.vectors)
    }
}
