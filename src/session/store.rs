//! Session-scoped document store.
//!
//! Holds the current [`Document`], its chunks and its embedding index. A new
//! document or an explicit clear invalidates all three together and bumps the
//! generation, so an index built for an older document can never be installed
//! over a newer one.

use crate::chunking::{chunk_text, Chunk, ChunkingConfig};
use crate::document::Document;
use crate::retrieval::EmbeddingIndex;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

#[derive(Debug)]
struct Loaded {
    document: Arc<Document>,
    chunks: Arc<Vec<Chunk>>,
    index: Option<Arc<EmbeddingIndex>>,
}

#[derive(Debug, Default)]
struct StoreState {
    generation: u64,
    loaded: Option<Loaded>,
}

/// Consistent view of the store at one point in time.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub document: Arc<Document>,
    pub chunks: Arc<Vec<Chunk>>,
    pub index: Option<Arc<EmbeddingIndex>>,
    pub generation: u64,
}

/// Owner of the document, its chunks and its embedding index.
#[derive(Debug)]
pub struct DocumentStore {
    state: RwLock<StoreState>,
    chunking: ChunkingConfig,
}

impl DocumentStore {
    pub fn new(chunking: ChunkingConfig) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            chunking,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the document wholesale. Chunks are recomputed and the index dropped.
    pub fn replace(&self, document: Document) -> Arc<Document> {
        let chunks = chunk_text(&document.content, self.chunking);
        info!(
            "Loaded document {} ({} characters, {} chunks)",
            document.display_name(),
            document.char_count(),
            chunks.len()
        );

        let document = Arc::new(document);
        let mut state = self.write();
        state.generation += 1;
        state.loaded = Some(Loaded {
            document: Arc::clone(&document),
            chunks: Arc::new(chunks),
            index: None,
        });
        document
    }

    /// Forget the document, its chunks and its index.
    pub fn invalidate(&self) {
        let mut state = self.write();
        state.generation += 1;
        if state.loaded.take().is_some() {
            debug!("Document cleared");
        }
    }

    /// Current document, chunks and index, if a document is loaded.
    pub fn snapshot(&self) -> Option<DocumentSnapshot> {
        let state = self.read();
        state.loaded.as_ref().map(|loaded| DocumentSnapshot {
            document: Arc::clone(&loaded.document),
            chunks: Arc::clone(&loaded.chunks),
            index: loaded.index.clone(),
            generation: state.generation,
        })
    }

    /// Install an index built from the snapshot of `generation`.
    ///
    /// Returns `false`, leaving the store untouched, if the document changed since.
    pub fn install_index(&self, generation: u64, index: Arc<EmbeddingIndex>) -> bool {
        let mut state = self.write();
        if state.generation != generation {
            return false;
        }
        match state.loaded.as_mut() {
            Some(loaded) => {
                loaded.index = Some(index);
                true
            }
            None => false,
        }
    }

    /// Drop the index of `generation` so the next lookup rebuilds it.
    pub fn drop_index(&self, generation: u64) {
        let mut state = self.write();
        if state.generation == generation {
            if let Some(loaded) = state.loaded.as_mut() {
                loaded.index = None;
            }
        }
    }

    /// The loaded document, if any.
    pub fn document(&self) -> Option<Arc<Document>> {
        self.read().loaded.as_ref().map(|l| Arc::clone(&l.document))
    }

    /// Whether a document with at least one chunk is loaded.
    pub fn has_content(&self) -> bool {
        self.read()
            .loaded
            .as_ref()
            .is_some_and(|l| !l.document.is_empty() && !l.chunks.is_empty())
    }

    /// Counter bumped by every replace and clear.
    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    pub fn chunking(&self) -> ChunkingConfig {
        self.chunking
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new(ChunkingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(text: &str) -> Document {
        Document::ingest("policy.txt", text.len() as u64, text, 15_000)
    }

    #[test]
    fn test_replace_computes_chunks() {
        let store = DocumentStore::default();
        assert!(store.snapshot().is_none());
        assert!(!store.has_content());

        let loaded = store.replace(document("Our company has no due diligence policy."));
        assert_eq!(loaded.name, "policy.txt");
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.chunks.len(), 1);
        assert!(snapshot.index.is_none());
        assert!(store.has_content());
    }

    #[test]
    fn test_index_is_discarded_for_old_generation() {
        let store = DocumentStore::default();
        store.replace(document("first"));
        let old = store.snapshot().unwrap().generation;

        store.replace(document("second"));
        let index = Arc::new(EmbeddingIndex::new("m", vec![vec![1.0]]));
        assert!(!store.install_index(old, Arc::clone(&index)));
        assert!(store.snapshot().unwrap().index.is_none());

        let current = store.generation();
        assert!(store.install_index(current, index));
        assert!(store.snapshot().unwrap().index.is_some());
    }

    #[test]
    fn test_invalidate_clears_everything() {
        let store = DocumentStore::default();
        store.replace(document("text"));
        let generation = store.generation();
        store.install_index(generation, Arc::new(EmbeddingIndex::new("m", vec![vec![1.0]])));

        store.invalidate();
        assert!(store.snapshot().is_none());
        assert!(store.document().is_none());
        assert!(!store.install_index(generation, Arc::new(EmbeddingIndex::new("m", vec![]))));
    }

    #[test]
    fn test_drop_index() {
        let store = DocumentStore::default();
        store.replace(document("text"));
        let generation = store.generation();
        store.install_index(generation, Arc::new(EmbeddingIndex::new("m", vec![vec![1.0]])));
        store.drop_index(generation);
        assert!(store.snapshot().unwrap().index.is_none());
    }

    #[test]
    fn test_blank_document_has_no_content() {
        let store = DocumentStore::default();
        store.replace(document("   \n\n  "));
        assert!(store.document().is_some());
        assert!(!store.has_content());
    }
}
