//! Per-document cache of chunks and their embeddings.
//!
//! An entry is only reused while the document text, the chunking parameters and
//! the embedding model all match what produced it. Anything else is treated as
//! stale and dropped on lookup.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::chunker::{Chunk, ChunkerConfig};
use crate::types::DocumentId;

#[derive(Debug, Clone)]
pub struct CachedEmbeddings {
    pub content_hash: blake3::Hash,
    pub chunker: ChunkerConfig,
    pub model: String,
    pub chunks: Arc<Vec<Chunk>>,
    pub vectors: Arc<Vec<Vec<f32>>>,
}

impl CachedEmbeddings {
    #[must_use]
    pub fn new(
        text: &str,
        chunker: ChunkerConfig,
        model: &str,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Self {
        Self {
            content_hash: blake3::hash(text.as_bytes()),
            chunker,
            model: model.to_owned(),
            chunks: Arc::new(chunks),
            vectors: Arc::new(vectors),
        }
    }

    fn matches(&self, text: &str, chunker: ChunkerConfig, model: &str) -> bool {
        self.chunker == chunker
            && self.model == model
            && self.content_hash == blake3::hash(text.as_bytes())
    }
}

struct Slot {
    entry: CachedEmbeddings,
    inserted: u64,
}

#[derive(Default)]
struct Inner {
    slots: HashMap<DocumentId, Slot>,
    tick: u64,
}

pub struct EmbeddingCache {
    inner: RwLock<Inner>,
    capacity: usize,
}

impl EmbeddingCache {
    /// Create a cache holding at most `capacity` documents (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Look up a still-valid entry for `id`. A stale entry is evicted.
    #[must_use]
    pub fn get(
        &self,
        id: DocumentId,
        text: &str,
        chunker: ChunkerConfig,
        model: &str,
    ) -> Option<CachedEmbeddings> {
        {
            let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            let slot = inner.slots.get(&id)?;
            if slot.entry.matches(text, chunker, model) {
                return Some(slot.entry.clone());
            }
        }

        self.evict_stale(id, text, chunker, model)
    }

    /// Write-locked second look: another caller may have stored a fresh entry since
    /// the read lock was released.
    fn evict_stale(
        &self,
        id: DocumentId,
        text: &str,
        chunker: ChunkerConfig,
        model: &str,
    ) -> Option<CachedEmbeddings> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let slot = inner.slots.get(&id)?;
        if slot.entry.matches(text, chunker, model) {
            return Some(slot.entry.clone());
        }
        inner.slots.remove(&id);
        tracing::debug!(%id, "dropping stale cached embeddings");
        None
    }

    /// Insert or replace the entry for `id`, evicting the oldest entry when full.
    pub fn insert(&self, id: DocumentId, entry: CachedEmbeddings) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.tick += 1;
        let tick = inner.tick;

        if !inner.slots.contains_key(&id)
            && inner.slots.len() >= self.capacity
            && let Some(oldest) = inner
                .slots
                .iter()
                .min_by_key(|(_, slot)| slot.inserted)
                .map(|(id, _)| *id)
        {
            inner.slots.remove(&oldest);
            tracing::debug!(evicted = %oldest, "embedding cache full");
        }

        inner.slots.insert(
            id,
            Slot {
                entry,
                inserted: tick,
            },
        );
    }

    /// Returns `true` if an entry was removed.
    pub fn invalidate(&self, id: DocumentId) -> bool {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .slots
            .remove(&id)
            .is_some()
    }

    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .slots
            .clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .slots
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new(64)
    }
}

impl std::fmt::Debug for EmbeddingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
