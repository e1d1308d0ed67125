//! Dense retrieval over a single document: chunk, embed, index, query.

use std::sync::Arc;
use std::time::Instant;

use docqa_llm::Embedder;
use docqa_memory::{CachedEmbeddings, Chunk, ChunkerConfig, DocumentId, EmbeddingCache, FlatL2Index, TextSplitter};

use crate::error::{QaError, Result};

/// A chunk selected for a question, with its squared L2 distance to the question.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub distance: f32,
    pub chunk: Chunk,
}

pub struct Retriever<E: Embedder> {
    embedder: Arc<E>,
    splitter: TextSplitter,
    cache: Option<Arc<EmbeddingCache>>,
}

impl<E: Embedder> Retriever<E> {
    /// # Errors
    ///
    /// Returns [`QaError::InvalidConfig`] if the chunking parameters are invalid.
    pub fn new(embedder: Arc<E>, chunker: ChunkerConfig) -> Result<Self> {
        Ok(Self {
            embedder,
            splitter: TextSplitter::new(chunker)?,
            cache: None,
        })
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<EmbeddingCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Return up to `k` chunks of `text` nearest to `question`, nearest first.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::EmptyDocument`] for text without content,
    /// [`QaError::EmptyQuestion`] for a question without letters or digits, and
    /// propagates embedding and index failures.
    pub async fn retrieve(&self, text: &str, question: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        self.retrieve_inner(None, text, question, k).await
    }

    /// Like [`Retriever::retrieve`], reusing cached chunk vectors for a stored document.
    ///
    /// # Errors
    ///
    /// Same as [`Retriever::retrieve`].
    pub async fn retrieve_document(
        &self,
        id: DocumentId,
        text: &str,
        question: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        self.retrieve_inner(Some(id), text, question, k).await
    }

    async fn retrieve_inner(
        &self,
        id: Option<DocumentId>,
        text: &str,
        question: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        if text.trim().is_empty() {
            return Err(QaError::EmptyDocument);
        }
        if !question.chars().any(char::is_alphanumeric) {
            return Err(QaError::EmptyQuestion);
        }

        let started = Instant::now();
        let (chunks, vectors) = self.document_vectors(id, text).await?;
        let index = FlatL2Index::build(&vectors)?;

        let query = self
            .embedder
            .encode_one(question)
            .await
            .map_err(QaError::embedding)?;
        let hits = index.query(&query, k)?;

        tracing::debug!(
            chunks = chunks.len(),
            k,
            hits = hits.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "retrieval complete"
        );

        Ok(hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                distance: hit.distance,
                chunk: chunks[hit.position].clone(),
            })
            .collect())
    }

    async fn document_vectors(
        &self,
        id: Option<DocumentId>,
        text: &str,
    ) -> Result<(Arc<Vec<Chunk>>, Arc<Vec<Vec<f32>>>)> {
        let chunker = self.splitter.config();
        let model = self.embedder.name();

        if let (Some(id), Some(cache)) = (id, &self.cache)
            && let Some(hit) = cache.get(id, text, chunker, model)
        {
            tracing::debug!(%id, chunks = hit.chunks.len(), "reusing cached embeddings");
            return Ok((hit.chunks, hit.vectors));
        }

        let chunks = self.splitter.split(text);
        if chunks.is_empty() {
            return Err(QaError::EmptyDocument);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self
            .embedder
            .encode(&texts)
            .await
            .map_err(QaError::embedding)?;
        if vectors.len() != chunks.len() {
            return Err(QaError::EmbeddingFailure(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        if let (Some(id), Some(cache)) = (id, &self.cache) {
            let entry = CachedEmbeddings::new(text, chunker, model, chunks, vectors);
            let out = (Arc::clone(&entry.chunks), Arc::clone(&entry.vectors));
            cache.insert(id, entry);
            return Ok(out);
        }

        Ok((Arc::new(chunks), Arc::new(vectors)))
    }
}
