//! Question answering over one document: retrieve, join, extract.

use std::sync::Arc;

use docqa_llm::{AnswerExtractor, Embedder};
use docqa_memory::DocumentId;
use serde::Serialize;

use crate::error::{QaError, Result};
use crate::retriever::{RetrievedChunk, Retriever};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AskOutcome {
    pub answer: String,
    pub score: f32,
    /// Number of chunks joined into the context.
    pub retrieved: usize,
}

pub struct QaPipeline<E: Embedder, X: AnswerExtractor> {
    retriever: Retriever<E>,
    extractor: Arc<X>,
    top_k: usize,
}

impl<E: Embedder, X: AnswerExtractor> QaPipeline<E, X> {
    #[must_use]
    pub fn new(retriever: Retriever<E>, extractor: Arc<X>, top_k: usize) -> Self {
        Self {
            retriever,
            extractor,
            top_k,
        }
    }

    /// Answer `question` from `text` using the configured `top_k`.
    ///
    /// # Errors
    ///
    /// Propagates retrieval and extraction failures unchanged.
    pub async fn ask(&self, text: &str, question: &str) -> Result<String> {
        Ok(self.ask_with(text, question, self.top_k).await?.answer)
    }

    /// # Errors
    ///
    /// Returns [`QaError::InvalidConfig`] if `k` is zero; otherwise propagates retrieval
    /// and extraction failures unchanged.
    pub async fn ask_with(&self, text: &str, question: &str, k: usize) -> Result<AskOutcome> {
        check_k(k)?;
        let retrieved = self.retriever.retrieve(text, question, k).await?;
        self.answer(question, &retrieved).await
    }

    /// Like [`QaPipeline::ask_with`] for a stored document, so chunk vectors can be cached.
    ///
    /// # Errors
    ///
    /// Propagates retrieval and extraction failures unchanged.
    pub async fn ask_document(
        &self,
        id: DocumentId,
        text: &str,
        question: &str,
        k: usize,
    ) -> Result<AskOutcome> {
        check_k(k)?;
        let retrieved = self
            .retriever
            .retrieve_document(id, text, question, k)
            .await?;
        self.answer(question, &retrieved).await
    }

    async fn answer(&self, question: &str, retrieved: &[RetrievedChunk]) -> Result<AskOutcome> {
        let context = join_context(retrieved);
        if context.trim().is_empty() {
            return Err(QaError::NoAnswerFound);
        }

        let answer = self
            .extractor
            .extract(question, &context)
            .await
            .map_err(QaError::extraction)?;
        tracing::debug!(
            retrieved = retrieved.len(),
            context_chars = context.chars().count(),
            score = answer.score,
            extractor = self.extractor.name(),
            "answer extracted"
        );

        Ok(AskOutcome {
            answer: answer.text,
            score: answer.score,
            retrieved: retrieved.len(),
        })
    }
}

fn check_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(QaError::InvalidConfig("k must be at least 1".into()));
    }
    Ok(())
}

/// Chunk texts joined with single spaces, nearest first.
#[must_use]
pub fn join_context(retrieved: &[RetrievedChunk]) -> String {
    retrieved
        .iter()
        .map(|r| r.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
