//! Test-only mock embedder and extractor.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::embedder::Embedder;
use crate::error::{ModelError, Result};
use crate::extractor::{Answer, AnswerExtractor};

#[derive(Debug, Clone)]
pub struct MockEmbedder {
    pub dimension: usize,
    /// Exact-text overrides; anything else gets `default_vector`.
    pub vectors: HashMap<String, Vec<f32>>,
    pub default_vector: Vec<f32>,
    pub fail: bool,
    /// Return one vector fewer than requested.
    pub drop_last: bool,
    /// Return a vector of the wrong length for the second input.
    pub ragged: bool,
    pub encode_calls: Arc<AtomicUsize>,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(4)
    }
}

impl MockEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: HashMap::new(),
            default_vector: vec![0.0; dimension],
            fail: false,
            drop_last: false,
            ragged: false,
            encode_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.encode_calls.load(Ordering::SeqCst)
    }
}

impl Embedder for MockEmbedder {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.encode_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ModelError::Inference("mock embed error".into()));
        }
        let mut out: Vec<Vec<f32>> = texts
            .iter()
            .map(|t| {
                self.vectors
                    .get(t)
                    .cloned()
                    .unwrap_or_else(|| self.default_vector.clone())
            })
            .collect();
        if self.ragged && out.len() > 1 {
            out[1].push(0.0);
        }
        if self.drop_last {
            out.pop();
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockExtractor {
    /// `None` makes the extractor abstain.
    pub answer: Option<String>,
    pub contexts: Arc<Mutex<Vec<String>>>,
}

impl MockExtractor {
    #[must_use]
    pub fn answering(answer: impl Into<String>) -> Self {
        Self {
            answer: Some(answer.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn abstaining() -> Self {
        Self::default()
    }

    /// Contexts seen so far, oldest first.
    #[must_use]
    pub fn seen_contexts(&self) -> Vec<String> {
        self.contexts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl AnswerExtractor for MockExtractor {
    async fn extract(&self, _question: &str, context: &str) -> Result<Answer> {
        self.contexts.lock().unwrap_or_else(PoisonError::into_inner).push(context.to_owned());
        if context.trim().is_empty() {
            return Err(ModelError::NoAnswer);
        }
        let text = self.answer.clone().ok_or(ModelError::NoAnswer)?;
        let start = context.find(&text).unwrap_or(0);
        Ok(Answer {
            end: start + text.len(),
            text,
            score: 1.0,
            start,
        })
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }
}
