//! Error types for the question-answering pipeline.

use docqa_llm::ModelError;
use docqa_memory::document::DocumentError;
use docqa_memory::{ChunkError, IndexError, MemoryError};

/// Errors surfaced by retrieval, answer extraction, and document handling.
#[derive(Debug, thiserror::Error)]
pub enum QaError {
    /// Chunking parameters or other settings are unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The document produced no chunks.
    #[error("document is empty")]
    EmptyDocument,

    /// The question has no content to embed.
    #[error("question is empty")]
    EmptyQuestion,

    /// Vectors of different dimensions met in the index.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The embedder failed or returned the wrong number of vectors.
    #[error("embedding failed: {0}")]
    EmbeddingFailure(String),

    /// The extractor failed for a reason other than abstaining.
    #[error("answer extraction failed: {0}")]
    Inference(String),

    /// The extractor abstained or the context was empty.
    #[error("no answer found")]
    NoAnswerFound,

    /// A configured model could not be loaded.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("document {0} not found")]
    DocumentNotFound(i64),

    /// Reading or extracting an input file failed.
    #[error("document load failed: {0}")]
    Document(#[from] DocumentError),

    #[error("storage error: {0}")]
    Storage(#[from] MemoryError),
}

impl QaError {
    pub(crate) fn embedding(e: ModelError) -> Self {
        match e {
            ModelError::ModelLoad(msg) => Self::ModelUnavailable(msg),
            other => Self::EmbeddingFailure(other.to_string()),
        }
    }

    pub(crate) fn extraction(e: ModelError) -> Self {
        match e {
            ModelError::NoAnswer | ModelError::EmptyInput => Self::NoAnswerFound,
            ModelError::ModelLoad(msg) => Self::ModelUnavailable(msg),
            other => Self::Inference(other.to_string()),
        }
    }

    /// Whether the failure was caused by the caller's input rather than the service.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig(_)
                | Self::EmptyDocument
                | Self::EmptyQuestion
                | Self::Document(
                    DocumentError::UnsupportedFormat(_) | DocumentError::FileTooLarge(_)
                )
        )
    }
}

impl From<ChunkError> for QaError {
    fn from(e: ChunkError) -> Self {
        Self::InvalidConfig(e.to_string())
    }
}

impl From<IndexError> for QaError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::DimensionMismatch { expected, actual } => {
                Self::DimensionMismatch { expected, actual }
            }
        }
    }
}

/// Result type alias using `QaError`.
pub type Result<T> = std::result::Result<T, QaError>;
