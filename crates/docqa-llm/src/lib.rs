//! Embedding and extractive question-answering backends.

pub mod any;
#[cfg(feature = "candle")]
pub mod candle_provider;
pub mod embedder;
pub mod error;
pub mod extractor;
pub mod hashing;
pub mod lexical;
#[cfg(feature = "mock")]
pub mod mock;
mod text;

pub use any::{AnyEmbedder, AnyExtractor};
pub use embedder::Embedder;
pub use error::ModelError;
pub use extractor::{Answer, AnswerExtractor};
