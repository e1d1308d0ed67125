//! Document chunking, call-scoped vector search, and document persistence.

pub mod chunker;
pub mod document;
pub mod embedding_cache;
pub mod error;
pub mod sqlite;
pub mod types;
pub mod vector_index;

pub use chunker::{Chunk, ChunkError, ChunkerConfig, TextSplitter};
pub use embedding_cache::{CachedEmbeddings, EmbeddingCache};
pub use error::MemoryError;
pub use sqlite::{DocumentStore, DocumentSummary, StoredDocument};
pub use types::DocumentId;
pub use vector_index::{FlatL2Index, IndexError, Neighbor};
