use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    600
}

fn default_top_k() -> usize {
    20
}

fn default_true() -> bool {
    true
}

fn default_cache_capacity() -> usize {
    64
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Window length in chars.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Chars shared by consecutive windows. Must be smaller than `chunk_size`.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Reuse chunk embeddings across questions about the same stored document.
    #[serde(default = "default_true")]
    pub cache_embeddings: bool,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            cache_embeddings: true,
            cache_capacity: default_cache_capacity(),
        }
    }
}

/// Sentence embedding backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Feature-hashed bag of words; no model download.
    #[default]
    Hashing,
    Candle,
}

fn default_embedding_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".into()
}

fn default_dimension() -> usize {
    384
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,
    /// Hub repo id or local directory for the candle backend.
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Vector size for the hashing backend. Candle models report their own.
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            model: default_embedding_model(),
            dimension: default_dimension(),
        }
    }
}

/// Answer extraction backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorBackend {
    #[default]
    Lexical,
    Candle,
}

fn default_extractor_model() -> String {
    "deepset/minilm-uncased-squad2".into()
}

fn default_max_answer_tokens() -> usize {
    15
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExtractorConfig {
    #[serde(default)]
    pub backend: ExtractorBackend,
    #[serde(default = "default_extractor_model")]
    pub model: String,
    #[serde(default = "default_max_answer_tokens")]
    pub max_answer_tokens: usize,
    #[serde(default)]
    pub min_score: f32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            backend: ExtractorBackend::default(),
            model: default_extractor_model(),
            max_answer_tokens: default_max_answer_tokens(),
            min_score: 0.0,
        }
    }
}

fn default_sqlite_path() -> String {
    "docqa.db".into()
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_file_size() -> u64 {
    docqa_memory::document::DEFAULT_MAX_FILE_SIZE
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
    /// Raw uploads are kept here as `<uuid>.<ext>`.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: default_sqlite_path(),
            upload_dir: default_upload_dir(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_gateway_bind() -> String {
    "127.0.0.1".into()
}

fn default_gateway_port() -> u16 {
    8000
}

fn default_gateway_max_body() -> usize {
    52_428_800
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost".into(),
        "http://localhost:8080".into(),
        "http://localhost:5173".into(),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    #[serde(default = "default_gateway_max_body")]
    pub max_body_size: usize,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_gateway_bind(),
            port: default_gateway_port(),
            max_body_size: default_gateway_max_body(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_ask_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_ask_timeout")]
    pub ask_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            ask_secs: default_ask_timeout(),
        }
    }
}
