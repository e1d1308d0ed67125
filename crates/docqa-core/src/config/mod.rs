mod env;
mod types;


pub use types::*;

use std::path::Path;

use anyhow::Context;
use docqa_memory::ChunkerConfig;

use crate::error::QaError;

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or if the
    /// resulting configuration fails [`Config::validate`].
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`QaError::InvalidConfig`] for an overlap not smaller than the chunk
    /// size, a zero `top_k`, or a zero embedding dimension.
    pub fn validate(&self) -> Result<(), QaError> {
        self.chunker()?;
        if self.retrieval.top_k == 0 {
            return Err(QaError::InvalidConfig("retrieval.top_k must be at least 1".into()));
        }
        if self.embedding.dimension == 0 {
            return Err(QaError::InvalidConfig(
                "embedding.dimension must be at least 1".into(),
            ));
        }
        if self.extractor.max_answer_tokens == 0 {
            return Err(QaError::InvalidConfig(
                "extractor.max_answer_tokens must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Chunking parameters from the `[retrieval]` section.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::InvalidConfig`] if the overlap is not smaller than the chunk size.
    pub fn chunker(&self) -> Result<ChunkerConfig, QaError> {
        Ok(ChunkerConfig::new(
            self.retrieval.chunk_size,
            self.retrieval.chunk_overlap,
        )?)
    }
}
