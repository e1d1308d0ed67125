//! Process-wide model handles, loaded on first use.

use std::sync::Arc;

use docqa_llm::hashing::HashingEmbedder;
use docqa_llm::lexical::LexicalExtractor;
use docqa_llm::{AnyEmbedder, AnyExtractor, Embedder, AnswerExtractor};
use tokio::sync::OnceCell;

use crate::config::{Config, EmbeddingBackend, EmbeddingConfig, ExtractorBackend, ExtractorConfig};
use crate::error::{QaError, Result};

/// Lazily loads the configured embedder and extractor once, then hands out clones
/// of the same `Arc` to every caller.
pub struct SharedModels {
    embedding: EmbeddingConfig,
    extraction: ExtractorConfig,
    embedder: OnceCell<Arc<AnyEmbedder>>,
    extractor: OnceCell<Arc<AnyExtractor>>,
}

impl SharedModels {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            embedding: config.embedding.clone(),
            extraction: config.extractor.clone(),
            embedder: OnceCell::new(),
            extractor: OnceCell::new(),
        }
    }

    /// Use already-built backends instead of loading from config.
    #[must_use]
    pub fn preloaded(embedder: AnyEmbedder, extractor: AnyExtractor) -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            extraction: ExtractorConfig::default(),
            embedder: OnceCell::new_with(Some(Arc::new(embedder))),
            extractor: OnceCell::new_with(Some(Arc::new(extractor))),
        }
    }

    /// # Errors
    ///
    /// Returns [`QaError::ModelUnavailable`] if the backend cannot be loaded.
    /// A failed load is retried by the next caller.
    pub async fn embedder(&self) -> Result<Arc<AnyEmbedder>> {
        self.embedder
            .get_or_try_init(|| async {
                let embedder = load_embedder(&self.embedding).await?;
                tracing::info!(
                    model = embedder.name(),
                    dimension = embedder.dimension(),
                    "embedder ready"
                );
                Ok(Arc::new(embedder))
            })
            .await
            .map(Arc::clone)
    }

    /// # Errors
    ///
    /// Returns [`QaError::ModelUnavailable`] if the backend cannot be loaded.
    pub async fn extractor(&self) -> Result<Arc<AnyExtractor>> {
        self.extractor
            .get_or_try_init(|| async {
                let extractor = load_extractor(&self.extraction).await?;
                tracing::info!(model = extractor.name(), "extractor ready");
                Ok(Arc::new(extractor))
            })
            .await
            .map(Arc::clone)
    }

    /// Load both models now rather than on the first question.
    ///
    /// # Errors
    ///
    /// Returns the first load failure.
    pub async fn warm_up(&self) -> Result<()> {
        self.embedder().await?;
        self.extractor().await?;
        Ok(())
    }
}

impl std::fmt::Debug for SharedModels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedModels")
            .field("embedder_loaded", &self.embedder.initialized())
            .field("extractor_loaded", &self.extractor.initialized())
            .finish_non_exhaustive()
    }
}

async fn load_embedder(config: &EmbeddingConfig) -> Result<AnyEmbedder> {
    match config.backend {
        EmbeddingBackend::Hashing => HashingEmbedder::new(config.dimension)
            .map(AnyEmbedder::Hashing)
            .map_err(|e| QaError::InvalidConfig(e.to_string())),
        #[cfg(feature = "candle")]
        EmbeddingBackend::Candle => {
            use docqa_llm::candle_provider::{CandleEmbedder, select_device};

            let model = config.model.clone();
            tracing::info!(%model, "loading candle embedder");
            let embedder = tokio::task::spawn_blocking(move || {
                CandleEmbedder::load(&model, &select_device())
            })
            .await
            .map_err(|e| QaError::ModelUnavailable(e.to_string()))?
            .map_err(|e| QaError::ModelUnavailable(e.to_string()))?;
            Ok(AnyEmbedder::Candle(embedder))
        }
        #[cfg(not(feature = "candle"))]
        EmbeddingBackend::Candle => Err(QaError::ModelUnavailable(
            "embedding backend \"candle\" needs a build with the `candle` feature".into(),
        )),
    }
}

async fn load_extractor(config: &ExtractorConfig) -> Result<AnyExtractor> {
    match config.backend {
        ExtractorBackend::Lexical => Ok(AnyExtractor::Lexical(LexicalExtractor::new())),
        #[cfg(feature = "candle")]
        ExtractorBackend::Candle => {
            use docqa_llm::candle_provider::{CandleExtractor, QaSettings, select_device};

            let model = config.model.clone();
            let settings = QaSettings {
                max_answer_tokens: config.max_answer_tokens,
                min_score: config.min_score,
                ..QaSettings::default()
            };
            tracing::info!(%model, "loading candle extractor");
            let extractor = tokio::task::spawn_blocking(move || {
                CandleExtractor::load(&model, settings, &select_device())
            })
            .await
            .map_err(|e| QaError::ModelUnavailable(e.to_string()))?
            .map_err(|e| QaError::ModelUnavailable(e.to_string()))?;
            Ok(AnyExtractor::Candle(extractor))
        }
        #[cfg(not(feature = "candle"))]
        ExtractorBackend::Candle => Err(QaError::ModelUnavailable(
            "extractor backend \"candle\" needs a build with the `candle` feature".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use docqa_llm::mock::{MockEmbedder, MockExtractor};

    use super::*;

    #[tokio::test]
    async fn default_config_loads_offline_backends() {
        let models = SharedModels::new(&Config::default());
        let embedder = models.embedder().await.unwrap();
        assert_eq!(embedder.dimension(), 384);
        assert_eq!(embedder.name(), "hashing-bow-384");
        let extractor = models.extractor().await.unwrap();
        assert_eq!(extractor.name(), "lexical-overlap");
    }

    #[tokio::test]
    async fn same_instance_is_shared() {
        let models = SharedModels::new(&Config::default());
        let a = models.embedder().await.unwrap();
        let b = models.embedder().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn concurrent_first_use_loads_once() {
        let models = Arc::new(SharedModels::new(&Config::default()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let models = Arc::clone(&models);
                tokio::spawn(async move { models.extractor().await.unwrap() })
            })
            .collect();
        let mut loaded = Vec::new();
        for h in handles {
            loaded.push(h.await.unwrap());
        }
        assert!(loaded.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn preloaded_backends_are_used() {
        let models = SharedModels::preloaded(
            AnyEmbedder::Mock(MockEmbedder::new(8)),
            AnyExtractor::Mock(MockExtractor::answering("x")),
        );
        assert_eq!(models.embedder().await.unwrap().dimension(), 8);
        assert_eq!(models.extractor().await.unwrap().name(), "mock");
    }

    #[tokio::test]
    async fn hashing_dimension_follows_config() {
        let mut config = Config::default();
        config.embedding.dimension = 64;
        let models = SharedModels::new(&config);
        assert_eq!(models.embedder().await.unwrap().dimension(), 64);
    }

    #[cfg(not(feature = "candle"))]
    #[tokio::test]
    async fn candle_without_feature_is_unavailable() {
        let mut config = Config::default();
        config.embedding.backend = EmbeddingBackend::Candle;
        config.extractor.backend = ExtractorBackend::Candle;
        let models = SharedModels::new(&config);
        assert!(matches!(models.embedder().await, Err(QaError::ModelUnavailable(_))));
        assert!(matches!(models.warm_up().await, Err(QaError::ModelUnavailable(_))));
    }
}
