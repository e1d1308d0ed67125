//! Stored-document question answering shared by the HTTP gateway and the CLI.

use std::path::Path;
use std::sync::Arc;

use docqa_memory::document::loader_for_path;
use docqa_memory::{DocumentId, DocumentStore, DocumentSummary, EmbeddingCache, StoredDocument};

use crate::config::Config;
use crate::error::{QaError, Result};
use crate::models::SharedModels;
use crate::pipeline::{AskOutcome, QaPipeline};
use crate::retriever::Retriever;

#[derive(Debug, Clone)]
pub struct DocQa {
    config: Arc<Config>,
    store: DocumentStore,
    models: Arc<SharedModels>,
    cache: Option<Arc<EmbeddingCache>>,
}

impl DocQa {
    /// Open the configured document store. Models load lazily on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the store cannot be opened.
    pub async fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let store = DocumentStore::new(&config.storage.sqlite_path).await?;
        let models = Arc::new(SharedModels::new(&config));
        Ok(Self::new(config, store, models))
    }

    #[must_use]
    pub fn new(config: Config, store: DocumentStore, models: Arc<SharedModels>) -> Self {
        let cache = config
            .retrieval
            .cache_embeddings
            .then(|| Arc::new(EmbeddingCache::new(config.retrieval.cache_capacity)));
        Self {
            config: Arc::new(config),
            store,
            models,
            cache,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn models(&self) -> &Arc<SharedModels> {
        &self.models
    }

    #[must_use]
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Extract text from the file at `path` and store it under `filename`.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::Document`] for unsupported, oversized or unreadable files and
    /// [`QaError::Storage`] if the insert fails.
    pub async fn ingest_file(&self, path: &Path, filename: &str) -> Result<DocumentId> {
        let loader = loader_for_path(path, self.config.storage.max_file_size)?;
        let document = loader.load(path).await?;
        let id = self.store.insert(filename, &document.content).await?;
        tracing::info!(
            %id,
            filename,
            content_type = %document.metadata.content_type,
            chars = document.content.chars().count(),
            "document stored"
        );
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns [`QaError::Storage`] if the insert fails.
    pub async fn ingest_text(&self, filename: &str, text: &str) -> Result<DocumentId> {
        let id = self.store.insert(filename, text).await?;
        tracing::info!(%id, filename, chars = text.chars().count(), "document stored");
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns [`QaError::DocumentNotFound`] for an unknown id.
    pub async fn document(&self, id: DocumentId) -> Result<StoredDocument> {
        self.store
            .get(id)
            .await?
            .ok_or(QaError::DocumentNotFound(id.0))
    }

    /// # Errors
    ///
    /// Returns [`QaError::Storage`] if the query fails.
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        Ok(self.store.list().await?)
    }

    /// Delete a stored document and drop its cached embeddings.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::DocumentNotFound`] for an unknown id.
    pub async fn delete_document(&self, id: DocumentId) -> Result<()> {
        if let Some(cache) = &self.cache {
            cache.invalidate(id);
        }
        if self.store.delete(id).await? {
            tracing::info!(%id, "document deleted");
            Ok(())
        } else {
            Err(QaError::DocumentNotFound(id.0))
        }
    }

    /// Answer a question about a stored document. `k` defaults to `retrieval.top_k`.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::DocumentNotFound`] for an unknown id and propagates
    /// pipeline failures.
    pub async fn ask_document(
        &self,
        id: DocumentId,
        question: &str,
        k: Option<usize>,
    ) -> Result<AskOutcome> {
        let document = self.document(id).await?;
        let pipeline = self.pipeline().await?;
        let k = self.top_k(k)?;
        pipeline
            .ask_document(id, &document.text_content, question, k)
            .await
    }

    /// Answer a question about text that is not stored.
    ///
    /// # Errors
    ///
    /// Propagates pipeline failures.
    pub async fn ask_text(&self, text: &str, question: &str, k: Option<usize>) -> Result<AskOutcome> {
        let pipeline = self.pipeline().await?;
        let k = self.top_k(k)?;
        pipeline.ask_with(text, question, k).await
    }

    fn top_k(&self, k: Option<usize>) -> Result<usize> {
        match k {
            Some(0) => Err(QaError::InvalidConfig("k must be at least 1".into())),
            Some(k) => Ok(k),
            None => Ok(self.config.retrieval.top_k),
        }
    }

    async fn pipeline(
        &self,
    ) -> Result<QaPipeline<docqa_llm::AnyEmbedder, docqa_llm::AnyExtractor>> {
        let embedder = self.models.embedder().await?;
        let extractor = self.models.extractor().await?;
        let mut retriever = Retriever::new(embedder, self.config.chunker()?)?;
        if let Some(cache) = &self.cache {
            retriever = retriever.with_cache(Arc::clone(cache));
        }
        Ok(QaPipeline::new(
            retriever,
            extractor,
            self.config.retrieval.top_k,
        ))
    }
}

#[cfg(test)]
mod tests {
    use docqa_llm::mock::{MockEmbedder, MockExtractor};
    use docqa_llm::{AnyEmbedder, AnyExtractor};

    use super::*;

    const DOC: &str = "The cat sat on the mat. The dog ran in the park.";

    fn small_chunks() -> Config {
        let mut config = Config::default();
        config.storage.sqlite_path = ":memory:".into();
        config.retrieval.chunk_size = 30;
        config.retrieval.chunk_overlap = 10;
        config
    }

    async fn offline() -> DocQa {
        DocQa::open(small_chunks()).await.unwrap()
    }

    #[tokio::test]
    async fn ask_stored_document() {
        let qa = offline().await;
        let id = qa.ingest_text("pets.txt", DOC).await.unwrap();
        let outcome = qa
            .ask_document(id, "Where did the dog run?", None)
            .await
            .unwrap();
        assert!(outcome.answer.contains("park"));
    }

    #[tokio::test]
    async fn ask_unknown_document() {
        let qa = offline().await;
        let err = qa.ask_document(DocumentId(42), "Where?", None).await.unwrap_err();
        assert!(matches!(err, QaError::DocumentNotFound(42)));
    }

    #[tokio::test]
    async fn ask_text_without_storing() {
        let qa = offline().await;
        let outcome = qa.ask_text(DOC, "Where did the dog run?", Some(1)).await.unwrap();
        assert_eq!(outcome.retrieved, 1);
        assert!(qa.list_documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_k_rejected() {
        let qa = offline().await;
        let err = qa.ask_text(DOC, "Where?", Some(0)).await.unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn ingest_file_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pets.md");
        std::fs::write(&path, DOC).unwrap();

        let qa = offline().await;
        let id = qa.ingest_file(&path, "pets.md").await.unwrap();
        let docs = qa.list_documents().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, id);
        assert_eq!(qa.document(id).await.unwrap().text_content, DOC);
    }

    #[tokio::test]
    async fn ingest_unsupported_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, [0u8, 1, 2]).unwrap();

        let err = offline().await.ingest_file(&path, "photo.png").await.unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn delete_invalidates_cache() {
        let embedder = MockEmbedder::new(4);
        let calls = embedder.clone();
        let models = Arc::new(SharedModels::preloaded(
            AnyEmbedder::Mock(embedder),
            AnyExtractor::Mock(MockExtractor::answering("park")),
        ));
        let store = DocumentStore::new(":memory:").await.unwrap();
        let qa = DocQa::new(small_chunks(), store, models);

        let id = qa.ingest_text("pets.txt", DOC).await.unwrap();
        qa.ask_document(id, "Where?", None).await.unwrap();
        qa.ask_document(id, "Where?", None).await.unwrap();
        assert_eq!(calls.calls(), 3);

        qa.delete_document(id).await.unwrap();
        assert!(matches!(
            qa.delete_document(id).await,
            Err(QaError::DocumentNotFound(_))
        ));
        assert!(matches!(
            qa.ask_document(id, "Where?", None).await,
            Err(QaError::DocumentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn cache_disabled_re_embeds() {
        let embedder = MockEmbedder::new(4);
        let calls = embedder.clone();
        let models = Arc::new(SharedModels::preloaded(
            AnyEmbedder::Mock(embedder),
            AnyExtractor::Mock(MockExtractor::answering("park")),
        ));
        let mut config = small_chunks();
        config.retrieval.cache_embeddings = false;
        let qa = DocQa::new(config, DocumentStore::new(":memory:").await.unwrap(), models);

        let id = qa.ingest_text("pets.txt", DOC).await.unwrap();
        qa.ask_document(id, "Where?", None).await.unwrap();
        qa.ask_document(id, "Where?", None).await.unwrap();
        assert_eq!(calls.calls(), 4);
    }
}
