use std::sync::Arc;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};

use super::hub;
use crate::embedder::Embedder;
use crate::error::{ModelError, Result};

const BATCH_SIZE: usize = 32;
const MAX_TOKENS: usize = 512;

/// BERT sentence encoder with masked mean pooling and L2 normalization.
#[derive(Clone)]
pub struct CandleEmbedder {
    model: Arc<BertModel>,
    tokenizer: Arc<Tokenizer>,
    device: Device,
    dimension: usize,
    name: String,
}

impl std::fmt::Debug for CandleEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleEmbedder")
            .field("name", &self.name)
            .field("dimension", &self.dimension)
            .field("device", &super::device_name(&self.device))
            .finish_non_exhaustive()
    }
}

impl CandleEmbedder {
    /// Load a BERT embedding model from a local directory or the `HuggingFace` Hub.
    ///
    /// # Errors
    ///
    /// Returns an error if model download or loading fails.
    pub fn load(model: &str, device: &Device) -> Result<Self> {
        let files = hub::fetch(model)?;

        let config_str = std::fs::read_to_string(&files.config)
            .map_err(|e| ModelError::ModelLoad(format!("failed to read BERT config: {e}")))?;
        let config: BertConfig = serde_json::from_str(&config_str)?;
        let dimension = hub::hidden_size(&config_str)?;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| ModelError::ModelLoad(format!("failed to load tokenizer: {e}")))?;
        tokenizer.with_padding(Some(PaddingParams::default()));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKENS,
                ..TruncationParams::default()
            }))
            .map_err(|e| ModelError::ModelLoad(format!("failed to configure tokenizer: {e}")))?;

        // SAFETY: the safetensors file comes from the hf-hub cache or a local model
        // directory and is not modified while the VarBuilder is alive
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights], DType::F32, device)?
        };
        let bert = BertModel::load(vb, &config)?;

        tracing::info!(model, dimension, "loaded candle embedding model");

        Ok(Self {
            model: Arc::new(bert),
            tokenizer: Arc::new(tokenizer),
            device: device.clone(),
            dimension,
            name: model.to_owned(),
        })
    }

    /// Embed texts in fixed-size batches.
    ///
    /// # Errors
    ///
    /// Returns an error if any text is empty, or tokenization or the forward pass fails.
    /// Whitespace-only text still embeds, as `[CLS] [SEP]`.
    pub fn embed_sync(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.iter().any(String::is_empty) {
            return Err(ModelError::EmptyInput);
        }

        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            out.extend(self.embed_batch(batch)?);
        }
        Ok(out)
    }

    fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(batch.to_vec(), true)
            .map_err(|e| ModelError::Inference(format!("tokenizer encode failed: {e}")))?;

        let ids = encodings
            .iter()
            .map(|e| Tensor::new(e.get_ids(), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let masks = encodings
            .iter()
            .map(|e| Tensor::new(e.get_attention_mask(), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;

        let input_ids = Tensor::stack(&ids, 0)?;
        let attention_mask = Tensor::stack(&masks, 0)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean pooling over real tokens only
        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?;
        let pooled = summed.broadcast_div(&counts)?;

        // L2 normalization
        let norm = pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
        let normalized = pooled.broadcast_div(&norm)?;

        normalized.to_vec2::<f32>().map_err(ModelError::Candle)
    }
}

impl Embedder for CandleEmbedder {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = self.clone();
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || model.embed_sync(&texts))
            .await
            .map_err(|e| ModelError::Inference(format!("candle embedding task failed: {e}")))?
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.name
    }
}
