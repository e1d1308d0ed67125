use std::sync::Arc;

use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{Linear, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;

use super::hub;
use crate::error::{ModelError, Result};
use crate::extractor::{Answer, AnswerExtractor};

const MAX_QUESTION_TOKENS: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct QaSettings {
    /// Tokens per window including `[CLS]`, the question, and both `[SEP]`s.
    pub max_seq_len: usize,
    /// Context tokens shared by consecutive windows.
    pub doc_stride: usize,
    pub max_answer_tokens: usize,
    /// Spans scoring below this make the extractor abstain.
    pub min_score: f32,
}

impl Default for QaSettings {
    fn default() -> Self {
        Self {
            max_seq_len: 384,
            doc_stride: 128,
            max_answer_tokens: 15,
            min_score: 0.0,
        }
    }
}

/// BERT encoder with a two-logit `qa_outputs` head scoring answer start and end.
#[derive(Clone)]
pub struct CandleExtractor {
    model: Arc<BertModel>,
    head: Arc<Linear>,
    tokenizer: Arc<Tokenizer>,
    device: Device,
    settings: QaSettings,
    cls_id: u32,
    sep_id: u32,
    name: String,
}

impl std::fmt::Debug for CandleExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleExtractor")
            .field("name", &self.name)
            .field("settings", &self.settings)
            .field("device", &super::device_name(&self.device))
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Span {
    score: f32,
    first_token: usize,
    last_token: usize,
}

impl CandleExtractor {
    /// Load a `BertForQuestionAnswering` checkpoint from a local directory or the
    /// `HuggingFace` Hub.
    ///
    /// # Errors
    ///
    /// Returns an error if download, tokenizer, or weight loading fails.
    pub fn load(model: &str, settings: QaSettings, device: &Device) -> Result<Self> {
        if settings.max_seq_len <= MAX_QUESTION_TOKENS + 3 {
            return Err(ModelError::ModelLoad(format!(
                "max_seq_len must exceed {}",
                MAX_QUESTION_TOKENS + 3
            )));
        }

        let files = hub::fetch(model)?;
        let config_str = std::fs::read_to_string(&files.config)
            .map_err(|e| ModelError::ModelLoad(format!("failed to read BERT config: {e}")))?;
        let config: BertConfig = serde_json::from_str(&config_str)?;
        let hidden = hub::hidden_size(&config_str)?;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| ModelError::ModelLoad(format!("failed to load tokenizer: {e}")))?;
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(None)
            .map_err(|e| ModelError::ModelLoad(format!("failed to configure tokenizer: {e}")))?;
        let special = |token: &str| {
            tokenizer
                .token_to_id(token)
                .ok_or_else(|| ModelError::ModelLoad(format!("tokenizer has no {token} token")))
        };
        let cls_id = special("[CLS]")?;
        let sep_id = special("[SEP]")?;

        // SAFETY: the safetensors file comes from the hf-hub cache or a local model
        // directory and is not modified while the VarBuilder is alive
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights], DType::F32, device)?
        };
        let bert = BertModel::load(vb.clone(), &config)?;
        let head = candle_nn::linear(hidden, 2, vb.pp("qa_outputs"))?;

        tracing::info!(model, "loaded candle question-answering model");

        Ok(Self {
            model: Arc::new(bert),
            head: Arc::new(head),
            tokenizer: Arc::new(tokenizer),
            device: device.clone(),
            settings,
            cls_id,
            sep_id,
            name: model.to_owned(),
        })
    }

    /// # Errors
    ///
    /// Returns [`ModelError::NoAnswer`] for blank context or when the best span scores
    /// below `min_score`; inference errors otherwise.
    pub fn extract_sync(&self, question: &str, context: &str) -> Result<Answer> {
        if context.trim().is_empty() {
            return Err(ModelError::NoAnswer);
        }

        let encode = |text: &str| {
            self.tokenizer
                .encode(text, false)
                .map_err(|e| ModelError::Inference(format!("tokenizer encode failed: {e}")))
        };
        let q_enc = encode(question)?;
        let c_enc = encode(context)?;

        let mut q_ids = q_enc.get_ids().to_vec();
        q_ids.truncate(MAX_QUESTION_TOKENS);
        let c_ids = c_enc.get_ids();
        let offsets = c_enc.get_offsets();
        if c_ids.is_empty() {
            return Err(ModelError::NoAnswer);
        }

        let budget = self.settings.max_seq_len - q_ids.len() - 3;
        let step = budget.saturating_sub(self.settings.doc_stride).max(1);

        let mut best: Option<Span> = None;
        let mut window_start = 0;
        loop {
            let window_end = (window_start + budget).min(c_ids.len());
            if let Some(span) = self.score_window(&q_ids, &c_ids[window_start..window_end])? {
                let span = Span {
                    first_token: span.first_token + window_start,
                    last_token: span.last_token + window_start,
                    ..span
                };
                if best.is_none_or(|b| span.score > b.score) {
                    best = Some(span);
                }
            }
            if window_end == c_ids.len() {
                break;
            }
            window_start += step;
        }

        let best = best.ok_or(ModelError::NoAnswer)?;
        tracing::debug!(score = best.score, "best answer span");
        if best.score < self.settings.min_score {
            return Err(ModelError::NoAnswer);
        }

        let start = offsets[best.first_token].0;
        let end = offsets[best.last_token].1;
        Answer::from_span(context, start, end, best.score).ok_or(ModelError::NoAnswer)
    }

    /// Best span inside one window, with token positions relative to the window.
    fn score_window(&self, q_ids: &[u32], window: &[u32]) -> Result<Option<Span>> {
        let mut ids = Vec::with_capacity(q_ids.len() + window.len() + 3);
        ids.push(self.cls_id);
        ids.extend_from_slice(q_ids);
        ids.push(self.sep_id);
        let context_offset = ids.len();
        ids.extend_from_slice(window);
        ids.push(self.sep_id);

        let type_ids: Vec<u32> = (0..ids.len())
            .map(|i| u32::from(i >= context_offset))
            .collect();

        let input_ids = Tensor::new(ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(type_ids.as_slice(), &self.device)?.unsqueeze(0)?;

        let hidden = self.model.forward(&input_ids, &token_type_ids, None)?;
        let logits = self.head.forward(&hidden)?.squeeze(0)?;
        let start_logits = logits.narrow(1, 0, 1)?.squeeze(1)?.to_vec1::<f32>()?;
        let end_logits = logits.narrow(1, 1, 1)?.squeeze(1)?.to_vec1::<f32>()?;

        let context_range = context_offset..context_offset + window.len();
        let start_probs = masked_softmax(&start_logits, &context_range);
        let end_probs = masked_softmax(&end_logits, &context_range);

        Ok(best_span(
            &start_probs,
            &end_probs,
            context_range.start,
            window.len(),
            self.settings.max_answer_tokens,
        ))
    }
}

/// Softmax over `[CLS]` (position 0) and the context positions; other positions get 0.
fn masked_softmax(logits: &[f32], context: &std::ops::Range<usize>) -> Vec<f32> {
    let keep = |i: usize| i == 0 || context.contains(&i);
    let max = logits
        .iter()
        .enumerate()
        .filter(|&(i, _)| keep(i))
        .map(|(_, &l)| l)
        .fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = logits
        .iter()
        .enumerate()
        .map(|(i, &l)| if keep(i) { (l - max).exp() } else { 0.0 })
        .collect();
    let total: f32 = exp.iter().sum();
    if total <= 0.0 {
        return exp;
    }
    exp.into_iter().map(|e| e / total).collect()
}

/// Highest `p_start * p_end` span with `end >= start` and length at most
/// `max_answer_tokens`. Positions in the result are relative to `offset`.
fn best_span(
    start_probs: &[f32],
    end_probs: &[f32],
    offset: usize,
    len: usize,
    max_answer_tokens: usize,
) -> Option<Span> {
    let mut best: Option<Span> = None;
    for i in 0..len {
        let limit = (i + max_answer_tokens.max(1)).min(len);
        for j in i..limit {
            let score = start_probs[offset + i] * end_probs[offset + j];
            if best.is_none_or(|b| score > b.score) {
                best = Some(Span {
                    score,
                    first_token: i,
                    last_token: j,
                });
            }
        }
    }
    best
}

impl AnswerExtractor for CandleExtractor {
    async fn extract(&self, question: &str, context: &str) -> Result<Answer> {
        let model = self.clone();
        let question = question.to_owned();
        let context = context.to_owned();
        tokio::task::spawn_blocking(move || model.extract_sync(&question, &context))
            .await
            .map_err(|e| ModelError::Inference(format!("candle extraction task failed: {e}")))?
    }

    fn name(&self) -> &str {
        &self.name
    }
}
