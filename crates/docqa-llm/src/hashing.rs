//! Feature-hashing embedder that needs no model download.

use std::collections::BTreeMap;

use crate::embedder::Embedder;
use crate::error::{ModelError, Result};
use crate::text::words;

pub const DEFAULT_DIMENSION: usize = 384;

const SYMBOL_PREFIX: &str = "\u{0}sym:";
const BLANK_FEATURE: &str = "\u{0}blank";

/// Bag-of-words vectors: each lowercased word is hashed with blake3 into a signed
/// bucket, weighted by `1 + ln(tf)`, and the result is L2-normalized.
///
/// Text without words falls back to its non-whitespace characters, and whitespace-only
/// text maps to one fixed feature, so every non-empty input gets a vector.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    name: String,
}

impl HashingEmbedder {
    /// # Errors
    ///
    /// Returns an error if `dimension` is zero.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(ModelError::ModelLoad(
                "hashing embedder dimension must be positive".into(),
            ));
        }
        Ok(Self {
            dimension,
            name: format!("hashing-bow-{dimension}"),
        })
    }

    /// # Errors
    ///
    /// Returns [`ModelError::EmptyInput`] for the empty string.
    pub fn embed_sync(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(ModelError::EmptyInput);
        }

        let mut vector = vec![0.0f32; self.dimension];
        for (term, count) in &features(text) {
            let (bucket, sign) = self.bucket(term);
            #[allow(clippy::cast_precision_loss)]
            let weight = 1.0 + (*count as f32).ln();
            vector[bucket] += sign * weight;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        Ok(vector)
    }

    fn bucket(&self, term: &str) -> (usize, f32) {
        let hash = blake3::hash(term.as_bytes());
        let bytes = hash.as_bytes();
        let mut head = [0u8; 8];
        head.copy_from_slice(&bytes[..8]);
        let value = u64::from_le_bytes(head);
        #[allow(clippy::cast_possible_truncation)]
        let bucket = (value % self.dimension as u64) as usize;
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        (bucket, sign)
    }
}

/// Term counts for `text`. Never empty for non-empty input.
fn features(text: &str) -> BTreeMap<String, u32> {
    let mut counts: BTreeMap<String, u32> = BTreeMap::new();
    for word in words(text) {
        *counts.entry(word.normalized()).or_default() += 1;
    }
    if counts.is_empty() {
        for c in text.chars().filter(|c| !c.is_whitespace()) {
            *counts.entry(format!("{SYMBOL_PREFIX}{c}")).or_default() += 1;
        }
    }
    if counts.is_empty() {
        counts.insert(BLANK_FEATURE.to_owned(), 1);
    }
    counts
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            name: format!("hashing-bow-{DEFAULT_DIMENSION}"),
        }
    }
}

impl Embedder for HashingEmbedder {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_sync(t)).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l2(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
    }

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn zero_dimension_rejected() {
        assert!(HashingEmbedder::new(0).is_err());
    }

    #[test]
    fn vectors_are_normalized() {
        let e = HashingEmbedder::default();
        let v = e.embed_sync("the quick brown fox").unwrap();
        assert!((norm(&v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_input_fails() {
        let e = HashingEmbedder::default();
        assert!(matches!(e.embed_sync(""), Err(ModelError::EmptyInput)));
    }

    #[test]
    fn wordless_text_gets_unit_vector() {
        let e = HashingEmbedder::default();
        for text in [" ,.; ", "???", "----------", ". . . . .", "   \n\t  "] {
            let v = e.embed_sync(text).unwrap();
            assert!((norm(&v) - 1.0).abs() < 1e-5, "{text:?}");
        }
        assert_eq!(e.embed_sync("  ").unwrap(), e.embed_sync("\n\n\n").unwrap());
        assert_ne!(e.embed_sync("---").unwrap(), e.embed_sync("...").unwrap());
    }

    #[test]
    fn words_win_over_symbols() {
        let e = HashingEmbedder::default();
        assert_eq!(e.embed_sync("--- dog ---").unwrap(), e.embed_sync("dog").unwrap());
    }

    #[test]
    fn deterministic_and_case_insensitive() {
        let e = HashingEmbedder::new(64).unwrap();
        assert_eq!(e.embed_sync("Dog park").unwrap(), e.embed_sync("dog PARK").unwrap());
    }

    #[test]
    fn shared_words_are_closer() {
        let e = HashingEmbedder::default();
        let q = e.embed_sync("where did the dog run").unwrap();
        let near = e.embed_sync("the dog ran in the park").unwrap();
        let far = e.embed_sync("quantum chromodynamics lecture notes").unwrap();
        assert!(l2(&q, &near) < l2(&q, &far));
    }

    #[tokio::test]
    async fn encode_preserves_length_and_order() {
        let e = HashingEmbedder::new(32).unwrap();
        let texts = vec!["alpha".to_owned(), "beta".to_owned(), "alpha".to_owned()];
        let vectors = e.encode(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert!(vectors.iter().all(|v| v.len() == 32));
        assert_eq!(vectors[0], vectors[2]);
        assert_ne!(vectors[0], vectors[1]);
    }

    #[tokio::test]
    async fn encode_one_matches_batch() {
        let e = HashingEmbedder::default();
        let one = e.encode_one("question text").await.unwrap();
        let batch = e.encode(&["question text".to_owned()]).await.unwrap();
        assert_eq!(one, batch[0]);
    }

    #[tokio::test]
    async fn encode_propagates_empty_item() {
        let e = HashingEmbedder::default();
        let texts = vec!["ok".to_owned(), String::new()];
        assert!(matches!(e.encode(&texts).await, Err(ModelError::EmptyInput)));
    }

    #[tokio::test]
    async fn encode_keeps_blank_and_symbol_items() {
        let e = HashingEmbedder::new(16).unwrap();
        let texts = vec!["ok".to_owned(), " ".repeat(400), "-".repeat(400)];
        let vectors = e.encode(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert!(vectors.iter().all(|v| v.len() == 16));
    }

    #[test]
    fn name_pins_dimension() {
        assert_eq!(HashingEmbedder::new(128).unwrap().name(), "hashing-bow-128");
    }

    mod proptest_hashing {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn encode_len_matches_input(texts in proptest::collection::vec("\\PC{1,50}", 1..20)) {
                let e = HashingEmbedder::new(48).unwrap();
                let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
                let vectors = rt.block_on(e.encode(&texts)).unwrap();
                prop_assert_eq!(vectors.len(), texts.len());
                for v in &vectors {
                    prop_assert_eq!(v.len(), 48);
                }
            }
        }
    }
}
