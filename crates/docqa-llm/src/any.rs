#[cfg(feature = "candle")]
use crate::candle_provider::{CandleEmbedder, CandleExtractor};
use crate::embedder::Embedder;
use crate::error::Result;
use crate::extractor::{Answer, AnswerExtractor};
use crate::hashing::HashingEmbedder;
use crate::lexical::LexicalExtractor;
#[cfg(feature = "mock")]
use crate::mock::{MockEmbedder, MockExtractor};

/// Generates a match over all `AnyEmbedder` variants, binding the inner backend
/// and evaluating the given expression for each arm.
macro_rules! delegate_embedder {
    ($self:expr, |$e:ident| $expr:expr) => {
        match $self {
            AnyEmbedder::Hashing($e) => $expr,
            #[cfg(feature = "candle")]
            AnyEmbedder::Candle($e) => $expr,
            #[cfg(feature = "mock")]
            AnyEmbedder::Mock($e) => $expr,
        }
    };
}

macro_rules! delegate_extractor {
    ($self:expr, |$e:ident| $expr:expr) => {
        match $self {
            AnyExtractor::Lexical($e) => $expr,
            #[cfg(feature = "candle")]
            AnyExtractor::Candle($e) => $expr,
            #[cfg(feature = "mock")]
            AnyExtractor::Mock($e) => $expr,
        }
    };
}

#[derive(Debug, Clone)]
pub enum AnyEmbedder {
    Hashing(HashingEmbedder),
    #[cfg(feature = "candle")]
    Candle(CandleEmbedder),
    #[cfg(feature = "mock")]
    Mock(MockEmbedder),
}

impl Embedder for AnyEmbedder {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        delegate_embedder!(self, |e| e.encode(texts).await)
    }

    async fn encode_one(&self, text: &str) -> Result<Vec<f32>> {
        delegate_embedder!(self, |e| e.encode_one(text).await)
    }

    fn dimension(&self) -> usize {
        delegate_embedder!(self, |e| e.dimension())
    }

    fn name(&self) -> &str {
        delegate_embedder!(self, |e| e.name())
    }
}

#[derive(Debug, Clone)]
pub enum AnyExtractor {
    Lexical(LexicalExtractor),
    #[cfg(feature = "candle")]
    Candle(CandleExtractor),
    #[cfg(feature = "mock")]
    Mock(MockExtractor),
}

impl AnswerExtractor for AnyExtractor {
    async fn extract(&self, question: &str, context: &str) -> Result<Answer> {
        delegate_extractor!(self, |e| e.extract(question, context).await)
    }

    fn name(&self) -> &str {
        delegate_extractor!(self, |e| e.name())
    }
}
