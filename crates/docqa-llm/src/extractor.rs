use serde::Serialize;

use crate::error::Result;

/// A contiguous span of the context selected as the answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    pub score: f32,
    /// Byte offset of the span start within the context.
    pub start: usize,
    /// Byte offset one past the span end within the context.
    pub end: usize,
}

impl Answer {
    /// Build an answer from a byte range of `context`.
    ///
    /// Returns `None` when the range is empty or does not fall on char boundaries.
    #[must_use]
    pub fn from_span(context: &str, start: usize, end: usize, score: f32) -> Option<Self> {
        let text = context.get(start..end)?.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            text: text.to_owned(),
            score,
            start,
            end,
        })
    }
}

/// Extractive question answering over a context string.
pub trait AnswerExtractor: Send + Sync {
    /// Return the best-scoring span of `context` that answers `question`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ModelError::NoAnswer`] when the context is empty or the model
    /// abstains, or an inference error if the backend fails.
    fn extract(
        &self,
        question: &str,
        context: &str,
    ) -> impl Future<Output = Result<Answer>> + Send;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_span_trims_text() {
        let answer = Answer::from_span("in the park ", 2, 12, 0.5).unwrap();
        assert_eq!(answer.text, "the park");
        assert_eq!(answer.start, 2);
    }

    #[test]
    fn from_span_rejects_empty() {
        assert!(Answer::from_span("abc", 1, 1, 1.0).is_none());
        assert!(Answer::from_span("a   b", 1, 4, 1.0).is_none());
    }

    #[test]
    fn from_span_rejects_non_char_boundary() {
        let ctx = "héllo";
        assert!(Answer::from_span(ctx, 0, 2, 1.0).is_none());
    }

    #[test]
    fn answer_serializes() {
        let answer = Answer {
            text: "park".into(),
            score: 1.0,
            start: 0,
            end: 4,
        };
        let json = serde_json::to_string(&answer).unwrap();
        assert!(json.contains("\"text\":\"park\""));
    }
}
