//! Deterministic extractive QA based on word overlap.

use std::collections::BTreeSet;

use crate::error::{ModelError, Result};
use crate::extractor::{Answer, AnswerExtractor};
use crate::text::{Word, is_stopword, sentence_spans, words};

/// Picks the sentence sharing the most question words, then answers with the longest
/// run of that sentence's words that the question does not already contain.
#[derive(Debug, Clone, Default)]
pub struct LexicalExtractor;

impl LexicalExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// # Errors
    ///
    /// Returns [`ModelError::NoAnswer`] if the context is blank or no sentence shares a
    /// content word with the question.
    pub fn extract_sync(&self, question: &str, context: &str) -> Result<Answer> {
        if context.trim().is_empty() {
            return Err(ModelError::NoAnswer);
        }

        let terms: BTreeSet<String> = words(question)
            .iter()
            .map(Word::normalized)
            .filter(|w| !is_stopword(w))
            .collect();
        if terms.is_empty() {
            return Err(ModelError::NoAnswer);
        }

        let mut best: Option<(usize, usize, usize)> = None;
        for (start, end) in sentence_spans(context) {
            let hits = words(&context[start..end])
                .iter()
                .map(Word::normalized)
                .filter(|w| terms.contains(w))
                .collect::<BTreeSet<_>>()
                .len();
            if hits > 0 && best.is_none_or(|(h, _, _)| hits > h) {
                best = Some((hits, start, end));
            }
        }
        let (hits, s_start, s_end) = best.ok_or(ModelError::NoAnswer)?;

        let sentence_words: Vec<Word<'_>> = words(&context[s_start..s_end])
            .into_iter()
            .map(|w| Word {
                start: w.start + s_start,
                end: w.end + s_start,
                ..w
            })
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let score = hits as f32 / terms.len() as f32;

        let (span_start, span_end) =
            best_run(&sentence_words, &terms).unwrap_or((s_start, s_end));
        Answer::from_span(context, span_start, span_end, score).ok_or(ModelError::NoAnswer)
    }
}

/// Longest run of non-question words, trimmed of stopwords at both ends, measured in
/// content words. Earliest run wins ties.
fn best_run(sentence: &[Word<'_>], terms: &BTreeSet<String>) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize, usize)> = None;

    for run in sentence.split(|w| terms.contains(&w.normalized())) {
        let first = run.iter().position(|w| !is_stopword(&w.normalized()));
        let last = run.iter().rposition(|w| !is_stopword(&w.normalized()));
        let (Some(first), Some(last)) = (first, last) else {
            continue;
        };
        let trimmed = &run[first..=last];
        let content = trimmed
            .iter()
            .filter(|w| !is_stopword(&w.normalized()))
            .count();
        if best.is_none_or(|(c, _, _)| content > c) {
            best = Some((content, trimmed[0].start, trimmed[trimmed.len() - 1].end));
        }
    }

    best.map(|(_, start, end)| (start, end))
}

impl AnswerExtractor for LexicalExtractor {
    async fn extract(&self, question: &str, context: &str) -> Result<Answer> {
        self.extract_sync(question, context)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "lexical-overlap"
    }
}
