use crate::error::{ModelError, Result};

/// Maps text to fixed-dimension dense vectors.
///
/// Every vector produced by one instance has the same length, [`Embedder::dimension`],
/// and vectors from separate calls are comparable as long as [`Embedder::name`] is
/// unchanged.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, returning exactly one vector per input in input order.
    ///
    /// # Errors
    ///
    /// Returns an error if any input cannot be embedded. Inputs are never skipped.
    fn encode(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send;

    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be embedded.
    fn encode_one(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send {
        async move {
            let mut vectors = self.encode(&[text.to_owned()]).await?;
            vectors
                .pop()
                .ok_or_else(|| ModelError::Inference("embedder returned no vector".into()))
        }
    }

    fn dimension(&self) -> usize;

    /// Pinned model identity.
    fn name(&self) -> &str;
}
