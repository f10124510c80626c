// embeddings/ - Sentence embeddings for keywords.
//
// Provides:
// - The `EmbeddingProvider` capability injected into the catalog store and ranking service
// - Model download + SHA256 verification
// - Local BERT inference with mean pooling (candle)
// - Keyword text preparation

pub mod download;
pub mod engine;
pub mod text_prep;

use thiserror::Error;

/// A single unit-norm embedding vector.
pub type Embedding = Vec<f32>;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding model unavailable: {0}")]
    Unavailable(String),

    #[error("embedding inference failed: {0}")]
    Inference(String),

    #[error("provider returned {got} vectors for {expected} texts")]
    CountMismatch { expected: usize, got: usize },

    #[error("provider returned a {got}-dim vector, expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Maps an ordered batch of texts to unit-norm vectors, one per text, in order.
///
/// Implementations must be deterministic: the same text always yields the
/// same vector. An empty batch yields an empty result.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError>;

    /// Name recorded in the catalog so query and catalog vectors come from the same model.
    fn model_name(&self) -> &str;

    fn dimensions(&self) -> usize;
}

/// Call `provider` and enforce the batch contract (count and dimensionality).
pub fn embed_checked(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
) -> Result<Vec<Embedding>, EmbeddingError> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let vectors = provider.embed(texts)?;
    if vectors.len() != texts.len() {
        return Err(EmbeddingError::CountMismatch {
            expected: texts.len(),
            got: vectors.len(),
        });
    }

    let dims = provider.dimensions();
    if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
        return Err(EmbeddingError::DimensionMismatch {
            expected: dims,
            got: bad.len(),
        });
    }

    Ok(vectors)
}
