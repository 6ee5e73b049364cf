use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::domain::value_objects::EmbeddingVector;

/// Maps text to fixed-width 32-bit vectors.
///
/// Index building and querying must go through the same implementation so
/// stored and query vectors share one width.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Name recorded in persisted snapshots
    fn model_name(&self) -> &str;

    /// Width of every vector this embedder returns
    fn dimension_count(&self) -> usize;

    /// Embed a batch, preserving input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>>;

    /// Embed a single text
    async fn embed_one(&self, text: &str) -> Result<EmbeddingVector> {
        let mut embeddings = self.embed(&[text.to_string()]).await?;
        embeddings.pop().context("No embedding returned")
    }
}
