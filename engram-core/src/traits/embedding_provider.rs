use async_trait::async_trait;

use crate::errors::EngramResult;

/// Caller-supplied embedding callback. Invoked synchronously on the write
/// path before a vector insert, and on the read path for query embeddings.
/// The engine never hosts a model; this is the only seam embeddings cross.
#[async_trait]
pub trait IEmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> EngramResult<Vec<f32>>;
}
