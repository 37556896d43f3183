//! Embedding provider configuration.

use serde::{Deserialize, Serialize};

/// Where embeddings come from. The engine never hosts a model itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingProviderKind {
    /// No embeddings; vector memory falls back to lexical indexing only.
    #[default]
    None,
    /// Embeddings supplied synchronously by a caller-registered callback.
    ExternalCallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    /// Hard timeout per embedding call. An embedding timeout fails the
    /// vector store step (a hard layer).
    pub timeout_ms: u64,
    /// Concurrency cap for the pooled embedding client.
    pub max_concurrency: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::None,
            timeout_ms: 5_000,
            max_concurrency: 8,
        }
    }
}
