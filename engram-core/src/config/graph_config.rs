//! Graph mirror configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum GraphAdapterKind {
    #[default]
    None,
    Cypher,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub adapter: GraphAdapterKind,
    /// Write-through mirroring on the `remember` happy path.
    pub mirror: bool,
    /// Timeout per graph write. Soft: a timeout is a layer event, not a failure.
    pub write_timeout_ms: u64,
    /// Concurrency cap for the pooled graph client.
    pub max_concurrency: usize,
    /// Per-layer row limit for `initial_graph_sync`, newest first.
    pub sync_limit_per_layer: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            adapter: GraphAdapterKind::None,
            mirror: false,
            write_timeout_ms: 3_000,
            max_concurrency: 4,
            sync_limit_per_layer: 1_000,
        }
    }
}
