//! Engine-wide limits.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Archived versions retained per memory; the oldest is hard-deleted past this.
    pub versions_per_memory: usize,
    /// Maximum context tree depth (root is depth 0).
    pub contexts_max_depth: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            versions_per_memory: 10,
            contexts_max_depth: 16,
        }
    }
}
