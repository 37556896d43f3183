//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Run the external fact extractor during `remember`.
    pub extract_facts: bool,
    /// Admitted `remember` calls per memory space.
    pub inflight_per_space: usize,
    /// Bounded FIFO wait queue per memory space; overflow fails `Overloaded`.
    pub queue_depth: usize,
    /// Timeout for the external fact extractor. Soft step.
    pub extractor_timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            extract_facts: true,
            inflight_per_space: 16,
            queue_depth: 256,
            extractor_timeout_ms: 15_000,
        }
    }
}
