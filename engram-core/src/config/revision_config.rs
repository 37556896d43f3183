//! Belief revision configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevisionConfig {
    /// Master switch. Disabled, every candidate fact is stored as ADD.
    pub enabled: bool,
    /// Include declared slot keys in the match signature.
    pub slot_matching: bool,
    /// Delegate classification to a registered LLM classifier. Invalid
    /// classifier output falls back to the rule-based path.
    pub llm_resolution: bool,
}

impl Default for RevisionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            slot_matching: true,
            llm_resolution: false,
        }
    }
}
