use serde::{Deserialize, Serialize};

/// AI participant. Referenced weakly by messages and memories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
    pub name: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    pub provider: Option<String>,
    pub registered_at: i64,
}
