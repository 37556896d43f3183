use serde::{Deserialize, Serialize};

/// L4 workflow node. Contexts form a rooted tree per space; `depth` is 0 at
/// the root and `parent.depth + 1` below, bounded by the configured maximum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub context_id: String,
    pub memory_space_id: String,
    pub purpose: String,
    pub parent_id: Option<String>,
    pub depth: usize,
    pub child_ids: Vec<String>,
    pub user_id: Option<String>,
    /// Conversation this context was triggered by, if any.
    pub conversation_ref: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: i64,
}
