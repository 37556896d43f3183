use serde::{Deserialize, Serialize};

/// Space flavor. `Shared` is the hive-mode configuration where multiple
/// agents write into one space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpaceType {
    #[default]
    Personal,
    Team,
    Shared,
}

/// The isolation boundary. Every other entity carries a `memory_space_id`
/// and cross-space queries are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySpace {
    pub memory_space_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub space_type: SpaceType,
    /// Registering user, when known. Drives `users.delete(cascade = true)`.
    pub owner_user_id: Option<String>,
    /// Fixed at the first embedded insert; all later embeddings must match.
    pub embedding_dimension: Option<usize>,
    pub created_at: i64,
}
