use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Raw,
    Summarized,
    Synthetic,
}

/// Provenance of a memory.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MemorySource {
    pub source_type: String,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

/// Weak id-based reference back into L1a.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRef {
    pub conversation_id: String,
    pub message_ids: Vec<String>,
}

/// L2 record: a searchable recollection, optionally embedded.
///
/// Invariants: at most one live version per `memory_id`; when present the
/// embedding length equals the space dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub memory_id: String,
    pub memory_space_id: String,
    pub content: String,
    pub content_type: ContentType,
    pub embedding: Option<Vec<f32>>,
    pub user_id: Option<String>,
    pub source: MemorySource,
    pub conversation_ref: Option<ConversationRef>,
    pub tags: Vec<String>,
    /// Caller-supplied salience in [0, 100]; a ranking tie-breaker only.
    pub importance: u8,
    pub created_at: i64,
    pub version: u32,
    pub archived_at: Option<i64>,
}

/// Input for `vector.store`. The engine mints the id and version.
#[derive(Debug, Clone, Default)]
pub struct NewMemory {
    pub content: String,
    pub content_type: ContentType,
    pub embedding: Option<Vec<f32>>,
    pub user_id: Option<String>,
    pub source: MemorySource,
    pub conversation_ref: Option<ConversationRef>,
    pub tags: Vec<String>,
    pub importance: u8,
}

/// Partial update for `vector.update`; unset fields keep their value.
/// Applying a patch creates a new version and archives the previous one.
#[derive(Debug, Clone, Default)]
pub struct MemoryPatch {
    pub content: Option<String>,
    pub content_type: Option<ContentType>,
    pub embedding: Option<Option<Vec<f32>>>,
    pub tags: Option<Vec<String>>,
    pub importance: Option<u8>,
}
