use serde::{Deserialize, Serialize};

use super::{ContentType, Fact, MemoryRecord};

/// Which retrieval strategies to run. Everything defaults to off; a recall
/// with no enabled source returns an empty list, not an error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RecallSources {
    pub vector: bool,
    pub facts: bool,
    pub lexical: bool,
    pub graph: bool,
}

impl RecallSources {
    pub fn all() -> Self {
        Self {
            vector: true,
            facts: true,
            lexical: true,
            graph: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.vector || self.facts || self.lexical || self.graph)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecallSourceKind {
    Vector,
    Facts,
    Lexical,
    Graph,
}

/// Metadata filters applied to memory-backed sources.
#[derive(Debug, Clone, Default)]
pub struct RecallFilters {
    pub tags: Option<Vec<String>>,
    pub content_type: Option<ContentType>,
    pub min_importance: Option<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct RecallRequest {
    pub memory_space_id: String,
    pub query: String,
    /// Pre-computed query embedding; when absent the vector source asks the
    /// registered embedding provider, and is skipped if there is none.
    pub embedding: Option<Vec<f32>>,
    pub limit: usize,
    /// Restrict hits to conversations reachable from this context or its
    /// ancestors.
    pub context_id: Option<String>,
    pub sources: RecallSources,
    pub filters: RecallFilters,
}

/// Which canonical layer a hit lives in. Dedup key is `(layer, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HitLayer {
    Memory,
    Fact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecallPayload {
    Memory(Box<MemoryRecord>),
    Fact(Box<Fact>),
}

/// One merged retrieval result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallHit {
    pub layer: HitLayer,
    pub id: String,
    /// `max` across contributing sources, in [0, 1].
    pub score: f64,
    /// Every strategy that surfaced this item.
    pub sources: Vec<RecallSourceKind>,
    /// Tie-breaker after score: importance for memories, confidence for facts.
    pub importance: u8,
    pub created_at: i64,
    pub payload: RecallPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: RecallSourceKind,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecallResponse {
    #[serde(default)]
    pub items: Vec<RecallHit>,
    /// Per-source failures are suppressed from `items` and surfaced here.
    #[serde(default)]
    pub source_failures: Vec<SourceFailure>,
}
