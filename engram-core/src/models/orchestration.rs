use serde::{Deserialize, Serialize};

use super::{RevisionAction, SpaceType};

/// Layer tag carried on every orchestration event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrchestrationLayer {
    MemorySpace,
    User,
    Agent,
    Conversation,
    Vector,
    Facts,
    Graph,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerStatus {
    InProgress,
    Complete,
    Error,
    Skipped,
}

/// Progress event emitted on every orchestrator state transition. Observers
/// receive these synchronously and must not block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerUpdate {
    pub orchestration_id: String,
    pub layer: OrchestrationLayer,
    pub status: LayerStatus,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision_action: Option<RevisionAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded_facts: Option<Vec<String>>,
}

impl LayerUpdate {
    pub fn new(orchestration_id: &str, layer: OrchestrationLayer, status: LayerStatus) -> Self {
        Self {
            orchestration_id: orchestration_id.to_string(),
            layer,
            status,
            latency_ms: 0,
            data: None,
            error: None,
            revision_action: None,
            superseded_facts: None,
        }
    }
}

/// Everything a completed `remember` created, by layer.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CreatedIds {
    pub conversation_id: Option<String>,
    pub message_ids: Vec<String>,
    pub memory_ids: Vec<String>,
    pub fact_ids: Vec<String>,
    pub context_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationComplete {
    pub orchestration_id: String,
    pub total_latency_ms: u64,
    pub created: CreatedIds,
}

/// One `remember` invocation: a user turn plus the agent turn that answered it.
#[derive(Debug, Clone, Default)]
pub struct RememberRequest {
    pub memory_space_id: String,
    pub user_id: String,
    pub user_name: Option<String>,
    pub agent_id: String,
    pub agent_name: Option<String>,
    /// Append target; a fresh conversation is created when absent.
    pub conversation_id: Option<String>,
    pub context_id: Option<String>,
    pub user_message: String,
    pub agent_response: String,
    /// Caller-supplied event time; part of the idempotency key.
    pub timestamp: Option<i64>,
    pub importance: Option<u8>,
    pub tags: Vec<String>,
    /// Opaque caller metadata. A2A mirroring reads `fromMemorySpace` /
    /// `toMemorySpace` from here, never inferring them.
    pub metadata: serde_json::Value,
    /// Used only if the space has to be created on the fly.
    pub space_name: Option<String>,
    pub space_type: Option<SpaceType>,
}

/// Options for `forget`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForgetOptions {
    pub delete_facts: bool,
    pub delete_conversation: bool,
    /// Mark rows retracted/archived instead of physical delete.
    pub archive_only: bool,
    pub cascade_graph: bool,
}

/// Per-layer counts of what was actually removed. Returned even on partial
/// failure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ForgetSummary {
    pub conversations: usize,
    pub memories: usize,
    pub facts: usize,
    pub contexts: usize,
    pub spaces: usize,
    pub graph_nodes: usize,
    pub graph_edges: usize,
    pub archived: usize,
}

impl ForgetSummary {
    pub fn absorb(&mut self, other: &ForgetSummary) {
        self.conversations += other.conversations;
        self.memories += other.memories;
        self.facts += other.facts;
        self.contexts += other.contexts;
        self.spaces += other.spaces;
        self.graph_nodes += other.graph_nodes;
        self.graph_edges += other.graph_edges;
        self.archived += other.archived;
    }
}
