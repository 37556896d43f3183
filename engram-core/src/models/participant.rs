use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantKind {
    User,
    Agent,
}

/// Role binding inside a space: a user or agent playing a named role.
/// Referenced by memories and agent-to-agent messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub participant_id: String,
    pub memory_space_id: String,
    pub kind: ParticipantKind,
    /// The bound `user_id` or `agent_id`.
    pub subject_id: String,
    pub role: String,
    pub created_at: i64,
}
