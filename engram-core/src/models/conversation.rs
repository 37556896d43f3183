use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ConversationType {
    #[default]
    UserAgent,
    A2a,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Agent,
    System,
}

/// One turn inside a conversation. Identity is stable once assigned; the
/// message list is append-only and totally ordered by insertion position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: i64,
    /// Uniqueness key used to absorb idempotent re-appends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedup_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConversationParticipants {
    pub user_id: Option<String>,
    pub participant_id: Option<String>,
}

/// L1a record: an append-ordered message sequence inside one space.
///
/// Invariant: `message_count == messages.len()` and positions are gapless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub conversation_id: String,
    pub memory_space_id: String,
    #[serde(rename = "type")]
    pub conversation_type: ConversationType,
    pub participants: ConversationParticipants,
    pub messages: Vec<Message>,
    pub message_count: usize,
    pub created_at: i64,
    pub updated_at: i64,
}
