//! Idempotency keys for `remember`: derived from the conversation, both
//! message hashes, and the caller timestamp. Re-running with the same key
//! converges — message appends dedup on a uniqueness constraint, vector
//! stores skip covered messages, and belief revision absorbs duplicates.

use engram_core::models::MessageRole;

pub fn idempotency_key(
    conversation_id: &str,
    user_message: &str,
    agent_response: &str,
    timestamp: i64,
) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(conversation_id.as_bytes());
    hasher.update(&[0]);
    hasher.update(blake3::hash(user_message.as_bytes()).as_bytes());
    hasher.update(blake3::hash(agent_response.as_bytes()).as_bytes());
    hasher.update(&timestamp.to_le_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Per-message dedup key: the orchestration key qualified by role.
pub fn message_dedup_key(idempotency_key: &str, role: MessageRole) -> String {
    let role = match role {
        MessageRole::User => "user",
        MessageRole::Agent => "agent",
        MessageRole::System => "system",
    };
    format!("{idempotency_key}:{role}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_deterministic() {
        let a = idempotency_key("c1", "hello", "hi", 42);
        let b = idempotency_key("c1", "hello", "hi", 42);
        assert_eq!(a, b);
    }

    #[test]
    fn key_varies_with_every_input() {
        let base = idempotency_key("c1", "hello", "hi", 42);
        assert_ne!(base, idempotency_key("c2", "hello", "hi", 42));
        assert_ne!(base, idempotency_key("c1", "hello!", "hi", 42));
        assert_ne!(base, idempotency_key("c1", "hello", "hi!", 42));
        assert_ne!(base, idempotency_key("c1", "hello", "hi", 43));
    }

    #[test]
    fn roles_never_collide() {
        let key = idempotency_key("c1", "same", "same", 1);
        assert_ne!(
            message_dedup_key(&key, MessageRole::User),
            message_dedup_key(&key, MessageRole::Agent)
        );
    }
}
