//! L1a conversation store: append ordering, idempotent appends, cascade
//! cleanup of weak references.

use engram_core::models::*;
use engram_core::EngramError;
use engram_storage::StorageEngine;

fn engine() -> StorageEngine {
    StorageEngine::open_in_memory().expect("open in-memory storage")
}

fn register_space(engine: &StorageEngine, id: &str) {
    engine
        .spaces()
        .register(id, id, SpaceType::Personal, None)
        .unwrap();
}

#[test]
fn create_then_get_returns_same_conversation() {
    let engine = engine();
    register_space(&engine, "s1");

    let created = engine
        .conversations()
        .create(
            "s1",
            ConversationType::UserAgent,
            ConversationParticipants {
                user_id: Some("alice".into()),
                participant_id: None,
            },
        )
        .unwrap();

    let got = engine.conversations().get(&created.conversation_id).unwrap();
    assert_eq!(got.conversation_id, created.conversation_id);
    assert_eq!(got.memory_space_id, "s1");
    assert_eq!(got.participants.user_id.as_deref(), Some("alice"));
    assert_eq!(got.message_count, 0);
    assert!(got.messages.is_empty());
}

#[test]
fn create_in_missing_space_fails() {
    let engine = engine();
    let err = engine
        .conversations()
        .create("nope", ConversationType::System, Default::default())
        .unwrap_err();
    assert!(matches!(err, EngramError::NotFound { entity: "memory_space", .. }));
}

#[test]
fn appended_messages_keep_insertion_order_and_count() {
    let engine = engine();
    register_space(&engine, "s1");
    let conversation = engine
        .conversations()
        .create("s1", ConversationType::UserAgent, Default::default())
        .unwrap();

    for i in 0..5 {
        engine
            .conversations()
            .add_message(
                &conversation.conversation_id,
                if i % 2 == 0 { MessageRole::User } else { MessageRole::Agent },
                &format!("message {i}"),
                None,
                None,
            )
            .unwrap();
    }

    let got = engine.conversations().get(&conversation.conversation_id).unwrap();
    assert_eq!(got.message_count, 5);
    assert_eq!(got.messages.len(), 5);
    for (i, message) in got.messages.iter().enumerate() {
        assert_eq!(message.content, format!("message {i}"));
    }
    assert!(got.updated_at >= got.created_at);
}

#[test]
fn duplicate_dedup_key_is_absorbed() {
    let engine = engine();
    register_space(&engine, "s1");
    let conversation = engine
        .conversations()
        .create("s1", ConversationType::UserAgent, Default::default())
        .unwrap();
    let id = &conversation.conversation_id;

    let first = engine
        .conversations()
        .add_message(id, MessageRole::User, "hello", None, Some("key-1".into()))
        .unwrap();
    assert!(!first.deduplicated);

    let second = engine
        .conversations()
        .add_message(id, MessageRole::User, "hello", None, Some("key-1".into()))
        .unwrap();
    assert!(second.deduplicated);
    assert_eq!(second.message.id, first.message.id);

    let got = engine.conversations().get(id).unwrap();
    assert_eq!(got.message_count, 1);
}

#[test]
fn append_to_missing_conversation_is_not_found() {
    let engine = engine();
    register_space(&engine, "s1");
    let err = engine
        .conversations()
        .add_message("conv_missing", MessageRole::User, "hi", None, None)
        .unwrap_err();
    assert!(matches!(err, EngramError::NotFound { entity: "conversation", .. }));
}

#[test]
fn delete_clears_refs_but_keeps_entities() {
    let engine = engine();
    register_space(&engine, "s1");
    let conversation = engine
        .conversations()
        .create("s1", ConversationType::UserAgent, Default::default())
        .unwrap();
    let conv_id = conversation.conversation_id.clone();

    let memory = engine
        .memories()
        .store(
            "s1",
            NewMemory {
                content: "derived recollection".into(),
                conversation_ref: Some(ConversationRef {
                    conversation_id: conv_id.clone(),
                    message_ids: vec![],
                }),
                ..Default::default()
            },
        )
        .unwrap();

    let fact = Fact {
        fact_id: "fact_ref".into(),
        memory_space_id: "s1".into(),
        fact: "alice prefers rust".into(),
        fact_type: FactType::Preference,
        subject: Some("alice".into()),
        predicate: Some("prefers".into()),
        object: Some("rust".into()),
        slots: Default::default(),
        confidence: 80,
        source_type: "conversation".into(),
        source_ref: Some(FactSourceRef {
            conversation_id: Some(conv_id.clone()),
            message_id: None,
            memory_id: None,
        }),
        tags: vec![],
        status: FactStatus::Active,
        supersedes: vec![],
        superseded_by: None,
        created_at: engram_core::now_ms(),
    };
    engine.facts().insert(&fact).unwrap();

    engine.conversations().delete(&conv_id).unwrap();

    let err = engine.conversations().get(&conv_id).unwrap_err();
    assert!(matches!(err, EngramError::NotFound { .. }));

    // Referencing entities survive with their refs cleared.
    let kept_memory = engine.memories().get("s1", &memory.memory_id).unwrap();
    assert!(kept_memory.conversation_ref.is_none());
    let kept_fact = engine.facts().get("s1", "fact_ref").unwrap();
    assert!(kept_fact.source_ref.is_none());
}
