//! Durability: a file-backed engine survives close and reopen with every
//! layer intact, and migrations are a no-op the second time around.

use engram_core::config::EngramConfig;
use engram_core::models::*;
use engram_storage::StorageEngine;

fn file_config(path: &std::path::Path) -> EngramConfig {
    let mut config = EngramConfig::default();
    config.storage.endpoint = path.to_string_lossy().into_owned();
    config
}

#[test]
fn reopened_database_keeps_all_layers() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("engram.db");

    let conversation_id = {
        let engine = StorageEngine::open(file_config(&db_path)).unwrap();
        engine
            .spaces()
            .register("s1", "space one", SpaceType::Personal, Some("u1".into()))
            .unwrap();
        let conversation = engine
            .conversations()
            .create("s1", ConversationType::UserAgent, Default::default())
            .unwrap();
        engine
            .conversations()
            .add_message(
                &conversation.conversation_id,
                MessageRole::User,
                "durable message",
                None,
                None,
            )
            .unwrap();
        engine
            .memories()
            .store(
                "s1",
                NewMemory {
                    content: "durable memory".into(),
                    embedding: Some(vec![0.25; 4]),
                    ..Default::default()
                },
            )
            .unwrap();
        engine.state().set("cursor", &serde_json::json!(7)).unwrap();
        conversation.conversation_id
    };

    let engine = StorageEngine::open(file_config(&db_path)).unwrap();
    let space = engine.spaces().get("s1").unwrap();
    assert_eq!(space.owner_user_id.as_deref(), Some("u1"));
    assert_eq!(space.embedding_dimension, Some(4));

    let conversation = engine.conversations().get(&conversation_id).unwrap();
    assert_eq!(conversation.message_count, 1);
    assert_eq!(conversation.messages[0].content, "durable message");

    let memories = engine.memories().list("s1", 10).unwrap();
    assert_eq!(memories.len(), 1);
    assert_eq!(memories[0].embedding.as_ref().map(Vec::len), Some(4));

    assert_eq!(engine.state().get("cursor").unwrap(), Some(serde_json::json!(7)));
}
