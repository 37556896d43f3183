//! L2 memory store: round trips, dimension pinning, versioned updates with
//! retention, cascade deletes, space isolation.

use engram_core::config::EngramConfig;
use engram_core::models::*;
use engram_core::EngramError;
use engram_storage::queries::memory_ops;
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

fn new_memory(content: &str, embedding: Option<Vec<f32>>) -> NewMemory {
    NewMemory {
        content: content.into(),
        embedding,
        importance: 50,
        tags: vec!["test".into()],
        ..Default::default()
    }
}

#[test]
fn store_then_get_round_trips() {
    let engine = engine();
    register_space(&engine, "s1");

    let stored = engine
        .memories()
        .store("s1", new_memory("I prefer TypeScript", Some(vec![0.1, 0.2, 0.3, 0.4])))
        .unwrap();

    let got = engine.memories().get("s1", &stored.memory_id).unwrap();
    assert_eq!(got.content, "I prefer TypeScript");
    assert_eq!(got.embedding, Some(vec![0.1, 0.2, 0.3, 0.4]));
    assert_eq!(got.version, 1);
    assert_eq!(got.tags, vec!["test".to_string()]);
    assert!(got.archived_at.is_none());
}

#[test]
fn first_embedded_insert_pins_the_space_dimension() {
    let engine = engine();
    register_space(&engine, "s1");

    engine
        .memories()
        .store("s1", new_memory("a", Some(vec![0.0; 8])))
        .unwrap();
    assert_eq!(engine.spaces().get("s1").unwrap().embedding_dimension, Some(8));

    let err = engine
        .memories()
        .store("s1", new_memory("b", Some(vec![0.0; 4])))
        .unwrap_err();
    assert!(matches!(
        err,
        EngramError::EmbeddingShape { expected: 8, actual: 4, .. }
    ));

    // Un-embedded records are still welcome.
    engine.memories().store("s1", new_memory("c", None)).unwrap();
}

#[test]
fn update_archives_previous_version() {
    let engine = engine();
    register_space(&engine, "s1");
    let stored = engine.memories().store("s1", new_memory("v1", None)).unwrap();

    let updated = engine
        .memories()
        .update(
            "s1",
            &stored.memory_id,
            MemoryPatch {
                content: Some("v2".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.version, 2);
    assert_eq!(updated.content, "v2");

    // Live read sees only the new version.
    let live = engine.memories().get("s1", &stored.memory_id).unwrap();
    assert_eq!(live.version, 2);

    let archived = engine
        .pool()
        .writer
        .with_conn_sync(|conn| memory_ops::version_count(conn, &stored.memory_id))
        .unwrap();
    assert_eq!(archived, 1);
}

#[test]
fn version_retention_drops_oldest_past_cap() {
    let mut config = EngramConfig::default();
    config.limits.versions_per_memory = 3;
    let engine = StorageEngine::open_in_memory_with(config).unwrap();
    register_space(&engine, "s1");

    let stored = engine.memories().store("s1", new_memory("v1", None)).unwrap();
    for i in 2..=8 {
        engine
            .memories()
            .update(
                "s1",
                &stored.memory_id,
                MemoryPatch {
                    content: Some(format!("v{i}")),
                    ..Default::default()
                },
            )
            .unwrap();
    }

    let archived = engine
        .pool()
        .writer
        .with_conn_sync(|conn| memory_ops::version_count(conn, &stored.memory_id))
        .unwrap();
    assert_eq!(archived, 3);
    assert_eq!(engine.memories().get("s1", &stored.memory_id).unwrap().version, 8);
}

#[test]
fn delete_removes_all_versions_and_cascades_facts() {
    let engine = engine();
    register_space(&engine, "s1");
    let stored = engine.memories().store("s1", new_memory("v1", None)).unwrap();
    engine
        .memories()
        .update(
            "s1",
            &stored.memory_id,
            MemoryPatch {
                content: Some("v2".into()),
                ..Default::default()
            },
        )
        .unwrap();

    let fact = Fact {
        fact_id: "fact_from_memory".into(),
        memory_space_id: "s1".into(),
        fact: "derived belief".into(),
        fact_type: FactType::Knowledge,
        subject: None,
        predicate: None,
        object: None,
        slots: Default::default(),
        confidence: 70,
        source_type: "memory".into(),
        source_ref: Some(FactSourceRef {
            conversation_id: None,
            message_id: None,
            memory_id: Some(stored.memory_id.clone()),
        }),
        tags: vec![],
        status: FactStatus::Active,
        supersedes: vec![],
        superseded_by: None,
        created_at: engram_core::now_ms(),
    };
    engine.facts().insert(&fact).unwrap();

    let (memories, facts) = engine.memories().delete("s1", &stored.memory_id, true).unwrap();
    assert_eq!((memories, facts), (1, 1));

    assert!(matches!(
        engine.memories().get("s1", &stored.memory_id),
        Err(EngramError::NotFound { .. })
    ));
    assert!(matches!(
        engine.facts().get("s1", "fact_from_memory"),
        Err(EngramError::NotFound { .. })
    ));
}

#[test]
fn list_is_newest_first_and_space_scoped() {
    let engine = engine();
    register_space(&engine, "s1");
    register_space(&engine, "s2");

    for i in 0..3 {
        engine
            .memories()
            .store("s1", new_memory(&format!("own {i}"), None))
            .unwrap();
    }
    engine.memories().store("s2", new_memory("foreign", None)).unwrap();

    let listed = engine.memories().list("s1", 10).unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed.iter().all(|m| m.memory_space_id == "s1"));
    assert!(listed.windows(2).all(|w| w[0].created_at >= w[1].created_at));
}

#[test]
fn cross_space_get_is_an_isolation_violation() {
    let engine = engine();
    register_space(&engine, "s1");
    register_space(&engine, "s2");
    let stored = engine.memories().store("s1", new_memory("secret", None)).unwrap();

    let err = engine.memories().get("s2", &stored.memory_id).unwrap_err();
    assert!(matches!(err, EngramError::IsolationViolation { .. }));
}
