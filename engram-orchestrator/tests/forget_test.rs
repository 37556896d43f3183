//! `forget` cascades: user-rooted purges, conversation targets,
//! archive-only compliance mode, and graph inverses.

use std::sync::Arc;

use engram_core::config::EngramConfig;
use engram_core::models::*;
use engram_core::traits::IGraphAdapter;
use engram_core::EngramError;
use engram_graph::InMemoryGraph;
use engram_orchestrator::Engram;
use test_fixtures::{extracted_preference, remember_request, StaticExtractor};

fn engram_with_extractor() -> Engram {
    Engram::builder(EngramConfig::default())
        .extractor(Arc::new(StaticExtractor {
            facts: vec![extracted_preference("Alice", "prefers", "TypeScript", 85)],
        }))
        .build()
        .unwrap()
}

#[tokio::test]
async fn user_cascade_purges_owned_spaces() {
    let engram = engram_with_extractor();

    // u1 owns s1 because the first remember registers the space for them.
    let outcome = engram
        .remember(remember_request("s1", "u1", "I prefer TypeScript", "Noted"))
        .await
        .unwrap();
    let conversation_id = outcome.created.conversation_id.clone().unwrap();

    let summary = engram.delete_user("u1", true).await.unwrap();
    assert_eq!(summary.conversations, 1);
    assert_eq!(summary.memories, 2);
    assert_eq!(summary.facts, 1);
    assert_eq!(summary.contexts, 0);
    assert_eq!(summary.spaces, 1);

    assert!(matches!(
        engram.conversations().get(&conversation_id),
        Err(EngramError::NotFound { .. })
    ));
    assert!(matches!(
        engram.users().get("u1"),
        Err(EngramError::NotFound { .. })
    ));
    assert!(matches!(
        engram.memory_spaces().get("s1"),
        Err(EngramError::NotFound { .. })
    ));
}

#[tokio::test]
async fn non_cascading_user_delete_keeps_spaces_but_clears_weak_refs() {
    let engram = engram_with_extractor();
    let outcome = engram
        .remember(remember_request("s1", "u1", "I prefer TypeScript", "Noted"))
        .await
        .unwrap();

    let summary = engram.delete_user("u1", false).await.unwrap();
    assert_eq!(summary, ForgetSummary::default());

    assert!(engram.memory_spaces().get("s1").is_ok());
    let conversation = engram
        .conversations()
        .get(outcome.created.conversation_id.as_deref().unwrap())
        .unwrap();
    assert_eq!(conversation.message_count, 2);
    for memory in engram.vector().list("s1", 10).unwrap() {
        assert_ne!(memory.user_id.as_deref(), Some("u1"));
    }
}

#[tokio::test]
async fn forgetting_a_conversation_takes_derived_entities_with_it() {
    let engram = engram_with_extractor();
    let outcome = engram
        .remember(remember_request("s1", "u1", "I prefer TypeScript", "Noted"))
        .await
        .unwrap();
    let conversation_id = outcome.created.conversation_id.clone().unwrap();

    let summary = engram
        .forget(
            "s1",
            &conversation_id,
            ForgetOptions {
                delete_facts: true,
                delete_conversation: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(summary.conversations, 1);
    assert_eq!(summary.memories, 2);
    assert_eq!(summary.facts, 1);

    assert!(engram.vector().list("s1", 10).unwrap().is_empty());
    assert!(engram.facts().list("s1", None, 10).unwrap().is_empty());
    // The space itself survives a conversation-level forget.
    assert!(engram.memory_spaces().get("s1").is_ok());
}

#[tokio::test]
async fn archive_only_retracts_without_deleting() {
    let engram = engram_with_extractor();
    let outcome = engram
        .remember(remember_request("s1", "u1", "I prefer TypeScript", "Noted"))
        .await
        .unwrap();
    let memory_id = outcome.created.memory_ids[0].clone();

    let summary = engram
        .forget(
            "s1",
            &memory_id,
            ForgetOptions {
                archive_only: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(summary.archived, 1);
    assert_eq!(summary.memories, 0);

    // Gone from live reads, still physically present as an archived row.
    assert!(matches!(
        engram.vector().get("s1", &memory_id),
        Err(EngramError::NotFound { .. })
    ));
    assert_eq!(engram.vector().list("s1", 10).unwrap().len(), 1);
}

#[tokio::test]
async fn forgetting_a_memory_with_fact_cascade() {
    let engram = engram_with_extractor();
    let outcome = engram
        .remember(remember_request("s1", "u1", "I prefer TypeScript", "Noted"))
        .await
        .unwrap();
    // Facts were sourced from the first stored memory.
    let memory_id = outcome.created.memory_ids[0].clone();

    let summary = engram
        .forget(
            "s1",
            &memory_id,
            ForgetOptions {
                delete_facts: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(summary.memories, 1);
    assert_eq!(summary.facts, 1);
    assert!(engram.facts().list("s1", None, 10).unwrap().is_empty());
}

#[tokio::test]
async fn forgetting_a_context_removes_the_subtree() {
    let engram = Engram::open_in_memory().unwrap();
    engram
        .memory_spaces()
        .register("s1", "s1", SpaceType::Personal, None)
        .unwrap();
    let root = engram
        .contexts()
        .create("s1", "project", None, None, None, serde_json::Value::Null)
        .unwrap();
    let child = engram
        .contexts()
        .create(
            "s1",
            "task",
            Some(root.context_id.clone()),
            None,
            None,
            serde_json::Value::Null,
        )
        .unwrap();

    let summary = engram
        .forget("s1", &root.context_id, ForgetOptions::default())
        .await
        .unwrap();
    assert_eq!(summary.contexts, 2);
    assert!(matches!(
        engram.contexts().get("s1", &child.context_id),
        Err(EngramError::NotFound { .. })
    ));
}

#[tokio::test]
async fn graph_projection_is_removed_with_the_canonical_rows() {
    let adapter = Arc::new(InMemoryGraph::new());
    let mut config = EngramConfig::default();
    config.graph.mirror = true;

    let engram = Engram::builder(config)
        .extractor(Arc::new(StaticExtractor {
            facts: vec![extracted_preference("Alice", "prefers", "TypeScript", 85)],
        }))
        .graph_adapter(adapter.clone() as Arc<dyn IGraphAdapter>)
        .build()
        .unwrap();

    let outcome = engram
        .remember(remember_request("s1", "u1", "I prefer TypeScript", "Noted"))
        .await
        .unwrap();
    assert!(adapter.count_nodes().await.unwrap() > 0);

    let graph_events: Vec<_> = outcome
        .events
        .iter()
        .filter(|e| e.layer == OrchestrationLayer::Graph)
        .collect();
    assert!(graph_events.iter().any(|e| e.status == LayerStatus::Complete));

    engram.delete_user("u1", true).await.unwrap();

    // Only the untouched User node may remain unreferenced; every canonical
    // projection for the purged space is gone.
    let remaining = adapter.count_nodes().await.unwrap();
    let facts_remaining = adapter
        .traverse("space:s1", None, 3)
        .await
        .unwrap();
    assert!(facts_remaining.is_empty());
    assert!(remaining < 4, "expected only stray entity/user nodes, got {remaining}");
}

#[tokio::test]
async fn unknown_target_is_not_found() {
    let engram = Engram::open_in_memory().unwrap();
    engram
        .memory_spaces()
        .register("s1", "s1", SpaceType::Personal, None)
        .unwrap();
    assert!(matches!(
        engram.forget("s1", "ghost", ForgetOptions::default()).await,
        Err(EngramError::NotFound { .. })
    ));
}
