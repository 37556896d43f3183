//! End-to-end `remember` orchestration: self-recall, soft-failure
//! isolation, idempotent re-runs, and the observer contract.

use std::sync::Arc;

use async_trait::async_trait;
use engram_core::config::EngramConfig;
use engram_core::errors::EngramResult;
use engram_core::models::*;
use engram_core::traits::IEmbeddingProvider;
use engram_core::EngramError;
use engram_orchestrator::Engram;
use test_fixtures::{
    extracted_preference, remember_request, FailingExtractor, RecordingObserver, StaticExtractor,
};

/// Embeds preference statements onto one axis and everything else onto an
/// orthogonal one.
struct AxisEmbedder;

#[async_trait]
impl IEmbeddingProvider for AxisEmbedder {
    async fn embed(&self, text: &str) -> EngramResult<Vec<f32>> {
        if text.contains("TypeScript") {
            Ok(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.0])
        } else {
            Ok(vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0])
        }
    }
}

#[tokio::test]
async fn remembered_turn_is_recallable_by_its_own_embedding() {
    test_fixtures::init_tracing();
    let engram = Engram::builder(EngramConfig::default())
        .embedder(Arc::new(AxisEmbedder))
        .build()
        .unwrap();

    let outcome = engram
        .remember(remember_request("s1", "Alice", "I prefer TypeScript", "Noted"))
        .await
        .unwrap();
    assert_eq!(outcome.created.message_ids.len(), 2);
    assert_eq!(outcome.created.memory_ids.len(), 2);

    let response = engram
        .recall(RecallRequest {
            memory_space_id: "s1".into(),
            query: "language preference".into(),
            embedding: Some(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.0]),
            limit: 5,
            sources: RecallSources {
                vector: true,
                ..Default::default()
            },
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(response.items.len(), 1);
    let top = &response.items[0];
    assert!(top.score >= 0.99, "similarity was {}", top.score);
    assert_eq!(top.sources, vec![RecallSourceKind::Vector]);
    match &top.payload {
        RecallPayload::Memory(memory) => assert_eq!(memory.content, "I prefer TypeScript"),
        other => panic!("expected memory payload, got {other:?}"),
    }
}

#[tokio::test]
async fn extractor_failure_is_isolated_from_hard_layers() {
    let engram = Engram::builder(EngramConfig::default())
        .extractor(Arc::new(FailingExtractor))
        .build()
        .unwrap();

    let outcome = engram
        .remember(remember_request("s1", "Alice", "I prefer TypeScript", "Noted"))
        .await
        .unwrap();

    // The facts layer reported the blow-up...
    assert!(outcome.events.iter().any(|e| {
        e.layer == OrchestrationLayer::Facts && e.status == LayerStatus::Error
    }));

    // ...while both hard layers landed.
    let conversation = engram
        .conversations()
        .get(outcome.created.conversation_id.as_deref().unwrap())
        .unwrap();
    assert_eq!(conversation.message_count, 2);
    assert_eq!(engram.vector().list("s1", 10).unwrap().len(), 2);
    assert!(engram.facts().list("s1", None, 10).unwrap().is_empty());
}

#[tokio::test]
async fn rerunning_with_the_same_key_changes_nothing() {
    let engram = Engram::builder(EngramConfig::default())
        .extractor(Arc::new(StaticExtractor {
            facts: vec![extracted_preference("Alice", "prefers", "TypeScript", 85)],
        }))
        .build()
        .unwrap();

    let mut request = remember_request("s1", "Alice", "I prefer TypeScript", "Noted");
    request.timestamp = Some(1_722_000_000_000);

    let first = engram.remember(request.clone()).await.unwrap();
    request.conversation_id = first.created.conversation_id.clone();
    let second = engram.remember(request.clone()).await.unwrap();
    let third = engram.remember(request).await.unwrap();

    // Layer counts identical to a single run.
    let conversation = engram
        .conversations()
        .get(first.created.conversation_id.as_deref().unwrap())
        .unwrap();
    assert_eq!(conversation.message_count, 2);
    assert_eq!(engram.vector().list("s1", 10).unwrap().len(), 2);
    assert_eq!(engram.facts().list("s1", None, 10).unwrap().len(), 1);

    // Re-runs create nothing new.
    assert_eq!(second.created.message_ids, first.created.message_ids);
    assert!(second.created.memory_ids.is_empty());
    assert!(second.created.fact_ids.is_empty());
    assert!(third.created.fact_ids.is_empty());
}

#[tokio::test]
async fn empty_extraction_leaves_facts_untouched_and_completes() {
    let engram = Engram::builder(EngramConfig::default())
        .extractor(Arc::new(StaticExtractor { facts: vec![] }))
        .build()
        .unwrap();

    let outcome = engram
        .remember(remember_request("s1", "Alice", "hello there", "hi"))
        .await
        .unwrap();

    assert!(outcome.created.fact_ids.is_empty());
    assert!(engram.facts().list("s1", None, 10).unwrap().is_empty());
    assert!(outcome.events.iter().any(|e| {
        e.layer == OrchestrationLayer::Facts && e.status == LayerStatus::Complete
    }));
}

#[tokio::test]
async fn explicit_conversation_id_must_exist() {
    let engram = Engram::open_in_memory().unwrap();
    let mut request = remember_request("s1", "Alice", "hello", "hi");
    request.conversation_id = Some("conv_deleted".into());

    let err = engram.remember(request).await.unwrap_err();
    assert!(matches!(err, EngramError::NotFound { entity: "conversation", .. }));
}

#[tokio::test]
async fn reuses_an_existing_conversation_by_appending() {
    let engram = Engram::open_in_memory().unwrap();

    let first = engram
        .remember(remember_request("s1", "Alice", "turn one", "ack one"))
        .await
        .unwrap();

    let mut request = remember_request("s1", "Alice", "turn two", "ack two");
    request.conversation_id = first.created.conversation_id.clone();
    engram.remember(request).await.unwrap();

    let conversation = engram
        .conversations()
        .get(first.created.conversation_id.as_deref().unwrap())
        .unwrap();
    assert_eq!(conversation.message_count, 4);
    let contents: Vec<_> = conversation.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["turn one", "ack one", "turn two", "ack two"]);
}

#[tokio::test]
async fn observers_see_start_updates_and_completion() {
    let engram = Engram::open_in_memory().unwrap();
    let observer = Arc::new(RecordingObserver::default());
    engram.register_observer(observer.clone());

    let outcome = engram
        .remember(remember_request("s1", "Alice", "hello", "hi"))
        .await
        .unwrap();

    assert_eq!(*observer.starts.lock().unwrap(), vec![outcome.orchestration_id.clone()]);

    let updates = observer.updates.lock().unwrap();
    for layer in [
        OrchestrationLayer::MemorySpace,
        OrchestrationLayer::User,
        OrchestrationLayer::Agent,
        OrchestrationLayer::Conversation,
        OrchestrationLayer::Vector,
        OrchestrationLayer::Facts,
        OrchestrationLayer::Graph,
    ] {
        assert!(
            updates.iter().any(|u| u.layer == layer),
            "missing event for {layer:?}"
        );
    }

    let completions = observer.completions.lock().unwrap();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].orchestration_id, outcome.orchestration_id);
    assert_eq!(completions[0].created.message_ids.len(), 2);
}

#[tokio::test]
async fn second_space_registration_is_skipped_not_recreated() {
    let engram = Engram::open_in_memory().unwrap();

    let first = engram
        .remember(remember_request("s1", "Alice", "one", "ack"))
        .await
        .unwrap();
    let space_event = first
        .events
        .iter()
        .find(|e| e.layer == OrchestrationLayer::MemorySpace)
        .unwrap();
    assert_eq!(space_event.status, LayerStatus::Complete);

    let second = engram
        .remember(remember_request("s1", "Alice", "two", "ack"))
        .await
        .unwrap();
    let space_event = second
        .events
        .iter()
        .find(|e| e.layer == OrchestrationLayer::MemorySpace)
        .unwrap();
    assert_eq!(space_event.status, LayerStatus::Skipped);
}
