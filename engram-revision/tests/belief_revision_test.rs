//! Belief revision end to end against real storage: supersession,
//! absorbing duplicates, merge updates, and classifier fallback.

use std::sync::Arc;

use engram_core::config::RevisionConfig;
use engram_core::models::{ClassifierVerdict, FactQuery, FactStatus, RevisionAction};
use engram_revision::RevisionEngine;
use engram_storage::StorageEngine;
use test_fixtures::{preference_fact, StaticClassifier};

fn storage() -> Arc<StorageEngine> {
    test_fixtures::init_tracing();
    let engine = StorageEngine::open_in_memory().expect("open in-memory storage");
    engine
        .spaces()
        .register("s1", "space one", engram_core::models::SpaceType::Personal, None)
        .unwrap();
    Arc::new(engine)
}

fn revision(storage: &Arc<StorageEngine>) -> RevisionEngine {
    RevisionEngine::new(Arc::clone(storage), RevisionConfig::default(), None)
}

#[tokio::test]
async fn first_fact_is_added() {
    let storage = storage();
    let engine = revision(&storage);

    let decision = engine
        .store_fact("s1", preference_fact("Alice", "prefers", "TypeScript", 85))
        .await
        .unwrap();
    assert_eq!(decision.action, RevisionAction::Add);
    assert!(decision.superseded.is_empty());

    let stored = storage.facts().get("s1", &decision.fact_id).unwrap();
    assert_eq!(stored.status, FactStatus::Active);
}

#[tokio::test]
async fn changed_object_supersedes_the_old_belief() {
    let storage = storage();
    let engine = revision(&storage);

    let first = engine
        .store_fact("s1", preference_fact("Alice", "prefers", "TypeScript", 85))
        .await
        .unwrap();
    let second = engine
        .store_fact("s1", preference_fact("Alice", "prefers", "Python", 90))
        .await
        .unwrap();

    assert_eq!(second.action, RevisionAction::Supersede);
    assert_eq!(second.superseded, vec![first.fact_id.clone()]);

    // One active belief for (Alice, prefers), object Python.
    let active = storage
        .facts()
        .query(
            "s1",
            &FactQuery {
                subject: Some("Alice".into()),
                predicate: Some("prefers".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].object.as_deref(), Some("Python"));

    let old = storage.facts().get("s1", &first.fact_id).unwrap();
    assert_eq!(old.status, FactStatus::Superseded);
    assert_eq!(old.superseded_by.as_deref(), Some(second.fact_id.as_str()));

    let new = storage.facts().get("s1", &second.fact_id).unwrap();
    assert_eq!(new.supersedes, vec![first.fact_id]);
}

#[tokio::test]
async fn identical_fact_is_an_absorbing_duplicate() {
    let storage = storage();
    let engine = revision(&storage);

    let first = engine
        .store_fact("s1", preference_fact("Alice", "prefers", "TypeScript", 85))
        .await
        .unwrap();

    // storing f twice is equivalent to storing once, then NONE.
    for _ in 0..3 {
        let again = engine
            .store_fact("s1", preference_fact("Alice", "prefers", "TypeScript", 85))
            .await
            .unwrap();
        assert_eq!(again.action, RevisionAction::None);
        assert_eq!(again.fact_id, first.fact_id);
    }

    let active = storage.facts().list("s1", None, 10).unwrap();
    assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn new_confidence_merges_into_the_existing_fact() {
    let storage = storage();
    let engine = revision(&storage);

    let first = engine
        .store_fact("s1", preference_fact("Alice", "prefers", "TypeScript", 85))
        .await
        .unwrap();
    let merged = engine
        .store_fact("s1", preference_fact("Alice", "prefers", "TypeScript", 95))
        .await
        .unwrap();

    assert_eq!(merged.action, RevisionAction::Update);
    assert_eq!(merged.fact_id, first.fact_id);

    let stored = storage.facts().get("s1", &first.fact_id).unwrap();
    assert_eq!(stored.confidence, 95);
    assert_eq!(storage.facts().list("s1", None, 10).unwrap().len(), 1);
}

#[tokio::test]
async fn disabled_revision_always_adds() {
    let storage = storage();
    let engine = RevisionEngine::new(
        Arc::clone(&storage),
        RevisionConfig {
            enabled: false,
            ..Default::default()
        },
        None,
    );

    engine
        .store_fact("s1", preference_fact("Alice", "prefers", "TypeScript", 85))
        .await
        .unwrap();
    let second = engine
        .store_fact("s1", preference_fact("Alice", "prefers", "TypeScript", 85))
        .await
        .unwrap();
    assert_eq!(second.action, RevisionAction::Add);
    assert_eq!(storage.facts().list("s1", None, 10).unwrap().len(), 2);
}

#[tokio::test]
async fn invalid_classifier_verdict_falls_back_to_rules() {
    let storage = storage();
    let classifier = Arc::new(StaticClassifier {
        verdict: ClassifierVerdict {
            action: "OBLITERATE".into(),
            supersedes: vec![],
        },
    });
    let engine = RevisionEngine::new(
        Arc::clone(&storage),
        RevisionConfig {
            llm_resolution: true,
            ..Default::default()
        },
        Some(classifier),
    );

    engine
        .store_fact("s1", preference_fact("Alice", "prefers", "TypeScript", 85))
        .await
        .unwrap();
    let second = engine
        .store_fact("s1", preference_fact("Alice", "prefers", "Python", 90))
        .await
        .unwrap();

    // The rules still decide: different object supersedes.
    assert_eq!(second.action, RevisionAction::Supersede);
}

#[tokio::test]
async fn valid_classifier_verdict_is_honored() {
    let storage = storage();

    // First belief goes in rule-based.
    let bootstrap = RevisionEngine::new(Arc::clone(&storage), RevisionConfig::default(), None);
    let first = bootstrap
        .store_fact("s1", preference_fact("Alice", "prefers", "TypeScript", 85))
        .await
        .unwrap();

    // A classifier that insists the changed belief is merely an update.
    let classifier = Arc::new(StaticClassifier {
        verdict: ClassifierVerdict {
            action: "UPDATE".into(),
            supersedes: vec![],
        },
    });
    let engine = RevisionEngine::new(
        Arc::clone(&storage),
        RevisionConfig {
            llm_resolution: true,
            ..Default::default()
        },
        Some(classifier),
    );

    let second = engine
        .store_fact("s1", preference_fact("Alice", "prefers", "Python", 90))
        .await
        .unwrap();
    assert_eq!(second.action, RevisionAction::Update);
    assert_eq!(second.fact_id, first.fact_id);
}
