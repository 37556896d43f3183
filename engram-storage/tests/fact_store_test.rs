//! L3 fact store: round trips, active-only default reads, structured
//! queries, supersession pointer maintenance.

use std::collections::BTreeMap;

use engram_core::models::*;
use engram_core::{now_ms, EngramError};
use engram_storage::queries::fact_ops;
use engram_storage::StorageEngine;

fn engine() -> StorageEngine {
    let engine = StorageEngine::open_in_memory().expect("open in-memory storage");
    engine
        .spaces()
        .register("s1", "space one", SpaceType::Personal, None)
        .unwrap();
    engine
}

fn fact(id: &str, subject: &str, predicate: &str, object: &str) -> Fact {
    Fact {
        fact_id: id.into(),
        memory_space_id: "s1".into(),
        fact: format!("{subject} {predicate} {object}"),
        fact_type: FactType::Preference,
        subject: Some(subject.into()),
        predicate: Some(predicate.into()),
        object: Some(object.into()),
        slots: Default::default(),
        confidence: 80,
        source_type: "manual".into(),
        source_ref: None,
        tags: vec!["pref".into()],
        status: FactStatus::Active,
        supersedes: vec![],
        superseded_by: None,
        created_at: now_ms(),
    }
}

#[test]
fn insert_then_get_round_trips_slots_and_tags() {
    let engine = engine();
    let mut stored = fact("f1", "alice", "prefers", "typescript");
    stored.slots = BTreeMap::from([
        ("language".to_string(), serde_json::json!("typescript")),
        ("strength".to_string(), serde_json::json!(0.9)),
    ]);
    engine.facts().insert(&stored).unwrap();

    let got = engine.facts().get("s1", "f1").unwrap();
    assert_eq!(got.fact, "alice prefers typescript");
    assert_eq!(got.slots, stored.slots);
    assert_eq!(got.tags, vec!["pref".to_string()]);
    assert_eq!(got.status, FactStatus::Active);
}

#[test]
fn default_reads_see_active_only() {
    let engine = engine();
    engine.facts().insert(&fact("active", "a", "p", "x")).unwrap();
    let mut duplicate = fact("dup", "a", "p", "x");
    duplicate.status = FactStatus::Duplicate;
    engine.facts().insert(&duplicate).unwrap();

    let default_list = engine.facts().list("s1", None, 10).unwrap();
    assert_eq!(default_list.len(), 1);
    assert_eq!(default_list[0].fact_id, "active");

    // Explicit flag surfaces the absorbed duplicate.
    let duplicates = engine.facts().list("s1", Some(FactStatus::Duplicate), 10).unwrap();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].fact_id, "dup");
}

#[test]
fn query_filters_by_triple_parts_and_tags() {
    let engine = engine();
    engine.facts().insert(&fact("f1", "alice", "prefers", "typescript")).unwrap();
    engine.facts().insert(&fact("f2", "alice", "works_at", "acme")).unwrap();
    engine.facts().insert(&fact("f3", "bob", "prefers", "go")).unwrap();

    let by_subject = engine
        .facts()
        .query(
            "s1",
            &FactQuery {
                subject: Some("alice".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(by_subject.len(), 2);

    let by_triple = engine
        .facts()
        .query(
            "s1",
            &FactQuery {
                subject: Some("alice".into()),
                predicate: Some("prefers".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(by_triple.len(), 1);
    assert_eq!(by_triple[0].fact_id, "f1");

    let by_tag = engine
        .facts()
        .query(
            "s1",
            &FactQuery {
                tags: Some(vec!["pref".into()]),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(by_tag.len(), 3);
}

#[test]
fn superseded_fact_keeps_pointer_to_active_successor() {
    let engine = engine();
    engine.facts().insert(&fact("old", "alice", "prefers", "typescript")).unwrap();
    let mut new = fact("new", "alice", "prefers", "python");
    new.supersedes = vec!["old".into()];
    engine.facts().insert(&new).unwrap();
    engine
        .pool()
        .writer
        .with_txn(|conn| fact_ops::mark_superseded(conn, "old", "new"))
        .unwrap();

    let old = engine.facts().get("s1", "old").unwrap();
    assert_eq!(old.status, FactStatus::Superseded);
    assert_eq!(old.superseded_by.as_deref(), Some("new"));

    let successor = engine.facts().get("s1", old.superseded_by.as_deref().unwrap()).unwrap();
    assert_eq!(successor.status, FactStatus::Active);

    let active = engine.facts().list("s1", None, 10).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].fact_id, "new");
}

#[test]
fn deleting_a_superseded_fact_rewrites_supersedes_arrays() {
    let engine = engine();
    engine.facts().insert(&fact("old", "alice", "prefers", "typescript")).unwrap();
    let mut new = fact("new", "alice", "prefers", "python");
    new.supersedes = vec!["old".into()];
    engine.facts().insert(&new).unwrap();
    engine
        .pool()
        .writer
        .with_txn(|conn| fact_ops::mark_superseded(conn, "old", "new"))
        .unwrap();

    engine.facts().delete("s1", "old").unwrap();

    // Nothing resurrects; the successor just drops the gone id.
    let successor = engine.facts().get("s1", "new").unwrap();
    assert_eq!(successor.status, FactStatus::Active);
    assert!(successor.supersedes.is_empty());
}

#[test]
fn retract_keeps_the_row_out_of_default_reads() {
    let engine = engine();
    engine.facts().insert(&fact("f1", "alice", "prefers", "typescript")).unwrap();
    engine.facts().retract("s1", "f1").unwrap();

    assert!(engine.facts().list("s1", None, 10).unwrap().is_empty());
    let retracted = engine.facts().get("s1", "f1").unwrap();
    assert_eq!(retracted.status, FactStatus::Retracted);
}

#[test]
fn cross_space_fact_get_is_an_isolation_violation() {
    let engine = engine();
    engine
        .spaces()
        .register("s2", "space two", SpaceType::Team, None)
        .unwrap();
    engine.facts().insert(&fact("f1", "alice", "prefers", "typescript")).unwrap();

    let err = engine.facts().get("s2", "f1").unwrap_err();
    assert!(matches!(err, EngramError::IsolationViolation { .. }));
}
