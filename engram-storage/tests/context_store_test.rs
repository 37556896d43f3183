//! L4 context trees: chains, depth law, depth cap, subtree deletion.

use engram_core::config::EngramConfig;
use engram_core::models::SpaceType;
use engram_core::EngramError;
use engram_storage::StorageEngine;

fn engine() -> StorageEngine {
    let engine = StorageEngine::open_in_memory().expect("open in-memory storage");
    engine
        .spaces()
        .register("s1", "space one", SpaceType::Personal, None)
        .unwrap();
    engine
}

fn create(engine: &StorageEngine, purpose: &str, parent: Option<String>) -> String {
    engine
        .contexts()
        .create("s1", purpose, parent, None, None, serde_json::Value::Null)
        .unwrap()
        .context_id
}

#[test]
fn chain_runs_root_to_node_with_increasing_depths() {
    let engine = engine();
    let root = create(&engine, "project", None);
    let child = create(&engine, "feature", Some(root.clone()));
    let grandchild = create(&engine, "task", Some(child.clone()));

    let chain = engine.contexts().get_chain(&grandchild).unwrap();
    let ids: Vec<_> = chain.iter().map(|c| c.context_id.clone()).collect();
    let depths: Vec<_> = chain.iter().map(|c| c.depth).collect();
    assert_eq!(ids, vec![root.clone(), child.clone(), grandchild.clone()]);
    assert_eq!(depths, vec![0, 1, 2]);

    // Depth law holds on every node.
    for pair in chain.windows(2) {
        assert_eq!(pair[1].depth, pair[0].depth + 1);
        assert_eq!(pair[1].parent_id.as_deref(), Some(pair[0].context_id.as_str()));
    }
}

#[test]
fn parent_lists_its_direct_children() {
    let engine = engine();
    let root = create(&engine, "project", None);
    let a = create(&engine, "a", Some(root.clone()));
    let b = create(&engine, "b", Some(root.clone()));

    let got = engine.contexts().get("s1", &root).unwrap();
    let mut children = got.child_ids.clone();
    children.sort();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(children, expected);
}

#[test]
fn depth_cap_rejects_overdeep_contexts() {
    let mut config = EngramConfig::default();
    config.limits.contexts_max_depth = 2;
    let engine = StorageEngine::open_in_memory_with(config).unwrap();
    engine
        .spaces()
        .register("s1", "space one", SpaceType::Personal, None)
        .unwrap();

    let mut parent = create(&engine, "depth 0", None);
    parent = create(&engine, "depth 1", Some(parent));
    parent = create(&engine, "depth 2", Some(parent));

    let err = engine
        .contexts()
        .create("s1", "depth 3", Some(parent), None, None, serde_json::Value::Null)
        .unwrap_err();
    assert!(matches!(err, EngramError::DependencyCycle(_)));
}

#[test]
fn delete_removes_the_whole_subtree() {
    let engine = engine();
    let root = create(&engine, "project", None);
    let child = create(&engine, "feature", Some(root.clone()));
    let grandchild = create(&engine, "task", Some(child.clone()));
    let unrelated = create(&engine, "other", None);

    let deleted = engine.contexts().delete("s1", &root).unwrap();
    assert_eq!(deleted, 3);

    for id in [&root, &child, &grandchild] {
        assert!(matches!(
            engine.contexts().get("s1", id),
            Err(EngramError::NotFound { .. })
        ));
    }
    assert!(engine.contexts().get("s1", &unrelated).is_ok());
}

#[test]
fn traverse_covers_the_subtree_breadth_first() {
    let engine = engine();
    let root = create(&engine, "project", None);
    let a = create(&engine, "a", Some(root.clone()));
    let _b = create(&engine, "b", Some(root.clone()));
    let _a1 = create(&engine, "a1", Some(a.clone()));

    let subtree = engine.contexts().traverse(&root).unwrap();
    assert_eq!(subtree.len(), 4);
    assert_eq!(subtree[0].context_id, root);
    assert!(subtree.windows(2).all(|w| w[0].depth <= w[1].depth));
}

#[test]
fn parent_from_another_space_is_rejected() {
    let engine = engine();
    engine
        .spaces()
        .register("s2", "space two", SpaceType::Team, None)
        .unwrap();
    let foreign_root = engine
        .contexts()
        .create("s2", "foreign", None, None, None, serde_json::Value::Null)
        .unwrap();

    let err = engine
        .contexts()
        .create(
            "s1",
            "child",
            Some(foreign_root.context_id),
            None,
            None,
            serde_json::Value::Null,
        )
        .unwrap_err();
    assert!(matches!(err, EngramError::IsolationViolation { .. }));
}
