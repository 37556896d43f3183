//! Property tests for the storage invariants: gapless message ordering,
//! space isolation, and embedding-dimension consistency.

use engram_core::models::*;
use engram_storage::StorageEngine;
use proptest::prelude::*;

fn engine_with_spaces(spaces: &[&str]) -> StorageEngine {
    let engine = StorageEngine::open_in_memory().expect("open in-memory storage");
    for space in spaces {
        engine
            .spaces()
            .register(space, space, SpaceType::Personal, None)
            .unwrap();
    }
    engine
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn message_count_equals_length_with_no_gaps(count in 1usize..16) {
        let engine = engine_with_spaces(&["s1"]);
        let conversation = engine
            .conversations()
            .create("s1", ConversationType::UserAgent, Default::default())
            .unwrap();

        for i in 0..count {
            engine
                .conversations()
                .add_message(
                    &conversation.conversation_id,
                    MessageRole::User,
                    &format!("m{i}"),
                    None,
                    None,
                )
                .unwrap();
        }

        let got = engine.conversations().get(&conversation.conversation_id).unwrap();
        prop_assert_eq!(got.message_count, count);
        prop_assert_eq!(got.messages.len(), count);
        for (i, message) in got.messages.iter().enumerate() {
            prop_assert_eq!(&message.content, &format!("m{i}"));
        }
    }

    #[test]
    fn queries_never_cross_the_space_boundary(
        own in 1usize..6,
        foreign in 1usize..6,
    ) {
        let engine = engine_with_spaces(&["s1", "s2"]);
        for i in 0..own {
            engine
                .memories()
                .store("s1", NewMemory { content: format!("own {i}"), ..Default::default() })
                .unwrap();
        }
        for i in 0..foreign {
            engine
                .memories()
                .store("s2", NewMemory { content: format!("foreign {i}"), ..Default::default() })
                .unwrap();
        }

        let listed = engine.memories().list("s1", 100).unwrap();
        prop_assert_eq!(listed.len(), own);
        prop_assert!(listed.iter().all(|m| m.memory_space_id == "s1"));
    }

    #[test]
    fn stored_embeddings_always_match_the_space_dimension(
        dimension in 2usize..16,
        attempts in prop::collection::vec(2usize..16, 1..6),
    ) {
        let engine = engine_with_spaces(&["s1"]);
        engine
            .memories()
            .store("s1", NewMemory {
                content: "pin".into(),
                embedding: Some(vec![0.5; dimension]),
                ..Default::default()
            })
            .unwrap();

        for attempt in attempts {
            let _ = engine.memories().store("s1", NewMemory {
                content: "more".into(),
                embedding: Some(vec![0.5; attempt]),
                ..Default::default()
            });
        }

        for memory in engine.memories().list("s1", 100).unwrap() {
            if let Some(embedding) = memory.embedding {
                prop_assert_eq!(embedding.len(), dimension);
            }
        }
    }
}
