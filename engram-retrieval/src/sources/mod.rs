//! One module per retrieval strategy. Each returns scored hits tagged with
//! its own source kind; the recall engine merges them.

pub mod facts;
pub mod graph;
pub mod lexical;
pub mod vector;

use engram_core::models::{
    Fact, HitLayer, MemoryRecord, RecallHit, RecallPayload, RecallSourceKind,
};

pub(crate) fn memory_hit(memory: MemoryRecord, score: f64, source: RecallSourceKind) -> RecallHit {
    RecallHit {
        layer: HitLayer::Memory,
        id: memory.memory_id.clone(),
        score,
        sources: vec![source],
        importance: memory.importance,
        created_at: memory.created_at,
        payload: RecallPayload::Memory(Box::new(memory)),
    }
}

pub(crate) fn fact_hit(fact: Fact, score: f64, source: RecallSourceKind) -> RecallHit {
    RecallHit {
        layer: HitLayer::Fact,
        id: fact.fact_id.clone(),
        score,
        // Facts have no importance of their own; confidence stands in for
        // the ranking tie-break.
        sources: vec![source],
        importance: fact.confidence,
        created_at: fact.created_at,
        payload: RecallPayload::Fact(Box::new(fact)),
    }
}

pub(crate) fn query_tokens(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|t| !t.is_empty())
        .collect()
}
