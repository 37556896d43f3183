//! Facts source: triple and slot lookup plus full-text over the statement.
//!
//! Scoring: 1.0 when the query names the whole triple, confidence/100 for a
//! subject/object slot hit, 0.5 for a bare text match.

use std::collections::HashMap;

use engram_core::errors::EngramResult;
use engram_core::models::{Fact, RecallHit, RecallRequest, RecallSourceKind};
use engram_storage::StorageEngine;

use super::{fact_hit, query_tokens};

const CANDIDATE_SCAN: usize = 500;

fn triple_score(fact: &Fact, tokens: &[String]) -> Option<f64> {
    let contains = |value: &Option<String>| {
        value
            .as_deref()
            .map(|v| {
                let v = v.to_lowercase();
                tokens.iter().any(|t| v.contains(t.as_str()))
            })
            .unwrap_or(false)
    };

    let subject = contains(&fact.subject);
    let predicate = contains(&fact.predicate);
    let object = contains(&fact.object);

    if subject && predicate && object {
        return Some(1.0);
    }
    if subject || object {
        return Some(f64::from(fact.confidence) / 100.0);
    }
    None
}

pub fn run(storage: &StorageEngine, request: &RecallRequest) -> EngramResult<Vec<RecallHit>> {
    let tokens = query_tokens(&request.query);
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let mut scored: HashMap<String, (Fact, f64)> = HashMap::new();

    // Structured pass over active facts.
    let active = storage
        .facts()
        .list(&request.memory_space_id, None, CANDIDATE_SCAN)?;
    for fact in active {
        if let Some(score) = triple_score(&fact, &tokens) {
            scored.insert(fact.fact_id.clone(), (fact, score));
        }
    }

    // Text pass; never downgrades a structured score.
    let text_hits = storage.facts().search_text(
        &request.memory_space_id,
        &request.query,
        request.limit.max(1),
    )?;
    for hit in text_hits {
        scored
            .entry(hit.fact.fact_id.clone())
            .or_insert((hit.fact, hit.score));
    }

    Ok(scored
        .into_values()
        .map(|(fact, score)| fact_hit(fact, score, RecallSourceKind::Facts))
        .collect())
}
