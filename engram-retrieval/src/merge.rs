//! Deduplication and deterministic ordering of per-source hit lists.

use std::collections::HashMap;

use engram_core::models::{HitLayer, RecallHit};

/// Merge per-source hit lists. Items are keyed by `(layer, id)`; the merged
/// score is the max across sources and every contributing source is kept on
/// the hit. Ordering: score desc, importance desc, created_at desc, id asc
/// as the final total-order tie-break.
pub fn merge_hits(source_results: Vec<Vec<RecallHit>>, limit: usize) -> Vec<RecallHit> {
    let mut merged: HashMap<(HitLayer, String), RecallHit> = HashMap::new();

    for hits in source_results {
        for hit in hits {
            let key = (hit.layer, hit.id.clone());
            match merged.get_mut(&key) {
                Some(existing) => {
                    if hit.score > existing.score {
                        existing.score = hit.score;
                    }
                    for source in hit.sources {
                        if !existing.sources.contains(&source) {
                            existing.sources.push(source);
                        }
                    }
                }
                None => {
                    merged.insert(key, hit);
                }
            }
        }
    }

    let mut out: Vec<RecallHit> = merged.into_values().collect();
    out.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.importance.cmp(&a.importance))
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    out.truncate(limit);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::models::{
        ContentType, MemoryRecord, MemorySource, RecallPayload, RecallSourceKind,
    };

    fn hit(id: &str, score: f64, importance: u8, created_at: i64, source: RecallSourceKind) -> RecallHit {
        let memory = MemoryRecord {
            memory_id: id.into(),
            memory_space_id: "s".into(),
            content: "x".into(),
            content_type: ContentType::Raw,
            embedding: None,
            user_id: None,
            source: MemorySource::default(),
            conversation_ref: None,
            tags: vec![],
            importance,
            created_at,
            version: 1,
            archived_at: None,
        };
        RecallHit {
            layer: HitLayer::Memory,
            id: id.into(),
            score,
            sources: vec![source],
            importance,
            created_at,
            payload: RecallPayload::Memory(Box::new(memory)),
        }
    }

    #[test]
    fn duplicate_ids_merge_to_max_score() {
        let merged = merge_hits(
            vec![
                vec![hit("a", 0.4, 10, 1, RecallSourceKind::Lexical)],
                vec![hit("a", 0.9, 10, 1, RecallSourceKind::Vector)],
            ],
            10,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].score, 0.9);
        assert_eq!(merged[0].sources.len(), 2);
    }

    #[test]
    fn ordering_is_score_then_importance_then_recency() {
        let merged = merge_hits(
            vec![vec![
                hit("low", 0.2, 99, 99, RecallSourceKind::Vector),
                hit("imp", 0.8, 90, 1, RecallSourceKind::Vector),
                hit("new", 0.8, 90, 50, RecallSourceKind::Vector),
                hit("top", 0.8, 95, 1, RecallSourceKind::Vector),
            ]],
            10,
        );
        let ids: Vec<_> = merged.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["top", "new", "imp", "low"]);
    }

    #[test]
    fn truncates_to_limit() {
        let hits: Vec<RecallHit> = (0..20)
            .map(|i| hit(&format!("m{i:02}"), 0.5, 0, i, RecallSourceKind::Vector))
            .collect();
        assert_eq!(merge_hits(vec![hits], 5).len(), 5);
    }
}
