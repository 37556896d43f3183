//! k-NN over embedded memories: brute-force cosine within one space.
//! Embeddings stay small (spaces fix a dimension at first insert) so a
//! filtered scan beats maintaining an ANN structure at this scale.

use rusqlite::{params, Connection};

use engram_core::errors::EngramResult;
use engram_core::models::{MemoryRecord, RecallFilters};

use super::memory_ops::{blob_to_embedding, row_to_memory};
use crate::to_storage_err;

/// A scored vector hit. `score` is cosine similarity mapped into [0, 1].
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub memory: MemoryRecord,
    pub score: f64,
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn passes_filters(memory: &MemoryRecord, filters: &RecallFilters) -> bool {
    if let Some(tags) = &filters.tags {
        if !tags.iter().any(|tag| memory.tags.contains(tag)) {
            return false;
        }
    }
    if let Some(content_type) = filters.content_type {
        if memory.content_type != content_type {
            return false;
        }
    }
    if let Some(min_importance) = filters.min_importance {
        if memory.importance < min_importance {
            return false;
        }
    }
    true
}

/// Top-`limit` live memories by cosine similarity to `query_embedding`,
/// restricted to one space and the given metadata filters.
pub fn knn_search(
    conn: &Connection,
    memory_space_id: &str,
    query_embedding: &[f32],
    limit: usize,
    filters: &RecallFilters,
) -> EngramResult<Vec<VectorHit>> {
    let mut stmt = conn
        .prepare(
            "SELECT memory_id, memory_space_id, version, content, content_type,
                    embedding, user_id, source, conversation_id, message_ids, tags,
                    importance, created_at, archived_at
             FROM memories
             WHERE memory_space_id = ?1 AND archived_at IS NULL AND embedding IS NOT NULL",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows = stmt
        .query_map(params![memory_space_id], |row| {
            let blob: Vec<u8> = row.get(5)?;
            Ok((row_to_memory(row), blob))
        })
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut hits = Vec::new();
    for (memory, blob) in rows {
        let memory = memory?;
        if !passes_filters(&memory, filters) {
            continue;
        }
        let embedding = blob_to_embedding(&blob);
        let similarity = cosine_similarity(&embedding, query_embedding);
        // Cosine lands in [-1, 1]; clamp the antipodal half to zero.
        let score = similarity.max(0.0);
        hits.push(VectorHit { memory, score });
    }

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.memory.importance.cmp(&a.memory.importance))
            .then_with(|| b.memory.created_at.cmp(&a.memory.created_at))
    });
    hits.truncate(limit);
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::cosine_similarity;

    #[test]
    fn identical_vectors_score_one() {
        let v = vec![0.1f32, 0.2, 0.3];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        let a = vec![1.0f32, 0.0];
        let b = vec![0.0f32, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-9);
    }

    #[test]
    fn mismatched_lengths_score_zero() {
        let a = vec![1.0f32, 0.0];
        let b = vec![1.0f32];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }
}
