//! Lexical source: FTS5 over live memory content, bm25-normalized.

use engram_core::errors::EngramResult;
use engram_core::models::{RecallHit, RecallRequest, RecallSourceKind};
use engram_storage::StorageEngine;

use super::memory_hit;

pub fn run(storage: &StorageEngine, request: &RecallRequest) -> EngramResult<Vec<RecallHit>> {
    let hits = storage.memories().lexical_search(
        &request.memory_space_id,
        &request.query,
        request.limit.max(1),
        &request.filters,
    )?;
    Ok(hits
        .into_iter()
        .map(|hit| memory_hit(hit.memory, hit.score, RecallSourceKind::Lexical))
        .collect())
}
