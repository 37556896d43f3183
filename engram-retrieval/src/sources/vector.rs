//! Vector source: cosine k-NN over embedded memories.

use engram_core::errors::EngramResult;
use engram_core::models::{RecallHit, RecallRequest, RecallSourceKind};
use engram_storage::StorageEngine;

use super::memory_hit;

/// Runs k-NN with the resolved query embedding. The caller has already
/// decided the embedding (supplied or generated); without one this source
/// is skipped upstream.
pub fn run(
    storage: &StorageEngine,
    request: &RecallRequest,
    query_embedding: &[f32],
) -> EngramResult<Vec<RecallHit>> {
    let hits = storage.memories().vector_search(
        &request.memory_space_id,
        query_embedding,
        request.limit.max(1),
        &request.filters,
    )?;
    Ok(hits
        .into_iter()
        // Zero similarity carries no signal; keep it out of the merge.
        .filter(|hit| hit.score > 0.0)
        .map(|hit| memory_hit(hit.memory, hit.score, RecallSourceKind::Vector))
        .collect())
}
