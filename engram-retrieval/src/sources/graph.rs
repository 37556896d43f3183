//! Graph source: traversal from entities named in the query out to facts
//! and memories within two hops. Score decays with distance as 1/(1+hops).

use std::sync::Arc;

use engram_core::errors::EngramResult;
use engram_core::models::{RecallHit, RecallRequest, RecallSourceKind};
use engram_core::traits::IGraphAdapter;
use engram_core::EngramError;
use engram_graph::projection;
use engram_storage::StorageEngine;

use super::{fact_hit, memory_hit, query_tokens};

const MAX_HOPS: usize = 2;

pub async fn run(
    storage: &StorageEngine,
    adapter: &Arc<dyn IGraphAdapter>,
    request: &RecallRequest,
) -> EngramResult<Vec<RecallHit>> {
    let mut hits = Vec::new();

    for token in query_tokens(&request.query) {
        let seed = projection::entity_node_id(&token);
        let reached = adapter.traverse(&seed, None, MAX_HOPS).await?;

        for traversal in reached {
            let score = 1.0 / (1.0 + traversal.hops as f64);
            match projection::parse_node_id(&traversal.node.id) {
                Some(("fact", fact_id)) => {
                    match storage.facts().get(&request.memory_space_id, fact_id) {
                        Ok(fact) => hits.push(fact_hit(fact, score, RecallSourceKind::Graph)),
                        // Stale mirror rows and foreign-space nodes are skipped,
                        // never surfaced across the isolation boundary.
                        Err(EngramError::NotFound { .. })
                        | Err(EngramError::IsolationViolation { .. }) => {}
                        Err(e) => return Err(e),
                    }
                }
                Some(("memory", memory_id)) => {
                    match storage.memories().get(&request.memory_space_id, memory_id) {
                        Ok(memory) => hits.push(memory_hit(memory, score, RecallSourceKind::Graph)),
                        Err(EngramError::NotFound { .. })
                        | Err(EngramError::IsolationViolation { .. }) => {}
                        Err(e) => return Err(e),
                    }
                }
                _ => {}
            }
        }
    }

    Ok(hits)
}
