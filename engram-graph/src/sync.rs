//! Bounded reconciliation: rebuild the mirror from the canonical layers,
//! newest first, up to a per-layer limit. Deleting the graph and re-running
//! this yields the same projection the write-through path maintains.

use tracing::info;

use engram_core::errors::EngramResult;
use engram_storage::StorageEngine;

use crate::mirror::GraphMirror;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub spaces: usize,
    pub conversations: usize,
    pub memories: usize,
    pub facts: usize,
    pub contexts: usize,
}

/// Walk canonical layers newest-first and project them into the graph.
pub async fn initial_graph_sync(
    storage: &StorageEngine,
    mirror: &GraphMirror,
    limit_per_layer: usize,
) -> EngramResult<SyncReport> {
    let mut report = SyncReport::default();

    for space in storage.spaces().list()? {
        mirror.mirror_space(&space).await?;
        report.spaces += 1;

        let space_id = &space.memory_space_id;

        for conversation_id in storage
            .conversations()
            .list_in_space(space_id)?
            .into_iter()
            .take(limit_per_layer)
        {
            let conversation = storage.conversations().get(&conversation_id)?;
            mirror.mirror_conversation(&conversation).await?;
            report.conversations += 1;
        }

        for memory in storage.memories().list(space_id, limit_per_layer)? {
            mirror.mirror_memory(&memory).await?;
            report.memories += 1;
        }

        for fact in storage.facts().list(space_id, None, limit_per_layer)? {
            mirror.mirror_fact(&fact).await?;
            report.facts += 1;
        }

        for context in storage.contexts().list(space_id)?.into_iter().take(limit_per_layer) {
            mirror.mirror_context(&context).await?;
            report.contexts += 1;
        }
    }

    info!(
        spaces = report.spaces,
        conversations = report.conversations,
        memories = report.memories,
        facts = report.facts,
        contexts = report.contexts,
        "graph sync complete"
    );
    Ok(report)
}
