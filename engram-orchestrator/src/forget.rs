//! `forget`: resolve the target, then remove (or archive) it and its
//! dependents in dependency order — graph projection first, then facts,
//! vector memories, conversations, contexts, and finally the target itself.
//! The summary reports what was actually removed even on partial failure.

use tracing::warn;

use engram_core::errors::EngramResult;
use engram_core::models::{Fact, ForgetOptions, ForgetSummary, MemoryRecord};
use engram_core::EngramError;
use engram_graph::GraphMirror;

use crate::client::Engram;

pub(crate) async fn run(
    engram: &Engram,
    memory_space_id: &str,
    target_id: &str,
    options: ForgetOptions,
) -> EngramResult<ForgetSummary> {
    if let Ok(memory) = engram.storage.memories().get(memory_space_id, target_id) {
        return forget_memory(engram, &memory, options).await;
    }
    if let Ok(fact) = engram.storage.facts().get(memory_space_id, target_id) {
        return forget_fact(engram, &fact, options).await;
    }
    if let Ok(conversation) = engram.storage.conversations().get(target_id) {
        if conversation.memory_space_id != memory_space_id {
            return Err(EngramError::IsolationViolation {
                entity: "conversation",
                id: target_id.to_string(),
                requested: memory_space_id.to_string(),
                actual: conversation.memory_space_id,
            });
        }
        return forget_conversation(engram, memory_space_id, target_id, options).await;
    }
    if engram.storage.contexts().get(memory_space_id, target_id).is_ok() {
        return forget_context(engram, memory_space_id, target_id, options).await;
    }
    if engram.storage.users().exists(target_id)? {
        return delete_user(engram, target_id, true).await;
    }
    Err(EngramError::not_found("forget target", target_id))
}

fn mirror_of(engram: &Engram, options: ForgetOptions) -> Option<&GraphMirror> {
    if options.cascade_graph {
        engram.mirror.as_deref()
    } else {
        None
    }
}

/// Graph inverses are best-effort; a dead adapter never blocks compliance
/// deletion of canonical rows.
async fn drop_graph_nodes(
    mirror: Option<&GraphMirror>,
    summary: &mut ForgetSummary,
    memories: &[MemoryRecord],
    facts: &[Fact],
) {
    let Some(mirror) = mirror else { return };
    for fact in facts {
        match mirror.remove_fact(&fact.fact_id).await {
            Ok(()) => summary.graph_nodes += 1,
            Err(e) => warn!("graph fact removal failed: {e}"),
        }
    }
    for memory in memories {
        match mirror.remove_memory(&memory.memory_id).await {
            Ok(()) => summary.graph_nodes += 1,
            Err(e) => warn!("graph memory removal failed: {e}"),
        }
    }
}

async fn forget_memory(
    engram: &Engram,
    memory: &MemoryRecord,
    options: ForgetOptions,
) -> EngramResult<ForgetSummary> {
    let mut summary = ForgetSummary::default();
    let space = &memory.memory_space_id;

    let dependent_facts = if options.delete_facts {
        engram.storage.facts().list_by_memory(&memory.memory_id)?
    } else {
        Vec::new()
    };

    if options.archive_only {
        summary.archived += engram.storage.memories().archive(space, &memory.memory_id)?;
        for fact in &dependent_facts {
            summary.archived += engram.storage.facts().retract(space, &fact.fact_id)?;
        }
        return Ok(summary);
    }

    drop_graph_nodes(
        mirror_of(engram, options),
        &mut summary,
        std::slice::from_ref(memory),
        &dependent_facts,
    )
    .await;

    let (memories, facts) =
        engram
            .storage
            .memories()
            .delete(space, &memory.memory_id, options.delete_facts)?;
    summary.memories += memories;
    summary.facts += facts;
    Ok(summary)
}

async fn forget_fact(
    engram: &Engram,
    fact: &Fact,
    options: ForgetOptions,
) -> EngramResult<ForgetSummary> {
    let mut summary = ForgetSummary::default();
    let space = &fact.memory_space_id;

    if options.archive_only {
        summary.archived += engram.storage.facts().retract(space, &fact.fact_id)?;
        return Ok(summary);
    }

    drop_graph_nodes(
        mirror_of(engram, options),
        &mut summary,
        &[],
        std::slice::from_ref(fact),
    )
    .await;

    summary.facts += engram.storage.facts().delete(space, &fact.fact_id)?;
    Ok(summary)
}

async fn forget_conversation(
    engram: &Engram,
    memory_space_id: &str,
    conversation_id: &str,
    options: ForgetOptions,
) -> EngramResult<ForgetSummary> {
    let mut summary = ForgetSummary::default();
    let conversation_ids = vec![conversation_id.to_string()];

    let memories = engram
        .storage
        .memories()
        .list_by_conversations(memory_space_id, &conversation_ids)?;
    let facts = if options.delete_facts {
        engram
            .storage
            .facts()
            .list_by_conversations(memory_space_id, &conversation_ids)?
    } else {
        Vec::new()
    };

    if options.archive_only {
        for memory in &memories {
            summary.archived += engram
                .storage
                .memories()
                .archive(memory_space_id, &memory.memory_id)?;
        }
        for fact in &facts {
            summary.archived += engram.storage.facts().retract(memory_space_id, &fact.fact_id)?;
        }
        return Ok(summary);
    }

    let mirror = mirror_of(engram, options);
    drop_graph_nodes(mirror, &mut summary, &memories, &facts).await;
    if let Some(mirror) = mirror {
        match mirror.remove_conversation(conversation_id).await {
            Ok(()) => summary.graph_nodes += 1,
            Err(e) => warn!("graph conversation removal failed: {e}"),
        }
    }

    for fact in &facts {
        summary.facts += engram.storage.facts().delete(memory_space_id, &fact.fact_id)?;
    }
    for memory in &memories {
        let (removed, _) = engram
            .storage
            .memories()
            .delete(memory_space_id, &memory.memory_id, false)?;
        summary.memories += removed;
    }
    summary.conversations += engram.storage.conversations().delete(conversation_id)?.min(1);
    Ok(summary)
}

async fn forget_context(
    engram: &Engram,
    memory_space_id: &str,
    context_id: &str,
    options: ForgetOptions,
) -> EngramResult<ForgetSummary> {
    let mut summary = ForgetSummary::default();
    let subtree = engram.storage.contexts().traverse(context_id)?;

    if options.archive_only {
        // Contexts have no archived state; archive what they reach instead.
        let conversation_ids: Vec<String> = subtree
            .iter()
            .filter_map(|context| context.conversation_ref.clone())
            .collect();
        for memory in engram
            .storage
            .memories()
            .list_by_conversations(memory_space_id, &conversation_ids)?
        {
            summary.archived += engram
                .storage
                .memories()
                .archive(memory_space_id, &memory.memory_id)?;
        }
        for fact in engram
            .storage
            .facts()
            .list_by_conversations(memory_space_id, &conversation_ids)?
        {
            summary.archived += engram.storage.facts().retract(memory_space_id, &fact.fact_id)?;
        }
        return Ok(summary);
    }

    if let Some(mirror) = mirror_of(engram, options) {
        for context in subtree.iter().rev() {
            match mirror.remove_context(&context.context_id).await {
                Ok(()) => summary.graph_nodes += 1,
                Err(e) => warn!("graph context removal failed: {e}"),
            }
        }
    }

    summary.contexts += engram.storage.contexts().delete(memory_space_id, context_id)?;
    Ok(summary)
}

/// Purge one space completely: every layer in dependency order, then the
/// registry row itself.
async fn purge_space(
    engram: &Engram,
    memory_space_id: &str,
    options: ForgetOptions,
) -> EngramResult<ForgetSummary> {
    let mut summary = ForgetSummary::default();
    let conversation_ids = engram.storage.conversations().list_in_space(memory_space_id)?;

    if let Some(mirror) = mirror_of(engram, options) {
        let memories = engram.storage.memories().list(memory_space_id, i64::MAX as usize)?;
        let facts = engram
            .storage
            .facts()
            .list(memory_space_id, None, i64::MAX as usize)?;
        drop_graph_nodes(Some(mirror), &mut summary, &memories, &facts).await;
        for conversation_id in &conversation_ids {
            if mirror.remove_conversation(conversation_id).await.is_ok() {
                summary.graph_nodes += 1;
            }
        }
        for context in engram.storage.contexts().list(memory_space_id)? {
            if mirror.remove_context(&context.context_id).await.is_ok() {
                summary.graph_nodes += 1;
            }
        }
        if mirror.remove_space(memory_space_id).await.is_ok() {
            summary.graph_nodes += 1;
        }
    }

    summary.facts += engram.storage.facts().purge(memory_space_id)?;
    summary.memories += engram.storage.memories().purge(memory_space_id)?;
    for conversation_id in &conversation_ids {
        match engram.storage.conversations().delete(conversation_id) {
            Ok(_) => summary.conversations += 1,
            Err(EngramError::NotFound { .. }) => {}
            Err(e) => warn!("conversation purge failed: {e}"),
        }
    }
    summary.contexts += engram.storage.contexts().purge(memory_space_id)?;
    engram.storage.participants().delete_in_space(memory_space_id)?;
    summary.spaces += engram.storage.spaces().delete(memory_space_id)?;
    Ok(summary)
}

/// User deletion. With cascade, spaces the user owns are purged wholesale;
/// weak references in other spaces are cleared when the registry row goes.
pub(crate) async fn delete_user(
    engram: &Engram,
    user_id: &str,
    cascade: bool,
) -> EngramResult<ForgetSummary> {
    if !engram.storage.users().exists(user_id)? {
        return Err(EngramError::not_found("user", user_id));
    }

    let mut summary = ForgetSummary::default();
    if cascade {
        let options = ForgetOptions {
            delete_facts: true,
            delete_conversation: true,
            archive_only: false,
            cascade_graph: true,
        };
        for space in engram.storage.spaces().list_owned_by(user_id)? {
            match purge_space(engram, &space.memory_space_id, options).await {
                Ok(purged) => summary.absorb(&purged),
                Err(e) => warn!(
                    space = %space.memory_space_id,
                    "owned-space purge failed, continuing: {e}"
                ),
            }
        }
    }

    engram.storage.users().delete(user_id)?;
    Ok(summary)
}
