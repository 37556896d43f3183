//! L4: hierarchical contexts. The parent graph is a tree per space; chain
//! walks are bounded by the configured max depth so a corrupted parent
//! pointer cannot loop forever.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::errors::EngramResult;
use engram_core::models::Context;
use engram_core::EngramError;

use crate::to_storage_err;

const CONTEXT_COLUMNS: &str = "context_id, memory_space_id, purpose, parent_id, depth, \
     user_id, conversation_ref, metadata, created_at";

pub fn insert_context(conn: &Connection, context: &Context) -> EngramResult<()> {
    let metadata =
        serde_json::to_string(&context.metadata).map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "INSERT INTO contexts (
            context_id, memory_space_id, purpose, parent_id, depth,
            user_id, conversation_ref, metadata, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            context.context_id,
            context.memory_space_id,
            context.purpose,
            context.parent_id,
            context.depth as i64,
            context.user_id,
            context.conversation_ref,
            metadata,
            context.created_at,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_context(conn: &Connection, context_id: &str) -> EngramResult<Option<Context>> {
    let result = conn
        .query_row(
            &format!("SELECT {CONTEXT_COLUMNS} FROM contexts WHERE context_id = ?1"),
            params![context_id],
            |row| Ok(row_to_context(row)),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    match result.transpose()? {
        Some(mut context) => {
            context.child_ids = child_ids(conn, context_id)?;
            Ok(Some(context))
        }
        None => Ok(None),
    }
}

pub fn child_ids(conn: &Connection, context_id: &str) -> EngramResult<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT context_id FROM contexts WHERE parent_id = ?1 ORDER BY created_at")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![context_id], |row| row.get::<_, String>(0))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(rows)
}

pub fn list_contexts(conn: &Connection, memory_space_id: &str) -> EngramResult<Vec<Context>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {CONTEXT_COLUMNS} FROM contexts
             WHERE memory_space_id = ?1 ORDER BY depth, created_at"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![memory_space_id], |row| Ok(row_to_context(row)))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut contexts: Vec<Context> = rows.into_iter().collect::<EngramResult<_>>()?;
    for context in &mut contexts {
        context.child_ids = child_ids(conn, &context.context_id)?;
    }
    Ok(contexts)
}

/// Walk root → … → node. Fails `DependencyCycle` if the parent chain loops
/// or exceeds `max_depth`.
pub fn get_chain(
    conn: &Connection,
    context_id: &str,
    max_depth: usize,
) -> EngramResult<Vec<Context>> {
    let mut chain = Vec::new();
    let mut visited = std::collections::HashSet::new();
    let mut cursor = Some(context_id.to_string());

    while let Some(id) = cursor {
        if !visited.insert(id.clone()) || chain.len() > max_depth {
            return Err(EngramError::DependencyCycle(format!(
                "parent chain of context {context_id} does not terminate"
            )));
        }
        let context = get_context(conn, &id)?
            .ok_or_else(|| EngramError::not_found("context", id.clone()))?;
        cursor = context.parent_id.clone();
        chain.push(context);
    }

    chain.reverse();
    Ok(chain)
}

/// Breadth-first subtree rooted at `context_id`, root included.
pub fn traverse(conn: &Connection, context_id: &str) -> EngramResult<Vec<Context>> {
    let root = get_context(conn, context_id)?
        .ok_or_else(|| EngramError::not_found("context", context_id))?;
    let mut out = vec![root];
    let mut index = 0;
    while index < out.len() {
        let ids = out[index].child_ids.clone();
        for child_id in ids {
            if let Some(child) = get_context(conn, &child_id)? {
                out.push(child);
            }
        }
        index += 1;
    }
    Ok(out)
}

/// Delete a context subtree, children first by descending depth.
/// Returns the number of contexts removed.
pub fn delete_subtree(conn: &Connection, context_id: &str) -> EngramResult<usize> {
    let mut subtree = traverse(conn, context_id)?;
    subtree.sort_by(|a, b| b.depth.cmp(&a.depth));
    let mut deleted = 0;
    for context in subtree {
        deleted += conn
            .execute(
                "DELETE FROM contexts WHERE context_id = ?1",
                params![context.context_id],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
    }
    Ok(deleted)
}

/// Delete every context in a space. Returns the count removed.
pub fn purge_space(conn: &Connection, memory_space_id: &str) -> EngramResult<usize> {
    conn.execute(
        "DELETE FROM contexts WHERE memory_space_id = ?1",
        params![memory_space_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

fn row_to_context(row: &rusqlite::Row<'_>) -> EngramResult<Context> {
    let metadata_json: String = row.get(7).map_err(|e| to_storage_err(e.to_string()))?;
    Ok(Context {
        context_id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        memory_space_id: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        purpose: row.get(2).map_err(|e| to_storage_err(e.to_string()))?,
        parent_id: row.get(3).map_err(|e| to_storage_err(e.to_string()))?,
        depth: row.get::<_, i64>(4).map_err(|e| to_storage_err(e.to_string()))? as usize,
        child_ids: Vec::new(),
        user_id: row.get(5).map_err(|e| to_storage_err(e.to_string()))?,
        conversation_ref: row.get(6).map_err(|e| to_storage_err(e.to_string()))?,
        metadata: serde_json::from_str(&metadata_json)
            .map_err(|e| to_storage_err(format!("parse context metadata: {e}")))?,
        created_at: row.get(8).map_err(|e| to_storage_err(e.to_string()))?,
    })
}
