//! L2: memory insert, versioned update, list, delete. Updates never mutate a
//! row in place: the live version is archived and a new row takes its place,
//! with retention enforced against the per-space version cap.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::errors::EngramResult;
use engram_core::models::{ContentType, ConversationRef, MemoryPatch, MemoryRecord, MemorySource};
use engram_core::now_ms;

use super::{enum_str, parse_enum};
use crate::to_storage_err;

pub(crate) fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

pub(crate) fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

pub fn insert_memory(conn: &Connection, memory: &MemoryRecord) -> EngramResult<()> {
    let source = serde_json::to_string(&memory.source).map_err(|e| to_storage_err(e.to_string()))?;
    let tags = serde_json::to_string(&memory.tags).map_err(|e| to_storage_err(e.to_string()))?;
    let message_ids = match &memory.conversation_ref {
        Some(conv_ref) => {
            serde_json::to_string(&conv_ref.message_ids).map_err(|e| to_storage_err(e.to_string()))?
        }
        None => "[]".to_string(),
    };

    conn.execute(
        "INSERT INTO memories (
            memory_id, memory_space_id, version, content, content_type, embedding,
            user_id, source, conversation_id, message_ids, tags, importance,
            created_at, archived_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            memory.memory_id,
            memory.memory_space_id,
            memory.version as i64,
            memory.content,
            enum_str(&memory.content_type)?,
            memory.embedding.as_ref().map(|e| embedding_to_blob(e)),
            memory.user_id,
            source,
            memory.conversation_ref.as_ref().map(|r| r.conversation_id.clone()),
            message_ids,
            tags,
            memory.importance as i64,
            memory.created_at,
            memory.archived_at,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    if memory.archived_at.is_none() {
        conn.execute(
            "INSERT INTO memories_fts (content, memory_id, memory_space_id) VALUES (?1, ?2, ?3)",
            params![memory.content, memory.memory_id, memory.memory_space_id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    }

    Ok(())
}

const MEMORY_COLUMNS: &str = "memory_id, memory_space_id, version, content, content_type, \
     embedding, user_id, source, conversation_id, message_ids, tags, importance, \
     created_at, archived_at";

/// Get the live version of a memory.
pub fn get_live(conn: &Connection, memory_id: &str) -> EngramResult<Option<MemoryRecord>> {
    let result = conn
        .query_row(
            &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE memory_id = ?1 AND archived_at IS NULL"),
            params![memory_id],
            |row| Ok(row_to_memory(row)),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    result.transpose()
}

/// Newest-first live memories in a space.
pub fn list_memories(
    conn: &Connection,
    memory_space_id: &str,
    limit: usize,
) -> EngramResult<Vec<MemoryRecord>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {MEMORY_COLUMNS} FROM memories
             WHERE memory_space_id = ?1 AND archived_at IS NULL
             ORDER BY created_at DESC, memory_id DESC LIMIT ?2"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![memory_space_id, limit as i64], |row| Ok(row_to_memory(row)))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.into_iter().collect()
}

/// Memories whose conversation_ref points at one of the given conversations.
pub fn list_by_conversations(
    conn: &Connection,
    memory_space_id: &str,
    conversation_ids: &[String],
) -> EngramResult<Vec<MemoryRecord>> {
    let mut out = Vec::new();
    for conversation_id in conversation_ids {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {MEMORY_COLUMNS} FROM memories
                 WHERE memory_space_id = ?1 AND conversation_id = ?2 AND archived_at IS NULL"
            ))
            .map_err(|e| to_storage_err(e.to_string()))?;
        let rows = stmt
            .query_map(params![memory_space_id, conversation_id], |row| {
                Ok(row_to_memory(row))
            })
            .map_err(|e| to_storage_err(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| to_storage_err(e.to_string()))?;
        for row in rows {
            out.push(row?);
        }
    }
    Ok(out)
}

/// Apply a patch as a new version. The previous live row is archived; when
/// the archived count exceeds `version_cap` the oldest version is deleted.
/// Returns the new live record.
pub fn update_memory(
    conn: &Connection,
    current: &MemoryRecord,
    patch: &MemoryPatch,
    version_cap: usize,
) -> EngramResult<MemoryRecord> {
    let now = now_ms();

    conn.execute(
        "UPDATE memories SET archived_at = ?3 WHERE memory_id = ?1 AND version = ?2",
        params![current.memory_id, current.version as i64, now],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "DELETE FROM memories_fts WHERE memory_id = ?1",
        params![current.memory_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    let mut next = current.clone();
    next.version = current.version + 1;
    next.created_at = now;
    next.archived_at = None;
    if let Some(content) = &patch.content {
        next.content = content.clone();
    }
    if let Some(content_type) = patch.content_type {
        next.content_type = content_type;
    }
    if let Some(embedding) = &patch.embedding {
        next.embedding = embedding.clone();
    }
    if let Some(tags) = &patch.tags {
        next.tags = tags.clone();
    }
    if let Some(importance) = patch.importance {
        next.importance = importance.min(100);
    }

    insert_memory(conn, &next)?;

    // Retention: drop the oldest archived versions past the cap.
    conn.execute(
        "DELETE FROM memories
         WHERE memory_id = ?1 AND archived_at IS NOT NULL AND version NOT IN (
            SELECT version FROM memories
            WHERE memory_id = ?1 AND archived_at IS NOT NULL
            ORDER BY version DESC LIMIT ?2
         )",
        params![current.memory_id, version_cap as i64],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    Ok(next)
}

/// Archive the live version without deleting anything.
pub fn archive_memory(conn: &Connection, memory_id: &str) -> EngramResult<usize> {
    let archived = conn
        .execute(
            "UPDATE memories SET archived_at = ?2 WHERE memory_id = ?1 AND archived_at IS NULL",
            params![memory_id, now_ms()],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    if archived > 0 {
        conn.execute(
            "DELETE FROM memories_fts WHERE memory_id = ?1",
            params![memory_id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    }
    Ok(archived)
}

/// Hard-delete every version of a memory. Returns 1 when a live version
/// existed.
pub fn delete_memory(conn: &Connection, memory_id: &str) -> EngramResult<usize> {
    let live: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM memories WHERE memory_id = ?1 AND archived_at IS NULL",
            params![memory_id],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute("DELETE FROM memories WHERE memory_id = ?1", params![memory_id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "DELETE FROM memories_fts WHERE memory_id = ?1",
        params![memory_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(live as usize)
}

/// Delete every memory in a space. Returns the live-version count removed.
pub fn purge_space(conn: &Connection, memory_space_id: &str) -> EngramResult<usize> {
    let live: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM memories WHERE memory_space_id = ?1 AND archived_at IS NULL",
            params![memory_space_id],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "DELETE FROM memories WHERE memory_space_id = ?1",
        params![memory_space_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "DELETE FROM memories_fts WHERE memory_space_id = ?1",
        params![memory_space_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(live as usize)
}

/// Count archived versions for a memory.
pub fn version_count(conn: &Connection, memory_id: &str) -> EngramResult<usize> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM memories WHERE memory_id = ?1 AND archived_at IS NOT NULL",
            params![memory_id],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count as usize)
}

/// True when a memory already exists for `(conversation_id, message_id)`.
/// Used by the idempotent `remember` path to skip re-stores.
pub fn exists_for_message(
    conn: &Connection,
    conversation_id: &str,
    message_id: &str,
) -> EngramResult<bool> {
    let pattern = format!("%\"{message_id}\"%");
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM memories
             WHERE conversation_id = ?1 AND message_ids LIKE ?2 AND archived_at IS NULL",
            params![conversation_id, pattern],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count > 0)
}

/// Parse a row from the memories table into a MemoryRecord.
pub(crate) fn row_to_memory(row: &rusqlite::Row<'_>) -> EngramResult<MemoryRecord> {
    let content_type_str: String = row.get(4).map_err(|e| to_storage_err(e.to_string()))?;
    let embedding_blob: Option<Vec<u8>> = row.get(5).map_err(|e| to_storage_err(e.to_string()))?;
    let source_json: String = row.get(7).map_err(|e| to_storage_err(e.to_string()))?;
    let conversation_id: Option<String> = row.get(8).map_err(|e| to_storage_err(e.to_string()))?;
    let message_ids_json: String = row.get(9).map_err(|e| to_storage_err(e.to_string()))?;
    let tags_json: String = row.get(10).map_err(|e| to_storage_err(e.to_string()))?;

    let source: MemorySource = serde_json::from_str(&source_json)
        .map_err(|e| to_storage_err(format!("parse source: {e}")))?;
    let message_ids: Vec<String> = serde_json::from_str(&message_ids_json)
        .map_err(|e| to_storage_err(format!("parse message_ids: {e}")))?;
    let tags: Vec<String> = serde_json::from_str(&tags_json)
        .map_err(|e| to_storage_err(format!("parse tags: {e}")))?;

    Ok(MemoryRecord {
        memory_id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        memory_space_id: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        version: row.get::<_, i64>(2).map_err(|e| to_storage_err(e.to_string()))? as u32,
        content: row.get(3).map_err(|e| to_storage_err(e.to_string()))?,
        content_type: parse_enum::<ContentType>("content_type", &content_type_str)?,
        embedding: embedding_blob.map(|blob| blob_to_embedding(&blob)),
        user_id: row.get(6).map_err(|e| to_storage_err(e.to_string()))?,
        source,
        conversation_ref: conversation_id.map(|conversation_id| ConversationRef {
            conversation_id,
            message_ids,
        }),
        tags,
        importance: row.get::<_, i64>(11).map_err(|e| to_storage_err(e.to_string()))? as u8,
        created_at: row.get(12).map_err(|e| to_storage_err(e.to_string()))?,
        archived_at: row.get(13).map_err(|e| to_storage_err(e.to_string()))?,
    })
}
