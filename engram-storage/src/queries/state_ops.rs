//! L1b content-addressed versioned documents and L1c last-writer-wins state.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::errors::EngramResult;
use engram_core::now_ms;

use crate::to_storage_err;

/// One stored document version.
#[derive(Debug, Clone)]
pub struct DocumentVersion {
    pub key: String,
    pub version: u64,
    pub content_hash: String,
    pub content: serde_json::Value,
    pub created_at: i64,
}

/// Append a new version for `key` unless the content hash already matches an
/// existing version (content-addressed: identical payloads share a version).
pub fn put_document(
    conn: &Connection,
    key: &str,
    content: &serde_json::Value,
) -> EngramResult<DocumentVersion> {
    let serialized = serde_json::to_string(content).map_err(|e| to_storage_err(e.to_string()))?;
    let content_hash = blake3::hash(serialized.as_bytes()).to_hex().to_string();

    let existing = conn
        .query_row(
            "SELECT version, created_at FROM document_versions
             WHERE key = ?1 AND content_hash = ?2
             ORDER BY version DESC LIMIT 1",
            params![key, content_hash],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    if let Some((version, created_at)) = existing {
        return Ok(DocumentVersion {
            key: key.to_string(),
            version: version as u64,
            content_hash,
            content: content.clone(),
            created_at,
        });
    }

    let next_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM document_versions WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let created_at = now_ms();
    conn.execute(
        "INSERT INTO document_versions (key, version, content_hash, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![key, next_version, content_hash, serialized, created_at],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    Ok(DocumentVersion {
        key: key.to_string(),
        version: next_version as u64,
        content_hash,
        content: content.clone(),
        created_at,
    })
}

/// Fetch a document at `version`, or the latest when `version` is None.
pub fn get_document(
    conn: &Connection,
    key: &str,
    version: Option<u64>,
) -> EngramResult<Option<DocumentVersion>> {
    let result = match version {
        Some(v) => conn
            .query_row(
                "SELECT key, version, content_hash, content, created_at
                 FROM document_versions WHERE key = ?1 AND version = ?2",
                params![key, v as i64],
                |row| Ok(row_to_document(row)),
            )
            .optional(),
        None => conn
            .query_row(
                "SELECT key, version, content_hash, content, created_at
                 FROM document_versions WHERE key = ?1 ORDER BY version DESC LIMIT 1",
                params![key],
                |row| Ok(row_to_document(row)),
            )
            .optional(),
    }
    .map_err(|e| to_storage_err(e.to_string()))?;
    result.transpose()
}

/// Last-writer-wins set.
pub fn kv_set(conn: &Connection, key: &str, value: &serde_json::Value) -> EngramResult<()> {
    let serialized = serde_json::to_string(value).map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute(
        "INSERT INTO kv_state (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, serialized, now_ms()],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn kv_get(conn: &Connection, key: &str) -> EngramResult<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM kv_state WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    raw.map(|s| serde_json::from_str(&s).map_err(|e| to_storage_err(format!("parse kv value: {e}"))))
        .transpose()
}

pub fn kv_delete(conn: &Connection, key: &str) -> EngramResult<usize> {
    conn.execute("DELETE FROM kv_state WHERE key = ?1", params![key])
        .map_err(|e| to_storage_err(e.to_string()))
}

fn row_to_document(row: &rusqlite::Row<'_>) -> EngramResult<DocumentVersion> {
    let content_json: String = row.get(3).map_err(|e| to_storage_err(e.to_string()))?;
    Ok(DocumentVersion {
        key: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        version: row.get::<_, i64>(1).map_err(|e| to_storage_err(e.to_string()))? as u64,
        content_hash: row.get(2).map_err(|e| to_storage_err(e.to_string()))?,
        content: serde_json::from_str(&content_json)
            .map_err(|e| to_storage_err(format!("parse document content: {e}")))?,
        created_at: row.get(4).map_err(|e| to_storage_err(e.to_string()))?,
    })
}
