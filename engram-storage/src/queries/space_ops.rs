//! Memory space registry: the isolation boundary every other row hangs off.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::errors::EngramResult;
use engram_core::models::{MemorySpace, SpaceType};

use super::{enum_str, parse_enum};
use crate::to_storage_err;

pub fn insert_space(conn: &Connection, space: &MemorySpace) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO memory_spaces (
            memory_space_id, name, space_type, owner_user_id, embedding_dimension, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            space.memory_space_id,
            space.name,
            enum_str(&space.space_type)?,
            space.owner_user_id,
            space.embedding_dimension.map(|d| d as i64),
            space.created_at,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn get_space(conn: &Connection, memory_space_id: &str) -> EngramResult<Option<MemorySpace>> {
    let result = conn
        .query_row(
            "SELECT memory_space_id, name, space_type, owner_user_id, embedding_dimension, created_at
             FROM memory_spaces WHERE memory_space_id = ?1",
            params![memory_space_id],
            |row| Ok(row_to_space(row)),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    result.transpose()
}

pub fn list_spaces(conn: &Connection) -> EngramResult<Vec<MemorySpace>> {
    let mut stmt = conn
        .prepare(
            "SELECT memory_space_id, name, space_type, owner_user_id, embedding_dimension, created_at
             FROM memory_spaces ORDER BY created_at DESC",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| Ok(row_to_space(row)))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.into_iter().collect()
}

pub fn list_spaces_owned_by(conn: &Connection, user_id: &str) -> EngramResult<Vec<MemorySpace>> {
    let mut stmt = conn
        .prepare(
            "SELECT memory_space_id, name, space_type, owner_user_id, embedding_dimension, created_at
             FROM memory_spaces WHERE owner_user_id = ?1",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![user_id], |row| Ok(row_to_space(row)))
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.into_iter().collect()
}

/// Fix the embedding dimension at first embedded insert. No-op if already set.
pub fn set_embedding_dimension(
    conn: &Connection,
    memory_space_id: &str,
    dimension: usize,
) -> EngramResult<()> {
    conn.execute(
        "UPDATE memory_spaces SET embedding_dimension = ?2
         WHERE memory_space_id = ?1 AND embedding_dimension IS NULL",
        params![memory_space_id, dimension as i64],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn delete_space(conn: &Connection, memory_space_id: &str) -> EngramResult<usize> {
    conn.execute(
        "DELETE FROM memory_spaces WHERE memory_space_id = ?1",
        params![memory_space_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Parse a row from the memory_spaces table.
fn row_to_space(row: &rusqlite::Row<'_>) -> EngramResult<MemorySpace> {
    let space_type_str: String = row.get(2).map_err(|e| to_storage_err(e.to_string()))?;
    let dimension: Option<i64> = row.get(4).map_err(|e| to_storage_err(e.to_string()))?;
    Ok(MemorySpace {
        memory_space_id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        name: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        space_type: parse_enum::<SpaceType>("space_type", &space_type_str)?,
        owner_user_id: row.get(3).map_err(|e| to_storage_err(e.to_string()))?,
        embedding_dimension: dimension.map(|d| d as usize),
        created_at: row.get(5).map_err(|e| to_storage_err(e.to_string()))?,
    })
}
