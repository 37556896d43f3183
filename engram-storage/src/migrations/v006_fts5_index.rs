//! Lexical search: FTS5 shadow tables for live memory content and active facts.
//! Maintained by the write paths, not triggers, so archived versions and
//! non-active facts fall out of the index deterministically.

use rusqlite::Connection;

use engram_core::errors::EngramResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "CREATE VIRTUAL TABLE memories_fts USING fts5(
            content,
            memory_id UNINDEXED,
            memory_space_id UNINDEXED
        );

        CREATE VIRTUAL TABLE facts_fts USING fts5(
            fact,
            fact_id UNINDEXED,
            memory_space_id UNINDEXED
        );",
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
