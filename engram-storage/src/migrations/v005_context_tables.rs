//! L4: hierarchical workflow contexts.

use rusqlite::Connection;

use engram_core::errors::EngramResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "CREATE TABLE contexts (
            context_id       TEXT PRIMARY KEY,
            memory_space_id  TEXT NOT NULL,
            purpose          TEXT NOT NULL,
            parent_id        TEXT,
            depth            INTEGER NOT NULL DEFAULT 0,
            user_id          TEXT,
            conversation_ref TEXT,
            metadata         TEXT NOT NULL DEFAULT '{}',
            created_at       INTEGER NOT NULL
        );

        CREATE INDEX idx_contexts_space_parent ON contexts(memory_space_id, parent_id);",
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
