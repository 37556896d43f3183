//! L2: versioned vector memories.

use rusqlite::Connection;

use engram_core::errors::EngramResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "CREATE TABLE memories (
            memory_id       TEXT NOT NULL,
            memory_space_id TEXT NOT NULL,
            version         INTEGER NOT NULL DEFAULT 1,
            content         TEXT NOT NULL,
            content_type    TEXT NOT NULL DEFAULT 'raw',
            embedding       BLOB,
            user_id         TEXT,
            source          TEXT NOT NULL DEFAULT '{}',
            conversation_id TEXT,
            message_ids     TEXT NOT NULL DEFAULT '[]',
            tags            TEXT NOT NULL DEFAULT '[]',
            importance      INTEGER NOT NULL DEFAULT 0,
            created_at      INTEGER NOT NULL,
            archived_at     INTEGER,
            PRIMARY KEY (memory_id, version)
        );

        -- At most one live version per memory_id.
        CREATE UNIQUE INDEX idx_memories_live
            ON memories(memory_id) WHERE archived_at IS NULL;

        CREATE INDEX idx_memories_space ON memories(memory_space_id, created_at DESC);
        CREATE INDEX idx_memories_conversation ON memories(conversation_id);",
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
