//! L3: structured beliefs with supersession pointers.

use rusqlite::Connection;

use engram_core::errors::EngramResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "CREATE TABLE facts (
            fact_id         TEXT PRIMARY KEY,
            memory_space_id TEXT NOT NULL,
            fact            TEXT NOT NULL,
            fact_type       TEXT NOT NULL DEFAULT 'knowledge',
            subject         TEXT,
            predicate       TEXT,
            object          TEXT,
            slots           TEXT NOT NULL DEFAULT '{}',
            confidence      INTEGER NOT NULL DEFAULT 50,
            source_type     TEXT NOT NULL DEFAULT 'manual',
            conversation_id TEXT,
            message_id      TEXT,
            memory_id       TEXT,
            tags            TEXT NOT NULL DEFAULT '[]',
            status          TEXT NOT NULL DEFAULT 'active',
            supersedes      TEXT NOT NULL DEFAULT '[]',
            superseded_by   TEXT,
            created_at      INTEGER NOT NULL
        );

        CREATE INDEX idx_facts_space ON facts(memory_space_id);
        CREATE INDEX idx_facts_triple ON facts(memory_space_id, subject, predicate);
        CREATE INDEX idx_facts_memory ON facts(memory_id);
        CREATE INDEX idx_facts_conversation ON facts(conversation_id);",
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
