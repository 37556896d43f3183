//! L4 coordination: memory spaces, users, agents, participants.

use rusqlite::Connection;

use engram_core::errors::EngramResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "CREATE TABLE memory_spaces (
            memory_space_id     TEXT PRIMARY KEY,
            name                TEXT NOT NULL,
            space_type          TEXT NOT NULL DEFAULT 'personal',
            owner_user_id       TEXT,
            embedding_dimension INTEGER,
            created_at          INTEGER NOT NULL
        );

        CREATE TABLE users (
            user_id      TEXT PRIMARY KEY,
            display_name TEXT,
            email        TEXT,
            metadata     TEXT NOT NULL DEFAULT '{}',
            created_at   INTEGER NOT NULL
        );

        CREATE TABLE agents (
            agent_id      TEXT PRIMARY KEY,
            name          TEXT NOT NULL,
            capabilities  TEXT NOT NULL DEFAULT '[]',
            provider      TEXT,
            registered_at INTEGER NOT NULL
        );

        CREATE TABLE participants (
            participant_id  TEXT PRIMARY KEY,
            memory_space_id TEXT NOT NULL,
            kind            TEXT NOT NULL,
            subject_id      TEXT NOT NULL,
            role            TEXT NOT NULL,
            created_at      INTEGER NOT NULL
        );

        CREATE INDEX idx_participants_space ON participants(memory_space_id);
        CREATE INDEX idx_participants_subject ON participants(subject_id);
        CREATE INDEX idx_spaces_owner ON memory_spaces(owner_user_id);",
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
