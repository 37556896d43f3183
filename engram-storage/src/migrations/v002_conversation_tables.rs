//! L1a: conversations and append-ordered messages.

use rusqlite::Connection;

use engram_core::errors::EngramResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "CREATE TABLE conversations (
            conversation_id   TEXT PRIMARY KEY,
            memory_space_id   TEXT NOT NULL,
            conversation_type TEXT NOT NULL DEFAULT 'user-agent',
            user_id           TEXT,
            participant_id    TEXT,
            message_count     INTEGER NOT NULL DEFAULT 0,
            created_at        INTEGER NOT NULL,
            updated_at        INTEGER NOT NULL
        );

        CREATE INDEX idx_conversations_space ON conversations(memory_space_id);

        -- Total per-conversation ordering rides on the (conversation_id, position)
        -- uniqueness constraint; dedup_key absorbs idempotent re-appends.
        CREATE TABLE messages (
            message_id      TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL,
            position        INTEGER NOT NULL,
            role            TEXT NOT NULL,
            content         TEXT NOT NULL,
            timestamp       INTEGER NOT NULL,
            dedup_key       TEXT,
            UNIQUE (conversation_id, position),
            UNIQUE (conversation_id, dedup_key)
        );

        CREATE INDEX idx_messages_conversation ON messages(conversation_id);",
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
