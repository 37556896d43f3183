//! L1b content-addressed versioned documents + L1c last-writer-wins state.

use rusqlite::Connection;

use engram_core::errors::EngramResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "CREATE TABLE document_versions (
            key          TEXT NOT NULL,
            version      INTEGER NOT NULL,
            content_hash TEXT NOT NULL,
            content      TEXT NOT NULL,
            created_at   INTEGER NOT NULL,
            PRIMARY KEY (key, version)
        );

        CREATE INDEX idx_document_versions_hash ON document_versions(key, content_hash);

        CREATE TABLE kv_state (
            key        TEXT PRIMARY KEY,
            value      TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );",
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
