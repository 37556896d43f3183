//! Migration runner — version tracking, forward-only, transactional per migration.

mod v001_coordination_tables;
mod v002_conversation_tables;
mod v003_memory_tables;
mod v004_fact_tables;
mod v005_context_tables;
mod v006_fts5_index;
mod v007_state_tables;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use engram_core::errors::{EngramResult, StorageError};
use engram_core::EngramError;

use crate::to_storage_err;

/// Total number of migrations.
pub const LATEST_VERSION: u32 = 7;

/// All migrations in order. Index 0 = v001, etc.
type MigrationFn = fn(&Connection) -> EngramResult<()>;

const MIGRATIONS: [(u32, &str, MigrationFn); 7] = [
    (1, "coordination_tables", v001_coordination_tables::migrate),
    (2, "conversation_tables", v002_conversation_tables::migrate),
    (3, "memory_tables", v003_memory_tables::migrate),
    (4, "fact_tables", v004_fact_tables::migrate),
    (5, "context_tables", v005_context_tables::migrate),
    (6, "fts5_index", v006_fts5_index::migrate),
    (7, "state_tables", v007_state_tables::migrate),
];

/// Get the current schema version from the database.
/// Returns 0 if the schema_version table doesn't exist yet.
pub fn current_version(conn: &Connection) -> EngramResult<u32> {
    let exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version'")
        .and_then(|mut stmt| stmt.exists([]))
        .map_err(|e| to_storage_err(e.to_string()))?;

    if !exists {
        return Ok(0);
    }

    let version: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    Ok(version)
}

/// Run all pending migrations. Forward-only, each wrapped in a transaction.
pub fn run_migrations(conn: &Connection) -> EngramResult<u32> {
    ensure_version_table(conn)?;
    let current = current_version(conn)?;
    let mut applied = 0;

    if current >= LATEST_VERSION {
        debug!("database schema is up to date (v{current})");
        return Ok(0);
    }

    info!("running migrations: v{} → v{}", current, LATEST_VERSION);

    for &(version, name, migrate_fn) in &MIGRATIONS {
        if version <= current {
            continue;
        }

        debug!("applying migration v{version:03}: {name}");

        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| to_storage_err(format!("begin transaction for v{version:03}: {e}")))?;

        match migrate_fn(conn) {
            Ok(()) => {
                conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
                    .map_err(|e| to_storage_err(format!("record version v{version:03}: {e}")))?;

                conn.execute_batch("COMMIT")
                    .map_err(|e| to_storage_err(format!("commit v{version:03}: {e}")))?;

                info!("applied migration v{version:03}: {name}");
                applied += 1;
            }
            Err(e) => {
                warn!("migration v{version:03} failed: {e}, rolling back");
                let _ = conn.execute_batch("ROLLBACK");
                return Err(EngramError::Storage(StorageError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                }));
            }
        }
    }

    info!("applied {applied} migration(s), now at v{LATEST_VERSION}");
    Ok(applied)
}

fn ensure_version_table(conn: &Connection) -> EngramResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        )",
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
