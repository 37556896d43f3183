//! # engram-storage
//!
//! SQLite persistence layer for the Engram memory engine. Single write
//! connection + read pool (WAL mode), forward-only migrations, and one query
//! module per storage layer: conversations (L1a), versioned documents (L1b),
//! mutable state (L1c), vector memory (L2), facts (L3), coordination (L4).

pub mod engine;
pub mod migrations;
pub mod pool;
pub mod queries;
pub mod stores;

pub use engine::StorageEngine;

/// Helper to convert a string message into an EngramError::Storage.
pub fn to_storage_err(msg: String) -> engram_core::EngramError {
    engram_core::EngramError::Storage(engram_core::errors::StorageError::Sqlite { message: msg })
}

/// True when a rusqlite error is a uniqueness/constraint violation, the
/// storage runtime's `Conflict` signal.
pub fn is_conflict(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
