/// Storage runtime errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite error: {message}")]
    Sqlite { message: String },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("optimistic concurrency conflict on {table}")]
    WriteConflict { table: &'static str },

    #[error("migration v{version:03} failed: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("read pool exhausted")]
    PoolExhausted,
}
