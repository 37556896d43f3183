//! Storage runtime configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the SQLite-backed storage runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database path. `:memory:` selects a process-private shared-cache database.
    pub endpoint: String,
    /// Number of read connections in the pool.
    pub read_pool_size: usize,
    /// SQLite busy timeout per connection.
    pub busy_timeout_ms: u64,
    /// Conflict retry attempts on message append.
    pub conflict_retries: u32,
    /// Base backoff between conflict retries, doubled per attempt.
    pub conflict_backoff_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: ":memory:".to_string(),
            read_pool_size: 4,
            busy_timeout_ms: 5_000,
            conflict_retries: 3,
            conflict_backoff_ms: 25,
        }
    }
}
