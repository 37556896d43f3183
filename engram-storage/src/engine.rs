//! StorageEngine — owns the connection pool and hands out layer stores.

use std::sync::Arc;

use engram_core::config::EngramConfig;
use engram_core::errors::EngramResult;

use crate::migrations;
use crate::pool::Pool;
use crate::stores::{
    AgentsStore, ContextsStore, ConversationsStore, FactsStore, MemoriesStore, ParticipantsStore,
    SpacesStore, StateStore, UsersStore,
};

/// The storage runtime: one write connection, a read pool, and a migrated
/// schema. Layer stores are cheap clones sharing the pool.
pub struct StorageEngine {
    pool: Arc<Pool>,
    config: EngramConfig,
}

impl StorageEngine {
    /// Open against `config.storage.endpoint` and run pending migrations.
    pub fn open(config: EngramConfig) -> EngramResult<Self> {
        let pool = Pool::open(
            &config.storage.endpoint,
            config.storage.read_pool_size,
            config.storage.busy_timeout_ms,
        )?;
        pool.writer.with_conn_sync(migrations::run_migrations)?;
        Ok(Self {
            pool: Arc::new(pool),
            config,
        })
    }

    /// Process-private in-memory database with default config.
    pub fn open_in_memory() -> EngramResult<Self> {
        Self::open(EngramConfig::default())
    }

    /// In-memory database with the given config (endpoint is overridden).
    pub fn open_in_memory_with(mut config: EngramConfig) -> EngramResult<Self> {
        config.storage.endpoint = ":memory:".to_string();
        Self::open(config)
    }

    pub fn pool(&self) -> &Arc<Pool> {
        &self.pool
    }

    pub fn config(&self) -> &EngramConfig {
        &self.config
    }

    pub fn spaces(&self) -> SpacesStore {
        SpacesStore {
            pool: Arc::clone(&self.pool),
        }
    }

    pub fn users(&self) -> UsersStore {
        UsersStore {
            pool: Arc::clone(&self.pool),
        }
    }

    pub fn agents(&self) -> AgentsStore {
        AgentsStore {
            pool: Arc::clone(&self.pool),
        }
    }

    pub fn participants(&self) -> ParticipantsStore {
        ParticipantsStore {
            pool: Arc::clone(&self.pool),
        }
    }

    pub fn conversations(&self) -> ConversationsStore {
        ConversationsStore {
            pool: Arc::clone(&self.pool),
            config: self.config.clone(),
        }
    }

    pub fn memories(&self) -> MemoriesStore {
        MemoriesStore {
            pool: Arc::clone(&self.pool),
            config: self.config.clone(),
        }
    }

    pub fn facts(&self) -> FactsStore {
        FactsStore {
            pool: Arc::clone(&self.pool),
        }
    }

    pub fn contexts(&self) -> ContextsStore {
        ContextsStore {
            pool: Arc::clone(&self.pool),
            config: self.config.clone(),
        }
    }

    pub fn state(&self) -> StateStore {
        StateStore {
            pool: Arc::clone(&self.pool),
        }
    }
}
