//! Single write connection + round-robin read pool.
//!
//! SQLite allows one writer at a time; funneling all mutations through one
//! connection avoids SQLITE_BUSY churn, while reads fan out across the pool.
//! In-memory databases use a process-private shared-cache URI so the readers
//! see the writer's data.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use engram_core::errors::{EngramResult, StorageError};
use engram_core::EngramError;

use crate::to_storage_err;

/// The one connection all mutations go through.
pub struct WriteConnection {
    conn: Mutex<Connection>,
}

impl WriteConnection {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Run a closure against the write connection.
    pub fn with_conn_sync<T>(
        &self,
        f: impl FnOnce(&Connection) -> EngramResult<T>,
    ) -> EngramResult<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| EngramError::Storage(StorageError::Unavailable("writer poisoned".into())))?;
        f(&conn)
    }

    /// Run a closure inside an IMMEDIATE transaction. Rolls back on error.
    pub fn with_txn<T>(&self, f: impl FnOnce(&Connection) -> EngramResult<T>) -> EngramResult<T> {
        self.with_conn_sync(|conn| {
            conn.execute_batch("BEGIN IMMEDIATE")
                .map_err(|e| to_storage_err(e.to_string()))?;
            match f(conn) {
                Ok(value) => {
                    conn.execute_batch("COMMIT")
                        .map_err(|e| to_storage_err(e.to_string()))?;
                    Ok(value)
                }
                Err(e) => {
                    let _ = conn.execute_batch("ROLLBACK");
                    Err(e)
                }
            }
        })
    }
}

/// Round-robin pool of read connections.
pub struct ReadPool {
    conns: Vec<Mutex<Connection>>,
    next: AtomicUsize,
}

impl ReadPool {
    pub fn new(conns: Vec<Connection>) -> Self {
        Self {
            conns: conns.into_iter().map(Mutex::new).collect(),
            next: AtomicUsize::new(0),
        }
    }

    /// Run a closure against one of the read connections.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> EngramResult<T>) -> EngramResult<T> {
        if self.conns.is_empty() {
            return Err(EngramError::Storage(StorageError::PoolExhausted));
        }
        let start = self.next.fetch_add(1, Ordering::Relaxed) % self.conns.len();
        // Prefer an uncontended connection, fall back to blocking on the first pick.
        for offset in 0..self.conns.len() {
            let idx = (start + offset) % self.conns.len();
            if let Ok(conn) = self.conns[idx].try_lock() {
                return f(&conn);
            }
        }
        let conn = self.conns[start]
            .lock()
            .map_err(|_| EngramError::Storage(StorageError::Unavailable("reader poisoned".into())))?;
        f(&conn)
    }
}

/// Writer + readers bundle shared by every store handle.
pub struct Pool {
    pub writer: Arc<WriteConnection>,
    pub readers: Arc<ReadPool>,
}

fn configure(conn: &Connection, busy_timeout_ms: u64) -> EngramResult<()> {
    conn.busy_timeout(std::time::Duration::from_millis(busy_timeout_ms))
        .map_err(|e| to_storage_err(e.to_string()))?;
    // journal_mode returns the resulting mode as a row.
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
        .map_err(|e| to_storage_err(e.to_string()))?;
    conn.execute_batch("PRAGMA synchronous = NORMAL; PRAGMA foreign_keys = ON;")
        .map_err(|e| to_storage_err(e.to_string()))
}

impl Pool {
    /// Open a pool against `endpoint`. `:memory:` selects a process-private
    /// shared-cache database so the read pool sees the writer's tables.
    pub fn open(endpoint: &str, read_pool_size: usize, busy_timeout_ms: u64) -> EngramResult<Self> {
        let uri = if endpoint == ":memory:" {
            format!(
                "file:engram-{}?mode=memory&cache=shared",
                uuid::Uuid::new_v4().simple()
            )
        } else {
            endpoint.to_string()
        };

        let open = |path: &str| -> EngramResult<Connection> {
            let conn = Connection::open(path)
                .map_err(|e| EngramError::Storage(StorageError::Unavailable(e.to_string())))?;
            configure(&conn, busy_timeout_ms)?;
            Ok(conn)
        };

        let writer = open(&uri)?;
        let mut readers = Vec::with_capacity(read_pool_size.max(1));
        for _ in 0..read_pool_size.max(1) {
            readers.push(open(&uri)?);
        }

        Ok(Self {
            writer: Arc::new(WriteConnection::new(writer)),
            readers: Arc::new(ReadPool::new(readers)),
        })
    }
}
