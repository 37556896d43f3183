use super::{GraphError, StorageError};

/// Top-level error type for the Engram memory engine.
/// All subsystem errors convert into this via `From` impls.
#[derive(Debug, thiserror::Error)]
pub enum EngramError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("memory space isolation violated: {entity} {id} belongs to {actual}, not {requested}")]
    IsolationViolation {
        entity: &'static str,
        id: String,
        requested: String,
        actual: String,
    },

    #[error("embedding dimension mismatch: space {memory_space_id} expects {expected}, got {actual}")]
    EmbeddingShape {
        memory_space_id: String,
        expected: usize,
        actual: usize,
    },

    #[error("overloaded: memory space {memory_space_id} queue is full")]
    Overloaded { memory_space_id: String },

    #[error("transient storage error after {attempts} attempt(s): {message}")]
    TransientStorage { attempts: u32, message: String },

    #[error("fact extractor failed: {0}")]
    Extractor(String),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("context dependency cycle or depth overflow: {0}")]
    DependencyCycle(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl EngramError {
    /// True for errors a caller may retry verbatim.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngramError::TransientStorage { .. } | EngramError::Overloaded { .. }
        )
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        EngramError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Convenience type alias.
pub type EngramResult<T> = Result<T, EngramError>;
