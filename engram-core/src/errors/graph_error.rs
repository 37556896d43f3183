/// Graph mirror errors. Always soft on the orchestration path: they are
/// reported as layer events, never failing `remember`.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("graph adapter unreachable: {0}")]
    Unreachable(String),

    #[error("graph write failed: {0}")]
    WriteFailed(String),

    #[error("graph query failed: {0}")]
    QueryFailed(String),

    #[error("graph call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}
