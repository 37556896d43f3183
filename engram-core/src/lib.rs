//! # engram-core
//!
//! Shared foundation for the Engram memory engine: entity models for the four
//! storage layers, the error taxonomy, configuration, and the trait seams the
//! engine talks to external collaborators through (embedding provider, fact
//! extractor, revision classifier, graph adapter, orchestration observer).

pub mod config;
pub mod errors;
pub mod models;
pub mod traits;

pub use errors::{EngramError, EngramResult};

/// Current time in milliseconds since epoch. Every persisted timestamp in the
/// engine uses this resolution.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Mint a prefixed opaque identifier.
pub fn mint_id(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_ids_are_unique_and_prefixed() {
        let a = mint_id("mem");
        let b = mint_id("mem");
        assert!(a.starts_with("mem_"));
        assert_ne!(a, b);
    }
}
