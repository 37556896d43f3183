pub mod embedding_config;
pub mod graph_config;
pub mod limits_config;
pub mod orchestrator_config;
pub mod revision_config;
pub mod storage_config;

use serde::{Deserialize, Serialize};

pub use embedding_config::{EmbeddingConfig, EmbeddingProviderKind};
pub use graph_config::{GraphAdapterKind, GraphConfig};
pub use limits_config::LimitsConfig;
pub use orchestrator_config::OrchestratorConfig;
pub use revision_config::RevisionConfig;
pub use storage_config::StorageConfig;

/// Top-level configuration aggregating all subsystem configs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngramConfig {
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub graph: GraphConfig,
    pub revision: RevisionConfig,
    pub orchestrator: OrchestratorConfig,
    pub limits: LimitsConfig,
}

impl EngramConfig {
    /// Load config from a TOML string, falling back to defaults for missing fields.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let config = EngramConfig::default();
        assert_eq!(config.limits.versions_per_memory, 10);
        assert_eq!(config.limits.contexts_max_depth, 16);
        assert_eq!(config.orchestrator.inflight_per_space, 16);
        assert_eq!(config.orchestrator.queue_depth, 256);
        assert_eq!(config.embedding.timeout_ms, 5_000);
        assert_eq!(config.orchestrator.extractor_timeout_ms, 15_000);
        assert_eq!(config.graph.write_timeout_ms, 3_000);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngramConfig::from_toml(
            r#"
            [limits]
            versions_per_memory = 4

            [graph]
            adapter = "cypher"
            mirror = true
            "#,
        )
        .unwrap();
        assert_eq!(config.limits.versions_per_memory, 4);
        assert_eq!(config.limits.contexts_max_depth, 16);
        assert!(matches!(config.graph.adapter, GraphAdapterKind::Cypher));
        assert!(config.graph.mirror);
        assert!(config.revision.enabled);
    }
}
