//! Query modules, one per storage layer.

pub mod context_ops;
pub mod conversation_ops;
pub mod fact_ops;
pub mod memory_ops;
pub mod memory_search;
pub mod registry_ops;
pub mod space_ops;
pub mod state_ops;
pub mod vector_search;

use engram_core::errors::EngramResult;

/// Parse an enum persisted as a bare string column back through serde.
pub(crate) fn parse_enum<T: serde::de::DeserializeOwned>(
    column: &str,
    value: &str,
) -> EngramResult<T> {
    serde_json::from_str(&format!("\"{value}\""))
        .map_err(|e| crate::to_storage_err(format!("parse {column} '{value}': {e}")))
}

/// Serialize an enum to its bare string column form.
pub(crate) fn enum_str<T: serde::Serialize>(value: &T) -> EngramResult<String> {
    let quoted = serde_json::to_string(value).map_err(|e| crate::to_storage_err(e.to_string()))?;
    Ok(quoted.trim_matches('"').to_string())
}
