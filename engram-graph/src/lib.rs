//! # engram-graph
//!
//! The graph mirror: a best-effort projection of canonical entities into an
//! external property graph behind the `IGraphAdapter` seam. The canonical
//! store stays the source of truth — every mirror write has a deterministic
//! inverse and the whole graph can be rebuilt by `initial_graph_sync`.

pub mod cypher;
pub mod memory_adapter;
pub mod mirror;
pub mod projection;
pub mod sync;

pub use cypher::CypherGraphAdapter;
pub use memory_adapter::InMemoryGraph;
pub use mirror::GraphMirror;
pub use sync::{initial_graph_sync, SyncReport};
