use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::EngramResult;

/// A labeled node in the external property graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub properties: serde_json::Value,
}

/// A typed, directed edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub edge_type: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub properties: serde_json::Value,
}

/// Opaque query passed through to the engine (e.g. a Cypher statement).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQuery {
    pub statement: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

/// One write in a `batch_write`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GraphBatchOp {
    CreateNode(GraphNode),
    UpdateNode { id: String, properties: serde_json::Value },
    DeleteNode { id: String },
    CreateEdge(GraphEdge),
    DeleteEdge { id: String },
}

/// A node reached by `traverse`, with its hop distance from the seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalHit {
    pub node: GraphNode,
    pub hops: usize,
}

/// The only boundary the engine knows about the property graph. The mirror
/// is a projection: the canonical store stays the source of truth and the
/// graph must be reconstructable by clearing and re-syncing.
#[async_trait]
pub trait IGraphAdapter: Send + Sync {
    async fn connect(&self) -> EngramResult<()>;

    async fn create_node(&self, node: GraphNode) -> EngramResult<()>;
    async fn update_node(&self, id: &str, properties: serde_json::Value) -> EngramResult<()>;
    async fn delete_node(&self, id: &str) -> EngramResult<()>;

    async fn create_edge(&self, edge: GraphEdge) -> EngramResult<()>;
    async fn delete_edge(&self, id: &str) -> EngramResult<()>;

    async fn query(&self, query: GraphQuery) -> EngramResult<serde_json::Value>;

    /// Breadth-first expansion from `from`, bounded by `max_hops`.
    async fn traverse(
        &self,
        from: &str,
        edge_types: Option<Vec<String>>,
        max_hops: usize,
    ) -> EngramResult<Vec<TraversalHit>>;

    /// Shortest node path between two nodes, empty when unconnected.
    async fn find_path(&self, from: &str, to: &str) -> EngramResult<Vec<GraphNode>>;

    async fn count_nodes(&self) -> EngramResult<usize>;
    async fn count_edges(&self) -> EngramResult<usize>;

    /// Drop everything. Used before a full re-sync.
    async fn clear_database(&self) -> EngramResult<()>;

    async fn batch_write(&self, ops: Vec<GraphBatchOp>) -> EngramResult<()>;
}
