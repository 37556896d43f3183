//! Cypher adapter: speaks the transactional HTTP endpoint of a
//! Cypher-capable property graph. Connection parameters stay opaque to the
//! engine; everything rides through the adapter verbs.

use async_trait::async_trait;
use serde_json::json;

use engram_core::errors::{EngramResult, GraphError};
use engram_core::traits::{GraphBatchOp, GraphEdge, GraphNode, GraphQuery, IGraphAdapter, TraversalHit};

pub struct CypherGraphAdapter {
    endpoint: String,
    client: reqwest::Client,
}

impl CypherGraphAdapter {
    /// `endpoint` is the full transaction-commit URL, e.g.
    /// `http://localhost:7474/db/neo4j/tx/commit`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn run(
        &self,
        statement: &str,
        parameters: serde_json::Value,
    ) -> EngramResult<serde_json::Value> {
        let body = json!({
            "statements": [{ "statement": statement, "parameters": parameters }]
        });
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| GraphError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GraphError::WriteFailed(format!("http {}", response.status())).into());
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GraphError::QueryFailed(e.to_string()))?;

        if let Some(errors) = payload.get("errors").and_then(|e| e.as_array()) {
            if !errors.is_empty() {
                return Err(GraphError::QueryFailed(errors[0].to_string()).into());
            }
        }
        Ok(payload)
    }

    fn first_count(payload: &serde_json::Value) -> usize {
        payload
            .pointer("/results/0/data/0/row/0")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize
    }

    fn node_from_row(row: &serde_json::Value) -> Option<GraphNode> {
        let properties = row.get(0)?.clone();
        let id = properties.get("_id")?.as_str()?.to_string();
        let label = properties.get("_label")?.as_str()?.to_string();
        Some(GraphNode {
            id,
            label,
            properties,
        })
    }
}

#[async_trait]
impl IGraphAdapter for CypherGraphAdapter {
    async fn connect(&self) -> EngramResult<()> {
        self.run("RETURN 1", json!({})).await.map(|_| ())
    }

    async fn create_node(&self, node: GraphNode) -> EngramResult<()> {
        let mut properties = node.properties.clone();
        if let Some(map) = properties.as_object_mut() {
            map.insert("_id".into(), json!(node.id));
            map.insert("_label".into(), json!(node.label));
        }
        self.run(
            &format!("MERGE (n:{} {{_id: $id}}) SET n = $props", node.label),
            json!({ "id": node.id, "props": properties }),
        )
        .await
        .map(|_| ())
    }

    async fn update_node(&self, id: &str, properties: serde_json::Value) -> EngramResult<()> {
        self.run(
            "MATCH (n {_id: $id}) SET n += $props",
            json!({ "id": id, "props": properties }),
        )
        .await
        .map(|_| ())
    }

    async fn delete_node(&self, id: &str) -> EngramResult<()> {
        self.run("MATCH (n {_id: $id}) DETACH DELETE n", json!({ "id": id }))
            .await
            .map(|_| ())
    }

    async fn create_edge(&self, edge: GraphEdge) -> EngramResult<()> {
        self.run(
            &format!(
                "MATCH (a {{_id: $from}}), (b {{_id: $to}})
                 MERGE (a)-[r:{} {{_id: $id}}]->(b)",
                edge.edge_type
            ),
            json!({ "from": edge.from, "to": edge.to, "id": edge.id }),
        )
        .await
        .map(|_| ())
    }

    async fn delete_edge(&self, id: &str) -> EngramResult<()> {
        self.run("MATCH ()-[r {_id: $id}]-() DELETE r", json!({ "id": id }))
            .await
            .map(|_| ())
    }

    async fn query(&self, query: GraphQuery) -> EngramResult<serde_json::Value> {
        self.run(&query.statement, query.parameters).await
    }

    async fn traverse(
        &self,
        from: &str,
        edge_types: Option<Vec<String>>,
        max_hops: usize,
    ) -> EngramResult<Vec<TraversalHit>> {
        let type_filter = edge_types
            .map(|types| format!(":{}", types.join("|")))
            .unwrap_or_default();
        let payload = self
            .run(
                &format!(
                    "MATCH path = (a {{_id: $from}})-[{type_filter}*1..{max_hops}]-(n)
                     RETURN DISTINCT properties(n), length(path) ORDER BY length(path)"
                ),
                json!({ "from": from }),
            )
            .await?;

        let mut hits = Vec::new();
        if let Some(rows) = payload.pointer("/results/0/data").and_then(|d| d.as_array()) {
            for entry in rows {
                let Some(row) = entry.get("row") else { continue };
                let Some(node) = Self::node_from_row(row) else { continue };
                let hops = row.get(1).and_then(|h| h.as_u64()).unwrap_or(1) as usize;
                hits.push(TraversalHit { node, hops });
            }
        }
        Ok(hits)
    }

    async fn find_path(&self, from: &str, to: &str) -> EngramResult<Vec<GraphNode>> {
        let payload = self
            .run(
                "MATCH path = shortestPath((a {_id: $from})-[*]-(b {_id: $to}))
                 UNWIND nodes(path) AS n RETURN properties(n)",
                json!({ "from": from, "to": to }),
            )
            .await?;

        let mut nodes = Vec::new();
        if let Some(rows) = payload.pointer("/results/0/data").and_then(|d| d.as_array()) {
            for entry in rows {
                if let Some(node) = entry.get("row").and_then(Self::node_from_row) {
                    nodes.push(node);
                }
            }
        }
        Ok(nodes)
    }

    async fn count_nodes(&self) -> EngramResult<usize> {
        let payload = self.run("MATCH (n) RETURN count(n)", json!({})).await?;
        Ok(Self::first_count(&payload))
    }

    async fn count_edges(&self) -> EngramResult<usize> {
        let payload = self.run("MATCH ()-[r]->() RETURN count(r)", json!({})).await?;
        Ok(Self::first_count(&payload))
    }

    async fn clear_database(&self) -> EngramResult<()> {
        self.run("MATCH (n) DETACH DELETE n", json!({})).await.map(|_| ())
    }

    async fn batch_write(&self, ops: Vec<GraphBatchOp>) -> EngramResult<()> {
        for op in ops {
            match op {
                GraphBatchOp::CreateNode(node) => self.create_node(node).await?,
                GraphBatchOp::UpdateNode { id, properties } => {
                    self.update_node(&id, properties).await?
                }
                GraphBatchOp::DeleteNode { id } => self.delete_node(&id).await?,
                GraphBatchOp::CreateEdge(edge) => self.create_edge(edge).await?,
                GraphBatchOp::DeleteEdge { id } => self.delete_edge(&id).await?,
            }
        }
        Ok(())
    }
}
