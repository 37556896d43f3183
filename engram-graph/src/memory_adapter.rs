//! In-memory adapter: a petgraph stable graph with id indexes. Used in tests
//! and single-process deployments that want graph recall without an external
//! engine.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use async_trait::async_trait;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use engram_core::errors::{EngramResult, GraphError};
use engram_core::traits::{GraphBatchOp, GraphEdge, GraphNode, GraphQuery, IGraphAdapter, TraversalHit};

#[derive(Debug, Clone)]
struct EdgeWeight {
    id: String,
    edge_type: String,
}

#[derive(Default)]
struct GraphState {
    graph: StableDiGraph<GraphNode, EdgeWeight>,
    node_ids: HashMap<String, NodeIndex>,
    edge_ids: HashMap<String, EdgeIndex>,
}

/// Thread-safe in-memory property graph.
#[derive(Default)]
pub struct InMemoryGraph {
    inner: RwLock<GraphState>,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> EngramResult<std::sync::RwLockReadGuard<'_, GraphState>> {
        self.inner
            .read()
            .map_err(|_| GraphError::Unreachable("graph lock poisoned".into()).into())
    }

    fn write(&self) -> EngramResult<std::sync::RwLockWriteGuard<'_, GraphState>> {
        self.inner
            .write()
            .map_err(|_| GraphError::Unreachable("graph lock poisoned".into()).into())
    }
}

impl GraphState {
    fn upsert_node(&mut self, node: GraphNode) {
        match self.node_ids.get(&node.id) {
            Some(&idx) => {
                self.graph[idx] = node;
            }
            None => {
                let id = node.id.clone();
                let idx = self.graph.add_node(node);
                self.node_ids.insert(id, idx);
            }
        }
    }

    fn remove_node(&mut self, id: &str) {
        if let Some(idx) = self.node_ids.remove(id) {
            // Incident edges vanish with the node; drop their id entries too.
            let incident: Vec<String> = self
                .graph
                .edges(idx)
                .map(|e| e.weight().id.clone())
                .chain(
                    self.graph
                        .edges_directed(idx, Direction::Incoming)
                        .map(|e| e.weight().id.clone()),
                )
                .collect();
            for edge_id in incident {
                self.edge_ids.remove(&edge_id);
            }
            self.graph.remove_node(idx);
        }
    }

    fn upsert_edge(&mut self, edge: GraphEdge) -> EngramResult<()> {
        if self.edge_ids.contains_key(&edge.id) {
            return Ok(());
        }
        let from = *self
            .node_ids
            .get(&edge.from)
            .ok_or_else(|| GraphError::WriteFailed(format!("edge source missing: {}", edge.from)))?;
        let to = *self
            .node_ids
            .get(&edge.to)
            .ok_or_else(|| GraphError::WriteFailed(format!("edge target missing: {}", edge.to)))?;
        let idx = self.graph.add_edge(
            from,
            to,
            EdgeWeight {
                id: edge.id.clone(),
                edge_type: edge.edge_type,
            },
        );
        self.edge_ids.insert(edge.id, idx);
        Ok(())
    }

    fn remove_edge(&mut self, id: &str) {
        if let Some(idx) = self.edge_ids.remove(id) {
            self.graph.remove_edge(idx);
        }
    }

    /// Undirected neighbors with the connecting edge type.
    fn neighbors(&self, idx: NodeIndex) -> Vec<(NodeIndex, String)> {
        let mut out = Vec::new();
        for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
            out.push((edge.target(), edge.weight().edge_type.clone()));
        }
        for edge in self.graph.edges_directed(idx, Direction::Incoming) {
            out.push((edge.source(), edge.weight().edge_type.clone()));
        }
        out
    }
}

#[async_trait]
impl IGraphAdapter for InMemoryGraph {
    async fn connect(&self) -> EngramResult<()> {
        Ok(())
    }

    async fn create_node(&self, node: GraphNode) -> EngramResult<()> {
        self.write()?.upsert_node(node);
        Ok(())
    }

    async fn update_node(&self, id: &str, properties: serde_json::Value) -> EngramResult<()> {
        let mut state = self.write()?;
        let idx = *state
            .node_ids
            .get(id)
            .ok_or_else(|| GraphError::WriteFailed(format!("node missing: {id}")))?;
        state.graph[idx].properties = properties;
        Ok(())
    }

    async fn delete_node(&self, id: &str) -> EngramResult<()> {
        self.write()?.remove_node(id);
        Ok(())
    }

    async fn create_edge(&self, edge: GraphEdge) -> EngramResult<()> {
        self.write()?.upsert_edge(edge)
    }

    async fn delete_edge(&self, id: &str) -> EngramResult<()> {
        self.write()?.remove_edge(id);
        Ok(())
    }

    async fn query(&self, _query: GraphQuery) -> EngramResult<serde_json::Value> {
        Err(GraphError::QueryFailed("opaque queries need an external graph engine".into()).into())
    }

    async fn traverse(
        &self,
        from: &str,
        edge_types: Option<Vec<String>>,
        max_hops: usize,
    ) -> EngramResult<Vec<TraversalHit>> {
        let state = self.read()?;
        let Some(&start) = state.node_ids.get(from) else {
            return Ok(Vec::new());
        };

        let mut hits = Vec::new();
        let mut visited: HashMap<NodeIndex, usize> = HashMap::from([(start, 0)]);
        let mut queue = VecDeque::from([(start, 0usize)]);

        while let Some((idx, hops)) = queue.pop_front() {
            if hops >= max_hops {
                continue;
            }
            for (next, edge_type) in state.neighbors(idx) {
                if let Some(allowed) = &edge_types {
                    if !allowed.contains(&edge_type) {
                        continue;
                    }
                }
                if visited.contains_key(&next) {
                    continue;
                }
                visited.insert(next, hops + 1);
                hits.push(TraversalHit {
                    node: state.graph[next].clone(),
                    hops: hops + 1,
                });
                queue.push_back((next, hops + 1));
            }
        }
        Ok(hits)
    }

    async fn find_path(&self, from: &str, to: &str) -> EngramResult<Vec<GraphNode>> {
        let state = self.read()?;
        let (Some(&start), Some(&goal)) = (state.node_ids.get(from), state.node_ids.get(to)) else {
            return Ok(Vec::new());
        };

        let mut parents: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        let mut found = start == goal;

        while let Some(idx) = queue.pop_front() {
            if found {
                break;
            }
            for (next, _) in state.neighbors(idx) {
                if next == start || parents.contains_key(&next) {
                    continue;
                }
                parents.insert(next, idx);
                if next == goal {
                    found = true;
                    break;
                }
                queue.push_back(next);
            }
        }

        if !found {
            return Ok(Vec::new());
        }

        let mut path = vec![goal];
        let mut cursor = goal;
        while cursor != start {
            cursor = parents[&cursor];
            path.push(cursor);
        }
        path.reverse();
        Ok(path.into_iter().map(|idx| state.graph[idx].clone()).collect())
    }

    async fn count_nodes(&self) -> EngramResult<usize> {
        Ok(self.read()?.graph.node_count())
    }

    async fn count_edges(&self) -> EngramResult<usize> {
        Ok(self.read()?.graph.edge_count())
    }

    async fn clear_database(&self) -> EngramResult<()> {
        let mut state = self.write()?;
        state.graph.clear();
        state.node_ids.clear();
        state.edge_ids.clear();
        Ok(())
    }

    async fn batch_write(&self, ops: Vec<GraphBatchOp>) -> EngramResult<()> {
        let mut state = self.write()?;
        for op in ops {
            match op {
                GraphBatchOp::CreateNode(node) => state.upsert_node(node),
                GraphBatchOp::UpdateNode { id, properties } => {
                    if let Some(&idx) = state.node_ids.get(&id) {
                        state.graph[idx].properties = properties;
                    }
                }
                GraphBatchOp::DeleteNode { id } => state.remove_node(&id),
                GraphBatchOp::CreateEdge(edge) => state.upsert_edge(edge)?,
                GraphBatchOp::DeleteEdge { id } => state.remove_edge(&id),
            }
        }
        Ok(())
    }
}
