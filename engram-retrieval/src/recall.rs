//! RecallEngine — fans enabled sources out as independent tasks and merges.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use engram_core::errors::EngramResult;
use engram_core::models::{
    RecallHit, RecallPayload, RecallRequest, RecallResponse, RecallSourceKind, SourceFailure,
};
use engram_core::traits::{IEmbeddingProvider, IGraphAdapter};
use engram_storage::StorageEngine;

use crate::merge::merge_hits;
use crate::sources;

pub struct RecallEngine {
    storage: Arc<StorageEngine>,
    embedder: Option<Arc<dyn IEmbeddingProvider>>,
    graph: Option<Arc<dyn IGraphAdapter>>,
    embedding_timeout: Duration,
}

impl RecallEngine {
    pub fn new(
        storage: Arc<StorageEngine>,
        embedder: Option<Arc<dyn IEmbeddingProvider>>,
        graph: Option<Arc<dyn IGraphAdapter>>,
        embedding_timeout_ms: u64,
    ) -> Self {
        Self {
            storage,
            embedder,
            graph,
            embedding_timeout: Duration::from_millis(embedding_timeout_ms),
        }
    }

    /// Multi-strategy retrieval. Per-source failures are suppressed from the
    /// result set and reported in `source_failures`; no enabled sources (or
    /// no hits) is an empty result, not an error.
    pub async fn recall(&self, request: RecallRequest) -> EngramResult<RecallResponse> {
        if request.sources.is_empty() {
            return Ok(RecallResponse::default());
        }

        // One read snapshot per consulted layer; a missing space is a caller
        // error rather than an empty set.
        self.storage.spaces().get(&request.memory_space_id)?;

        let mut source_results: Vec<Vec<RecallHit>> = Vec::new();
        let mut source_failures: Vec<SourceFailure> = Vec::new();

        let query_embedding = if request.sources.vector {
            match self.resolve_embedding(&request).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    source_failures.push(SourceFailure {
                        source: RecallSourceKind::Vector,
                        error: e.to_string(),
                    });
                    None
                }
            }
        } else {
            None
        };

        let vector_task = {
            let storage = Arc::clone(&self.storage);
            let request = request.clone();
            let embedding = query_embedding.clone();
            async move {
                match embedding {
                    Some(embedding) => tokio::task::spawn_blocking(move || {
                        sources::vector::run(&storage, &request, &embedding)
                    })
                    .await
                    .unwrap_or_else(|e| Err(engram_core::EngramError::Validation(e.to_string()))),
                    None => Ok(Vec::new()),
                }
            }
        };

        let facts_task = {
            let storage = Arc::clone(&self.storage);
            let request = request.clone();
            let enabled = request.sources.facts;
            async move {
                if !enabled {
                    return Ok(Vec::new());
                }
                tokio::task::spawn_blocking(move || sources::facts::run(&storage, &request))
                    .await
                    .unwrap_or_else(|e| Err(engram_core::EngramError::Validation(e.to_string())))
            }
        };

        let lexical_task = {
            let storage = Arc::clone(&self.storage);
            let request = request.clone();
            let enabled = request.sources.lexical;
            async move {
                if !enabled {
                    return Ok(Vec::new());
                }
                tokio::task::spawn_blocking(move || sources::lexical::run(&storage, &request))
                    .await
                    .unwrap_or_else(|e| Err(engram_core::EngramError::Validation(e.to_string())))
            }
        };

        let graph_task = {
            let storage = Arc::clone(&self.storage);
            let adapter = self.graph.clone();
            let request = request.clone();
            let enabled = request.sources.graph;
            async move {
                match adapter {
                    Some(adapter) if enabled => {
                        sources::graph::run(&storage, &adapter, &request).await
                    }
                    // No adapter configured: graph recall degrades to off.
                    _ => Ok(Vec::new()),
                }
            }
        };

        let (vector, facts, lexical, graph) =
            tokio::join!(vector_task, facts_task, lexical_task, graph_task);

        for (kind, result) in [
            (RecallSourceKind::Vector, vector),
            (RecallSourceKind::Facts, facts),
            (RecallSourceKind::Lexical, lexical),
            (RecallSourceKind::Graph, graph),
        ] {
            match result {
                Ok(hits) => source_results.push(hits),
                Err(e) => {
                    debug!(source = ?kind, "recall source failed: {e}");
                    source_failures.push(SourceFailure {
                        source: kind,
                        error: e.to_string(),
                    });
                }
            }
        }

        if let Some(context_id) = &request.context_id {
            let allowed = self.reachable_conversations(context_id)?;
            for hits in &mut source_results {
                hits.retain(|hit| {
                    conversation_of(hit)
                        .map(|id| allowed.contains(id))
                        .unwrap_or(false)
                });
            }
        }

        Ok(RecallResponse {
            items: merge_hits(source_results, request.limit.max(1)),
            source_failures,
        })
    }

    async fn resolve_embedding(&self, request: &RecallRequest) -> EngramResult<Option<Vec<f32>>> {
        if let Some(embedding) = &request.embedding {
            return Ok(Some(embedding.clone()));
        }
        let Some(embedder) = &self.embedder else {
            debug!("vector source skipped: no query embedding and no provider");
            return Ok(None);
        };
        let embedding =
            tokio::time::timeout(self.embedding_timeout, embedder.embed(&request.query))
                .await
                .map_err(|_| {
                    engram_core::EngramError::Validation(format!(
                        "query embedding timed out after {}ms",
                        self.embedding_timeout.as_millis()
                    ))
                })??;
        Ok(Some(embedding))
    }

    /// Conversations reachable from the context or any of its ancestors.
    fn reachable_conversations(&self, context_id: &str) -> EngramResult<HashSet<String>> {
        let chain = self.storage.contexts().get_chain(context_id)?;
        Ok(chain
            .into_iter()
            .filter_map(|context| context.conversation_ref)
            .collect())
    }
}

fn conversation_of(hit: &RecallHit) -> Option<&String> {
    match &hit.payload {
        RecallPayload::Memory(memory) => {
            memory.conversation_ref.as_ref().map(|r| &r.conversation_id)
        }
        RecallPayload::Fact(fact) => fact
            .source_ref
            .as_ref()
            .and_then(|r| r.conversation_id.as_ref()),
    }
}
