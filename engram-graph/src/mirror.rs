//! Write-through mirror operations with deterministic inverses. Every call
//! is bounded by the configured graph write timeout; failures bubble up as
//! `GraphError` for the orchestrator to soften into layer events.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use engram_core::errors::{EngramResult, GraphError};
use engram_core::models::{Context, Conversation, Fact, MemoryRecord, MemorySpace};
use engram_core::traits::{GraphNode, IGraphAdapter};

use crate::projection;

pub struct GraphMirror {
    adapter: Arc<dyn IGraphAdapter>,
    write_timeout: Duration,
}

impl GraphMirror {
    pub fn new(adapter: Arc<dyn IGraphAdapter>, write_timeout_ms: u64) -> Self {
        Self {
            adapter,
            write_timeout: Duration::from_millis(write_timeout_ms),
        }
    }

    pub fn adapter(&self) -> &Arc<dyn IGraphAdapter> {
        &self.adapter
    }

    async fn timed<T>(&self, fut: impl Future<Output = EngramResult<T>>) -> EngramResult<T> {
        match tokio::time::timeout(self.write_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(GraphError::Timeout {
                timeout_ms: self.write_timeout.as_millis() as u64,
            }
            .into()),
        }
    }

    pub async fn mirror_space(&self, space: &MemorySpace) -> EngramResult<()> {
        self.timed(self.adapter.create_node(projection::space_node(space)))
            .await
    }

    pub async fn mirror_conversation(&self, conversation: &Conversation) -> EngramResult<()> {
        self.timed(async {
            self.adapter
                .create_node(projection::conversation_node(conversation))
                .await?;
            self.adapter
                .create_edge(projection::contains_edge(
                    &conversation.memory_space_id,
                    projection::conversation_node_id(&conversation.conversation_id),
                ))
                .await
        })
        .await
    }

    pub async fn mirror_memory(&self, memory: &MemoryRecord) -> EngramResult<()> {
        self.timed(async {
            self.adapter.create_node(projection::memory_node(memory)).await?;
            self.adapter
                .create_edge(projection::contains_edge(
                    &memory.memory_space_id,
                    projection::memory_node_id(&memory.memory_id),
                ))
                .await?;
            if let Some(conv_ref) = &memory.conversation_ref {
                self.adapter
                    .create_edge(projection::references_edge(
                        &memory.memory_id,
                        &conv_ref.conversation_id,
                    ))
                    .await?;
            }
            Ok(())
        })
        .await
    }

    /// Project a fact: its node, containment, provenance, entity mentions,
    /// and supersession edges.
    pub async fn mirror_fact(&self, fact: &Fact) -> EngramResult<()> {
        self.timed(async {
            self.adapter.create_node(projection::fact_node(fact)).await?;
            self.adapter
                .create_edge(projection::contains_edge(
                    &fact.memory_space_id,
                    projection::fact_node_id(&fact.fact_id),
                ))
                .await?;

            if let Some(source_ref) = &fact.source_ref {
                if let Some(conversation_id) = &source_ref.conversation_id {
                    self.adapter
                        .create_edge(projection::extracted_from_edge(&fact.fact_id, conversation_id))
                        .await?;
                }
            }

            for entity in projection::fact_entities(fact) {
                self.adapter.create_node(projection::entity_node(&entity)).await?;
                self.adapter
                    .create_edge(projection::mentions_edge(&fact.fact_id, &entity))
                    .await?;
            }

            for superseded in &fact.supersedes {
                self.adapter
                    .create_edge(projection::supersedes_edge(&fact.fact_id, superseded))
                    .await?;
            }
            Ok(())
        })
        .await
    }

    pub async fn mirror_context(&self, context: &Context) -> EngramResult<()> {
        self.timed(async {
            self.adapter.create_node(projection::context_node(context)).await?;
            self.adapter
                .create_edge(projection::contains_edge(
                    &context.memory_space_id,
                    projection::context_node_id(&context.context_id),
                ))
                .await?;

            if let Some(parent_id) = &context.parent_id {
                self.adapter
                    .create_edge(projection::child_of_edge(&context.context_id, parent_id))
                    .await?;
            }
            if let Some(conversation_id) = &context.conversation_ref {
                self.adapter
                    .create_edge(projection::triggered_by_edge(&context.context_id, conversation_id))
                    .await?;
            }
            if let Some(user_id) = &context.user_id {
                self.adapter
                    .create_node(GraphNode {
                        id: projection::user_node_id(user_id),
                        label: projection::LABEL_USER.to_string(),
                        properties: serde_json::json!({ "userId": user_id }),
                    })
                    .await?;
                self.adapter
                    .create_edge(projection::involves_edge(&context.context_id, user_id))
                    .await?;
            }
            Ok(())
        })
        .await
    }

    /// A2A denormalization: SENT_TO between spaces, only when the caller
    /// supplied both sides in metadata. Never inferred.
    pub async fn mirror_a2a(&self, metadata: &serde_json::Value) -> EngramResult<bool> {
        let from = metadata.get("fromMemorySpace").and_then(|v| v.as_str());
        let to = metadata.get("toMemorySpace").and_then(|v| v.as_str());
        let (Some(from), Some(to)) = (from, to) else {
            return Ok(false);
        };
        self.timed(async {
            self.adapter
                .create_edge(projection::sent_to_edge(from, to))
                .await
        })
        .await?;
        debug!(from, to, "mirrored a2a SENT_TO edge");
        Ok(true)
    }

    // Inverses, invoked by forget. Node deletion detaches incident edges.

    pub async fn remove_memory(&self, memory_id: &str) -> EngramResult<()> {
        self.timed(self.adapter.delete_node(&projection::memory_node_id(memory_id)))
            .await
    }

    pub async fn remove_fact(&self, fact_id: &str) -> EngramResult<()> {
        self.timed(self.adapter.delete_node(&projection::fact_node_id(fact_id)))
            .await
    }

    pub async fn remove_conversation(&self, conversation_id: &str) -> EngramResult<()> {
        self.timed(
            self.adapter
                .delete_node(&projection::conversation_node_id(conversation_id)),
        )
        .await
    }

    pub async fn remove_context(&self, context_id: &str) -> EngramResult<()> {
        self.timed(self.adapter.delete_node(&projection::context_node_id(context_id)))
            .await
    }

    pub async fn remove_space(&self, memory_space_id: &str) -> EngramResult<()> {
        self.timed(self.adapter.delete_node(&projection::space_node_id(memory_space_id)))
            .await
    }
}
