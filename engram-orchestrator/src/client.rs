//! The Engram client: configuration, wired collaborators, and the
//! programmatic surface consumed by bridges and SDK users.

use std::sync::Arc;

use engram_core::config::EngramConfig;
use engram_core::errors::EngramResult;
use engram_core::models::{
    CreatedIds, ForgetOptions, ForgetSummary, LayerStatus, LayerUpdate, NewFact,
    OrchestrationLayer, RecallRequest, RecallResponse, RememberRequest, RevisionDecision,
};
use engram_core::traits::{
    IEmbeddingProvider, IFactExtractor, IGraphAdapter, IOrchestrationObserver, IRevisionClassifier,
};
use engram_core::mint_id;
use engram_graph::{initial_graph_sync, GraphMirror, SyncReport};
use engram_retrieval::RecallEngine;
use engram_revision::RevisionEngine;
use engram_storage::stores::{
    AgentsStore, ContextsStore, ConversationsStore, FactsStore, MemoriesStore, ParticipantsStore,
    SpacesStore, StateStore, UsersStore,
};
use engram_storage::StorageEngine;

use crate::admission::AdmissionController;
use crate::events::ObserverHub;
use crate::{forget, remember};

/// Result of one completed `remember` orchestration: everything created,
/// plus the buffered layer events (soft failures included).
#[derive(Debug, Clone)]
pub struct RememberOutcome {
    pub orchestration_id: String,
    pub created: CreatedIds,
    pub events: Vec<LayerUpdate>,
    pub total_latency_ms: u64,
}

pub struct EngramBuilder {
    config: EngramConfig,
    embedder: Option<Arc<dyn IEmbeddingProvider>>,
    extractor: Option<Arc<dyn IFactExtractor>>,
    classifier: Option<Arc<dyn IRevisionClassifier>>,
    graph_adapter: Option<Arc<dyn IGraphAdapter>>,
}

impl EngramBuilder {
    pub fn new(config: EngramConfig) -> Self {
        Self {
            config,
            embedder: None,
            extractor: None,
            classifier: None,
            graph_adapter: None,
        }
    }

    pub fn embedder(mut self, embedder: Arc<dyn IEmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn IFactExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn IRevisionClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn graph_adapter(mut self, adapter: Arc<dyn IGraphAdapter>) -> Self {
        self.graph_adapter = Some(adapter);
        self
    }

    pub fn build(self) -> EngramResult<Engram> {
        let storage = Arc::new(StorageEngine::open(self.config.clone())?);

        let mirror = match (&self.graph_adapter, self.config.graph.mirror) {
            (Some(adapter), true) => Some(Arc::new(GraphMirror::new(
                Arc::clone(adapter),
                self.config.graph.write_timeout_ms,
            ))),
            _ => None,
        };

        let revision = RevisionEngine::new(
            Arc::clone(&storage),
            self.config.revision.clone(),
            self.classifier.clone(),
        );

        let recall_engine = RecallEngine::new(
            Arc::clone(&storage),
            self.embedder.clone(),
            self.graph_adapter.clone(),
            self.config.embedding.timeout_ms,
        );

        let admission = AdmissionController::new(
            self.config.orchestrator.inflight_per_space,
            self.config.orchestrator.queue_depth,
        );

        Ok(Engram {
            storage,
            config: self.config,
            revision,
            recall_engine,
            mirror,
            embedder: self.embedder,
            extractor: self.extractor,
            observers: ObserverHub::new(),
            admission,
        })
    }
}

pub struct Engram {
    pub(crate) storage: Arc<StorageEngine>,
    pub(crate) config: EngramConfig,
    pub(crate) revision: RevisionEngine,
    pub(crate) recall_engine: RecallEngine,
    pub(crate) mirror: Option<Arc<GraphMirror>>,
    pub(crate) embedder: Option<Arc<dyn IEmbeddingProvider>>,
    pub(crate) extractor: Option<Arc<dyn IFactExtractor>>,
    pub(crate) observers: ObserverHub,
    pub(crate) admission: AdmissionController,
}

impl Engram {
    pub fn builder(config: EngramConfig) -> EngramBuilder {
        EngramBuilder::new(config)
    }

    /// In-memory engine with default config; the common test entry point.
    pub fn open_in_memory() -> EngramResult<Self> {
        EngramBuilder::new(EngramConfig::default()).build()
    }

    // ── Orchestrated surface ────────────────────────────────────────────────

    /// Persist one conversational turn across every layer.
    pub async fn remember(&self, request: RememberRequest) -> EngramResult<RememberOutcome> {
        remember::run(self, request).await
    }

    /// Multi-strategy retrieval with graceful per-source degradation.
    pub async fn recall(&self, request: RecallRequest) -> EngramResult<RecallResponse> {
        self.recall_engine.recall(request).await
    }

    /// Remove or archive a target and its dependents, in dependency order.
    pub async fn forget(
        &self,
        memory_space_id: &str,
        target_id: &str,
        options: ForgetOptions,
    ) -> EngramResult<ForgetSummary> {
        forget::run(self, memory_space_id, target_id, options).await
    }

    /// Store a fact through belief revision, emitting the decision as a
    /// `facts` layer event.
    pub async fn store_fact(
        &self,
        memory_space_id: &str,
        input: NewFact,
    ) -> EngramResult<RevisionDecision> {
        let decision = self.revision.store_fact(memory_space_id, input).await?;

        let mut update = LayerUpdate::new(
            &mint_id("orch"),
            OrchestrationLayer::Facts,
            LayerStatus::Complete,
        );
        update.revision_action = Some(decision.action);
        update.superseded_facts = Some(decision.superseded.clone());
        update.data = Some(serde_json::json!({ "factId": decision.fact_id }));
        self.observers.emit_update(&update);

        Ok(decision)
    }

    /// Delete a user. With `cascade`, every space the user owns is purged
    /// and weak references elsewhere are cleared.
    pub async fn delete_user(&self, user_id: &str, cascade: bool) -> EngramResult<ForgetSummary> {
        forget::delete_user(self, user_id, cascade).await
    }

    /// Rebuild the graph mirror from the canonical layers.
    pub async fn sync_graph(&self) -> EngramResult<Option<SyncReport>> {
        match &self.mirror {
            Some(mirror) => Ok(Some(
                initial_graph_sync(&self.storage, mirror, self.config.graph.sync_limit_per_layer)
                    .await?,
            )),
            None => Ok(None),
        }
    }

    pub fn register_observer(&self, observer: Arc<dyn IOrchestrationObserver>) {
        self.observers.register(observer);
    }

    // ── Layer accessors ─────────────────────────────────────────────────────

    pub fn memory_spaces(&self) -> SpacesStore {
        self.storage.spaces()
    }

    pub fn users(&self) -> UsersStore {
        self.storage.users()
    }

    pub fn agents(&self) -> AgentsStore {
        self.storage.agents()
    }

    pub fn participants(&self) -> ParticipantsStore {
        self.storage.participants()
    }

    pub fn conversations(&self) -> ConversationsStore {
        self.storage.conversations()
    }

    pub fn vector(&self) -> MemoriesStore {
        self.storage.memories()
    }

    pub fn facts(&self) -> FactsStore {
        self.storage.facts()
    }

    pub fn contexts(&self) -> ContextsStore {
        self.storage.contexts()
    }

    pub fn state(&self) -> StateStore {
        self.storage.state()
    }

    pub fn storage(&self) -> &Arc<StorageEngine> {
        &self.storage
    }

    pub fn config(&self) -> &EngramConfig {
        &self.config
    }
}
