//! The `remember` state machine: spaceCheck → userCheck → agentCheck →
//! conversationAppend → vectorStore → factExtract → beliefRevision →
//! graphMirror → complete. Hard layers (conversation, vector) fail the call;
//! soft layers (facts extraction, graph mirror) surface as error events and
//! the orchestration still completes.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use engram_core::errors::EngramResult;
use engram_core::models::{
    ContentType, ConversationParticipants, ConversationType, CreatedIds, FactSourceRef,
    LayerStatus, LayerUpdate, MemorySource, MessageRole, NewFact, NewMemory,
    OrchestrationComplete, OrchestrationLayer, RememberRequest, RevisionAction, SpaceType,
};
use engram_core::{mint_id, now_ms, EngramError};
use engram_storage::queries::conversation_ops::AppendOutcome;

use crate::client::{Engram, RememberOutcome};
use crate::events::ObserverHub;
use crate::idempotency::{idempotency_key, message_dedup_key};

/// Buffers every emitted event for the outcome while forwarding to
/// registered observers.
struct EventBuffer {
    hub: ObserverHub,
    orchestration_id: String,
    events: Vec<LayerUpdate>,
}

impl EventBuffer {
    fn new(hub: ObserverHub, orchestration_id: String) -> Self {
        Self {
            hub,
            orchestration_id,
            events: Vec::new(),
        }
    }

    fn emit(&mut self, layer: OrchestrationLayer, status: LayerStatus, started: Instant) {
        let mut update = LayerUpdate::new(&self.orchestration_id, layer, status);
        update.latency_ms = started.elapsed().as_millis() as u64;
        self.hub.emit_update(&update);
        self.events.push(update);
    }

    fn emit_data(
        &mut self,
        layer: OrchestrationLayer,
        status: LayerStatus,
        started: Instant,
        data: serde_json::Value,
    ) {
        let mut update = LayerUpdate::new(&self.orchestration_id, layer, status);
        update.latency_ms = started.elapsed().as_millis() as u64;
        update.data = Some(data);
        self.hub.emit_update(&update);
        self.events.push(update);
    }

    fn emit_error(&mut self, layer: OrchestrationLayer, started: Instant, error: &EngramError) {
        let mut update = LayerUpdate::new(&self.orchestration_id, layer, LayerStatus::Error);
        update.latency_ms = started.elapsed().as_millis() as u64;
        update.error = Some(error.to_string());
        self.hub.emit_update(&update);
        self.events.push(update);
    }

    fn emit_revision(
        &mut self,
        started: Instant,
        decision: &engram_core::models::RevisionDecision,
    ) {
        let mut update =
            LayerUpdate::new(&self.orchestration_id, OrchestrationLayer::Facts, LayerStatus::Complete);
        update.latency_ms = started.elapsed().as_millis() as u64;
        update.revision_action = Some(decision.action);
        update.superseded_facts = Some(decision.superseded.clone());
        update.data = Some(serde_json::json!({ "factId": decision.fact_id }));
        self.hub.emit_update(&update);
        self.events.push(update);
    }
}

/// Run one step of a hard layer: errors are emitted and fail the call.
macro_rules! hard {
    ($events:expr, $layer:expr, $started:expr, $result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => {
                $events.emit_error($layer, $started, &e);
                return Err(e);
            }
        }
    };
}

pub(crate) async fn run(engram: &Engram, request: RememberRequest) -> EngramResult<RememberOutcome> {
    for (field, value) in [
        ("memorySpaceId", &request.memory_space_id),
        ("userId", &request.user_id),
        ("agentId", &request.agent_id),
    ] {
        if value.trim().is_empty() {
            return Err(EngramError::Validation(format!("{field} must not be empty")));
        }
    }

    let _permit = engram.admission.acquire(&request.memory_space_id).await?;

    let orchestration_id = mint_id("orch");
    let call_started = Instant::now();
    engram.observers.emit_start(&orchestration_id);
    let mut events = EventBuffer::new(engram.observers.clone(), orchestration_id.clone());
    let mut created = CreatedIds::default();

    // ── spaceCheck ──────────────────────────────────────────────────────────
    let started = Instant::now();
    let space_name = request
        .space_name
        .clone()
        .unwrap_or_else(|| request.memory_space_id.clone());
    let space_type = request.space_type.unwrap_or(SpaceType::Personal);
    let (space, space_created) = hard!(
        events,
        OrchestrationLayer::MemorySpace,
        started,
        engram.storage.spaces().ensure(
            &request.memory_space_id,
            &space_name,
            space_type,
            Some(request.user_id.clone()),
        )
    );
    events.emit_data(
        OrchestrationLayer::MemorySpace,
        if space_created { LayerStatus::Complete } else { LayerStatus::Skipped },
        started,
        serde_json::json!({ "memorySpaceId": space.memory_space_id }),
    );

    // ── userCheck ───────────────────────────────────────────────────────────
    let started = Instant::now();
    let (_, user_created) = hard!(
        events,
        OrchestrationLayer::User,
        started,
        engram
            .storage
            .users()
            .ensure(&request.user_id, request.user_name.clone())
    );
    events.emit(
        OrchestrationLayer::User,
        if user_created { LayerStatus::Complete } else { LayerStatus::Skipped },
        started,
    );

    // ── agentCheck ──────────────────────────────────────────────────────────
    let started = Instant::now();
    let agent_name = request.agent_name.clone().unwrap_or_else(|| request.agent_id.clone());
    let (_, agent_created) = hard!(
        events,
        OrchestrationLayer::Agent,
        started,
        engram
            .storage
            .agents()
            .ensure(&request.agent_id, &agent_name, Vec::new(), None)
    );
    events.emit(
        OrchestrationLayer::Agent,
        if agent_created { LayerStatus::Complete } else { LayerStatus::Skipped },
        started,
    );

    // ── conversationAppend (hard) ───────────────────────────────────────────
    let started = Instant::now();
    let conversation = match &request.conversation_id {
        Some(conversation_id) => {
            let conversation = hard!(
                events,
                OrchestrationLayer::Conversation,
                started,
                engram.storage.conversations().get(conversation_id)
            );
            if conversation.memory_space_id != request.memory_space_id {
                let e = EngramError::IsolationViolation {
                    entity: "conversation",
                    id: conversation.conversation_id.clone(),
                    requested: request.memory_space_id.clone(),
                    actual: conversation.memory_space_id.clone(),
                };
                events.emit_error(OrchestrationLayer::Conversation, started, &e);
                return Err(e);
            }
            conversation
        }
        None => hard!(
            events,
            OrchestrationLayer::Conversation,
            started,
            engram.storage.conversations().create(
                &request.memory_space_id,
                ConversationType::UserAgent,
                ConversationParticipants {
                    user_id: Some(request.user_id.clone()),
                    participant_id: None,
                },
            )
        ),
    };

    let conversation_id = conversation.conversation_id.clone();
    let timestamp = request.timestamp.unwrap_or_else(now_ms);
    let key = idempotency_key(
        &conversation_id,
        &request.user_message,
        &request.agent_response,
        timestamp,
    );

    let (user_appended, agent_appended) = hard!(
        events,
        OrchestrationLayer::Conversation,
        started,
        engram.storage.conversations().append_turn(
            &conversation_id,
            (
                &request.user_message,
                timestamp,
                Some(message_dedup_key(&key, MessageRole::User)),
            ),
            (
                &request.agent_response,
                timestamp,
                Some(message_dedup_key(&key, MessageRole::Agent)),
            ),
        )
    );
    created.conversation_id = Some(conversation_id.clone());
    created.message_ids = vec![
        user_appended.message.id.clone(),
        agent_appended.message.id.clone(),
    ];
    events.emit_data(
        OrchestrationLayer::Conversation,
        LayerStatus::Complete,
        started,
        serde_json::json!({
            "conversationId": conversation_id,
            "messageIds": created.message_ids,
            "deduplicated": user_appended.deduplicated && agent_appended.deduplicated,
        }),
    );

    // ── vectorStore (hard) ──────────────────────────────────────────────────
    let started = Instant::now();
    let turns: [(&AppendOutcome, Option<String>); 2] = [
        (&user_appended, Some(request.user_id.clone())),
        (&agent_appended, None),
    ];
    for (appended, user_id) in turns {
        if appended.message.content.trim().is_empty() {
            continue;
        }
        let covered = hard!(
            events,
            OrchestrationLayer::Vector,
            started,
            engram
                .storage
                .memories()
                .exists_for_message(&conversation_id, &appended.message.id)
        );
        if covered {
            debug!(message_id = %appended.message.id, "vector store skipped, already covered");
            continue;
        }

        let embedding = match &engram.embedder {
            None => None,
            Some(embedder) => {
                let embed_timeout = Duration::from_millis(engram.config.embedding.timeout_ms);
                let embedded = match tokio::time::timeout(
                    embed_timeout,
                    embedder.embed(&appended.message.content),
                )
                .await
                {
                    Ok(inner) => inner,
                    Err(_) => Err(EngramError::TransientStorage {
                        attempts: 1,
                        message: format!(
                            "embedding timed out after {}ms",
                            embed_timeout.as_millis()
                        ),
                    }),
                };
                // A hard step: embedding failure fails the call.
                Some(hard!(events, OrchestrationLayer::Vector, started, embedded))
            }
        };

        let record = hard!(
            events,
            OrchestrationLayer::Vector,
            started,
            engram.storage.memories().store(
                &request.memory_space_id,
                NewMemory {
                    content: appended.message.content.clone(),
                    content_type: ContentType::Raw,
                    embedding,
                    user_id: user_id.clone(),
                    source: MemorySource {
                        source_type: "conversation".to_string(),
                        user_id: user_id.clone(),
                        user_name: request.user_name.clone(),
                    },
                    conversation_ref: Some(engram_core::models::ConversationRef {
                        conversation_id: conversation_id.clone(),
                        message_ids: vec![appended.message.id.clone()],
                    }),
                    tags: request.tags.clone(),
                    importance: request.importance.unwrap_or(50),
                },
            )
        );
        created.memory_ids.push(record.memory_id);
    }
    events.emit_data(
        OrchestrationLayer::Vector,
        LayerStatus::Complete,
        started,
        serde_json::json!({ "memoryIds": created.memory_ids }),
    );

    // ── factExtract (soft) + beliefRevision ─────────────────────────────────
    let started = Instant::now();
    let mut extracted = None;
    if !engram.config.orchestrator.extract_facts {
        events.emit(OrchestrationLayer::Facts, LayerStatus::Skipped, started);
    } else {
        match &engram.extractor {
            None => {
                events.emit(OrchestrationLayer::Facts, LayerStatus::Skipped, started);
            }
            Some(extractor) => {
                let extract_timeout =
                    Duration::from_millis(engram.config.orchestrator.extractor_timeout_ms);
                match tokio::time::timeout(
                    extract_timeout,
                    extractor.extract(&request.user_message, &request.agent_response),
                )
                .await
                {
                    Err(_) => {
                        let e = EngramError::Extractor(format!(
                            "extraction timed out after {}ms",
                            extract_timeout.as_millis()
                        ));
                        warn!("{e}");
                        events.emit_error(OrchestrationLayer::Facts, started, &e);
                    }
                    Ok(Err(e)) => {
                        warn!("fact extraction failed: {e}");
                        events.emit_error(OrchestrationLayer::Facts, started, &e);
                    }
                    Ok(Ok(list)) => extracted = Some(list),
                }
            }
        }
    }

    if let Some(list) = extracted {
        if list.is_empty() {
            events.emit_data(
                OrchestrationLayer::Facts,
                LayerStatus::Complete,
                started,
                serde_json::json!({ "factCount": 0 }),
            );
        }
        for extracted_fact in list {
            let revision_started = Instant::now();
            let input = NewFact::from_extracted(
                extracted_fact,
                FactSourceRef {
                    conversation_id: Some(conversation_id.clone()),
                    message_id: Some(user_appended.message.id.clone()),
                    memory_id: created.memory_ids.first().cloned(),
                },
            );
            match engram.revision.store_fact(&request.memory_space_id, input).await {
                Ok(decision) => {
                    if matches!(decision.action, RevisionAction::Add | RevisionAction::Supersede) {
                        created.fact_ids.push(decision.fact_id.clone());
                    }
                    events.emit_revision(revision_started, &decision);
                }
                Err(e) => {
                    // Soft: the turn is already durable in L1/L2.
                    warn!("belief revision failed: {e}");
                    events.emit_error(OrchestrationLayer::Facts, revision_started, &e);
                }
            }
        }
    }

    // ── graphMirror (soft) ──────────────────────────────────────────────────
    let started = Instant::now();
    match &engram.mirror {
        None => {
            events.emit(OrchestrationLayer::Graph, LayerStatus::Skipped, started);
        }
        Some(mirror) => {
            let result: EngramResult<()> = async {
                mirror.mirror_space(&space).await?;
                let refreshed = engram.storage.conversations().get(&conversation_id)?;
                mirror.mirror_conversation(&refreshed).await?;
                for memory_id in &created.memory_ids {
                    let memory = engram
                        .storage
                        .memories()
                        .get(&request.memory_space_id, memory_id)?;
                    mirror.mirror_memory(&memory).await?;
                }
                for fact_id in &created.fact_ids {
                    let fact = engram.storage.facts().get(&request.memory_space_id, fact_id)?;
                    mirror.mirror_fact(&fact).await?;
                }
                if let Some(context_id) = &request.context_id {
                    let context = engram
                        .storage
                        .contexts()
                        .get(&request.memory_space_id, context_id)?;
                    mirror.mirror_context(&context).await?;
                }
                mirror.mirror_a2a(&request.metadata).await?;
                Ok(())
            }
            .await;

            match result {
                Ok(()) => {
                    events.emit(OrchestrationLayer::Graph, LayerStatus::Complete, started);
                }
                Err(e) => {
                    warn!("graph mirror failed: {e}");
                    events.emit_error(OrchestrationLayer::Graph, started, &e);
                }
            }
        }
    }

    // ── complete ────────────────────────────────────────────────────────────
    let total_latency_ms = call_started.elapsed().as_millis() as u64;
    let complete = OrchestrationComplete {
        orchestration_id: orchestration_id.clone(),
        total_latency_ms,
        created: created.clone(),
    };
    engram.observers.emit_complete(&complete);

    Ok(RememberOutcome {
        orchestration_id,
        created,
        events: events.events,
        total_latency_ms,
    })
}
