//! Layer store handles: thin typed facades over the query modules, sharing
//! the engine's pool. Space-scoped operations verify the target row belongs
//! to the requested space and fail `IsolationViolation` otherwise.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use engram_core::config::EngramConfig;
use engram_core::errors::{EngramResult, StorageError};
use engram_core::models::{
    Agent, Context, Conversation, ConversationParticipants, ConversationType, Fact, FactQuery,
    FactStatus, MemoryPatch, MemoryRecord, MemorySpace, Message, MessageRole, NewMemory,
    Participant, ParticipantKind, RecallFilters, SpaceType, User,
};
use engram_core::{mint_id, now_ms, EngramError};

use crate::pool::Pool;
use crate::queries::{
    context_ops, conversation_ops, fact_ops, memory_ops, memory_search, registry_ops, space_ops,
    state_ops, vector_search,
};

fn require(field: &'static str, value: &str) -> EngramResult<()> {
    if value.trim().is_empty() {
        return Err(EngramError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

// ─── Memory spaces ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct SpacesStore {
    pub(crate) pool: Arc<Pool>,
}

impl SpacesStore {
    /// Idempotent registration: an existing space is returned unchanged.
    pub fn register(
        &self,
        memory_space_id: &str,
        name: &str,
        space_type: SpaceType,
        owner_user_id: Option<String>,
    ) -> EngramResult<MemorySpace> {
        require("memorySpaceId", memory_space_id)?;
        require("name", name)?;
        self.pool.writer.with_txn(|conn| {
            if let Some(existing) = space_ops::get_space(conn, memory_space_id)? {
                return Ok(existing);
            }
            let space = MemorySpace {
                memory_space_id: memory_space_id.to_string(),
                name: name.to_string(),
                space_type,
                owner_user_id: owner_user_id.clone(),
                embedding_dimension: None,
                created_at: now_ms(),
            };
            space_ops::insert_space(conn, &space)?;
            Ok(space)
        })
    }

    /// Like `register`, but reports whether the space was created.
    pub fn ensure(
        &self,
        memory_space_id: &str,
        name: &str,
        space_type: SpaceType,
        owner_user_id: Option<String>,
    ) -> EngramResult<(MemorySpace, bool)> {
        require("memorySpaceId", memory_space_id)?;
        self.pool.writer.with_txn(|conn| {
            if let Some(existing) = space_ops::get_space(conn, memory_space_id)? {
                return Ok((existing, false));
            }
            let space = MemorySpace {
                memory_space_id: memory_space_id.to_string(),
                name: name.to_string(),
                space_type,
                owner_user_id: owner_user_id.clone(),
                embedding_dimension: None,
                created_at: now_ms(),
            };
            space_ops::insert_space(conn, &space)?;
            Ok((space, true))
        })
    }

    pub fn get(&self, memory_space_id: &str) -> EngramResult<MemorySpace> {
        self.pool.readers.with_conn(|conn| {
            space_ops::get_space(conn, memory_space_id)?
                .ok_or_else(|| EngramError::not_found("memory_space", memory_space_id))
        })
    }

    pub fn exists(&self, memory_space_id: &str) -> EngramResult<bool> {
        self.pool
            .readers
            .with_conn(|conn| Ok(space_ops::get_space(conn, memory_space_id)?.is_some()))
    }

    pub fn list(&self) -> EngramResult<Vec<MemorySpace>> {
        self.pool.readers.with_conn(space_ops::list_spaces)
    }

    pub fn list_owned_by(&self, user_id: &str) -> EngramResult<Vec<MemorySpace>> {
        self.pool
            .readers
            .with_conn(|conn| space_ops::list_spaces_owned_by(conn, user_id))
    }

    /// Remove the bare registry row. Layer contents are the forget
    /// orchestration's responsibility.
    pub fn delete(&self, memory_space_id: &str) -> EngramResult<usize> {
        self.pool
            .writer
            .with_txn(|conn| space_ops::delete_space(conn, memory_space_id))
    }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct UsersStore {
    pub(crate) pool: Arc<Pool>,
}

impl UsersStore {
    pub fn create(
        &self,
        user_id: &str,
        display_name: Option<String>,
        email: Option<String>,
        metadata: serde_json::Value,
    ) -> EngramResult<User> {
        require("userId", user_id)?;
        let user = User {
            user_id: user_id.to_string(),
            display_name,
            email,
            metadata,
            created_at: now_ms(),
        };
        self.pool.writer.with_txn(|conn| {
            if registry_ops::get_user(conn, user_id)?.is_some() {
                return Err(EngramError::Conflict(format!("user {user_id} already exists")));
            }
            registry_ops::insert_user(conn, &user)?;
            Ok(())
        })?;
        Ok(user)
    }

    /// Get-or-create, used by the orchestrator's idempotent user check.
    /// The boolean reports whether the user was created.
    pub fn ensure(
        &self,
        user_id: &str,
        display_name: Option<String>,
    ) -> EngramResult<(User, bool)> {
        require("userId", user_id)?;
        self.pool.writer.with_txn(|conn| {
            if let Some(existing) = registry_ops::get_user(conn, user_id)? {
                return Ok((existing, false));
            }
            let user = User {
                user_id: user_id.to_string(),
                display_name: display_name.clone(),
                email: None,
                metadata: serde_json::Value::Object(Default::default()),
                created_at: now_ms(),
            };
            registry_ops::insert_user(conn, &user)?;
            Ok((user, true))
        })
    }

    pub fn get(&self, user_id: &str) -> EngramResult<User> {
        self.pool.readers.with_conn(|conn| {
            registry_ops::get_user(conn, user_id)?
                .ok_or_else(|| EngramError::not_found("user", user_id))
        })
    }

    pub fn update(&self, user: &User) -> EngramResult<()> {
        self.pool.writer.with_txn(|conn| {
            if registry_ops::update_user(conn, user)? == 0 {
                return Err(EngramError::not_found("user", user.user_id.clone()));
            }
            Ok(())
        })
    }

    pub fn exists(&self, user_id: &str) -> EngramResult<bool> {
        self.pool
            .readers
            .with_conn(|conn| Ok(registry_ops::get_user(conn, user_id)?.is_some()))
    }

    /// Remove the registry row and clear weak references across spaces.
    /// Owned-space cascading happens in the forget orchestration.
    pub fn delete(&self, user_id: &str) -> EngramResult<usize> {
        self.pool.writer.with_txn(|conn| {
            registry_ops::clear_user_references(conn, user_id)?;
            registry_ops::delete_user(conn, user_id)
        })
    }
}

// ─── Agents ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AgentsStore {
    pub(crate) pool: Arc<Pool>,
}

impl AgentsStore {
    /// Idempotent registration by agent id.
    pub fn register(
        &self,
        agent_id: &str,
        name: &str,
        capabilities: Vec<String>,
        provider: Option<String>,
    ) -> EngramResult<Agent> {
        self.ensure(agent_id, name, capabilities, provider).map(|(agent, _)| agent)
    }

    /// Like `register`, but reports whether the agent was created.
    pub fn ensure(
        &self,
        agent_id: &str,
        name: &str,
        capabilities: Vec<String>,
        provider: Option<String>,
    ) -> EngramResult<(Agent, bool)> {
        require("agentId", agent_id)?;
        self.pool.writer.with_txn(|conn| {
            if let Some(existing) = registry_ops::get_agent(conn, agent_id)? {
                return Ok((existing, false));
            }
            let agent = Agent {
                agent_id: agent_id.to_string(),
                name: name.to_string(),
                capabilities: capabilities.clone(),
                provider: provider.clone(),
                registered_at: now_ms(),
            };
            registry_ops::insert_agent(conn, &agent)?;
            Ok((agent, true))
        })
    }

    pub fn get(&self, agent_id: &str) -> EngramResult<Agent> {
        self.pool.readers.with_conn(|conn| {
            registry_ops::get_agent(conn, agent_id)?
                .ok_or_else(|| EngramError::not_found("agent", agent_id))
        })
    }

    pub fn list(&self) -> EngramResult<Vec<Agent>> {
        self.pool.readers.with_conn(registry_ops::list_agents)
    }

    pub fn unregister(&self, agent_id: &str) -> EngramResult<()> {
        self.pool.writer.with_txn(|conn| {
            if registry_ops::delete_agent(conn, agent_id)? == 0 {
                return Err(EngramError::not_found("agent", agent_id));
            }
            Ok(())
        })
    }
}

// ─── Participants ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct ParticipantsStore {
    pub(crate) pool: Arc<Pool>,
}

impl ParticipantsStore {
    pub fn create(
        &self,
        memory_space_id: &str,
        kind: ParticipantKind,
        subject_id: &str,
        role: &str,
    ) -> EngramResult<Participant> {
        require("subjectId", subject_id)?;
        require("role", role)?;
        let participant = Participant {
            participant_id: mint_id("part"),
            memory_space_id: memory_space_id.to_string(),
            kind,
            subject_id: subject_id.to_string(),
            role: role.to_string(),
            created_at: now_ms(),
        };
        self.pool.writer.with_txn(|conn| {
            if space_ops::get_space(conn, memory_space_id)?.is_none() {
                return Err(EngramError::not_found("memory_space", memory_space_id));
            }
            registry_ops::insert_participant(conn, &participant)
        })?;
        Ok(participant)
    }

    pub fn get(&self, participant_id: &str) -> EngramResult<Participant> {
        self.pool.readers.with_conn(|conn| {
            registry_ops::get_participant(conn, participant_id)?
                .ok_or_else(|| EngramError::not_found("participant", participant_id))
        })
    }

    pub fn list(&self, memory_space_id: &str) -> EngramResult<Vec<Participant>> {
        self.pool
            .readers
            .with_conn(|conn| registry_ops::list_participants(conn, memory_space_id))
    }

    pub fn delete_in_space(&self, memory_space_id: &str) -> EngramResult<usize> {
        self.pool
            .writer
            .with_txn(|conn| registry_ops::delete_participants_in_space(conn, memory_space_id))
    }
}

// ─── Conversations (L1a) ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct ConversationsStore {
    pub(crate) pool: Arc<Pool>,
    pub(crate) config: EngramConfig,
}

impl ConversationsStore {
    pub fn create(
        &self,
        memory_space_id: &str,
        conversation_type: ConversationType,
        participants: ConversationParticipants,
    ) -> EngramResult<Conversation> {
        let now = now_ms();
        let conversation = Conversation {
            conversation_id: mint_id("conv"),
            memory_space_id: memory_space_id.to_string(),
            conversation_type,
            participants,
            messages: Vec::new(),
            message_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.pool.writer.with_txn(|conn| {
            if space_ops::get_space(conn, memory_space_id)?.is_none() {
                return Err(EngramError::not_found("memory_space", memory_space_id));
            }
            conversation_ops::insert_conversation(conn, &conversation)
        })?;
        Ok(conversation)
    }

    pub fn get(&self, conversation_id: &str) -> EngramResult<Conversation> {
        self.pool.readers.with_conn(|conn| {
            conversation_ops::get_conversation(conn, conversation_id)?
                .ok_or_else(|| EngramError::not_found("conversation", conversation_id))
        })
    }

    /// Append with conflict retry: position races surface as uniqueness
    /// violations and are retried with exponential backoff before giving up
    /// as `TransientStorage`.
    pub fn add_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
        timestamp: Option<i64>,
        dedup_key: Option<String>,
    ) -> EngramResult<conversation_ops::AppendOutcome> {
        let message = Message {
            id: mint_id("msg"),
            role,
            content: content.to_string(),
            timestamp: timestamp.unwrap_or_else(now_ms),
            dedup_key,
        };

        let retries = self.config.storage.conflict_retries.max(1);
        let mut backoff = Duration::from_millis(self.config.storage.conflict_backoff_ms);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = self.pool.writer.with_txn(|conn| {
                if conversation_ops::get_conversation(conn, conversation_id)?.is_none() {
                    return Err(EngramError::not_found("conversation", conversation_id));
                }
                conversation_ops::append_message(conn, conversation_id, &message)
            });

            match result {
                Err(EngramError::Storage(StorageError::WriteConflict { .. })) if attempt < retries => {
                    debug!(conversation_id, attempt, "message append conflict, retrying");
                    std::thread::sleep(backoff);
                    backoff *= 2;
                }
                Err(EngramError::Storage(StorageError::WriteConflict { .. })) => {
                    warn!(conversation_id, attempt, "message append conflict retries exhausted");
                    return Err(EngramError::TransientStorage {
                        attempts: attempt,
                        message: format!("append to conversation {conversation_id} kept conflicting"),
                    });
                }
                other => return other,
            }
        }
    }

    /// Append a user turn and the answering agent turn atomically: both
    /// messages land in one transaction or neither does. Same conflict
    /// retry policy as `add_message`.
    #[allow(clippy::type_complexity)]
    pub fn append_turn(
        &self,
        conversation_id: &str,
        user_message: (&str, i64, Option<String>),
        agent_message: (&str, i64, Option<String>),
    ) -> EngramResult<(conversation_ops::AppendOutcome, conversation_ops::AppendOutcome)> {
        let user = Message {
            id: mint_id("msg"),
            role: MessageRole::User,
            content: user_message.0.to_string(),
            timestamp: user_message.1,
            dedup_key: user_message.2,
        };
        let agent = Message {
            id: mint_id("msg"),
            role: MessageRole::Agent,
            content: agent_message.0.to_string(),
            timestamp: agent_message.1,
            dedup_key: agent_message.2,
        };

        let retries = self.config.storage.conflict_retries.max(1);
        let mut backoff = Duration::from_millis(self.config.storage.conflict_backoff_ms);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = self.pool.writer.with_txn(|conn| {
                if conversation_ops::get_conversation(conn, conversation_id)?.is_none() {
                    return Err(EngramError::not_found("conversation", conversation_id));
                }
                let first = conversation_ops::append_message(conn, conversation_id, &user)?;
                let second = conversation_ops::append_message(conn, conversation_id, &agent)?;
                Ok((first, second))
            });

            match result {
                Err(EngramError::Storage(StorageError::WriteConflict { .. })) if attempt < retries => {
                    debug!(conversation_id, attempt, "turn append conflict, retrying");
                    std::thread::sleep(backoff);
                    backoff *= 2;
                }
                Err(EngramError::Storage(StorageError::WriteConflict { .. })) => {
                    return Err(EngramError::TransientStorage {
                        attempts: attempt,
                        message: format!("append to conversation {conversation_id} kept conflicting"),
                    });
                }
                other => return other,
            }
        }
    }

    pub fn list_in_space(&self, memory_space_id: &str) -> EngramResult<Vec<String>> {
        self.pool
            .readers
            .with_conn(|conn| conversation_ops::list_conversations_in_space(conn, memory_space_id))
    }

    /// Cascade: clears conversation refs on memories and facts, then removes
    /// the conversation and its messages.
    pub fn delete(&self, conversation_id: &str) -> EngramResult<usize> {
        self.pool.writer.with_txn(|conn| {
            let deleted = conversation_ops::delete_conversation(conn, conversation_id)?;
            if deleted == 0 {
                return Err(EngramError::not_found("conversation", conversation_id));
            }
            Ok(deleted)
        })
    }
}

// ─── Vector memories (L2) ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MemoriesStore {
    pub(crate) pool: Arc<Pool>,
    pub(crate) config: EngramConfig,
}

impl MemoriesStore {
    /// Store a record, fixing the space embedding dimension on first use.
    pub fn store(&self, memory_space_id: &str, input: NewMemory) -> EngramResult<MemoryRecord> {
        require("content", &input.content)?;
        let memory = MemoryRecord {
            memory_id: mint_id("mem"),
            memory_space_id: memory_space_id.to_string(),
            content: input.content,
            content_type: input.content_type,
            embedding: input.embedding,
            user_id: input.user_id,
            source: input.source,
            conversation_ref: input.conversation_ref,
            tags: input.tags,
            importance: input.importance.min(100),
            created_at: now_ms(),
            version: 1,
            archived_at: None,
        };

        self.pool.writer.with_txn(|conn| {
            let space = space_ops::get_space(conn, memory_space_id)?
                .ok_or_else(|| EngramError::not_found("memory_space", memory_space_id))?;

            if let Some(embedding) = &memory.embedding {
                match space.embedding_dimension {
                    Some(expected) if expected != embedding.len() => {
                        return Err(EngramError::EmbeddingShape {
                            memory_space_id: memory_space_id.to_string(),
                            expected,
                            actual: embedding.len(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        space_ops::set_embedding_dimension(conn, memory_space_id, embedding.len())?
                    }
                }
            }

            memory_ops::insert_memory(conn, &memory)
        })?;
        Ok(memory)
    }

    pub fn get(&self, memory_space_id: &str, memory_id: &str) -> EngramResult<MemoryRecord> {
        self.pool.readers.with_conn(|conn| {
            let memory = memory_ops::get_live(conn, memory_id)?
                .ok_or_else(|| EngramError::not_found("memory", memory_id))?;
            check_space("memory", memory_id, &memory.memory_space_id, memory_space_id)?;
            Ok(memory)
        })
    }

    pub fn list(&self, memory_space_id: &str, limit: usize) -> EngramResult<Vec<MemoryRecord>> {
        self.pool
            .readers
            .with_conn(|conn| memory_ops::list_memories(conn, memory_space_id, limit))
    }

    /// Versioned update; the previous version is archived and retention is
    /// enforced against the configured cap.
    pub fn update(
        &self,
        memory_space_id: &str,
        memory_id: &str,
        patch: MemoryPatch,
    ) -> EngramResult<MemoryRecord> {
        let cap = self.config.limits.versions_per_memory;
        self.pool.writer.with_txn(|conn| {
            let current = memory_ops::get_live(conn, memory_id)?
                .ok_or_else(|| EngramError::not_found("memory", memory_id))?;
            check_space("memory", memory_id, &current.memory_space_id, memory_space_id)?;

            if let Some(Some(embedding)) = &patch.embedding {
                let space = space_ops::get_space(conn, memory_space_id)?
                    .ok_or_else(|| EngramError::not_found("memory_space", memory_space_id))?;
                if let Some(expected) = space.embedding_dimension {
                    if expected != embedding.len() {
                        return Err(EngramError::EmbeddingShape {
                            memory_space_id: memory_space_id.to_string(),
                            expected,
                            actual: embedding.len(),
                        });
                    }
                }
            }

            memory_ops::update_memory(conn, &current, &patch, cap)
        })
    }

    /// Remove the live row and all archived versions. With `cascade`, facts
    /// sourced from this memory go too. Returns (memories, facts) removed.
    pub fn delete(
        &self,
        memory_space_id: &str,
        memory_id: &str,
        cascade: bool,
    ) -> EngramResult<(usize, usize)> {
        self.pool.writer.with_txn(|conn| {
            let current = memory_ops::get_live(conn, memory_id)?
                .ok_or_else(|| EngramError::not_found("memory", memory_id))?;
            check_space("memory", memory_id, &current.memory_space_id, memory_space_id)?;

            let memories = memory_ops::delete_memory(conn, memory_id)?;
            let facts = if cascade {
                fact_ops::delete_by_memory(conn, memory_id)?
            } else {
                0
            };
            Ok((memories, facts))
        })
    }

    pub fn vector_search(
        &self,
        memory_space_id: &str,
        query_embedding: &[f32],
        limit: usize,
        filters: &RecallFilters,
    ) -> EngramResult<Vec<vector_search::VectorHit>> {
        self.pool.readers.with_conn(|conn| {
            vector_search::knn_search(conn, memory_space_id, query_embedding, limit, filters)
        })
    }

    pub fn lexical_search(
        &self,
        memory_space_id: &str,
        query: &str,
        limit: usize,
        filters: &RecallFilters,
    ) -> EngramResult<Vec<memory_search::LexicalHit>> {
        self.pool.readers.with_conn(|conn| {
            memory_search::search_memories(conn, memory_space_id, query, limit, filters)
        })
    }

    /// Archive the live version in place (archive-only forget).
    pub fn archive(&self, memory_space_id: &str, memory_id: &str) -> EngramResult<usize> {
        self.pool.writer.with_txn(|conn| {
            let current = memory_ops::get_live(conn, memory_id)?
                .ok_or_else(|| EngramError::not_found("memory", memory_id))?;
            check_space("memory", memory_id, &current.memory_space_id, memory_space_id)?;
            memory_ops::archive_memory(conn, memory_id)
        })
    }

    pub fn list_by_conversations(
        &self,
        memory_space_id: &str,
        conversation_ids: &[String],
    ) -> EngramResult<Vec<MemoryRecord>> {
        self.pool.readers.with_conn(|conn| {
            memory_ops::list_by_conversations(conn, memory_space_id, conversation_ids)
        })
    }

    /// True when a memory already covers `(conversation, message)`; lets the
    /// idempotent remember path skip re-stores.
    pub fn exists_for_message(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> EngramResult<bool> {
        self.pool
            .readers
            .with_conn(|conn| memory_ops::exists_for_message(conn, conversation_id, message_id))
    }

    /// Delete every memory in a space; returns the live count removed.
    pub fn purge(&self, memory_space_id: &str) -> EngramResult<usize> {
        self.pool
            .writer
            .with_txn(|conn| memory_ops::purge_space(conn, memory_space_id))
    }
}

// ─── Facts (L3, raw storage — belief revision sits above) ────────────────────

#[derive(Clone)]
pub struct FactsStore {
    pub(crate) pool: Arc<Pool>,
}

impl FactsStore {
    /// Raw insert. The revision engine decides status and pointers first.
    pub fn insert(&self, fact: &Fact) -> EngramResult<()> {
        require("fact", &fact.fact)?;
        self.pool.writer.with_txn(|conn| {
            if space_ops::get_space(conn, &fact.memory_space_id)?.is_none() {
                return Err(EngramError::not_found(
                    "memory_space",
                    fact.memory_space_id.clone(),
                ));
            }
            fact_ops::insert_fact(conn, fact)
        })
    }

    pub fn get(&self, memory_space_id: &str, fact_id: &str) -> EngramResult<Fact> {
        self.pool.readers.with_conn(|conn| {
            let fact = fact_ops::get_fact(conn, fact_id)?
                .ok_or_else(|| EngramError::not_found("fact", fact_id))?;
            check_space("fact", fact_id, &fact.memory_space_id, memory_space_id)?;
            Ok(fact)
        })
    }

    pub fn list(
        &self,
        memory_space_id: &str,
        status: Option<FactStatus>,
        limit: usize,
    ) -> EngramResult<Vec<Fact>> {
        self.pool
            .readers
            .with_conn(|conn| fact_ops::list_facts(conn, memory_space_id, status, limit))
    }

    pub fn query(&self, memory_space_id: &str, query: &FactQuery) -> EngramResult<Vec<Fact>> {
        self.pool
            .readers
            .with_conn(|conn| fact_ops::query_facts(conn, memory_space_id, query))
    }

    pub fn search_text(
        &self,
        memory_space_id: &str,
        query: &str,
        limit: usize,
    ) -> EngramResult<Vec<memory_search::FactTextHit>> {
        self.pool.readers.with_conn(|conn| {
            memory_search::search_facts_text(conn, memory_space_id, query, limit)
        })
    }

    pub fn delete(&self, memory_space_id: &str, fact_id: &str) -> EngramResult<usize> {
        self.pool.writer.with_txn(|conn| {
            let fact = fact_ops::get_fact(conn, fact_id)?
                .ok_or_else(|| EngramError::not_found("fact", fact_id))?;
            check_space("fact", fact_id, &fact.memory_space_id, memory_space_id)?;
            fact_ops::delete_fact(conn, fact_id)
        })
    }

    /// Mark retracted without physical delete (archive-only forget).
    pub fn retract(&self, memory_space_id: &str, fact_id: &str) -> EngramResult<usize> {
        self.pool.writer.with_txn(|conn| {
            let fact = fact_ops::get_fact(conn, fact_id)?
                .ok_or_else(|| EngramError::not_found("fact", fact_id))?;
            check_space("fact", fact_id, &fact.memory_space_id, memory_space_id)?;
            fact_ops::retract_fact(conn, fact_id)
        })
    }

    pub fn list_by_conversations(
        &self,
        memory_space_id: &str,
        conversation_ids: &[String],
    ) -> EngramResult<Vec<Fact>> {
        self.pool.readers.with_conn(|conn| {
            fact_ops::list_by_conversations(conn, memory_space_id, conversation_ids)
        })
    }

    pub fn list_by_memory(&self, memory_id: &str) -> EngramResult<Vec<Fact>> {
        self.pool
            .readers
            .with_conn(|conn| fact_ops::list_by_memory(conn, memory_id))
    }

    /// Delete every fact in a space; returns the count removed.
    pub fn purge(&self, memory_space_id: &str) -> EngramResult<usize> {
        self.pool
            .writer
            .with_txn(|conn| fact_ops::purge_space(conn, memory_space_id))
    }
}

// ─── Contexts (L4) ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct ContextsStore {
    pub(crate) pool: Arc<Pool>,
    pub(crate) config: EngramConfig,
}

impl ContextsStore {
    pub fn create(
        &self,
        memory_space_id: &str,
        purpose: &str,
        parent_id: Option<String>,
        user_id: Option<String>,
        conversation_ref: Option<String>,
        metadata: serde_json::Value,
    ) -> EngramResult<Context> {
        require("purpose", purpose)?;
        let max_depth = self.config.limits.contexts_max_depth;

        self.pool.writer.with_txn(|conn| {
            if space_ops::get_space(conn, memory_space_id)?.is_none() {
                return Err(EngramError::not_found("memory_space", memory_space_id));
            }

            let depth = match &parent_id {
                None => 0,
                Some(parent_id) => {
                    let parent = context_ops::get_context(conn, parent_id)?
                        .ok_or_else(|| EngramError::not_found("context", parent_id.clone()))?;
                    check_space("context", parent_id, &parent.memory_space_id, memory_space_id)?;
                    let depth = parent.depth + 1;
                    if depth > max_depth {
                        return Err(EngramError::DependencyCycle(format!(
                            "context depth {depth} exceeds maximum {max_depth}"
                        )));
                    }
                    depth
                }
            };

            let context = Context {
                context_id: mint_id("ctx"),
                memory_space_id: memory_space_id.to_string(),
                purpose: purpose.to_string(),
                parent_id: parent_id.clone(),
                depth,
                child_ids: Vec::new(),
                user_id: user_id.clone(),
                conversation_ref: conversation_ref.clone(),
                metadata: metadata.clone(),
                created_at: now_ms(),
            };
            context_ops::insert_context(conn, &context)?;
            Ok(context)
        })
    }

    pub fn get(&self, memory_space_id: &str, context_id: &str) -> EngramResult<Context> {
        self.pool.readers.with_conn(|conn| {
            let context = context_ops::get_context(conn, context_id)?
                .ok_or_else(|| EngramError::not_found("context", context_id))?;
            check_space("context", context_id, &context.memory_space_id, memory_space_id)?;
            Ok(context)
        })
    }

    pub fn list(&self, memory_space_id: &str) -> EngramResult<Vec<Context>> {
        self.pool
            .readers
            .with_conn(|conn| context_ops::list_contexts(conn, memory_space_id))
    }

    /// Root → … → node.
    pub fn get_chain(&self, context_id: &str) -> EngramResult<Vec<Context>> {
        let max_depth = self.config.limits.contexts_max_depth;
        self.pool
            .readers
            .with_conn(|conn| context_ops::get_chain(conn, context_id, max_depth))
    }

    /// Breadth-first subtree, root included.
    pub fn traverse(&self, context_id: &str) -> EngramResult<Vec<Context>> {
        self.pool
            .readers
            .with_conn(|conn| context_ops::traverse(conn, context_id))
    }

    /// Delete the subtree rooted here, children first.
    pub fn delete(&self, memory_space_id: &str, context_id: &str) -> EngramResult<usize> {
        self.pool.writer.with_txn(|conn| {
            let context = context_ops::get_context(conn, context_id)?
                .ok_or_else(|| EngramError::not_found("context", context_id))?;
            check_space("context", context_id, &context.memory_space_id, memory_space_id)?;
            context_ops::delete_subtree(conn, context_id)
        })
    }

    /// Delete every context in a space; returns the count removed.
    pub fn purge(&self, memory_space_id: &str) -> EngramResult<usize> {
        self.pool
            .writer
            .with_txn(|conn| context_ops::purge_space(conn, memory_space_id))
    }
}

// ─── L1b/L1c state ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct StateStore {
    pub(crate) pool: Arc<Pool>,
}

impl StateStore {
    /// Content-addressed versioned put; identical content returns the
    /// existing version.
    pub fn put_document(
        &self,
        key: &str,
        content: &serde_json::Value,
    ) -> EngramResult<state_ops::DocumentVersion> {
        require("key", key)?;
        self.pool
            .writer
            .with_txn(|conn| state_ops::put_document(conn, key, content))
    }

    pub fn get_document(
        &self,
        key: &str,
        version: Option<u64>,
    ) -> EngramResult<Option<state_ops::DocumentVersion>> {
        self.pool
            .readers
            .with_conn(|conn| state_ops::get_document(conn, key, version))
    }

    /// Last-writer-wins set.
    pub fn set(&self, key: &str, value: &serde_json::Value) -> EngramResult<()> {
        require("key", key)?;
        self.pool
            .writer
            .with_conn_sync(|conn| state_ops::kv_set(conn, key, value))
    }

    pub fn get(&self, key: &str) -> EngramResult<Option<serde_json::Value>> {
        self.pool.readers.with_conn(|conn| state_ops::kv_get(conn, key))
    }

    pub fn remove(&self, key: &str) -> EngramResult<bool> {
        self.pool
            .writer
            .with_conn_sync(|conn| Ok(state_ops::kv_delete(conn, key)? > 0))
    }
}

pub(crate) fn check_space(
    entity: &'static str,
    id: &str,
    actual: &str,
    requested: &str,
) -> EngramResult<()> {
    if actual != requested {
        return Err(EngramError::IsolationViolation {
            entity,
            id: id.to_string(),
            requested: requested.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}
