mod agent;
mod context;
mod conversation;
mod fact;
mod memory;
mod memory_space;
mod orchestration;
mod participant;
mod recall;
mod user;

pub use agent::Agent;
pub use context::Context;
pub use conversation::{
    Conversation, ConversationParticipants, ConversationType, Message, MessageRole,
};
pub use fact::{
    ClassifierVerdict, ExtractedFact, Fact, FactQuery, FactSourceRef, FactStatus, FactType,
    NewFact, RevisionAction, RevisionDecision, Slots,
};
pub use memory::{
    ContentType, ConversationRef, MemoryPatch, MemoryRecord, MemorySource, NewMemory,
};
pub use memory_space::{MemorySpace, SpaceType};
pub use orchestration::{
    CreatedIds, ForgetOptions, ForgetSummary, LayerStatus, LayerUpdate, OrchestrationComplete,
    OrchestrationLayer, RememberRequest,
};
pub use participant::{Participant, ParticipantKind};
pub use recall::{
    HitLayer, RecallFilters, RecallHit, RecallPayload, RecallRequest, RecallResponse,
    RecallSourceKind, RecallSources, SourceFailure,
};
pub use user::User;
