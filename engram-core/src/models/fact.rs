use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FactType {
    #[default]
    Knowledge,
    Preference,
    Relationship,
    Event,
    Rule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FactStatus {
    #[default]
    Active,
    Superseded,
    Duplicate,
    Retracted,
}

/// Named typed fields used for slot matching. Typing rides on the JSON value.
pub type Slots = BTreeMap<String, serde_json::Value>;

/// Weak reference to where a fact came from.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FactSourceRef {
    pub conversation_id: Option<String>,
    pub message_id: Option<String>,
    pub memory_id: Option<String>,
}

/// L3 record: a structured belief.
///
/// Invariants: active facts form a DAG under `supersedes`; a superseded fact
/// keeps `superseded_by` pointing at an active fact; duplicates never appear
/// in default queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    pub fact_id: String,
    pub memory_space_id: String,
    /// Human-readable statement.
    pub fact: String,
    pub fact_type: FactType,
    pub subject: Option<String>,
    pub predicate: Option<String>,
    pub object: Option<String>,
    #[serde(default)]
    pub slots: Slots,
    /// Belief strength in [0, 100].
    pub confidence: u8,
    pub source_type: String,
    pub source_ref: Option<FactSourceRef>,
    pub tags: Vec<String>,
    pub status: FactStatus,
    #[serde(default)]
    pub supersedes: Vec<String>,
    pub superseded_by: Option<String>,
    pub created_at: i64,
}

/// Input for `facts.store`; the engine mints the id and runs belief revision
/// before commit.
#[derive(Debug, Clone, Default)]
pub struct NewFact {
    pub fact: String,
    pub fact_type: FactType,
    pub subject: Option<String>,
    pub predicate: Option<String>,
    pub object: Option<String>,
    pub slots: Slots,
    pub confidence: u8,
    pub source_type: String,
    pub source_ref: Option<FactSourceRef>,
    pub tags: Vec<String>,
}

/// A belief produced by the external extractor, before the orchestrator
/// attaches provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedFact {
    pub fact: String,
    #[serde(default)]
    pub fact_type: FactType,
    pub subject: Option<String>,
    pub predicate: Option<String>,
    pub object: Option<String>,
    #[serde(default)]
    pub slots: Slots,
    #[serde(default = "default_confidence")]
    pub confidence: u8,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_confidence() -> u8 {
    50
}

impl Default for ExtractedFact {
    fn default() -> Self {
        Self {
            fact: String::new(),
            fact_type: FactType::default(),
            subject: None,
            predicate: None,
            object: None,
            slots: Slots::default(),
            confidence: default_confidence(),
            tags: Vec::new(),
        }
    }
}

impl NewFact {
    pub fn from_extracted(extracted: ExtractedFact, source_ref: FactSourceRef) -> Self {
        Self {
            fact: extracted.fact,
            fact_type: extracted.fact_type,
            subject: extracted.subject,
            predicate: extracted.predicate,
            object: extracted.object,
            slots: extracted.slots,
            confidence: extracted.confidence.min(100),
            source_type: "conversation".to_string(),
            source_ref: Some(source_ref),
            tags: extracted.tags,
        }
    }
}

/// Structured query over facts. `status = None` means active-only, the
/// default read path.
#[derive(Debug, Clone, Default)]
pub struct FactQuery {
    pub subject: Option<String>,
    pub predicate: Option<String>,
    pub object: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<FactStatus>,
    pub limit: Option<usize>,
}

/// Outcome of classifying one candidate against existing beliefs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RevisionAction {
    Add,
    Update,
    Supersede,
    None,
}

/// Committed belief-revision decision, emitted as a `facts` layer event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionDecision {
    pub action: RevisionAction,
    /// The surviving fact id: the new fact for ADD/SUPERSEDE, the merged
    /// fact for UPDATE, the pre-existing active fact for NONE.
    pub fact_id: String,
    pub superseded: Vec<String>,
}

/// Raw output of a pluggable (possibly LLM-backed) classifier. The engine
/// validates `action` against the closed set and `supersedes` against the
/// actual match set before trusting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierVerdict {
    pub action: String,
    #[serde(default)]
    pub supersedes: Vec<String>,
}
