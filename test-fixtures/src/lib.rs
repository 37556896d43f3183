//! Shared builders and stub collaborators for integration tests: a
//! deterministic embedder, scriptable extractor and classifier, and a
//! recording observer.

use std::sync::Mutex;

use async_trait::async_trait;

use engram_core::errors::EngramResult;
use engram_core::models::{
    ClassifierVerdict, ExtractedFact, Fact, FactType, LayerUpdate, NewFact, OrchestrationComplete,
    RememberRequest,
};
use engram_core::traits::{
    IEmbeddingProvider, IFactExtractor, IOrchestrationObserver, IRevisionClassifier,
};
use engram_core::EngramError;

/// Install a test subscriber honoring RUST_LOG. Safe to call repeatedly.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Deterministic embedder: hashes the text into a fixed-dimension unit-free
/// vector. Identical text always embeds identically.
pub struct HashEmbedder {
    pub dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl IEmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> EngramResult<Vec<f32>> {
        let hash = blake3::hash(text.as_bytes());
        let bytes = hash.as_bytes();
        Ok((0..self.dimension)
            .map(|i| (bytes[i % 32] as f32 / 255.0) * 2.0 - 1.0)
            .collect())
    }
}

/// Embedder returning a fixed vector regardless of input.
pub struct FixedEmbedder {
    pub vector: Vec<f32>,
}

#[async_trait]
impl IEmbeddingProvider for FixedEmbedder {
    async fn embed(&self, _text: &str) -> EngramResult<Vec<f32>> {
        Ok(self.vector.clone())
    }
}

/// Extractor that returns a pre-scripted fact list on every call.
#[derive(Default)]
pub struct StaticExtractor {
    pub facts: Vec<ExtractedFact>,
}

#[async_trait]
impl IFactExtractor for StaticExtractor {
    async fn extract(&self, _user: &str, _agent: &str) -> EngramResult<Vec<ExtractedFact>> {
        Ok(self.facts.clone())
    }
}

/// Extractor that always fails, for soft-failure isolation tests.
pub struct FailingExtractor;

#[async_trait]
impl IFactExtractor for FailingExtractor {
    async fn extract(&self, _user: &str, _agent: &str) -> EngramResult<Vec<ExtractedFact>> {
        Err(EngramError::Extractor("extractor exploded".into()))
    }
}

/// Classifier returning a fixed verdict, valid or not.
pub struct StaticClassifier {
    pub verdict: ClassifierVerdict,
}

#[async_trait]
impl IRevisionClassifier for StaticClassifier {
    async fn classify(&self, _candidate: &Fact, _matches: &[Fact]) -> EngramResult<ClassifierVerdict> {
        Ok(self.verdict.clone())
    }
}

/// Observer that records everything it sees.
#[derive(Default)]
pub struct RecordingObserver {
    pub starts: Mutex<Vec<String>>,
    pub updates: Mutex<Vec<LayerUpdate>>,
    pub completions: Mutex<Vec<OrchestrationComplete>>,
}

impl IOrchestrationObserver for RecordingObserver {
    fn on_orchestration_start(&self, orchestration_id: &str) {
        self.starts.lock().unwrap().push(orchestration_id.to_string());
    }

    fn on_layer_update(&self, update: &LayerUpdate) {
        self.updates.lock().unwrap().push(update.clone());
    }

    fn on_orchestration_complete(&self, complete: &OrchestrationComplete) {
        self.completions.lock().unwrap().push(complete.clone());
    }
}

pub fn remember_request(space: &str, user: &str, message: &str, response: &str) -> RememberRequest {
    RememberRequest {
        memory_space_id: space.to_string(),
        user_id: user.to_string(),
        user_name: Some(user.to_string()),
        agent_id: "agent-1".to_string(),
        agent_name: Some("Agent One".to_string()),
        user_message: message.to_string(),
        agent_response: response.to_string(),
        metadata: serde_json::Value::Null,
        ..Default::default()
    }
}

pub fn preference_fact(subject: &str, predicate: &str, object: &str, confidence: u8) -> NewFact {
    NewFact {
        fact: format!("{subject} {predicate} {object}"),
        fact_type: FactType::Preference,
        subject: Some(subject.to_string()),
        predicate: Some(predicate.to_string()),
        object: Some(object.to_string()),
        confidence,
        source_type: "manual".to_string(),
        ..Default::default()
    }
}

pub fn extracted_preference(
    subject: &str,
    predicate: &str,
    object: &str,
    confidence: u8,
) -> ExtractedFact {
    ExtractedFact {
        fact: format!("{subject} {predicate} {object}"),
        fact_type: FactType::Preference,
        subject: Some(subject.to_string()),
        predicate: Some(predicate.to_string()),
        object: Some(object.to_string()),
        confidence,
        ..Default::default()
    }
}
