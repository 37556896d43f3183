use async_trait::async_trait;

use crate::errors::EngramResult;
use crate::models::{ClassifierVerdict, Fact};

/// Pluggable belief-revision classifier (typically LLM-backed). The revision
/// engine validates the verdict — action in the closed set, `supersedes` a
/// subset of the presented matches — and falls back to the rule-based
/// classifier on anything invalid.
#[async_trait]
pub trait IRevisionClassifier: Send + Sync {
    async fn classify(
        &self,
        candidate: &Fact,
        matches: &[Fact],
    ) -> EngramResult<ClassifierVerdict>;
}
