use async_trait::async_trait;

use crate::errors::EngramResult;
use crate::models::ExtractedFact;

/// Opaque LLM-backed fact extraction. Failures here are soft: the
/// orchestrator reports a `facts` layer error and keeps going.
#[async_trait]
pub trait IFactExtractor: Send + Sync {
    async fn extract(
        &self,
        user_message: &str,
        agent_response: &str,
    ) -> EngramResult<Vec<ExtractedFact>>;
}
