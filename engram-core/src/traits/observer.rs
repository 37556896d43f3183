use crate::models::{LayerUpdate, OrchestrationComplete};

/// Typed progress callbacks per client instance. Called synchronously from
/// the orchestrating task; implementations must not block. Observer failures
/// never stall forward progress.
pub trait IOrchestrationObserver: Send + Sync {
    fn on_orchestration_start(&self, orchestration_id: &str) {
        let _ = orchestration_id;
    }

    fn on_layer_update(&self, update: &LayerUpdate) {
        let _ = update;
    }

    fn on_orchestration_complete(&self, complete: &OrchestrationComplete) {
        let _ = complete;
    }
}
