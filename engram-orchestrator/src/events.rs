//! Observer hub: typed progress callbacks, registered per client instance.
//! Emission is synchronous and best-effort; an observer can never stall an
//! orchestration.

use std::sync::{Arc, RwLock};

use engram_core::models::{LayerUpdate, OrchestrationComplete};
use engram_core::traits::IOrchestrationObserver;

#[derive(Clone, Default)]
pub struct ObserverHub {
    observers: Arc<RwLock<Vec<Arc<dyn IOrchestrationObserver>>>>,
}

impl ObserverHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, observer: Arc<dyn IOrchestrationObserver>) {
        if let Ok(mut observers) = self.observers.write() {
            observers.push(observer);
        }
    }

    pub fn emit_start(&self, orchestration_id: &str) {
        if let Ok(observers) = self.observers.read() {
            for observer in observers.iter() {
                observer.on_orchestration_start(orchestration_id);
            }
        }
    }

    pub fn emit_update(&self, update: &LayerUpdate) {
        if let Ok(observers) = self.observers.read() {
            for observer in observers.iter() {
                observer.on_layer_update(update);
            }
        }
    }

    pub fn emit_complete(&self, complete: &OrchestrationComplete) {
        if let Ok(observers) = self.observers.read() {
            for observer in observers.iter() {
                observer.on_orchestration_complete(complete);
            }
        }
    }
}
