//! Per-space admission: a FIFO semaphore caps inflight orchestrations and a
//! bounded wait queue sheds load as `Overloaded`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use engram_core::errors::EngramResult;
use engram_core::EngramError;

struct SpaceGate {
    semaphore: Arc<Semaphore>,
    queued: AtomicUsize,
}

pub struct AdmissionController {
    gates: DashMap<String, Arc<SpaceGate>>,
    inflight_per_space: usize,
    queue_depth: usize,
}

/// Held for the duration of one orchestration; dropping it admits the next
/// waiter.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionController {
    pub fn new(inflight_per_space: usize, queue_depth: usize) -> Self {
        Self {
            gates: DashMap::new(),
            inflight_per_space: inflight_per_space.max(1),
            queue_depth,
        }
    }

    fn gate(&self, memory_space_id: &str) -> Arc<SpaceGate> {
        self.gates
            .entry(memory_space_id.to_string())
            .or_insert_with(|| {
                Arc::new(SpaceGate {
                    semaphore: Arc::new(Semaphore::new(self.inflight_per_space)),
                    queued: AtomicUsize::new(0),
                })
            })
            .clone()
    }

    /// Admit immediately when under the inflight cap, otherwise wait FIFO.
    /// Fails `Overloaded` when the wait queue is already full.
    pub async fn acquire(&self, memory_space_id: &str) -> EngramResult<AdmissionPermit> {
        let gate = self.gate(memory_space_id);

        if let Ok(permit) = Arc::clone(&gate.semaphore).try_acquire_owned() {
            return Ok(AdmissionPermit { _permit: permit });
        }

        let waiting = gate.queued.fetch_add(1, Ordering::SeqCst);
        if waiting >= self.queue_depth {
            gate.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(EngramError::Overloaded {
                memory_space_id: memory_space_id.to_string(),
            });
        }

        let acquired = Arc::clone(&gate.semaphore).acquire_owned().await;
        gate.queued.fetch_sub(1, Ordering::SeqCst);
        let permit = acquired.map_err(|_| EngramError::Overloaded {
            memory_space_id: memory_space_id.to_string(),
        })?;
        Ok(AdmissionPermit { _permit: permit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_up_to_inflight_cap() {
        let controller = AdmissionController::new(2, 0);
        let _a = controller.acquire("s1").await.unwrap();
        let _b = controller.acquire("s1").await.unwrap();
        // Queue depth 0: the third caller is shed immediately.
        let err = controller.acquire("s1").await.unwrap_err();
        assert!(matches!(err, EngramError::Overloaded { .. }));
    }

    #[tokio::test]
    async fn spaces_are_isolated() {
        let controller = AdmissionController::new(1, 0);
        let _a = controller.acquire("s1").await.unwrap();
        assert!(controller.acquire("s2").await.is_ok());
    }

    #[tokio::test]
    async fn released_permit_readmits() {
        let controller = AdmissionController::new(1, 0);
        let permit = controller.acquire("s1").await.unwrap();
        drop(permit);
        assert!(controller.acquire("s1").await.is_ok());
    }
}
