//! Append-only worker registry.
//!
//! Every worker ever created is registered here and never removed, so repeated
//! triggers are additive and observable. Appends are serialized by a mutex;
//! readers take a consistent snapshot under the same mutex.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::worker::{ScenarioId, WorkerId, WorkerRecord, WorkerRole, WorkerSnapshot, WorkerState};

/// Registry of all workers across all invocations.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: Mutex<Vec<Arc<WorkerRecord>>>,
    next_id: AtomicU64,
}

impl WorkerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn workers(&self) -> MutexGuard<'_, Vec<Arc<WorkerRecord>>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers one invocation's workers.
    ///
    /// The workers are appended contiguously and in `roles` order, even when
    /// other invocations register concurrently.
    pub fn register_scenario(
        &self,
        scenario: ScenarioId,
        roles: &[WorkerRole],
    ) -> Vec<Arc<WorkerRecord>> {
        let mut workers = self.workers();
        let records: Vec<_> = roles
            .iter()
            .map(|&role| {
                let id = WorkerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
                Arc::new(WorkerRecord::new(id, scenario, role))
            })
            .collect();
        workers.extend(records.iter().cloned());
        records
    }

    /// Returns the number of workers ever registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.workers().len()
    }

    /// Returns `true` if no worker has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers().is_empty()
    }

    /// Returns a snapshot of every worker in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<WorkerSnapshot> {
        self.workers().iter().map(|w| w.snapshot()).collect()
    }

    /// Returns the records belonging to `scenario`.
    #[must_use]
    pub fn scenario(&self, scenario: ScenarioId) -> Vec<Arc<WorkerRecord>> {
        self.workers()
            .iter()
            .filter(|w| w.scenario() == scenario)
            .cloned()
            .collect()
    }

    /// Counts workers currently in `state`.
    #[must_use]
    pub fn count_in_state(&self, state: WorkerState) -> usize {
        self.workers().iter().filter(|w| w.state() == state).count()
    }
}
