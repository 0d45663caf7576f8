//! Scenario controller.
//!
//! Orchestrates worker creation, start order and timing so the intended
//! contention is reached deterministically rather than by luck.
//!
//! # Scenarios
//!
//! - **Blocking**: a HOLDER takes `blockingLock` and parks forever with it;
//!   a WAITER started after the HOLDER confirms (or after the grace period)
//!   blocks on the same lock forever.
//! - **Deadlock**: two participants take `lockA`/`lockB` in opposite order
//!   with a hold delay between acquisitions, producing circular wait.
//!
//! Every invocation is additive. Workers are never reaped, and later
//! invocations contend on the same locks as earlier ones.
//!
//! # Example
//!
//! ```rust,no_run
//! use threadlab_core::config::ScenarioConfig;
//! use threadlab_core::scenario::{ScenarioContext, ScenarioController};
//!
//! let controller = ScenarioController::new(ScenarioContext::new(), ScenarioConfig::default());
//! let ack = controller.start_deadlock_scenario();
//! println!("{}", ack.message());
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::{ScenarioConfig, StartOrdering};
use crate::registry::WorkerRegistry;
use crate::sync::{Latch, LockRegistry};
use crate::worker::roles::WorkerTask;
use crate::worker::{ScenarioId, WorkerId, WorkerRecord, WorkerRole, WorkerState};

/// Process-scoped shared state: the lock registry and the worker registry.
///
/// Built once at startup and handed to the controller. Clones share the same
/// locks and registry.
#[derive(Debug, Clone, Default)]
pub struct ScenarioContext {
    locks: Arc<LockRegistry>,
    workers: Arc<WorkerRegistry>,
}

impl ScenarioContext {
    /// Creates a context with free locks and an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared lock registry.
    #[must_use]
    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    /// Returns the worker registry.
    #[must_use]
    pub fn workers(&self) -> &WorkerRegistry {
        &self.workers
    }
}

/// The two reproducible pathologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Indefinite single-lock blocking.
    Blocking,
    /// Two-party circular-wait deadlock.
    Deadlock,
}

impl ScenarioKind {
    /// Returns the label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blocking => "blocking",
            Self::Deadlock => "deadlock",
        }
    }

    /// Worker roles created by one invocation, in start order.
    #[must_use]
    pub const fn roles(self) -> [WorkerRole; 2] {
        match self {
            Self::Blocking => [WorkerRole::Holder, WorkerRole::Waiter],
            Self::Deadlock => [WorkerRole::DeadlockA, WorkerRole::DeadlockB],
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acknowledgment that a scenario was initiated.
///
/// Says nothing about whether the pathological state has been reached yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioAck {
    /// Invocation id.
    pub scenario: ScenarioId,
    /// Which scenario was started.
    pub kind: ScenarioKind,
    /// Workers created, in start order.
    pub workers: Vec<WorkerId>,
}

impl ScenarioAck {
    /// Plain acknowledgment string returned to triggers.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self.kind {
            ScenarioKind::Blocking => "Blocking scenario initiated!",
            ScenarioKind::Deadlock => "Deadlock scenario initiated!",
        }
    }
}

/// Internal scenario failures. Never surfaced to triggers.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The OS refused to create a worker thread.
    #[error("failed to spawn worker thread {name}: {source}")]
    Spawn {
        /// Thread name of the worker.
        name: &'static str,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },
}

/// Starts scenarios against a shared [`ScenarioContext`].
///
/// Both start operations may be called concurrently from any number of
/// threads.
#[derive(Debug)]
pub struct ScenarioController {
    context: ScenarioContext,
    config: ScenarioConfig,
    next_scenario: AtomicU64,
    spawner: Spawner,
}

/// Starts a worker thread named after its role.
type Spawner = fn(&'static str, WorkerTask) -> io::Result<()>;

fn spawn_named(name: &'static str, task: WorkerTask) -> io::Result<()> {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || task.run())
        .map(drop)
}

impl ScenarioController {
    /// Creates a controller over `context` with the given timings.
    #[must_use]
    pub const fn new(context: ScenarioContext, config: ScenarioConfig) -> Self {
        Self {
            context,
            config,
            next_scenario: AtomicU64::new(1),
            spawner: spawn_named,
        }
    }

    /// Returns the shared context.
    #[must_use]
    pub const fn context(&self) -> &ScenarioContext {
        &self.context
    }

    /// Starts a HOLDER and, once it has had its chance at `blockingLock`, a
    /// WAITER.
    ///
    /// Returns after the WAITER has been started, without waiting for it to
    /// block. With [`StartOrdering::Handshake`] the call takes as long as the
    /// HOLDER needs to acquire the lock, up to the grace period; the bound is
    /// hit when an earlier invocation's HOLDER still owns the lock.
    pub fn start_blocking_scenario(&self) -> ScenarioAck {
        let (scenario, records) = self.register(ScenarioKind::Blocking);
        let [holder, waiter] = [&records[0], &records[1]];

        let acquired = Arc::new(Latch::new());
        self.launch(holder, Some(Arc::clone(&acquired)));

        let grace = self.config.grace_period();
        match self.config.start_ordering {
            StartOrdering::Handshake => {
                if acquired.wait_timeout(grace).is_none() {
                    debug!(
                        scenario = %scenario,
                        grace_ms = self.config.grace_period_ms,
                        "holder did not confirm acquisition within grace period"
                    );
                }
            },
            StartOrdering::FixedDelay => thread::sleep(grace),
        }

        self.launch(waiter, None);
        Self::ack(scenario, ScenarioKind::Blocking, &records)
    }

    /// Starts both deadlock participants with no ordering between them.
    pub fn start_deadlock_scenario(&self) -> ScenarioAck {
        let (scenario, records) = self.register(ScenarioKind::Deadlock);
        for record in &records {
            self.launch(record, None);
        }
        Self::ack(scenario, ScenarioKind::Deadlock, &records)
    }

    fn register(&self, kind: ScenarioKind) -> (ScenarioId, Vec<Arc<WorkerRecord>>) {
        let scenario = ScenarioId(self.next_scenario.fetch_add(1, Ordering::Relaxed));
        let records = self
            .context
            .workers
            .register_scenario(scenario, &kind.roles());
        info!(scenario = %scenario, kind = %kind, "initiating scenario");
        (scenario, records)
    }

    fn ack(scenario: ScenarioId, kind: ScenarioKind, records: &[Arc<WorkerRecord>]) -> ScenarioAck {
        ScenarioAck {
            scenario,
            kind,
            workers: records.iter().map(|r| r.id()).collect(),
        }
    }

    /// Spawns the worker, recording a failed spawn as `Terminated`.
    fn launch(&self, record: &Arc<WorkerRecord>, acquired: Option<Arc<Latch>>) {
        if let Err(err) = self.spawn(record, acquired) {
            error!(worker = %record.id(), error = %err, "worker never started");
            record.finish(WorkerState::Terminated);
        }
    }

    fn spawn(
        &self,
        record: &Arc<WorkerRecord>,
        acquired: Option<Arc<Latch>>,
    ) -> Result<(), ScenarioError> {
        let task = WorkerTask {
            record: Arc::clone(record),
            locks: Arc::clone(&self.context.locks),
            hold_delay: self.config.hold_delay(),
            acquired,
        };
        (self.spawner)(record.name(), task).map_err(|source| ScenarioError::Spawn {
            name: record.name(),
            source,
        })?;
        debug!(
            worker = %record.id(),
            name = record.name(),
            role = %record.role(),
            "worker started"
        );
        Ok(())
    }
}
