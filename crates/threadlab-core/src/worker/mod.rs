//! Synthetic workers and their lifecycle state.
//!
//! A worker is one named OS thread playing one scenario role. The
//! [`WorkerRecord`] is the shared, observable side of that thread: the thread
//! writes its state transitions into it, the [`WorkerRegistry`] keeps it
//! forever, and external inspection reads it through [`WorkerSnapshot`].
//!
//! # State machine
//!
//! ```text
//! NotStarted -> Running -> BlockedOnLock <-> Holding -> WaitingIndefinitely
//!                                 |             |              |
//!                                 +-------------+--------------+--> Terminated | Interrupted
//! ```
//!
//! `Terminated` and `Interrupted` are terminal. A worker blocked inside a
//! mutex acquire never leaves `BlockedOnLock` unless the holder releases.
//!
//! [`WorkerRegistry`]: crate::registry::WorkerRegistry

pub(crate) mod roles;

use std::fmt;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sync::{Latch, LockName};

/// Role a worker plays in its scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerRole {
    /// Takes `blockingLock` and never gives it back.
    Holder,
    /// Blocks forever trying to take `blockingLock`.
    Waiter,
    /// Takes `lockA` then `lockB`.
    DeadlockA,
    /// Takes `lockB` then `lockA`.
    DeadlockB,
}

impl WorkerRole {
    /// All roles.
    pub const ALL: [Self; 4] = [Self::Holder, Self::Waiter, Self::DeadlockA, Self::DeadlockB];

    /// Thread name given to workers of this role.
    ///
    /// Names repeat across invocations so dumps group them together.
    #[must_use]
    pub const fn thread_name(self) -> &'static str {
        match self {
            Self::Holder => "BlockerThread",
            Self::Waiter => "BlockedThread",
            Self::DeadlockA => "DeadlockThread-1",
            Self::DeadlockB => "DeadlockThread-2",
        }
    }

    /// Returns the snake-case label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Holder => "holder",
            Self::Waiter => "waiter",
            Self::DeadlockA => "deadlock_a",
            Self::DeadlockB => "deadlock_b",
        }
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Registered, thread not spawned yet.
    NotStarted,
    /// Thread spawned, no lock activity yet.
    Running,
    /// Holds at least one lock and is not acquiring another.
    Holding,
    /// Inside an acquire call on [`WorkerSnapshot::waiting_on`].
    ///
    /// Set just before the acquire call is made, so an acquisition of a free
    /// lock shows up here for a moment before the worker moves to `Holding`.
    BlockedOnLock,
    /// Parked on a release latch that is never opened, lock still held.
    WaitingIndefinitely,
    /// Finished on its own, or never started.
    Terminated,
    /// Unwound through the interrupt path.
    Interrupted,
}

impl WorkerState {
    /// All states.
    pub const ALL: [Self; 7] = [
        Self::NotStarted,
        Self::Running,
        Self::Holding,
        Self::BlockedOnLock,
        Self::WaitingIndefinitely,
        Self::Terminated,
        Self::Interrupted,
    ];

    /// Returns `true` for states a worker never leaves.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Terminated | Self::Interrupted)
    }

    /// Returns the snake-case label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Running => "running",
            Self::Holding => "holding",
            Self::BlockedOnLock => "blocked_on_lock",
            Self::WaitingIndefinitely => "waiting_indefinitely",
            Self::Terminated => "terminated",
            Self::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry-assigned worker identifier, unique for the registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W-{}", self.0)
    }
}

/// Identifier of one scenario invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(pub u64);

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

#[derive(Debug)]
struct WorkerStatus {
    state: WorkerState,
    held: Vec<LockName>,
    waiting_on: Option<LockName>,
}

/// Shared record of one worker.
///
/// Owned by the registry through an `Arc`; the worker thread holds the other
/// reference and is the only writer of its status.
#[derive(Debug)]
pub struct WorkerRecord {
    id: WorkerId,
    scenario: ScenarioId,
    role: WorkerRole,
    created_at: DateTime<Utc>,
    status: Mutex<WorkerStatus>,
    /// Release latch. Nothing in the public API opens it with `Released`.
    signal: Latch,
}

impl WorkerRecord {
    pub(crate) fn new(id: WorkerId, scenario: ScenarioId, role: WorkerRole) -> Self {
        Self {
            id,
            scenario,
            role,
            created_at: Utc::now(),
            status: Mutex::new(WorkerStatus {
                state: WorkerState::NotStarted,
                held: Vec::new(),
                waiting_on: None,
            }),
            signal: Latch::new(),
        }
    }

    /// Returns the worker id.
    #[must_use]
    pub const fn id(&self) -> WorkerId {
        self.id
    }

    /// Returns the invocation this worker belongs to.
    #[must_use]
    pub const fn scenario(&self) -> ScenarioId {
        self.scenario
    }

    /// Returns the worker role.
    #[must_use]
    pub const fn role(&self) -> WorkerRole {
        self.role
    }

    /// Returns the worker (thread) name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.role.thread_name()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        self.lock_status().state
    }

    /// Returns a consistent point-in-time copy of this record.
    #[must_use]
    pub fn snapshot(&self) -> WorkerSnapshot {
        let status = self.lock_status();
        WorkerSnapshot {
            id: self.id,
            scenario: self.scenario,
            name: self.name().to_string(),
            role: self.role,
            state: status.state,
            held: status.held.clone(),
            waiting_on: status.waiting_on,
            created_at: self.created_at,
        }
    }

    pub(crate) const fn signal(&self) -> &Latch {
        &self.signal
    }

    /// Opens the worker's latch with the interrupt outcome.
    ///
    /// Only a parked HOLDER or a deadlock participant inside its hold delay
    /// observes this. A thread blocked in a mutex acquire does not. Nothing
    /// outside this crate's own tests can reach it: a started scenario is
    /// never resolved.
    #[cfg(test)]
    pub(crate) fn interrupt(&self) {
        self.signal.interrupt();
    }

    fn lock_status(&self) -> std::sync::MutexGuard<'_, WorkerStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut WorkerStatus)) {
        let mut status = self.lock_status();
        let before = status.state;
        f(&mut *status);
        if before != status.state {
            debug!(
                worker = %self.id,
                name = self.name(),
                from = %before,
                to = %status.state,
                "worker state transition"
            );
        }
    }

    pub(crate) fn mark_running(&self) {
        self.update(|s| s.state = WorkerState::Running);
    }

    /// Records that the thread is about to block acquiring `lock`.
    pub(crate) fn begin_acquire(&self, lock: LockName) {
        self.update(|s| {
            s.state = WorkerState::BlockedOnLock;
            s.waiting_on = Some(lock);
        });
    }

    pub(crate) fn acquired(&self, lock: LockName) {
        self.update(|s| {
            s.state = WorkerState::Holding;
            s.waiting_on = None;
            s.held.push(lock);
        });
    }

    /// Records that `lock` is about to be released. Called before the guard
    /// drops so the record never claims a lock another worker already owns.
    pub(crate) fn releasing(&self, lock: LockName) {
        self.update(|s| {
            s.held.retain(|&held| held != lock);
            if s.held.is_empty() && s.state == WorkerState::Holding {
                s.state = WorkerState::Running;
            }
        });
    }

    pub(crate) fn mark_waiting_indefinitely(&self) {
        self.update(|s| s.state = WorkerState::WaitingIndefinitely);
    }

    /// Records the final state after all guards have been dropped.
    pub(crate) fn finish(&self, state: WorkerState) {
        debug_assert!(state.is_terminal());
        self.update(|s| {
            s.state = state;
            s.held.clear();
            s.waiting_on = None;
        });
    }
}

/// Serializable point-in-time view of a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    /// Worker id.
    pub id: WorkerId,
    /// Owning invocation.
    pub scenario: ScenarioId,
    /// Thread name.
    pub name: String,
    /// Scenario role.
    pub role: WorkerRole,
    /// Execution state.
    pub state: WorkerState,
    /// Locks held, in acquisition order.
    pub held: Vec<LockName>,
    /// Lock being acquired, if blocked.
    pub waiting_on: Option<LockName>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(role: WorkerRole) -> WorkerRecord {
        WorkerRecord::new(WorkerId(1), ScenarioId(7), role)
    }

    #[test]
    fn test_new_record_is_not_started() {
        let rec = record(WorkerRole::Holder);
        let snap = rec.snapshot();
        assert_eq!(snap.state, WorkerState::NotStarted);
        assert_eq!(snap.name, "BlockerThread");
        assert!(snap.held.is_empty());
        assert_eq!(snap.waiting_on, None);
    }

    #[test]
    fn test_acquire_bookkeeping() {
        let rec = record(WorkerRole::DeadlockA);
        rec.mark_running();
        rec.begin_acquire(LockName::LockA);
        assert_eq!(rec.snapshot().waiting_on, Some(LockName::LockA));

        rec.acquired(LockName::LockA);
        rec.begin_acquire(LockName::LockB);
        let snap = rec.snapshot();
        assert_eq!(snap.state, WorkerState::BlockedOnLock);
        assert_eq!(snap.held, vec![LockName::LockA]);
        assert_eq!(snap.waiting_on, Some(LockName::LockB));

        rec.finish(WorkerState::Terminated);
        let snap = rec.snapshot();
        assert!(snap.state.is_terminal());
        assert!(snap.held.is_empty());
    }

    #[test]
    fn test_snapshot_serializes_snake_case() {
        let rec = record(WorkerRole::DeadlockB);
        rec.begin_acquire(LockName::LockB);
        let json = serde_json::to_value(rec.snapshot()).unwrap();
        assert_eq!(json["role"], "deadlock_b");
        assert_eq!(json["state"], "blocked_on_lock");
        assert_eq!(json["waiting_on"], "lockB");
        assert_eq!(json["id"], 1);
    }

    #[test]
    fn test_thread_names_are_stable() {
        let names: Vec<_> = WorkerRole::ALL.iter().map(|r| r.thread_name()).collect();
        assert_eq!(
            names,
            ["BlockerThread", "BlockedThread", "DeadlockThread-1", "DeadlockThread-2"]
        );
    }
}
