//! Role bodies executed on each worker thread.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::{WorkerRecord, WorkerRole, WorkerState};
use crate::sync::{Latch, LatchOutcome, LockName, LockRegistry};

/// Everything a worker thread needs, moved into the thread at spawn.
pub(crate) struct WorkerTask {
    pub record: Arc<WorkerRecord>,
    pub locks: Arc<LockRegistry>,
    /// Critical-section delay for deadlock participants.
    pub hold_delay: Duration,
    /// Opened by the HOLDER once it owns `blockingLock`.
    pub acquired: Option<Arc<Latch>>,
}

impl WorkerTask {
    pub(crate) fn run(self) {
        self.record.mark_running();
        match self.record.role() {
            WorkerRole::Holder => self.run_holder(),
            WorkerRole::Waiter => self.run_waiter(),
            WorkerRole::DeadlockA => self.run_deadlock(LockName::LockA, LockName::LockB),
            WorkerRole::DeadlockB => self.run_deadlock(LockName::LockB, LockName::LockA),
        }
    }

    fn acquire(&self, lock: LockName) -> std::sync::MutexGuard<'_, ()> {
        let rec = &self.record;
        info!(worker = %rec.id(), name = rec.name(), lock = %lock, "attempting to acquire lock");
        rec.begin_acquire(lock);
        let guard = self.locks.acquire(lock);
        rec.acquired(lock);
        info!(worker = %rec.id(), name = rec.name(), lock = %lock, "acquired lock");
        guard
    }

    /// Takes `blockingLock` and parks on the release latch with it held.
    fn run_holder(&self) {
        let rec = &self.record;
        let guard = self.acquire(LockName::Blocking);
        if let Some(acquired) = &self.acquired {
            acquired.release();
        }

        rec.mark_waiting_indefinitely();
        info!(
            worker = %rec.id(),
            name = rec.name(),
            lock = %LockName::Blocking,
            "holding lock indefinitely"
        );

        // The latch is never released; only the interrupt path returns here.
        let outcome = rec.signal().wait();
        rec.releasing(LockName::Blocking);
        drop(guard);
        match outcome {
            LatchOutcome::Interrupted => {
                warn!(
                    worker = %rec.id(),
                    name = rec.name(),
                    "interrupted while holding blockingLock, lock released"
                );
                rec.finish(WorkerState::Interrupted);
            },
            LatchOutcome::Released => rec.finish(WorkerState::Terminated),
        }
    }

    /// Blocks on `blockingLock` behind the HOLDER.
    fn run_waiter(&self) {
        let rec = &self.record;
        let guard = self.acquire(LockName::Blocking);
        warn!(
            worker = %rec.id(),
            name = rec.name(),
            "acquired blockingLock, holder is no longer active"
        );
        rec.releasing(LockName::Blocking);
        drop(guard);
        rec.finish(WorkerState::Terminated);
    }

    /// Takes `first`, holds it for the hold delay, then takes `second`.
    ///
    /// The opposite participant runs the same body with the locks swapped,
    /// which produces circular wait whenever both first acquisitions land
    /// inside each other's hold delay.
    fn run_deadlock(&self, first: LockName, second: LockName) {
        let rec = &self.record;
        let first_guard = self.acquire(first);

        if rec.signal().wait_timeout(self.hold_delay) == Some(LatchOutcome::Interrupted) {
            rec.releasing(first);
            drop(first_guard);
            warn!(
                worker = %rec.id(),
                name = rec.name(),
                lock = %first,
                "interrupted during hold delay, lock released"
            );
            rec.finish(WorkerState::Interrupted);
            return;
        }

        let second_guard = self.acquire(second);
        info!(worker = %rec.id(), name = rec.name(), "holding both locks");
        rec.releasing(second);
        drop(second_guard);
        rec.releasing(first);
        drop(first_guard);
        info!(worker = %rec.id(), name = rec.name(), "released both locks");
        rec.finish(WorkerState::Terminated);
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Instant;

    use super::*;
    use crate::worker::{ScenarioId, WorkerId};

    fn task(role: WorkerRole, locks: &Arc<LockRegistry>) -> WorkerTask {
        WorkerTask {
            record: Arc::new(WorkerRecord::new(WorkerId(1), ScenarioId(1), role)),
            locks: Arc::clone(locks),
            hold_delay: Duration::from_millis(30),
            acquired: Some(Arc::new(Latch::new())),
        }
    }

    fn wait_for_state(record: &WorkerRecord, state: WorkerState) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while record.state() != state {
            assert!(
                Instant::now() < deadline,
                "worker stuck in {} waiting for {state}",
                record.state()
            );
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_holder_signals_and_parks() {
        let locks = Arc::new(LockRegistry::new());
        let task = task(WorkerRole::Holder, &locks);
        let record = Arc::clone(&task.record);
        let acquired = Arc::clone(task.acquired.as_ref().unwrap());
        thread::spawn(move || task.run());

        assert_eq!(
            acquired.wait_timeout(Duration::from_secs(5)),
            Some(LatchOutcome::Released)
        );
        wait_for_state(&record, WorkerState::WaitingIndefinitely);
        assert!(locks.is_held(LockName::Blocking));
        assert_eq!(record.snapshot().held, vec![LockName::Blocking]);
    }

    #[test]
    fn test_interrupted_holder_releases_lock() {
        let locks = Arc::new(LockRegistry::new());
        let task = task(WorkerRole::Holder, &locks);
        let record = Arc::clone(&task.record);
        let handle = thread::spawn(move || task.run());

        wait_for_state(&record, WorkerState::WaitingIndefinitely);
        record.interrupt();
        handle.join().unwrap();

        assert_eq!(record.state(), WorkerState::Interrupted);
        assert!(!locks.is_held(LockName::Blocking));
    }

    #[test]
    fn test_lone_participant_terminates() {
        let locks = Arc::new(LockRegistry::new());
        let task = task(WorkerRole::DeadlockA, &locks);
        let record = Arc::clone(&task.record);
        thread::spawn(move || task.run()).join().unwrap();

        assert_eq!(record.state(), WorkerState::Terminated);
        assert!(!locks.is_held(LockName::LockA));
        assert!(!locks.is_held(LockName::LockB));
    }

    #[test]
    fn test_participant_interrupted_in_hold_delay() {
        let locks = Arc::new(LockRegistry::new());
        let mut task = task(WorkerRole::DeadlockB, &locks);
        task.hold_delay = Duration::from_secs(30);
        let record = Arc::clone(&task.record);
        let handle = thread::spawn(move || task.run());

        wait_for_state(&record, WorkerState::Holding);
        assert!(locks.is_held(LockName::LockB));
        record.interrupt();
        handle.join().unwrap();

        assert_eq!(record.state(), WorkerState::Interrupted);
        assert!(!locks.is_held(LockName::LockB));
        assert!(!locks.is_held(LockName::LockA));
    }

    #[test]
    fn test_waiter_blocks_behind_held_lock() {
        let locks = Arc::new(LockRegistry::new());
        let _guard = locks.acquire(LockName::Blocking);
        let task = task(WorkerRole::Waiter, &locks);
        let record = Arc::clone(&task.record);
        thread::spawn(move || task.run());

        wait_for_state(&record, WorkerState::BlockedOnLock);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(record.state(), WorkerState::BlockedOnLock);
        assert_eq!(record.snapshot().waiting_on, Some(LockName::Blocking));
    }
}
