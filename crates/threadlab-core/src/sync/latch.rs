//! One-shot wait/release latch.
//!
//! A [`Latch`] starts armed and opens exactly once, either by
//! [`release`](Latch::release) or by the interrupt path, which only this
//! crate's tests drive. Every waiter, present or future, observes the same
//! [`LatchOutcome`].
//!
//! The HOLDER worker parks on a latch that nothing in the public contract ever
//! releases. That unreleased latch is the resource leak the blocking scenario
//! exists to reproduce.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// How an opened latch was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchOutcome {
    /// Opened by [`Latch::release`].
    Released,
    /// Opened by the internal interrupt path.
    Interrupted,
}

/// One-shot latch backed by a `Mutex` + `Condvar` pair.
#[derive(Debug, Default)]
pub struct Latch {
    /// `None` while armed.
    outcome: Mutex<Option<LatchOutcome>>,
    cond: Condvar,
}

impl Latch {
    /// Creates an armed latch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the latch with [`LatchOutcome::Released`].
    ///
    /// Has no effect if the latch is already open.
    pub fn release(&self) {
        self.open(LatchOutcome::Released);
    }

    /// Opens the latch with [`LatchOutcome::Interrupted`].
    #[cfg(test)]
    pub(crate) fn interrupt(&self) {
        self.open(LatchOutcome::Interrupted);
    }

    fn open(&self, outcome: LatchOutcome) {
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(outcome);
            self.cond.notify_all();
        }
    }

    /// Returns the outcome if the latch has been opened.
    #[must_use]
    pub fn outcome(&self) -> Option<LatchOutcome> {
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks the calling thread until the latch opens. Unbounded.
    pub fn wait(&self) -> LatchOutcome {
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(outcome) = *slot {
                return outcome;
            }
            slot = self
                .cond
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks until the latch opens or `timeout` elapses.
    ///
    /// Returns `None` on timeout. Spurious wakeups do not shorten the wait.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<LatchOutcome> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(outcome) = *slot {
                return Some(outcome);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            slot = self
                .cond
                .wait_timeout(slot, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_armed_latch_times_out() {
        let latch = Latch::new();
        assert_eq!(latch.wait_timeout(Duration::from_millis(20)), None);
        assert_eq!(latch.outcome(), None);
    }

    #[test]
    fn test_release_wakes_all_waiters() {
        let latch = Arc::new(Latch::new());
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let latch = Arc::clone(&latch);
                thread::spawn(move || latch.wait())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        latch.release();

        for waiter in waiters {
            assert_eq!(waiter.join().unwrap(), LatchOutcome::Released);
        }
    }

    #[test]
    fn test_first_opening_wins() {
        let latch = Latch::new();
        latch.interrupt();
        latch.release();
        assert_eq!(latch.wait(), LatchOutcome::Interrupted);
        assert_eq!(
            latch.wait_timeout(Duration::ZERO),
            Some(LatchOutcome::Interrupted)
        );
    }
}
