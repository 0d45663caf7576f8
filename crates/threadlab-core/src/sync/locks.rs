//! Shared lock registry.
//!
//! The fixed set of named exclusive locks every worker contends on. Locks are
//! created once with the [`LockRegistry`] and live as long as it does; all
//! scenario invocations against the same registry compound contention on the
//! same three mutexes.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use serde::{Deserialize, Serialize};

/// Identity of a contention point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockName {
    /// First deadlock lock.
    #[serde(rename = "lockA")]
    LockA,
    /// Second deadlock lock.
    #[serde(rename = "lockB")]
    LockB,
    /// Lock the blocking scenario's HOLDER never returns.
    #[serde(rename = "blockingLock")]
    Blocking,
}

impl LockName {
    /// All lock names in registry order.
    pub const ALL: [Self; 3] = [Self::LockA, Self::LockB, Self::Blocking];

    /// Returns the display name used in logs and snapshots.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LockA => "lockA",
            Self::LockB => "lockB",
            Self::Blocking => "blockingLock",
        }
    }
}

impl fmt::Display for LockName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owner of the three shared locks.
///
/// The locks guard no data; their only state is held/free. A poisoned lock is
/// treated as free because a panicking holder has already released it.
#[derive(Debug, Default)]
pub struct LockRegistry {
    lock_a: Mutex<()>,
    lock_b: Mutex<()>,
    blocking: Mutex<()>,
}

impl LockRegistry {
    /// Creates a registry with all locks free.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, name: LockName) -> &Mutex<()> {
        match name {
            LockName::LockA => &self.lock_a,
            LockName::LockB => &self.lock_b,
            LockName::Blocking => &self.blocking,
        }
    }

    /// Acquires `name`, blocking the calling thread until it is free.
    ///
    /// There is no timeout. The lock is released when the guard drops.
    pub fn acquire(&self, name: LockName) -> MutexGuard<'_, ()> {
        self.get(name)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Attempts to acquire `name` without blocking.
    pub fn try_acquire(&self, name: LockName) -> Option<MutexGuard<'_, ()>> {
        match self.get(name).try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Returns `true` if some thread currently holds `name`.
    ///
    /// Probes with a non-blocking acquire, so the answer may be stale by the
    /// time the caller reads it.
    #[must_use]
    pub fn is_held(&self, name: LockName) -> bool {
        self.try_acquire(name).is_none()
    }
}
