//! Contention primitives: the shared lock registry and the one-shot latch.

pub mod latch;
pub mod locks;

pub use latch::{Latch, LatchOutcome};
pub use locks::{LockName, LockRegistry};
