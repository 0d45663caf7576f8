#![allow(clippy::doc_markdown)]

//! threadlab-core - contention scenario engine
//!
//! Manufactures two diagnosable lock pathologies on demand so that thread
//! dump tools, profilers and monitoring agents have a reproducible target:
//!
//! - indefinite single-lock blocking (a thread that never returns a lock and
//!   a thread queued behind it), and
//! - two-party circular-wait deadlock.
//!
//! Pathological states are permanent until the process exits. Nothing here
//! detects or resolves deadlocks.
//!
//! # Modules
//!
//! - [`config`]: TOML configuration for listen address and scenario timings
//! - [`registry`]: Append-only registry of every worker ever started
//! - [`scenario`]: [`ScenarioController`] and the process-scoped
//!   [`ScenarioContext`]
//! - [`sync`]: Shared lock registry and one-shot latch
//! - [`worker`]: Worker roles, lifecycle states and snapshots

pub mod config;
pub mod registry;
pub mod scenario;
pub mod sync;
pub mod worker;

pub use config::{ConfigError, LabConfig, ScenarioConfig, StartOrdering};
pub use registry::WorkerRegistry;
pub use scenario::{ScenarioAck, ScenarioContext, ScenarioController, ScenarioError, ScenarioKind};
pub use sync::{Latch, LatchOutcome, LockName, LockRegistry};
pub use worker::{ScenarioId, WorkerId, WorkerRecord, WorkerRole, WorkerSnapshot, WorkerState};
