#![allow(clippy::doc_markdown)]

//! threadlab-daemon - HTTP trigger daemon
//!
//! Exposes the threadlab scenario engine over HTTP so that an operator (or a
//! test harness driving a thread analyzer) can manufacture lock contention on
//! demand.
//!
//! # Modules
//!
//! - [`handlers`]: axum routes and the `serve` loop
//! - [`logging`]: tracing subscriber setup
//! - [`metrics`]: Prometheus metrics
//! - [`state`]: Shared daemon state

pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod state;
