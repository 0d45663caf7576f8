//! Shared daemon state.
//!
//! Provides thread-safe shared state for the trigger handlers: the scenario
//! controller (and through it the process-scoped lock and worker registries)
//! plus the metrics registry. Workers started through the controller outlive
//! every request and die with the process.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use threadlab_core::ScenarioController;

use crate::metrics::SharedMetricsRegistry;

/// Shared daemon state.
pub type SharedState = Arc<DaemonStateHandle>;

/// Handle to daemon state.
pub struct DaemonStateHandle {
    /// Scenario controller shared by every request.
    controller: Arc<ScenarioController>,
    /// Prometheus metrics.
    metrics: SharedMetricsRegistry,
    /// Time when the daemon started.
    started_at: DateTime<Utc>,
}

impl DaemonStateHandle {
    /// Create a new daemon state handle.
    #[must_use]
    pub fn new(controller: Arc<ScenarioController>, metrics: SharedMetricsRegistry) -> Self {
        Self {
            controller,
            metrics,
            started_at: Utc::now(),
        }
    }

    /// Returns the scenario controller.
    #[must_use]
    pub const fn controller(&self) -> &Arc<ScenarioController> {
        &self.controller
    }

    /// Returns the metrics registry.
    #[must_use]
    pub const fn metrics(&self) -> &SharedMetricsRegistry {
        &self.metrics
    }

    /// Get daemon uptime in seconds.
    #[must_use]
    #[allow(clippy::cast_sign_loss)] // max(0) ensures non-negative
    pub fn uptime_secs(&self) -> u64 {
        let now = Utc::now();
        (now - self.started_at).num_seconds().max(0) as u64
    }
}
