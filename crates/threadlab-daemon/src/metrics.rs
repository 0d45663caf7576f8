//! Prometheus metrics for the trigger daemon.
//!
//! # Metrics Families
//!
//! | Metric | Type | Description | Labels |
//! |--------|------|-------------|--------|
//! | `threadlab_scenarios_started_total` | Counter | Scenario invocations | `kind` |
//! | `threadlab_trigger_requests_total` | Counter | Requests per route | `route` |
//! | `threadlab_workers` | Gauge | Registered workers | `role`, `state` |
//!
//! `threadlab_workers` is refreshed from a registry snapshot right before
//! each scrape, so it always covers every role/state pair.
//!
//! # Usage
//!
//! ```rust,ignore
//! use threadlab_daemon::metrics::MetricsRegistry;
//!
//! let registry = MetricsRegistry::new()?;
//! registry.daemon_metrics().scenario_started(ScenarioKind::Deadlock);
//! let output = registry.encode_text()?;
//! ```

use std::sync::Arc;

use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;
use threadlab_core::{ScenarioKind, WorkerRole, WorkerSnapshot, WorkerState};

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Failed to register a metric with Prometheus.
    #[error("failed to register metric: {0}")]
    RegistrationFailed(#[from] prometheus::Error),

    /// Failed to encode metrics output.
    #[error("failed to encode metrics: {0}")]
    EncodingFailed(String),
}

/// Result type for metrics operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Daemon metrics.
///
/// All metrics use interior mutability and are safe to share across threads.
#[derive(Clone)]
pub struct DaemonMetrics {
    /// Scenario invocations, labeled by `kind`.
    scenarios_started_total: CounterVec,

    /// Trigger requests, labeled by `route`.
    trigger_requests_total: CounterVec,

    /// Registered workers, labeled by `role` and `state`.
    workers: GaugeVec,
}

impl DaemonMetrics {
    /// Creates new daemon metrics and registers them with the given registry.
    ///
    /// # Errors
    ///
    /// Returns an error if any metric fails to register (e.g., duplicate name).
    pub fn new(registry: &Registry) -> MetricsResult<Self> {
        let scenarios_started_total = CounterVec::new(
            Opts::new(
                "threadlab_scenarios_started_total",
                "Total scenario invocations by kind",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(scenarios_started_total.clone()))?;

        let trigger_requests_total = CounterVec::new(
            Opts::new(
                "threadlab_trigger_requests_total",
                "Total trigger requests by route",
            ),
            &["route"],
        )?;
        registry.register(Box::new(trigger_requests_total.clone()))?;

        let workers = GaugeVec::new(
            Opts::new("threadlab_workers", "Registered workers by role and state"),
            &["role", "state"],
        )?;
        registry.register(Box::new(workers.clone()))?;

        Ok(Self {
            scenarios_started_total,
            trigger_requests_total,
            workers,
        })
    }

    /// Records a scenario invocation.
    pub fn scenario_started(&self, kind: ScenarioKind) {
        self.scenarios_started_total
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    /// Returns the scenario invocation count for `kind`.
    #[must_use]
    pub fn scenarios_started(&self, kind: ScenarioKind) -> f64 {
        self.scenarios_started_total
            .with_label_values(&[kind.as_str()])
            .get()
    }

    /// Records a request to `route`.
    pub fn trigger_request(&self, route: &'static str) {
        self.trigger_requests_total.with_label_values(&[route]).inc();
    }

    /// Returns the request count for `route`.
    #[must_use]
    pub fn trigger_request_count(&self, route: &'static str) -> f64 {
        self.trigger_requests_total.with_label_values(&[route]).get()
    }

    /// Overwrites the worker gauge from a registry snapshot.
    #[allow(clippy::cast_precision_loss)] // worker counts stay far below 2^52
    pub fn observe_workers(&self, snapshot: &[WorkerSnapshot]) {
        for role in WorkerRole::ALL {
            for state in WorkerState::ALL {
                let count = snapshot
                    .iter()
                    .filter(|w| w.role == role && w.state == state)
                    .count();
                self.workers
                    .with_label_values(&[role.as_str(), state.as_str()])
                    .set(count as f64);
            }
        }
    }

    /// Returns the gauge value for a role/state pair.
    #[must_use]
    pub fn workers_in(&self, role: WorkerRole, state: WorkerState) -> f64 {
        self.workers
            .with_label_values(&[role.as_str(), state.as_str()])
            .get()
    }
}

/// Metrics registry wrapper that holds the Prometheus registry and daemon
/// metrics.
#[derive(Clone)]
pub struct MetricsRegistry {
    /// The Prometheus registry.
    registry: Registry,
    /// Daemon metrics registered with this registry.
    daemon_metrics: DaemonMetrics,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all daemon metrics registered.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails.
    pub fn new() -> MetricsResult<Self> {
        let registry = Registry::new();
        let daemon_metrics = DaemonMetrics::new(&registry)?;
        Ok(Self {
            registry,
            daemon_metrics,
        })
    }

    /// Returns a reference to the daemon metrics.
    #[must_use]
    pub const fn daemon_metrics(&self) -> &DaemonMetrics {
        &self.daemon_metrics
    }

    /// Encodes all metrics in Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode_text(&self) -> MetricsResult<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::EncodingFailed(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| MetricsError::EncodingFailed(e.to_string()))
    }
}

/// Shared metrics registry for use across the daemon.
pub type SharedMetricsRegistry = Arc<MetricsRegistry>;

/// Creates a new shared metrics registry.
///
/// # Errors
///
/// Returns an error if metric registration fails.
pub fn new_shared_registry() -> MetricsResult<SharedMetricsRegistry> {
    Ok(Arc::new(MetricsRegistry::new()?))
}

#[cfg(test)]
#[allow(clippy::float_cmp)] // Prometheus counters/gauges return exact integer values as f64
mod tests {
    use chrono::Utc;
    use threadlab_core::{LockName, ScenarioId, WorkerId};

    use super::*;

    fn snapshot(role: WorkerRole, state: WorkerState) -> WorkerSnapshot {
        WorkerSnapshot {
            id: WorkerId(1),
            scenario: ScenarioId(1),
            name: role.thread_name().to_string(),
            role,
            state,
            held: Vec::new(),
            waiting_on: Some(LockName::Blocking),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_metrics_registry_creation() {
        let registry = MetricsRegistry::new().expect("registry creation should succeed");
        assert!(registry.encode_text().is_ok());
    }

    #[test]
    fn test_scenario_counter() {
        let registry = MetricsRegistry::new().unwrap();
        let metrics = registry.daemon_metrics();

        metrics.scenario_started(ScenarioKind::Deadlock);
        metrics.scenario_started(ScenarioKind::Deadlock);
        metrics.scenario_started(ScenarioKind::Blocking);

        assert_eq!(metrics.scenarios_started(ScenarioKind::Deadlock), 2.0);
        assert_eq!(metrics.scenarios_started(ScenarioKind::Blocking), 1.0);
    }

    #[test]
    fn test_worker_gauge_overwrites() {
        let registry = MetricsRegistry::new().unwrap();
        let metrics = registry.daemon_metrics();

        metrics.observe_workers(&[
            snapshot(WorkerRole::Waiter, WorkerState::BlockedOnLock),
            snapshot(WorkerRole::Waiter, WorkerState::BlockedOnLock),
        ]);
        assert_eq!(
            metrics.workers_in(WorkerRole::Waiter, WorkerState::BlockedOnLock),
            2.0
        );

        metrics.observe_workers(&[snapshot(WorkerRole::Waiter, WorkerState::BlockedOnLock)]);
        assert_eq!(
            metrics.workers_in(WorkerRole::Waiter, WorkerState::BlockedOnLock),
            1.0
        );
        assert_eq!(
            metrics.workers_in(WorkerRole::Holder, WorkerState::WaitingIndefinitely),
            0.0
        );
    }

    #[test]
    fn test_metrics_text_encoding() {
        let registry = MetricsRegistry::new().unwrap();
        let metrics = registry.daemon_metrics();

        metrics.scenario_started(ScenarioKind::Blocking);
        metrics.trigger_request("/block");
        metrics.observe_workers(&[]);

        let output = registry.encode_text().unwrap();
        assert!(output.contains("threadlab_scenarios_started_total{kind=\"blocking\"} 1"));
        assert!(output.contains("threadlab_trigger_requests_total{route=\"/block\"} 1"));
        assert!(output.contains("threadlab_workers{role=\"holder\",state=\"waiting_indefinitely\"} 0"));
    }
}
