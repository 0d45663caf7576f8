//! HTTP trigger routes.
//!
//! | Route | Effect |
//! |-------|--------|
//! | `GET /` | Liveness banner |
//! | `GET /block` | `start_blocking_scenario` |
//! | `GET /deadlock` | `start_deadlock_scenario` |
//! | `GET /workers` | JSON snapshot of the worker registry |
//! | `GET /metrics` | Prometheus text exposition |
//!
//! Trigger routes are fire-and-forget: they answer `200` with the plain
//! acknowledgment as soon as the scenario is initiated.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use threadlab_core::{ScenarioKind, WorkerSnapshot};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::state::SharedState;

/// Builds the trigger router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/block", get(trigger_block))
        .route("/deadlock", get(trigger_deadlock))
        .route("/workers", get(list_workers))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serves the trigger router on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve(
    listener: TcpListener,
    state: SharedState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = listener.local_addr().context("listener has no local address")?;
    info!(addr = %addr, "trigger listener ready");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("trigger server error")
}

async fn liveness(State(state): State<SharedState>) -> String {
    state.metrics().daemon_metrics().trigger_request("/");
    format!(
        "threadlab daemon (up {}s)\n\n\
         GET /block    - start a blocking scenario\n\
         GET /deadlock - start a deadlock scenario\n\
         GET /workers  - worker registry snapshot\n\
         GET /metrics  - Prometheus metrics\n",
        state.uptime_secs()
    )
}

async fn trigger_block(State(state): State<SharedState>) -> Response {
    start_scenario(&state, ScenarioKind::Blocking, "/block").await
}

async fn trigger_deadlock(State(state): State<SharedState>) -> Response {
    start_scenario(&state, ScenarioKind::Deadlock, "/deadlock").await
}

/// Runs the controller on the blocking pool; the blocking scenario sleeps up
/// to the grace period before it returns.
async fn start_scenario(state: &SharedState, kind: ScenarioKind, route: &'static str) -> Response {
    let metrics = state.metrics().daemon_metrics();
    metrics.trigger_request(route);
    info!(route, kind = %kind, "received trigger request");

    let controller = Arc::clone(state.controller());
    let started = tokio::task::spawn_blocking(move || match kind {
        ScenarioKind::Blocking => controller.start_blocking_scenario(),
        ScenarioKind::Deadlock => controller.start_deadlock_scenario(),
    })
    .await;

    match started {
        Ok(ack) => {
            metrics.scenario_started(kind);
            (StatusCode::OK, ack.message()).into_response()
        },
        Err(e) => {
            error!(route, error = %e, "scenario controller task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to start {kind} scenario"),
            )
                .into_response()
        },
    }
}

async fn list_workers(State(state): State<SharedState>) -> Json<Vec<WorkerSnapshot>> {
    state.metrics().daemon_metrics().trigger_request("/workers");
    Json(state.controller().context().workers().snapshot())
}

async fn metrics(State(state): State<SharedState>) -> Response {
    let registry = state.metrics();
    registry
        .daemon_metrics()
        .observe_workers(&state.controller().context().workers().snapshot());

    match registry.encode_text() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {e}"),
            )
                .into_response()
        },
    }
}
