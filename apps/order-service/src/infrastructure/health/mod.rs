//! Health Check and Metrics Endpoint
//!
//! # Endpoints
//!
//! - `GET /health` - JSON health status
//! - `GET /healthz` - liveness probe (simple OK)
//! - `GET /readyz` - readiness probe (simulator running)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::{OrderLifecycleService, StatusSimulator};
use crate::infrastructure::metrics::get_metrics_handle;

/// Missed simulator intervals after which health is reported as degraded.
const STALE_TICK_INTERVALS: u32 = 3;

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Orders held in memory.
    pub stored_orders: usize,
    /// Subscription pollers running.
    pub active_subscriptions: usize,
    /// Simulator state.
    pub simulator: SimulatorInfo,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All systems operational.
    Healthy,
    /// Serving requests, but orders are not advancing on schedule.
    Degraded,
    /// Simulator stopped.
    Unhealthy,
}

/// Simulator status.
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorInfo {
    /// Whether the tick loop is running.
    pub running: bool,
    /// Passes completed.
    pub ticks: u64,
    /// Time of the last pass.
    pub last_tick_at: Option<DateTime<Utc>>,
    /// Configured interval in seconds.
    pub interval_secs: u64,
}

// =============================================================================
// Health Server State
// =============================================================================

/// Shared state for the health server.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    lifecycle: Arc<OrderLifecycleService>,
    simulator: Arc<StatusSimulator>,
}

impl HealthServerState {
    /// Create new health server state.
    #[must_use]
    pub fn new(
        version: String,
        lifecycle: Arc<OrderLifecycleService>,
        simulator: Arc<StatusSimulator>,
    ) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            lifecycle,
            simulator,
        }
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// Health check HTTP server.
pub struct HealthServer {
    addr: SocketAddr,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a new health server.
    #[must_use]
    pub const fn new(
        addr: SocketAddr,
        state: Arc<HealthServerState>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            addr,
            state,
            cancel,
        }
    }

    /// Run the health server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(self.addr, e.to_string()))?;

        tracing::info!(addr = %self.addr, "Health server listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}

/// Routes served by [`HealthServer`].
pub fn router(state: Arc<HealthServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state, Utc::now());
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    if state.simulator.is_running() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            )
        },
    )
}

fn build_health_response(state: &HealthServerState, now: DateTime<Utc>) -> HealthResponse {
    let simulator = SimulatorInfo {
        running: state.simulator.is_running(),
        ticks: state.simulator.ticks(),
        last_tick_at: state.simulator.last_tick_at(),
        interval_secs: state.simulator.interval().as_secs(),
    };

    HealthResponse {
        status: determine_health_status(&simulator, state.started_at.elapsed().as_secs(), now),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: now,
        stored_orders: state.lifecycle.stored_orders(),
        active_subscriptions: state.lifecycle.active_subscriptions(),
        simulator,
    }
}

fn determine_health_status(sim: &SimulatorInfo, uptime_secs: u64, now: DateTime<Utc>) -> HealthStatus {
    if !sim.running {
        return HealthStatus::Unhealthy;
    }
    let budget = sim.interval_secs.saturating_mul(u64::from(STALE_TICK_INTERVALS));
    let idle_secs = sim.last_tick_at.map_or(uptime_secs, |at| {
        u64::try_from((now - at).num_seconds()).unwrap_or(0)
    });
    if idle_secs > budget {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind the listener.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(SocketAddr, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================
