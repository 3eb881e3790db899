//! Prometheus Metrics Module
//!
//! # Metrics Categories
//!
//! - **Orders**: creations by type, creation failures by reason
//! - **Lifecycle**: simulator transitions by target status
//! - **Subscriptions**: active pollers, updates streamed
//! - **Markets**: validator lookups by outcome, cache hits and misses
//!
//! Recording before [`init_metrics`] is a no-op, so library code and tests
//! never depend on a recorder being installed.
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::domain::{OrderStatus, OrderType};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Subsequent calls return the handle installed by the first one.
///
/// # Errors
///
/// Returns an error if another global recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!("order_service_orders_created_total", "Orders stored, by order type");
    describe_counter!(
        "order_service_create_failures_total",
        "CreateOrder calls that failed, by reason"
    );
    describe_counter!(
        "order_service_status_transitions_total",
        "Simulator transitions, by target status"
    );
    describe_counter!(
        "order_service_updates_streamed_total",
        "Status updates delivered to subscribers, by status"
    );
    describe_gauge!(
        "order_service_active_subscriptions",
        "Subscription pollers currently running"
    );
    describe_counter!(
        "order_service_market_lookups_total",
        "Market validator calls, by outcome"
    );
    describe_counter!(
        "order_service_markets_cache_lookups_total",
        "Markets cache reads, by result"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Outcome of a market validator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketLookupOutcome {
    /// Validator answered.
    Success,
    /// Validator failed.
    Failure,
}

impl MarketLookupOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Record a stored order.
pub fn record_order_created(order_type: OrderType) {
    counter!(
        "order_service_orders_created_total",
        "order_type" => order_type.as_str()
    )
    .increment(1);
}

/// Record a failed `CreateOrder`.
pub fn record_create_failure(reason: &'static str) {
    counter!("order_service_create_failures_total", "reason" => reason).increment(1);
}

/// Record one simulator transition.
pub fn record_status_transition(to: OrderStatus) {
    counter!(
        "order_service_status_transitions_total",
        "status" => to.as_str()
    )
    .increment(1);
}

/// Record an update handed to a subscriber.
pub fn record_update_streamed(status: OrderStatus) {
    counter!(
        "order_service_updates_streamed_total",
        "status" => status.as_str()
    )
    .increment(1);
}

/// Update the active subscription count.
#[allow(clippy::cast_precision_loss)]
pub fn set_active_subscriptions(count: usize) {
    gauge!("order_service_active_subscriptions").set(count as f64);
}

/// Record a market validator call.
pub fn record_market_lookup(outcome: MarketLookupOutcome) {
    counter!(
        "order_service_market_lookups_total",
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Record a markets cache read.
pub fn record_cache_lookup(hit: bool) {
    counter!(
        "order_service_markets_cache_lookups_total",
        "result" => if hit { "hit" } else { "miss" }
    )
    .increment(1);
}

// =============================================================================
// Tests
// =============================================================================
