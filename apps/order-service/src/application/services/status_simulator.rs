//! Status Simulator
//!
//! Background task that advances every open order one lifecycle step per
//! tick. It is the only writer of status after creation.
//!
//! Each tick is a single exclusive pass over the store, so a reader sees
//! either all of a tick's transitions or none of them. Transitions are
//! logged after the pass, outside the lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::domain::{ExecutionPolicy, OrderStatusWriter, StatusTransition};
use crate::infrastructure::metrics;

/// Simulator tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSimulatorConfig {
    /// Time between two passes.
    pub interval: Duration,
    /// Probability that a pending order fills rather than rejects.
    pub fill_probability: f64,
}

impl Default for StatusSimulatorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            fill_probability: 0.5,
        }
    }
}

/// Periodically advances open orders.
pub struct StatusSimulator {
    writer: Arc<dyn OrderStatusWriter>,
    policy: Arc<dyn ExecutionPolicy>,
    interval: Duration,
    cancel: CancellationToken,
    running: AtomicBool,
    ticks: AtomicU64,
    last_tick_at: RwLock<Option<DateTime<Utc>>>,
}

impl StatusSimulator {
    /// Create a simulator. Nothing happens until [`StatusSimulator::run`].
    #[must_use]
    pub fn new(
        writer: Arc<dyn OrderStatusWriter>,
        policy: Arc<dyn ExecutionPolicy>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            writer,
            policy,
            interval,
            cancel,
            running: AtomicBool::new(false),
            ticks: AtomicU64::new(0),
            last_tick_at: RwLock::new(None),
        }
    }

    /// Tick every interval until cancelled. The first pass runs one full
    /// interval after start.
    pub async fn run(&self) {
        self.running.store(true, Ordering::Relaxed);
        tracing::info!(
            interval_secs = self.interval.as_secs_f64(),
            "Status simulator started"
        );

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }

        self.running.store(false, Ordering::Relaxed);
        tracing::info!(
            ticks = self.ticks.load(Ordering::Relaxed),
            "Status simulator stopped"
        );
    }

    /// Run one pass now and return what moved.
    pub fn tick(&self) -> Vec<StatusTransition> {
        let now = Utc::now();
        let transitions = self.writer.advance_open_orders(self.policy.as_ref(), now);

        self.ticks.fetch_add(1, Ordering::Relaxed);
        *self.last_tick_at.write() = Some(now);

        for transition in &transitions {
            metrics::record_status_transition(transition.to);
            tracing::info!(
                order_id = %transition.order_id,
                user_id = %transition.user_id,
                from = %transition.from,
                to = %transition.to,
                "Order status advanced"
            );
        }
        if !transitions.is_empty() {
            tracing::debug!(count = transitions.len(), "Simulator pass complete");
        }

        transitions
    }

    /// Returns true while [`StatusSimulator::run`] is looping.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Time between two passes.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Passes completed so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Time of the last pass.
    #[must_use]
    pub fn last_tick_at(&self) -> Option<DateTime<Utc>> {
        *self.last_tick_at.read()
    }
}
