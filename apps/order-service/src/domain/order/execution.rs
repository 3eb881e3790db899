//! Execution decisions for pending orders.
//!
//! The simulator asks an [`ExecutionPolicy`] what happens to each pending
//! order on a tick. The random policy stands in for a real execution venue;
//! the fixed policy makes lifecycle tests deterministic.

use rand::Rng;

use super::aggregate::Order;
use super::status::OrderStatus;

/// Outcome for one pending order on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionDecision {
    /// Move to `FILLED`.
    Fill,
    /// Move to `REJECTED`.
    Reject,
    /// Stay `PENDING` until the next tick.
    Hold,
}

impl ExecutionDecision {
    /// Status the order lands in, or `None` when it is held.
    #[must_use]
    pub const fn target(self) -> Option<OrderStatus> {
        match self {
            Self::Fill => Some(OrderStatus::Filled),
            Self::Reject => Some(OrderStatus::Rejected),
            Self::Hold => None,
        }
    }
}

/// Decides the fate of pending orders.
pub trait ExecutionPolicy: Send + Sync {
    /// Decide what happens to a pending order on this tick.
    fn decide(&self, order: &Order) -> ExecutionDecision;
}

/// Fills with a fixed probability and rejects otherwise.
#[derive(Debug, Clone, Copy)]
pub struct RandomExecutionPolicy {
    fill_probability: f64,
}

impl RandomExecutionPolicy {
    /// Create a policy filling with `fill_probability`, clamped to `[0, 1]`.
    #[must_use]
    pub fn new(fill_probability: f64) -> Self {
        let fill_probability = if fill_probability.is_nan() {
            0.5
        } else {
            fill_probability.clamp(0.0, 1.0)
        };
        Self { fill_probability }
    }

    /// Probability of a fill.
    #[must_use]
    pub const fn fill_probability(&self) -> f64 {
        self.fill_probability
    }
}

impl Default for RandomExecutionPolicy {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl ExecutionPolicy for RandomExecutionPolicy {
    fn decide(&self, _order: &Order) -> ExecutionDecision {
        if rand::rng().random_bool(self.fill_probability) {
            ExecutionDecision::Fill
        } else {
            ExecutionDecision::Reject
        }
    }
}

/// Always returns the same decision.
#[derive(Debug, Clone, Copy)]
pub struct FixedExecutionPolicy(pub ExecutionDecision);

impl ExecutionPolicy for FixedExecutionPolicy {
    fn decide(&self, _order: &Order) -> ExecutionDecision {
        self.0
    }
}
