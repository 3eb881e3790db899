//! Order storage ports.
//!
//! Reads and writes are short critical sections over process memory, so
//! the traits are synchronous. Implementations must hand out owned
//! snapshots only; no caller ever holds a reference into the store.

use chrono::{DateTime, Utc};

use super::aggregate::{NewOrder, Order, StatusTransition};
use super::execution::ExecutionPolicy;
use super::identifiers::OrderId;
use crate::domain::errors::StoreError;

/// Create and read orders.
pub trait OrderRepository: Send + Sync {
    /// Store a new order under a freshly generated ID.
    ///
    /// Never fails for a validated `NewOrder`. Returns the stored snapshot.
    fn create(&self, order: NewOrder) -> Order;

    /// Snapshot of one order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no order has this ID.
    fn get_by_id(&self, id: &OrderId) -> Result<Order, StoreError>;

    /// Number of stored orders.
    fn len(&self) -> usize;

    /// Returns true if nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bulk status advancement, used only by the status simulator.
pub trait OrderStatusWriter: Send + Sync {
    /// Advance every open order one step in a single exclusive pass.
    ///
    /// Readers see either the whole pass or none of it.
    fn advance_open_orders(
        &self,
        policy: &dyn ExecutionPolicy,
        at: DateTime<Utc>,
    ) -> Vec<StatusTransition>;
}
