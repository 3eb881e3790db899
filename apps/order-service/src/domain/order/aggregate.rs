//! Order aggregate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::execution::ExecutionPolicy;
use super::identifiers::{MarketId, OrderId, UserId};
use super::status::{OrderStatus, OrderType};
use crate::domain::errors::ValidationError;

// =============================================================================
// New Order
// =============================================================================

/// A validated order request, not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    user_id: UserId,
    market_id: MarketId,
    order_type: OrderType,
    price: Decimal,
    quantity: u64,
}

impl NewOrder {
    /// Validate and build a new order.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the order type is unspecified, the
    /// quantity is zero, or the price is out of range for the order type.
    /// A limit price must be positive; a market order executes at the
    /// prevailing price, so its price may be zero but never negative.
    pub fn new(
        user_id: UserId,
        market_id: MarketId,
        order_type: OrderType,
        price: Decimal,
        quantity: u64,
    ) -> Result<Self, ValidationError> {
        if order_type == OrderType::Unspecified {
            return Err(ValidationError::new("order_type", "must be specified"));
        }
        match order_type {
            OrderType::Limit if price <= Decimal::ZERO => {
                return Err(ValidationError::new("price", "must be greater than zero"));
            }
            OrderType::Market if price < Decimal::ZERO => {
                return Err(ValidationError::new("price", "must not be negative"));
            }
            _ => {}
        }
        if quantity == 0 {
            return Err(ValidationError::new("quantity", "must be greater than zero"));
        }

        Ok(Self {
            user_id,
            market_id,
            order_type,
            price,
            quantity,
        })
    }

    /// Owning user.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Target market.
    #[must_use]
    pub const fn market_id(&self) -> MarketId {
        self.market_id
    }
}

// =============================================================================
// Order
// =============================================================================

/// A stored order.
///
/// Identity, owner and terms are fixed at creation. Status changes only
/// through [`Order::advance`], which follows the lifecycle edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    market_id: MarketId,
    order_type: OrderType,
    price: Decimal,
    quantity: u64,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Materialize a new order in `CREATED` status.
    #[must_use]
    pub fn create(id: OrderId, new: NewOrder, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: new.user_id,
            market_id: new.market_id,
            order_type: new.order_type,
            price: new.price,
            quantity: new.quantity,
            status: OrderStatus::Created,
            created_at,
            updated_at: None,
        }
    }

    /// Move one step along the lifecycle.
    ///
    /// `CREATED` always becomes `PENDING`. A `PENDING` order asks `policy`.
    /// Terminal orders never change. Returns the transition applied, if any.
    pub fn advance(
        &mut self,
        policy: &dyn ExecutionPolicy,
        at: DateTime<Utc>,
    ) -> Option<StatusTransition> {
        let next = match self.status {
            OrderStatus::Created => OrderStatus::Pending,
            OrderStatus::Pending => policy.decide(self).target()?,
            OrderStatus::Unspecified | OrderStatus::Filled | OrderStatus::Rejected => {
                return None;
            }
        };

        if !self.status.can_transition_to(next) {
            return None;
        }

        let transition = StatusTransition {
            order_id: self.id,
            user_id: self.user_id,
            from: self.status,
            to: next,
            at,
        };
        self.status = next;
        self.updated_at = Some(at);
        Some(transition)
    }

    /// Returns true if `user_id` owns this order.
    #[must_use]
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        self.user_id == *user_id
    }

    /// Snapshot of the fields a subscriber sees.
    #[must_use]
    pub const fn to_update(&self) -> OrderUpdate {
        OrderUpdate {
            order_id: self.id,
            status: self.status,
            updated_at: self.updated_at,
        }
    }

    /// Order ID.
    #[must_use]
    pub const fn id(&self) -> OrderId {
        self.id
    }

    /// Owning user.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Target market.
    #[must_use]
    pub const fn market_id(&self) -> MarketId {
        self.market_id
    }

    /// Order type.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Limit price.
    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.price
    }

    /// Quantity, always positive.
    #[must_use]
    pub const fn quantity(&self) -> u64 {
        self.quantity
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Creation time.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time of the last status change, if any.
    #[must_use]
    pub const fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

// =============================================================================
// Events
// =============================================================================

/// One status change applied by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    /// Order that moved.
    pub order_id: OrderId,
    /// Its owner.
    pub user_id: UserId,
    /// Status before.
    pub from: OrderStatus,
    /// Status after.
    pub to: OrderStatus,
    /// When it moved.
    pub at: DateTime<Utc>,
}

/// Status event delivered to a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderUpdate {
    /// Order the event is about.
    pub order_id: OrderId,
    /// Status observed.
    pub status: OrderStatus,
    /// Time of the last status change; `None` while still `CREATED`.
    pub updated_at: Option<DateTime<Utc>>,
}
