//! Order DTOs.

use rust_decimal::Decimal;

use crate::domain::{MarketId, OrderId, OrderStatus, OrderType, UserId, UserRole};

/// Input to `create_order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrderRequest {
    /// Caller placing the order.
    pub user_id: UserId,
    /// Target market.
    pub market_id: MarketId,
    /// Order type.
    pub order_type: OrderType,
    /// Limit price.
    pub price: Decimal,
    /// Quantity.
    pub quantity: u64,
    /// Caller roles, used for market visibility.
    pub user_roles: Vec<UserRole>,
    /// Correlation ID of the inbound call; a fresh one is generated if absent.
    pub request_id: Option<String>,
}

/// Result of `create_order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateOrderResponse {
    /// Generated order ID.
    pub order_id: OrderId,
    /// Initial status, always `CREATED`.
    pub status: OrderStatus,
}

/// An order addressed on behalf of a caller.
///
/// Used by both status queries and subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderQuery {
    /// Order requested.
    pub order_id: OrderId,
    /// Caller; must own the order.
    pub user_id: UserId,
}
