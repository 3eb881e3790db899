//! Order lifecycle errors.
//!
//! | Variant | Meaning |
//! |---------|---------|
//! | `Validation` | malformed request, rejected before any lookup |
//! | `MarketNotFound` | market absent or not visible to the caller's roles |
//! | `InvalidUserId` | order exists but belongs to someone else |
//! | `InvalidOrderId` | order does not exist (subscription setup) |
//! | `Unknown` | collaborator or store failure |

use thiserror::Error;

use crate::domain::{MarketId, OrderId, UserId, ValidationError};

/// Errors returned by the order lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderServiceError {
    /// Request failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Market is not visible to the caller.
    #[error("market not found: {0}")]
    MarketNotFound(MarketId),

    /// Caller does not own the order.
    #[error("order {order_id} does not belong to user {user_id}")]
    InvalidUserId {
        /// Order requested.
        order_id: OrderId,
        /// Caller.
        user_id: UserId,
    },

    /// Order does not exist.
    #[error("order not found: {0}")]
    InvalidOrderId(OrderId),

    /// Opaque failure from a collaborator or the store.
    #[error("{0}")]
    Unknown(String),
}

impl OrderServiceError {
    /// Stable machine-readable reason code.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::MarketNotFound(_) => "MARKET_NOT_FOUND",
            Self::InvalidUserId { .. } => "INVALID_USER_ID",
            Self::InvalidOrderId(_) => "INVALID_ORDER_ID",
            Self::Unknown(_) => "UNKNOWN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_are_distinct() {
        let order_id = OrderId::generate();
        let errors = [
            OrderServiceError::Validation(ValidationError::new("price", "bad")),
            OrderServiceError::MarketNotFound(MarketId::generate()),
            OrderServiceError::InvalidUserId {
                order_id,
                user_id: UserId::generate(),
            },
            OrderServiceError::InvalidOrderId(order_id),
            OrderServiceError::Unknown("boom".to_string()),
        ];
        let mut reasons: Vec<_> = errors.iter().map(OrderServiceError::reason).collect();
        reasons.sort_unstable();
        reasons.dedup();
        assert_eq!(reasons.len(), errors.len());
    }

    #[test]
    fn validation_is_transparent() {
        let err: OrderServiceError = ValidationError::new("quantity", "must be greater than zero").into();
        assert_eq!(err.to_string(), "invalid quantity: must be greater than zero");
    }
}
