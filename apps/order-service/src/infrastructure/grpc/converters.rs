//! Conversions between protobuf messages and domain types.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use prost_types::Timestamp;
use rust_decimal::Decimal;

use super::proto::common::v1 as common_proto;
use super::proto::order::v1 as order_proto;
use super::proto::spot_instrument::v1 as spot_proto;
use crate::application::dto::{CreateOrderRequest, OrderQuery};
use crate::domain::{
    Market, MarketId, OrderId, OrderStatus, OrderType, OrderUpdate, UserId, UserRole,
    ValidationError,
};

// =============================================================================
// Requests
// =============================================================================

/// Parse a `CreateOrder` request.
///
/// # Errors
///
/// Returns `ValidationError` naming the first malformed field.
pub fn create_order_from_proto(
    req: order_proto::CreateOrderRequest,
) -> Result<CreateOrderRequest, ValidationError> {
    let user_id = UserId::parse(&req.user_id)?;
    let market_id = MarketId::parse(&req.market_id)?;
    let order_type = order_type_from_proto(req.order_type)?;
    let price = parse_price(&req.price)?;
    let quantity = u64::try_from(req.quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| ValidationError::new("quantity", "must be greater than zero"))?;

    if req.user_roles.is_empty() {
        return Err(ValidationError::new("user_roles", "at least one role is required"));
    }
    let user_roles = req
        .user_roles
        .into_iter()
        .map(caller_role_from_proto)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CreateOrderRequest {
        user_id,
        market_id,
        order_type,
        price,
        quantity,
        user_roles,
        request_id: None,
    })
}

/// Parse an (order ID, user ID) pair.
///
/// # Errors
///
/// Returns `ValidationError` if either ID is missing or not a UUID.
pub fn order_query_from_proto(order_id: &str, user_id: &str) -> Result<OrderQuery, ValidationError> {
    Ok(OrderQuery {
        order_id: OrderId::parse(order_id)?,
        user_id: UserId::parse(user_id)?,
    })
}

fn parse_price(raw: &str) -> Result<Decimal, ValidationError> {
    if raw.trim().is_empty() {
        return Err(ValidationError::new("price", "is required"));
    }
    Decimal::from_str(raw.trim())
        .map_err(|_| ValidationError::new("price", "must be a decimal number"))
}

fn order_type_from_proto(value: i32) -> Result<OrderType, ValidationError> {
    match order_proto::OrderType::try_from(value) {
        Ok(order_proto::OrderType::Limit) => Ok(OrderType::Limit),
        Ok(order_proto::OrderType::Market) => Ok(OrderType::Market),
        Ok(order_proto::OrderType::Unspecified) => {
            Err(ValidationError::new("order_type", "must be specified"))
        }
        Err(_) => Err(ValidationError::new("order_type", format!("unknown value {value}"))),
    }
}

fn caller_role_from_proto(value: i32) -> Result<UserRole, ValidationError> {
    match role_from_proto(value) {
        Some(UserRole::Unspecified) => Err(ValidationError::new(
            "user_roles",
            "must not contain USER_ROLE_UNSPECIFIED",
        )),
        Some(role) => Ok(role),
        None => Err(ValidationError::new("user_roles", format!("unknown role {value}"))),
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Map a wire role; `None` for values this build does not know.
#[must_use]
pub fn role_from_proto(value: i32) -> Option<UserRole> {
    match common_proto::UserRole::try_from(value).ok()? {
        common_proto::UserRole::Unspecified => Some(UserRole::Unspecified),
        common_proto::UserRole::Trader => Some(UserRole::Trader),
        common_proto::UserRole::Viewer => Some(UserRole::Viewer),
        common_proto::UserRole::Admin => Some(UserRole::Admin),
    }
}

/// Map a domain role to the wire enum.
#[must_use]
pub const fn role_to_proto(role: UserRole) -> common_proto::UserRole {
    match role {
        UserRole::Unspecified => common_proto::UserRole::Unspecified,
        UserRole::Trader => common_proto::UserRole::Trader,
        UserRole::Viewer => common_proto::UserRole::Viewer,
        UserRole::Admin => common_proto::UserRole::Admin,
    }
}

/// Map a domain status to the wire enum.
#[must_use]
pub const fn status_to_proto(status: OrderStatus) -> order_proto::OrderStatus {
    match status {
        OrderStatus::Unspecified => order_proto::OrderStatus::Unspecified,
        OrderStatus::Created => order_proto::OrderStatus::Created,
        OrderStatus::Pending => order_proto::OrderStatus::Pending,
        OrderStatus::Filled => order_proto::OrderStatus::Filled,
        OrderStatus::Rejected => order_proto::OrderStatus::Rejected,
    }
}

/// Map a wire status to the domain; unknown values become `Unspecified`.
#[must_use]
pub fn status_from_proto(value: i32) -> OrderStatus {
    match order_proto::OrderStatus::try_from(value) {
        Ok(order_proto::OrderStatus::Created) => OrderStatus::Created,
        Ok(order_proto::OrderStatus::Pending) => OrderStatus::Pending,
        Ok(order_proto::OrderStatus::Filled) => OrderStatus::Filled,
        Ok(order_proto::OrderStatus::Rejected) => OrderStatus::Rejected,
        Ok(order_proto::OrderStatus::Unspecified) | Err(_) => OrderStatus::Unspecified,
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Encode a subscriber event.
#[must_use]
pub fn update_to_proto(update: &OrderUpdate) -> order_proto::OrderUpdate {
    order_proto::OrderUpdate {
        order_id: update.order_id.to_string(),
        status: status_to_proto(update.status).into(),
        updated_at: update.updated_at.map(datetime_to_timestamp),
    }
}

/// Decode a market from the spot instrument service.
///
/// Roles this build does not recognise are dropped.
///
/// # Errors
///
/// Returns `ValidationError` if the market ID is not a UUID.
pub fn market_from_proto(market: spot_proto::Market) -> Result<Market, ValidationError> {
    Ok(Market {
        id: MarketId::parse(&market.id)?,
        name: market.name,
        enabled: market.enabled,
        deleted_at: market.deleted_at.and_then(timestamp_to_datetime),
        allowed_roles: market
            .allowed_roles
            .into_iter()
            .filter_map(role_from_proto)
            .collect(),
    })
}

/// Convert chrono `DateTime` to protobuf `Timestamp`.
#[must_use]
pub fn datetime_to_timestamp(dt: DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: dt.timestamp(),
        nanos: i32::try_from(dt.timestamp_subsec_nanos()).unwrap_or(0),
    }
}

/// Convert protobuf `Timestamp` to chrono `DateTime`, if in range.
#[must_use]
pub fn timestamp_to_datetime(ts: Timestamp) -> Option<DateTime<Utc>> {
    let nanos = u32::try_from(ts.nanos).ok()?;
    DateTime::from_timestamp(ts.seconds, nanos)
}
