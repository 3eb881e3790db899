//! Order type and order status.
//!
//! # State Machine
//!
//! ```text
//! CREATED ──► PENDING ──┬──► FILLED
//!                       └──► REJECTED
//! ```
//!
//! `FILLED` and `REJECTED` are absorbing. No other edge exists, so a status
//! observed later is always reachable from one observed earlier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How an order is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Not set by the caller. Never accepted for a new order.
    #[default]
    Unspecified,
    /// Limit order at the given price.
    Limit,
    /// Market order.
    Market,
}

impl OrderType {
    /// Get the canonical name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "UNSPECIFIED",
            Self::Limit => "LIMIT",
            Self::Market => "MARKET",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// No status. Never stored; only appears on malformed wire input.
    #[default]
    Unspecified,
    /// Accepted and stored.
    Created,
    /// Awaiting an execution decision.
    Pending,
    /// Executed.
    Filled,
    /// Refused by execution.
    Rejected,
}

impl OrderStatus {
    /// Returns true if no further transition can occur.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Rejected)
    }

    /// Returns true if the simulator should still look at this order.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Created | Self::Pending)
    }

    /// Returns true if `next` is a direct edge from this status.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Pending)
                | (Self::Pending, Self::Filled | Self::Rejected)
        )
    }

    /// Returns true if `later` can be observed after this status.
    ///
    /// Reflexive: a status is reachable from itself.
    #[must_use]
    pub fn can_reach(&self, later: Self) -> bool {
        *self == later || self.stage() < later.stage()
    }

    /// Position along the lifecycle; terminal statuses share the last stage.
    #[must_use]
    pub const fn stage(&self) -> u8 {
        match self {
            Self::Unspecified => 0,
            Self::Created => 1,
            Self::Pending => 2,
            Self::Filled | Self::Rejected => 3,
        }
    }

    /// Get the canonical name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "UNSPECIFIED",
            Self::Created => "CREATED",
            Self::Pending => "PENDING",
            Self::Filled => "FILLED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
