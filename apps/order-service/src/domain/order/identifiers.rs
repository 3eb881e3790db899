//! Strongly-typed identifiers for orders, users and markets.
//!
//! All three are UUIDs on the wire; the newtypes keep an order ID from
//! being passed where a user ID is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::ValidationError;

macro_rules! define_id {
    ($name:ident, $field:literal, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wrap an existing UUID.
            #[must_use]
            pub const fn new(value: Uuid) -> Self {
                Self(value)
            }

            /// Generate a new unique identifier using UUID v4.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse the canonical string form.
            ///
            /// # Errors
            ///
            /// Returns `ValidationError` if `value` is not a UUID.
            pub fn parse(value: &str) -> Result<Self, ValidationError> {
                if value.is_empty() {
                    return Err(ValidationError::new($field, "is required"));
                }
                Uuid::parse_str(value)
                    .map(Self)
                    .map_err(|_| ValidationError::new($field, "must be a valid UUID"))
            }

            /// Get the inner UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

define_id!(OrderId, "order_id", "Unique identifier for an order.");
define_id!(UserId, "user_id", "Identifier of the user owning an order.");
define_id!(MarketId, "market_id", "Identifier of a tradeable market.");
