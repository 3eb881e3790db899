//! Markets and caller roles.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::order::MarketId;

/// Role of the caller; decides which markets are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Not set.
    Unspecified,
    /// Can place orders.
    Trader,
    /// Read-only access.
    Viewer,
    /// Full access.
    Admin,
}

impl UserRole {
    /// Get the canonical name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "UNSPECIFIED",
            Self::Trader => "TRADER",
            Self::Viewer => "VIEWER",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A market as reported by the market validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    /// Market ID.
    pub id: MarketId,
    /// Display name.
    pub name: String,
    /// Whether trading is enabled.
    pub enabled: bool,
    /// Soft-delete time, if deleted.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Roles allowed to see the market.
    pub allowed_roles: Vec<UserRole>,
}

/// Cache key for the market list visible to `roles`.
///
/// Order and duplicates do not matter: `[ADMIN, TRADER, ADMIN]` and
/// `[TRADER, ADMIN]` share `markets:ADMIN,TRADER`.
#[must_use]
pub fn roles_fingerprint(roles: &[UserRole]) -> String {
    let mut names: Vec<&str> = roles.iter().map(UserRole::as_str).collect();
    names.sort_unstable();
    names.dedup();
    format!("markets:{}", names.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_order_and_duplicate_insensitive() {
        let a = roles_fingerprint(&[UserRole::Admin, UserRole::Trader, UserRole::Admin]);
        let b = roles_fingerprint(&[UserRole::Trader, UserRole::Admin]);
        assert_eq!(a, b);
        assert_eq!(a, "markets:ADMIN,TRADER");
    }

    #[test]
    fn fingerprint_of_no_roles() {
        assert_eq!(roles_fingerprint(&[]), "markets:");
    }

    #[test]
    fn role_serde_names() {
        assert_eq!(serde_json::to_string(&UserRole::Viewer).unwrap(), "\"VIEWER\"");
        let role: UserRole = serde_json::from_str("\"TRADER\"").unwrap();
        assert_eq!(role, UserRole::Trader);
    }
}
