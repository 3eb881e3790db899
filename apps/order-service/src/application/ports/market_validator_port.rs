//! Market Validator Port (Driven Port)
//!
//! Resolves which markets a caller may trade given their roles.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Market, UserRole};

/// Market validator failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketValidatorError {
    /// Validator could not be reached or timed out.
    #[error("market validator unavailable: {0}")]
    Unavailable(String),

    /// Validator answered with an error status.
    #[error("market validator rejected request: {0}")]
    Rejected(String),

    /// Validator answered with data that does not decode.
    #[error("invalid market data: {0}")]
    InvalidResponse(String),
}

/// Port for listing markets visible to a set of roles.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketValidatorPort: Send + Sync {
    /// List the markets visible to `roles`.
    ///
    /// `request_id` is the caller's correlation ID and is forwarded to the
    /// validator when it is a remote service.
    ///
    /// # Errors
    ///
    /// Returns `MarketValidatorError` if the lookup fails.
    async fn view_markets(
        &self,
        roles: &[UserRole],
        request_id: &str,
    ) -> Result<Vec<Market>, MarketValidatorError>;
}
