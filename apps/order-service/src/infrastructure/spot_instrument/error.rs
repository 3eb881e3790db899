//! Error types for the spot instrument client.

use thiserror::Error;

use super::retry::is_retryable;
use crate::application::ports::MarketValidatorError;

/// Errors from talking to the spot instrument service.
#[derive(Error, Debug)]
pub enum SpotInstrumentError {
    /// Endpoint or settings are unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// What is wrong.
        message: String,
    },

    /// gRPC status returned by the service or the transport.
    #[error("grpc error: {0}")]
    Status(#[from] tonic::Status),

    /// Transient failures persisted through every retry.
    #[error("gave up after {attempts} attempts: {message}")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// Last failure.
        message: String,
    },

    /// Response could not be mapped to domain markets.
    #[error("invalid response: {message}")]
    InvalidResponse {
        /// What failed to decode.
        message: String,
    },
}

impl From<SpotInstrumentError> for MarketValidatorError {
    fn from(err: SpotInstrumentError) -> Self {
        match err {
            SpotInstrumentError::Status(status) if is_retryable(status.code()) => {
                Self::Unavailable(status.message().to_string())
            }
            SpotInstrumentError::Status(status) => Self::Rejected(format!(
                "{:?}: {}",
                status.code(),
                status.message()
            )),
            other @ (SpotInstrumentError::InvalidConfig { .. }
            | SpotInstrumentError::RetriesExhausted { .. }) => Self::Unavailable(other.to_string()),
            SpotInstrumentError::InvalidResponse { message } => Self::InvalidResponse(message),
        }
    }
}
