//! Mapping of lifecycle errors onto gRPC statuses.
//!
//! Every status carries a `google.rpc.ErrorInfo` detail with a stable
//! reason code and the `order.service` domain. Validation failures add a
//! `BadRequest` field violation.

use std::collections::HashMap;

use tonic::{Code, Status};
use tonic_types::{ErrorDetails, StatusExt};

use crate::application::OrderServiceError;
use crate::domain::ValidationError;

/// Error domain reported in `ErrorInfo`.
pub const ERROR_DOMAIN: &str = "order.service";

/// gRPC code for a lifecycle error.
#[must_use]
pub const fn grpc_code(err: &OrderServiceError) -> Code {
    match err {
        OrderServiceError::Validation(_)
        | OrderServiceError::InvalidUserId { .. }
        | OrderServiceError::InvalidOrderId(_) => Code::InvalidArgument,
        OrderServiceError::MarketNotFound(_) => Code::NotFound,
        OrderServiceError::Unknown(_) => Code::Internal,
    }
}

/// Convert a lifecycle error to a tonic `Status` with rich error details.
#[must_use]
pub fn to_status(err: &OrderServiceError) -> Status {
    let mut metadata = HashMap::new();
    match err {
        OrderServiceError::Validation(v) => {
            metadata.insert("field".to_string(), v.field().to_string());
        }
        OrderServiceError::MarketNotFound(market_id) => {
            metadata.insert("market_id".to_string(), market_id.to_string());
        }
        OrderServiceError::InvalidUserId { order_id, user_id } => {
            metadata.insert("order_id".to_string(), order_id.to_string());
            metadata.insert("user_id".to_string(), user_id.to_string());
        }
        OrderServiceError::InvalidOrderId(order_id) => {
            metadata.insert("order_id".to_string(), order_id.to_string());
        }
        OrderServiceError::Unknown(_) => {}
    }

    let mut details = ErrorDetails::new();
    details.set_error_info(err.reason(), ERROR_DOMAIN, metadata);
    if let OrderServiceError::Validation(v) = err {
        details.add_bad_request_violation(v.field(), v.message());
    }

    // Collaborator messages are not forwarded to callers
    let message = match err {
        OrderServiceError::Unknown(_) => "internal error".to_string(),
        other => other.to_string(),
    };

    Status::with_error_details(grpc_code(err), message, details)
}

/// Status for a request that failed wire-level parsing.
#[must_use]
pub fn invalid_argument(err: ValidationError) -> Status {
    to_status(&OrderServiceError::Validation(err))
}

impl From<OrderServiceError> for Status {
    fn from(err: OrderServiceError) -> Self {
        to_status(&err)
    }
}
