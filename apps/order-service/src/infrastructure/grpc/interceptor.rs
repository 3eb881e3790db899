//! Request ID propagation.

use tonic::metadata::MetadataValue;
use tonic::{Request, Status};
use uuid::Uuid;

/// Metadata key carrying the caller's request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Borrow the ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Tonic interceptor: reuse `x-request-id` or generate one.
///
/// The ID is stored as a [`RequestId`] extension and echoed into the
/// request metadata so downstream layers see the same value.
///
/// # Errors
///
/// Never fails; the signature is the one tonic expects.
#[allow(clippy::result_large_err, clippy::unnecessary_wraps)]
pub fn request_id_interceptor(mut request: Request<()>) -> Result<Request<()>, Status> {
    let id = request
        .metadata()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);

    if let Ok(value) = MetadataValue::try_from(id.as_str()) {
        request.metadata_mut().insert(REQUEST_ID_HEADER, value);
    }
    request.extensions_mut().insert(RequestId(id));
    Ok(request)
}

/// Request ID of an intercepted request, or `"-"` when absent.
#[must_use]
pub fn request_id<T>(request: &Request<T>) -> &str {
    request
        .extensions()
        .get::<RequestId>()
        .map_or("-", RequestId::as_str)
}
