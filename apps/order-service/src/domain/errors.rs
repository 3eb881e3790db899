//! Domain errors.

use thiserror::Error;

use super::order::OrderId;

/// A request field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    field: &'static str,
    message: String,
}

impl ValidationError {
    /// Create a validation error for a named field.
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    /// Name of the offending field.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        self.field
    }

    /// Human-readable reason.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Order store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No order with this ID exists.
    #[error("order not found: {0}")]
    NotFound(OrderId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display_names_field() {
        let err = ValidationError::new("quantity", "must be greater than zero");
        assert_eq!(err.field(), "quantity");
        assert_eq!(err.to_string(), "invalid quantity: must be greater than zero");
    }

    #[test]
    fn store_error_display_includes_id() {
        let id = OrderId::generate();
        let err = StoreError::NotFound(id);
        assert_eq!(err.to_string(), format!("order not found: {id}"));
    }
}
