//! Data Transfer Objects
//!
//! Typed inputs and outputs of the order lifecycle operations. The gRPC
//! layer parses wire messages into these; the service never sees raw
//! strings.

mod order_dto;

pub use order_dto::{CreateOrderRequest, CreateOrderResponse, OrderQuery};
