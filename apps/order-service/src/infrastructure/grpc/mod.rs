//! gRPC Server
//!
//! Exposes the order lifecycle over two services:
//!
//! - `OrderSyncService`: `CreateOrder`, `GetOrderStatus`
//! - `OrderStreamService`: server-streaming `StreamOrderUpdates`
//!
//! Wire messages are parsed into typed DTOs in `converters` before the
//! lifecycle service sees them; failures there answer `INVALID_ARGUMENT`.
//! `status` maps lifecycle errors onto gRPC codes with rich error details.

pub mod converters;
pub mod interceptor;
pub mod server;
pub mod status;

// Allow clippy warnings and missing docs in generated code
#[allow(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
pub mod proto {
    pub mod common {
        pub mod v1 {
            include!(concat!(env!("OUT_DIR"), "/common.v1.rs"));
        }
    }
    pub mod order {
        pub mod v1 {
            include!(concat!(env!("OUT_DIR"), "/order.v1.rs"));
        }
    }
    pub mod spot_instrument {
        pub mod v1 {
            include!(concat!(env!("OUT_DIR"), "/spot_instrument.v1.rs"));
        }
    }
}

pub use interceptor::{REQUEST_ID_HEADER, RequestId, request_id_interceptor};
pub use server::{OrderGrpcServer, OrderUpdatesStream};
