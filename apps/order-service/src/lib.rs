#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Order Service - Order Lifecycle over gRPC
//!
//! Accepts orders against markets visible to the caller's roles, moves them
//! through a simulated execution lifecycle, and streams status changes to
//! subscribers.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: the order aggregate and its status state machine
//!   - `order`: identifiers, `Order`, `OrderStatus`, execution policies,
//!     storage ports
//!   - `market`: markets and caller roles
//!
//! - **Application**: use cases and port definitions
//!   - `ports`: market validator, markets cache
//!   - `services`: order lifecycle, subscriptions, status simulator
//!
//! - **Infrastructure**: adapters and process plumbing
//!   - `persistence`: in-memory order store
//!   - `spot_instrument`: gRPC market validator client with retries
//!   - `cache`: markets cache and caching validator
//!   - `grpc`: `OrderSyncService` / `OrderStreamService`
//!   - `config`, `telemetry`, `metrics`, `health`
//!
//! # Order Lifecycle
//!
//! ```text
//! CREATED ──► PENDING ──┬──► FILLED
//!                       └──► REJECTED
//! ```
//!
//! The simulator advances every open order by at most one step per tick.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - order lifecycle types with no I/O.
pub mod domain;

/// Application layer - use cases and port definitions.
pub mod application;

/// Infrastructure layer - adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::{
    ExecutionDecision, ExecutionPolicy, FixedExecutionPolicy, Market, MarketId, NewOrder, Order,
    OrderId, OrderStatus, OrderType, OrderUpdate, RandomExecutionPolicy, UserId, UserRole,
};

// Application services
pub use application::OrderServiceError;
pub use application::dto::{CreateOrderRequest, CreateOrderResponse, OrderQuery};
pub use application::ports::{MarketValidatorError, MarketValidatorPort};
pub use application::services::{
    OrderLifecycleService, OrderSubscription, StatusSimulator, StatusSimulatorConfig,
    SubscriptionConfig, SubscriptionHandle,
};

// Infrastructure config
pub use infrastructure::config::{CacheSettings, ConfigError, ServerSettings, ServiceConfig};

// Adapters
pub use infrastructure::cache::{CachedMarketValidator, InMemoryMarketsCache};
pub use infrastructure::persistence::InMemoryOrderStore;
pub use infrastructure::spot_instrument::{SpotInstrumentClient, SpotInstrumentConfig};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// gRPC (for integration tests)
pub use infrastructure::grpc::{
    OrderGrpcServer, REQUEST_ID_HEADER,
    proto::common::v1 as common_proto, proto::order::v1 as proto,
    proto::spot_instrument::v1 as spot_proto,
};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
