//! Domain Layer - Order lifecycle types with no I/O.
//!
//! - `order`: the order aggregate, its status state machine, and the
//!   storage ports the rest of the service talks to.
//! - `market`: markets and caller roles as returned by market validation.
//! - `errors`: validation and storage errors raised by domain code.

pub mod errors;
pub mod market;
pub mod order;

pub use errors::{StoreError, ValidationError};
pub use market::{Market, UserRole, roles_fingerprint};
pub use order::{
    ExecutionDecision, ExecutionPolicy, FixedExecutionPolicy, MarketId, NewOrder, Order, OrderId,
    OrderRepository, OrderStatus, OrderStatusWriter, OrderType, OrderUpdate,
    RandomExecutionPolicy, StatusTransition, UserId,
};
