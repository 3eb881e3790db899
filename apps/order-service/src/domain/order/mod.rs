//! Order aggregate, lifecycle state machine and storage ports.

mod aggregate;
mod execution;
mod identifiers;
mod repository;
mod status;

pub use aggregate::{NewOrder, Order, OrderUpdate, StatusTransition};
pub use execution::{
    ExecutionDecision, ExecutionPolicy, FixedExecutionPolicy, RandomExecutionPolicy,
};
pub use identifiers::{MarketId, OrderId, UserId};
pub use repository::{OrderRepository, OrderStatusWriter};
pub use status::{OrderStatus, OrderType};
