//! Order Lifecycle Service
//!
//! Orchestrates the three public operations:
//!
//! - **create**: validate, confirm the market is visible to the caller's
//!   roles, then store the order
//! - **query**: read the order and enforce ownership
//! - **subscribe**: enforce ownership once, then spawn a poller that
//!   streams status changes until cancelled
//!
//! This is the only component that talks to the market validator.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::field::{Empty, display};
use uuid::Uuid;

use super::subscription::{
    ActiveSubscription, OrderSubscription, SubscriptionConfig, SubscriptionHandle,
    SubscriptionPoller,
};
use crate::application::dto::{CreateOrderRequest, CreateOrderResponse, OrderQuery};
use crate::application::errors::OrderServiceError;
use crate::application::ports::MarketValidatorPort;
use crate::domain::{NewOrder, Order, OrderRepository, OrderStatus, ValidationError};
use crate::infrastructure::metrics::{self, MarketLookupOutcome};

/// Order lifecycle use cases.
pub struct OrderLifecycleService {
    orders: Arc<dyn OrderRepository>,
    markets: Arc<dyn MarketValidatorPort>,
    subscriptions: SubscriptionConfig,
    active_subscriptions: Arc<AtomicUsize>,
}

impl OrderLifecycleService {
    /// Create the service over a store and a market validator.
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        markets: Arc<dyn MarketValidatorPort>,
        subscriptions: SubscriptionConfig,
    ) -> Self {
        Self {
            orders,
            markets,
            subscriptions,
            active_subscriptions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Place a new order.
    ///
    /// Nothing is stored unless every check passes.
    ///
    /// # Errors
    ///
    /// - `Validation` if the request is malformed or carries no roles
    /// - `Unknown` if the market validator fails
    /// - `MarketNotFound` if the market is not visible to the caller's roles
    #[tracing::instrument(
        name = "order.create",
        skip_all,
        fields(
            request_id = Empty,
            user_id = %request.user_id,
            market_id = %request.market_id,
            order_id = Empty,
        )
    )]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<CreateOrderResponse, OrderServiceError> {
        let span = tracing::Span::current();
        let request_id = request
            .request_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        span.record("request_id", request_id.as_str());

        if request.user_roles.is_empty() {
            return Err(ValidationError::new("user_roles", "at least one role is required").into());
        }
        let new_order = NewOrder::new(
            request.user_id,
            request.market_id,
            request.order_type,
            request.price,
            request.quantity,
        )?;

        let markets = match self
            .markets
            .view_markets(&request.user_roles, &request_id)
            .await
        {
            Ok(markets) => {
                metrics::record_market_lookup(MarketLookupOutcome::Success);
                markets
            }
            Err(e) => {
                metrics::record_market_lookup(MarketLookupOutcome::Failure);
                tracing::warn!(
                    request_id = %request_id,
                    user_id = %request.user_id,
                    error = %e,
                    "Market lookup failed"
                );
                return Err(OrderServiceError::Unknown(e.to_string()));
            }
        };

        if !markets.iter().any(|m| m.id == new_order.market_id()) {
            tracing::info!(
                request_id = %request_id,
                user_id = %request.user_id,
                market_id = %request.market_id,
                "Market not visible to caller"
            );
            return Err(OrderServiceError::MarketNotFound(request.market_id));
        }

        let order = self.orders.create(new_order);
        span.record("order_id", display(order.id()));
        metrics::record_order_created(order.order_type());
        tracing::info!(
            request_id = %request_id,
            order_id = %order.id(),
            user_id = %order.user_id(),
            market_id = %order.market_id(),
            order_type = %order.order_type(),
            price = %order.price(),
            quantity = order.quantity(),
            "Order created"
        );

        Ok(CreateOrderResponse {
            order_id: order.id(),
            status: order.status(),
        })
    }

    /// Current status of an order owned by the caller.
    ///
    /// # Errors
    ///
    /// - `Unknown` if the order does not exist
    /// - `InvalidUserId` if the caller does not own it
    #[tracing::instrument(
        name = "order.get_status",
        skip_all,
        fields(order_id = %query.order_id, user_id = %query.user_id, status = Empty)
    )]
    pub fn get_order_status(&self, query: &OrderQuery) -> Result<OrderStatus, OrderServiceError> {
        let order = self
            .orders
            .get_by_id(&query.order_id)
            .map_err(|e| OrderServiceError::Unknown(e.to_string()))?;
        authorize(&order, query)?;
        tracing::Span::current().record("status", display(order.status()));
        Ok(order.status())
    }

    /// Start streaming status changes of an order owned by the caller.
    ///
    /// The poller runs under a child of `parent`, so cancelling `parent`
    /// (request end, process shutdown) also stops it. Dropping the
    /// returned subscription stops it too.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - `InvalidOrderId` if the order does not exist
    /// - `InvalidUserId` if the caller does not own it
    #[tracing::instrument(
        name = "order.subscribe",
        skip_all,
        fields(order_id = %query.order_id, user_id = %query.user_id)
    )]
    pub fn subscribe_to_order_status(
        &self,
        query: OrderQuery,
        parent: &CancellationToken,
    ) -> Result<OrderSubscription, OrderServiceError> {
        let order = self
            .orders
            .get_by_id(&query.order_id)
            .map_err(|_| OrderServiceError::InvalidOrderId(query.order_id))?;
        authorize(&order, &query)?;

        let token = parent.child_token();
        let (tx, rx) = mpsc::channel(self.subscriptions.buffer_capacity.max(1));
        let poller = SubscriptionPoller::new(
            Arc::clone(&self.orders),
            query,
            self.subscriptions.poll_interval,
            ActiveSubscription::register(Arc::clone(&self.active_subscriptions)),
        );
        tokio::spawn(poller.run(tx, token.clone()));

        tracing::info!(
            order_id = %query.order_id,
            user_id = %query.user_id,
            "Subscription opened"
        );

        Ok(OrderSubscription::new(rx, SubscriptionHandle::new(token)))
    }

    /// Pollers currently running.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.active_subscriptions.load(Ordering::Relaxed)
    }

    /// Orders in the store.
    #[must_use]
    pub fn stored_orders(&self) -> usize {
        self.orders.len()
    }
}

fn authorize(order: &Order, query: &OrderQuery) -> Result<(), OrderServiceError> {
    if order.is_owned_by(&query.user_id) {
        Ok(())
    } else {
        tracing::warn!(
            order_id = %query.order_id,
            user_id = %query.user_id,
            "Order owner mismatch"
        );
        Err(OrderServiceError::InvalidUserId {
            order_id: query.order_id,
            user_id: query.user_id,
        })
    }
}
