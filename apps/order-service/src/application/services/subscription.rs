//! Order Status Subscriptions
//!
//! A subscription is one polling task per (order, user) pair. Each tick it
//! reads the order, re-checks ownership, and pushes an [`OrderUpdate`] when
//! the status differs from the last one delivered. Intermediate statuses
//! that appear and vanish between two ticks are never seen.
//!
//! The delivery queue is bounded. A consumer that stops draining it stalls
//! the poller on `send` until it reads again or the subscription is
//! cancelled.
//!
//! The task ends when its token is cancelled, when the consumer drops the
//! receiver, or when the [`SubscriptionHandle`] is dropped. The sender is
//! owned by the task, so the queue closes exactly once, when the task
//! returns.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::application::dto::OrderQuery;
use crate::domain::{OrderRepository, OrderStatus, OrderUpdate};
use crate::infrastructure::metrics;

// =============================================================================
// Configuration
// =============================================================================

/// Subscription tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionConfig {
    /// Time between two reads of the order.
    pub poll_interval: Duration,
    /// Capacity of the delivery queue.
    pub buffer_capacity: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            buffer_capacity: 10,
        }
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Stops a subscription's polling task.
///
/// Dropping the handle cancels too, so a consumer that goes away without
/// calling [`SubscriptionHandle::cancel`] still releases the task.
#[derive(Debug)]
pub struct SubscriptionHandle {
    token: CancellationToken,
}

impl SubscriptionHandle {
    pub(crate) const fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Stop the polling task. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once cancelled, by this handle or by its parent token.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// A live sequence of status updates for one order.
#[derive(Debug)]
pub struct OrderSubscription {
    updates: mpsc::Receiver<OrderUpdate>,
    handle: SubscriptionHandle,
}

impl OrderSubscription {
    pub(crate) const fn new(updates: mpsc::Receiver<OrderUpdate>, handle: SubscriptionHandle) -> Self {
        Self { updates, handle }
    }

    /// Next update, or `None` once the subscription has ended.
    pub async fn recv(&mut self) -> Option<OrderUpdate> {
        self.updates.recv().await
    }

    /// Stop the subscription. Updates already queued can still be read.
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Split into the receiver and the handle that keeps it alive.
    #[must_use]
    pub fn into_parts(self) -> (mpsc::Receiver<OrderUpdate>, SubscriptionHandle) {
        (self.updates, self.handle)
    }
}

// =============================================================================
// Active Subscription Tracking
// =============================================================================

/// Counts a running poller for as long as it lives.
pub(crate) struct ActiveSubscription {
    counter: Arc<AtomicUsize>,
}

impl ActiveSubscription {
    pub(crate) fn register(counter: Arc<AtomicUsize>) -> Self {
        let active = counter.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::set_active_subscriptions(active);
        Self { counter }
    }
}

impl Drop for ActiveSubscription {
    fn drop(&mut self) {
        let active = self.counter.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
        metrics::set_active_subscriptions(active);
    }
}

// =============================================================================
// Poller
// =============================================================================

/// Polling task behind one subscription.
pub(crate) struct SubscriptionPoller {
    orders: Arc<dyn OrderRepository>,
    query: OrderQuery,
    poll_interval: Duration,
    last_seen: Option<OrderStatus>,
    _active: ActiveSubscription,
}

impl SubscriptionPoller {
    pub(crate) fn new(
        orders: Arc<dyn OrderRepository>,
        query: OrderQuery,
        poll_interval: Duration,
        active: ActiveSubscription,
    ) -> Self {
        Self {
            orders,
            query,
            poll_interval,
            last_seen: None,
            _active: active,
        }
    }

    /// Poll until cancelled or until the consumer goes away.
    pub(crate) async fn run(mut self, tx: mpsc::Sender<OrderUpdate>, cancel: CancellationToken) {
        let order_id = self.query.order_id;
        tracing::debug!(order_id = %order_id, "Subscription started");

        // First tick completes immediately, so a new subscriber sees the
        // current status without waiting a full interval.
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tx.closed() => break,
                _ = ticker.tick() => {}
            }

            let Some(update) = self.poll() else {
                continue;
            };

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                sent = tx.send(update) => {
                    if sent.is_err() {
                        break;
                    }
                    metrics::record_update_streamed(update.status);
                    tracing::debug!(
                        order_id = %order_id,
                        status = %update.status,
                        "Order update delivered"
                    );
                }
            }
        }

        tracing::debug!(order_id = %order_id, "Subscription closed");
    }

    /// One read of the order. Returns an update only when the status moved.
    fn poll(&mut self) -> Option<OrderUpdate> {
        let order = match self.orders.get_by_id(&self.query.order_id) {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!(
                    order_id = %self.query.order_id,
                    error = %e,
                    "Subscription poll failed, skipping tick"
                );
                return None;
            }
        };

        if !order.is_owned_by(&self.query.user_id) {
            tracing::warn!(
                order_id = %self.query.order_id,
                user_id = %self.query.user_id,
                "Subscription owner mismatch, skipping tick"
            );
            return None;
        }

        let status = order.status();
        if self.last_seen == Some(status) {
            return None;
        }
        self.last_seen = Some(status);
        Some(order.to_update())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ExecutionDecision, FixedExecutionPolicy, MarketId, NewOrder, OrderStatusWriter, OrderType,
        StoreError, UserId,
    };
    use crate::domain::{Order, OrderId};
    use crate::infrastructure::persistence::InMemoryOrderStore;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn new_order(user_id: UserId) -> NewOrder {
        NewOrder::new(
            user_id,
            MarketId::generate(),
            OrderType::Limit,
            Decimal::new(10050, 2),
            5,
        )
        .unwrap()
    }

    fn spawn_poller(
        orders: Arc<dyn OrderRepository>,
        query: OrderQuery,
        capacity: usize,
    ) -> (mpsc::Receiver<OrderUpdate>, CancellationToken, Arc<AtomicUsize>, tokio::task::JoinHandle<()>) {
        let counter = Arc::new(AtomicUsize::new(0));
        let poller = SubscriptionPoller::new(
            orders,
            query,
            Duration::from_secs(5),
            ActiveSubscription::register(Arc::clone(&counter)),
        );
        let (tx, rx) = mpsc::channel(capacity);
        let token = CancellationToken::new();
        let task = tokio::spawn(poller.run(tx, token.clone()));
        (rx, token, counter, task)
    }

    #[tokio::test(start_paused = true)]
    async fn first_poll_delivers_current_status() {
        let store = Arc::new(InMemoryOrderStore::new());
        let user_id = UserId::generate();
        let order = store.create(new_order(user_id));

        let (mut rx, token, _, _task) = spawn_poller(
            store,
            OrderQuery { order_id: order.id(), user_id },
            10,
        );

        let update = rx.recv().await.unwrap();
        assert_eq!(update.order_id, order.id());
        assert_eq!(update.status, OrderStatus::Created);
        assert!(update.updated_at.is_none());
        token.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_status_is_not_repeated() {
        let store = Arc::new(InMemoryOrderStore::new());
        let user_id = UserId::generate();
        let order = store.create(new_order(user_id));

        let (mut rx, token, _, _task) = spawn_poller(
            Arc::clone(&store) as Arc<dyn OrderRepository>,
            OrderQuery { order_id: order.id(), user_id },
            10,
        );
        assert_eq!(rx.recv().await.unwrap().status, OrderStatus::Created);

        tokio::time::sleep(Duration::from_secs(21)).await;
        assert!(rx.try_recv().is_err());

        store.advance_open_orders(&FixedExecutionPolicy(ExecutionDecision::Fill), Utc::now());
        assert_eq!(rx.recv().await.unwrap().status, OrderStatus::Pending);
        token.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn changes_between_ticks_are_coalesced() {
        let store = Arc::new(InMemoryOrderStore::new());
        let user_id = UserId::generate();
        let order = store.create(new_order(user_id));

        let (mut rx, token, _, _task) = spawn_poller(
            Arc::clone(&store) as Arc<dyn OrderRepository>,
            OrderQuery { order_id: order.id(), user_id },
            10,
        );
        assert_eq!(rx.recv().await.unwrap().status, OrderStatus::Created);

        let policy = FixedExecutionPolicy(ExecutionDecision::Reject);
        store.advance_open_orders(&policy, Utc::now());
        store.advance_open_orders(&policy, Utc::now());

        assert_eq!(rx.recv().await.unwrap().status, OrderStatus::Rejected);
        token.cancel();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_closes_queue() {
        let store = Arc::new(InMemoryOrderStore::new());
        let user_id = UserId::generate();
        let order = store.create(new_order(user_id));

        let (mut rx, token, counter, task) = spawn_poller(
            store,
            OrderQuery { order_id: order.id(), user_id },
            10,
        );
        assert!(rx.recv().await.is_some());
        assert_eq!(counter.load(Ordering::Relaxed), 1);

        token.cancel();
        assert!(rx.recv().await.is_none());
        task.await.unwrap();
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_receiver_stops_task() {
        let store = Arc::new(InMemoryOrderStore::new());
        let user_id = UserId::generate();
        let order = store.create(new_order(user_id));

        let (rx, _token, counter, task) = spawn_poller(
            store,
            OrderQuery { order_id: order.id(), user_id },
            10,
        );
        drop(rx);

        task.await.unwrap();
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_blocks_until_cancelled() {
        let store = Arc::new(InMemoryOrderStore::new());
        let user_id = UserId::generate();
        let order = store.create(new_order(user_id));

        let (mut rx, token, _, task) = spawn_poller(
            Arc::clone(&store) as Arc<dyn OrderRepository>,
            OrderQuery { order_id: order.id(), user_id },
            1,
        );

        // Queue holds CREATED; PENDING waits on send.
        tokio::time::sleep(Duration::from_millis(1)).await;
        store.advance_open_orders(&FixedExecutionPolicy(ExecutionDecision::Hold), Utc::now());
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(!task.is_finished());

        token.cancel();
        task.await.unwrap();
        assert_eq!(rx.recv().await.unwrap().status, OrderStatus::Created);
        assert!(rx.recv().await.is_none());
    }

    /// Store whose single order changes owner and sometimes vanishes.
    struct FlakyStore {
        order: Order,
        mode: parking_lot::Mutex<&'static str>,
    }

    impl OrderRepository for FlakyStore {
        fn create(&self, _order: NewOrder) -> Order {
            self.order.clone()
        }

        fn get_by_id(&self, id: &OrderId) -> Result<Order, StoreError> {
            match *self.mode.lock() {
                "missing" => Err(StoreError::NotFound(*id)),
                "foreign" => {
                    let stranger = NewOrder::new(
                        UserId::generate(),
                        self.order.market_id(),
                        OrderType::Market,
                        Decimal::ONE,
                        1,
                    )
                    .unwrap();
                    Ok(Order::create(*id, stranger, Utc::now()))
                }
                _ => Ok(self.order.clone()),
            }
        }

        fn len(&self) -> usize {
            1
        }
    }

    #[tokio::test(start_paused = true)]
    async fn read_failures_and_owner_mismatch_skip_ticks() {
        let user_id = UserId::generate();
        let order = Order::create(OrderId::generate(), new_order(user_id), Utc::now());
        let store = Arc::new(FlakyStore {
            order: order.clone(),
            mode: parking_lot::Mutex::new("missing"),
        });

        let (mut rx, token, _, task) = spawn_poller(
            Arc::clone(&store) as Arc<dyn OrderRepository>,
            OrderQuery { order_id: order.id(), user_id },
            10,
        );

        tokio::time::sleep(Duration::from_secs(6)).await;
        *store.mode.lock() = "foreign";
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
        assert!(!task.is_finished());

        *store.mode.lock() = "ok";
        let update = rx.recv().await.unwrap();
        assert_eq!(update.status, OrderStatus::Created);
        token.cancel();
    }

    #[test]
    fn handle_drop_cancels_token() {
        let token = CancellationToken::new();
        let handle = SubscriptionHandle::new(token.clone());
        assert!(!handle.is_cancelled());
        drop(handle);
        assert!(token.is_cancelled());
    }
}
