//! In-memory order store.
//!
//! The single owner of every order. One `RwLock` guards the whole map:
//! reads take the shared lock, inserts and the simulator's bulk pass take
//! the exclusive lock. Only clones leave the lock, and nothing awaits or
//! logs while holding it.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::domain::{
    ExecutionPolicy, NewOrder, Order, OrderId, OrderRepository, OrderStatusWriter, StatusTransition,
    StoreError,
};

/// Process-local implementation of `OrderRepository` and `OrderStatusWriter`.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
        }
    }
}

impl OrderRepository for InMemoryOrderStore {
    fn create(&self, order: NewOrder) -> Order {
        let now = Utc::now();
        let mut orders = self.orders.write();
        loop {
            if let Entry::Vacant(slot) = orders.entry(OrderId::generate()) {
                let created = Order::create(*slot.key(), order, now);
                slot.insert(created.clone());
                return created;
            }
        }
    }

    fn get_by_id(&self, id: &OrderId) -> Result<Order, StoreError> {
        self.orders
            .read()
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound(*id))
    }

    fn len(&self) -> usize {
        self.orders.read().len()
    }
}

impl OrderStatusWriter for InMemoryOrderStore {
    fn advance_open_orders(
        &self,
        policy: &dyn ExecutionPolicy,
        at: DateTime<Utc>,
    ) -> Vec<StatusTransition> {
        let mut orders = self.orders.write();
        orders
            .values_mut()
            .filter(|order| order.status().is_open())
            .filter_map(|order| order.advance(policy, at))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::{
        ExecutionDecision, FixedExecutionPolicy, MarketId, OrderStatus, OrderType, UserId,
    };
    use rust_decimal::Decimal;

    fn new_order() -> NewOrder {
        NewOrder::new(
            UserId::generate(),
            MarketId::generate(),
            OrderType::Limit,
            Decimal::new(10050, 2),
            5,
        )
        .unwrap()
    }

    #[test]
    fn create_then_get_returns_snapshot() {
        let store = InMemoryOrderStore::new();
        let created = store.create(new_order());

        let fetched = store.get_by_id(&created.id()).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.status(), OrderStatus::Created);
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = InMemoryOrderStore::new();
        let id = OrderId::generate();
        assert_eq!(store.get_by_id(&id), Err(StoreError::NotFound(id)));
        assert!(store.is_empty());
    }

    #[test]
    fn snapshots_are_detached_from_store() {
        let store = InMemoryOrderStore::new();
        let created = store.create(new_order());
        let before = store.get_by_id(&created.id()).unwrap();

        store.advance_open_orders(&FixedExecutionPolicy(ExecutionDecision::Hold), Utc::now());

        assert_eq!(before.status(), OrderStatus::Created);
        assert_eq!(
            store.get_by_id(&created.id()).unwrap().status(),
            OrderStatus::Pending
        );
    }

    #[test]
    fn advance_reports_only_orders_that_moved() {
        let store = InMemoryOrderStore::new();
        let a = store.create(new_order());
        let hold = FixedExecutionPolicy(ExecutionDecision::Hold);

        let first = store.advance_open_orders(&hold, Utc::now());
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].order_id, a.id());
        assert_eq!(first[0].to, OrderStatus::Pending);

        let b = store.create(new_order());
        let second = store.advance_open_orders(&hold, Utc::now());
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].order_id, b.id());
    }

    #[test]
    fn concurrent_creates_yield_unique_ids() {
        let store = Arc::new(InMemoryOrderStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    (0..250).map(|_| store.create(new_order()).id()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<OrderId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = ids.len();
        ids.sort_by_key(|id| *id.as_uuid());
        ids.dedup();

        assert_eq!(ids.len(), total);
        assert_eq!(store.len(), total);
    }

    #[test]
    fn readers_never_see_a_partial_pass() {
        let store = Arc::new(InMemoryOrderStore::new());
        let ids: Vec<OrderId> = (0..200).map(|_| store.create(new_order()).id()).collect();

        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                let policy = FixedExecutionPolicy(ExecutionDecision::Fill);
                store.advance_open_orders(&policy, Utc::now());
                store.advance_open_orders(&policy, Utc::now());
            })
        };

        for _ in 0..50 {
            let statuses: Vec<OrderStatus> = {
                let orders = store.orders.read();
                ids.iter().map(|id| orders[id].status()).collect()
            };
            assert!(statuses.windows(2).all(|w| w[0] == w[1]));
        }
        writer.join().unwrap();
    }
}
