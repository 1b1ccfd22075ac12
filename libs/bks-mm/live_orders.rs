//! Live-Orders Table (C6): an in-memory map from client-order-id to order
//! record. Mutated by execution reports from the broker's executions
//! feed, by C5's own place/edit/cancel acknowledgements, and periodically
//! repaired by a forced per-order status poll.
//!
//! Single-threaded-cooperative per SPEC_FULL.md §5: the table itself is
//! `parking_lot::RwLock`-guarded only because multiple independent async
//! tasks (executions feed, order manager, forced refresher, supervisor
//! shutdown) each hold an `Arc` handle to it, not because steady-state
//! access is contended.

use crate::domain::{Instrument, Order, OrderSide, OrderStatus};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct LiveOrdersTable {
    inner: Arc<RwLock<HashMap<String, Order>>>,
}

impl LiveOrdersTable {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Inserts a freshly placed order with status `New`.
    pub fn insert_new(&self, order: Order) {
        self.inner.write().insert(order.client_order_id.clone(), order);
    }

    /// Removes an entry outright, used on cancel-ack and on edit (the old
    /// id is retired in favor of the new one).
    pub fn remove(&self, client_order_id: &str) -> Option<Order> {
        self.inner.write().remove(client_order_id)
    }

    pub fn get(&self, client_order_id: &str) -> Option<Order> {
        self.inner.read().get(client_order_id).cloned()
    }

    pub fn live_order_ids(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }

    /// All non-terminal orders resting on the given (instrument, side).
    /// I2 requires this to hold at most one element after a reconciliation
    /// pass completes.
    pub fn orders_for_side(&self, instrument: &Instrument, side: OrderSide) -> Vec<Order> {
        self.inner
            .read()
            .values()
            .filter(|o| &o.instrument == instrument && o.side == side)
            .cloned()
            .collect()
    }

    pub fn all_orders(&self) -> Vec<Order> {
        self.inner.read().values().cloned().collect()
    }

    /// Applies a status transition from either the executions feed or the
    /// forced refresher. Terminal codes evict the entry; `PartiallyFilled`
    /// updates the remaining quantity; everything else updates status in
    /// place. Idempotent under duplicate delivery (P6): re-applying the
    /// same terminal code on an already-absent id is a no-op, and
    /// re-applying the same non-terminal code just rewrites the same
    /// fields.
    pub fn apply_status(&self, client_order_id: &str, status: OrderStatus, remained_quantity: Option<u64>) {
        let mut table = self.inner.write();

        if status.is_terminal() {
            if table.remove(client_order_id).is_some() {
                debug!(id = client_order_id, ?status, "order reached terminal status, evicted");
            }
            return;
        }

        match table.get_mut(client_order_id) {
            Some(order) => {
                if let Some(remaining) = remained_quantity {
                    order.quantity = remaining;
                }
                order.status = status;
            }
            None => {
                warn!(
                    id = client_order_id,
                    ?status,
                    "execution report for unknown order id, dropping"
                );
            }
        }
    }

    /// Replaces the entire table contents, used at startup to hydrate from
    /// the broker's orders-search endpoint.
    pub fn hydrate(&self, orders: Vec<Order>) {
        let mut table = self.inner.write();
        table.clear();
        for order in orders {
            table.insert(order.client_order_id.clone(), order);
        }
    }
}

impl Default for LiveOrdersTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Instrument;

    fn make_order(id: &str, side: OrderSide, price: f64, qty: u64, status: OrderStatus) -> Order {
        Order {
            client_order_id: id.to_string(),
            instrument: Instrument::new("SBER", "TQBR"),
            side,
            price,
            quantity: qty,
            status,
        }
    }

    #[test]
    fn insert_and_get() {
        let table = LiveOrdersTable::new();
        table.insert_new(make_order("a", OrderSide::Bid, 100.0, 1, OrderStatus::New));
        assert!(table.get("a").is_some());
    }

    #[test]
    fn partial_fill_updates_quantity_and_keeps_entry() {
        let table = LiveOrdersTable::new();
        table.insert_new(make_order("x", OrderSide::Bid, 100.0, 2, OrderStatus::New));
        table.apply_status("x", OrderStatus::PartiallyFilled, Some(1));
        let order = table.get("x").unwrap();
        assert_eq!(order.quantity, 1);
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
    }

    #[test]
    fn terminal_status_evicts_entry() {
        let table = LiveOrdersTable::new();
        table.insert_new(make_order("x", OrderSide::Bid, 100.0, 2, OrderStatus::New));
        table.apply_status("x", OrderStatus::Filled, None);
        assert!(table.get("x").is_none());
    }

    #[test]
    fn duplicate_terminal_delivery_is_idempotent() {
        let table = LiveOrdersTable::new();
        table.insert_new(make_order("x", OrderSide::Bid, 100.0, 2, OrderStatus::New));
        table.apply_status("x", OrderStatus::Filled, None);
        table.apply_status("x", OrderStatus::Filled, None);
        assert!(table.get("x").is_none());
    }

    #[test]
    fn at_most_one_per_side_after_reconciliation() {
        let table = LiveOrdersTable::new();
        table.insert_new(make_order("a", OrderSide::Bid, 100.0, 1, OrderStatus::New));
        let sber = Instrument::new("SBER", "TQBR");
        assert_eq!(table.orders_for_side(&sber, OrderSide::Bid).len(), 1);
        assert_eq!(table.orders_for_side(&sber, OrderSide::Ask).len(), 0);
    }
}
