//! Event Bus (C3): two size-one, overwrite-on-full channels carrying the
//! latest order-book snapshot and the latest inventory snapshot from the
//! broker client to the strategy.
//!
//! `tokio::sync::watch` already has exactly these semantics (a single slot,
//! newest value wins, multiple independent consumers may `changed()`
//! without ever constructing a new receiver per message) so it is used
//! directly rather than building a bespoke ring buffer.

use crate::domain::{Inventory, OrderBookSnapshot};
use tokio::sync::watch;

pub struct EventBus {
    book_tx: watch::Sender<Option<OrderBookSnapshot>>,
    book_rx: watch::Receiver<Option<OrderBookSnapshot>>,
    inventory_tx: watch::Sender<Option<Inventory>>,
    inventory_rx: watch::Receiver<Option<Inventory>>,
}

impl EventBus {
    pub fn new() -> Self {
        let (book_tx, book_rx) = watch::channel(None);
        let (inventory_tx, inventory_rx) = watch::channel(None);
        Self {
            book_tx,
            book_rx,
            inventory_tx,
            inventory_rx,
        }
    }

    pub fn book_sender(&self) -> watch::Sender<Option<OrderBookSnapshot>> {
        self.book_tx.clone()
    }

    pub fn book_receiver(&self) -> watch::Receiver<Option<OrderBookSnapshot>> {
        self.book_rx.clone()
    }

    pub fn inventory_sender(&self) -> watch::Sender<Option<Inventory>> {
        self.inventory_tx.clone()
    }

    pub fn inventory_receiver(&self) -> watch::Receiver<Option<Inventory>> {
        self.inventory_rx.clone()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Instrument;

    #[tokio::test]
    async fn book_publish_overwrites_and_is_observed_once_per_change() {
        let bus = EventBus::new();
        let tx = bus.book_sender();
        let mut rx = bus.book_receiver();

        let snap = OrderBookSnapshot {
            instrument: Instrument::new("SBER", "TQBR"),
            bids: vec![],
            asks: vec![],
        };
        tx.send(Some(snap.clone())).unwrap();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Some(snap));
    }
}
