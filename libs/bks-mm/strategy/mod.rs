//! Strategy (C4): consumes the latest order-book and inventory events,
//! excludes the engine's own resting volume from the observed top, and
//! emits a target quote pair whenever either input changes.

pub mod quote_model;

use crate::config::StrategyConfig;
use crate::domain::{Instrument, OrderSide, TargetQuote};
use crate::live_orders::LiveOrdersTable;
use quote_model::{compute_target_quote, external_top, own_quantity_lookup};
use tokio::sync::watch;
use tracing::debug;

/// Runs the strategy loop until its inputs are dropped. Exits cleanly (for
/// cooperative shutdown) when both watch channels close.
pub async fn run(
    instrument: Instrument,
    params: StrategyConfig,
    mut book_rx: watch::Receiver<Option<crate::domain::OrderBookSnapshot>>,
    mut inventory_rx: watch::Receiver<Option<crate::domain::Inventory>>,
    live_orders: LiveOrdersTable,
    target_tx: watch::Sender<Option<TargetQuote>>,
) {
    loop {
        tokio::select! {
            result = book_rx.changed() => {
                if result.is_err() {
                    debug!("order book channel closed, strategy loop exiting");
                    return;
                }
            }
            result = inventory_rx.changed() => {
                if result.is_err() {
                    debug!("inventory channel closed, strategy loop exiting");
                    return;
                }
            }
        }

        let book = book_rx.borrow().clone();
        let inventory = inventory_rx.borrow().clone();

        let (Some(book), Some(inventory)) = (book, inventory) else {
            continue;
        };

        let own_bids = live_orders.orders_for_side(&instrument, OrderSide::Bid);
        let own_asks = live_orders.orders_for_side(&instrument, OrderSide::Ask);

        let best_bid = external_top(&book.bids, own_quantity_lookup(&own_bids, OrderSide::Bid));
        let best_ask = external_top(&book.asks, own_quantity_lookup(&own_asks, OrderSide::Ask));

        let position = inventory.position(&instrument.ticker);
        let target = compute_target_quote(instrument.clone(), best_bid, best_ask, position, &params);

        debug!(?target, "strategy tick produced target quote");
        let _ = target_tx.send(Some(target));
    }
}
