//! Integration test wiring the Event Bus, the strategy task, and the
//! Live-Orders Table together end to end, the way `Supervisor::run` does,
//! but without any broker network I/O — mirrors hypersockets' own
//! `tests/integration_*.rs` convention for this crate's cross-module seam.

use bks_mm::bus::EventBus;
use bks_mm::config::StrategyConfig;
use bks_mm::domain::{
    Instrument, Inventory, Order, OrderBookSnapshot, OrderSide, OrderStatus, PriceLevel,
};
use bks_mm::live_orders::LiveOrdersTable;
use bks_mm::strategy;
use std::collections::HashMap;
use std::time::Duration;

fn params() -> StrategyConfig {
    StrategyConfig {
        spread: 0.30,
        base_size: 1,
        inventory_limit: 5,
        inventory_k: 0.1,
        min_edit_delta: 0.10,
        tick_size: 0.01,
    }
}

#[tokio::test]
async fn strategy_task_publishes_a_target_quote_when_book_and_inventory_arrive() {
    let instrument = Instrument::new("SBER", "TQBR");
    let bus = EventBus::new();
    let live_orders = LiveOrdersTable::new();
    let (target_tx, mut target_rx) = tokio::sync::watch::channel(None);

    let task = tokio::spawn(strategy::run(
        instrument.clone(),
        params(),
        bus.book_receiver(),
        bus.inventory_receiver(),
        live_orders.clone(),
        target_tx,
    ));

    bus.inventory_sender()
        .send(Some(Inventory::new(HashMap::new())))
        .unwrap();
    bus.book_sender()
        .send(Some(OrderBookSnapshot {
            instrument: instrument.clone(),
            bids: vec![PriceLevel { price: 99.90, quantity: 10 }],
            asks: vec![PriceLevel { price: 100.10, quantity: 10 }],
        }))
        .unwrap();

    target_rx.changed().await.unwrap();
    let target = target_rx.borrow().clone().expect("a target quote should have been published");

    assert_eq!(target.instrument, instrument);
    let bid = target.bid.expect("flat inventory quotes both sides");
    let ask = target.ask.expect("flat inventory quotes both sides");
    assert!(bid.price <= 99.90);
    assert!(ask.price >= 100.10);

    task.abort();
}

#[tokio::test]
async fn strategy_excludes_own_resting_volume_from_the_observed_top() {
    let instrument = Instrument::new("SBER", "TQBR");
    let bus = EventBus::new();
    let live_orders = LiveOrdersTable::new();
    live_orders.insert_new(Order {
        client_order_id: "own-bid".into(),
        instrument: instrument.clone(),
        side: OrderSide::Bid,
        price: 99.90,
        quantity: 10,
        status: OrderStatus::New,
    });
    let (target_tx, mut target_rx) = tokio::sync::watch::channel(None);

    let task = tokio::spawn(strategy::run(
        instrument.clone(),
        params(),
        bus.book_receiver(),
        bus.inventory_receiver(),
        live_orders.clone(),
        target_tx,
    ));

    bus.inventory_sender()
        .send(Some(Inventory::new(HashMap::new())))
        .unwrap();
    // Top bid level is entirely our own resting order; self-exclusion (P5)
    // should fall through to the level behind it.
    bus.book_sender()
        .send(Some(OrderBookSnapshot {
            instrument: instrument.clone(),
            bids: vec![
                PriceLevel { price: 99.90, quantity: 10 },
                PriceLevel { price: 99.80, quantity: 5 },
            ],
            asks: vec![PriceLevel { price: 100.10, quantity: 10 }],
        }))
        .unwrap();

    target_rx.changed().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let target = target_rx.borrow().clone().expect("a target quote should have been published");

    let bid = target.bid.expect("flat inventory quotes both sides");
    assert!(bid.price <= 99.80, "self-exclusion should skip the fully-own 99.90 level");

    task.abort();
}
