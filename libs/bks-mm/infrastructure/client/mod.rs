//! Broker Client (C2): the single owner of the HTTP session, the access
//! token, and the two WebSocket feeds. Everything else in the engine
//! reaches the broker only through a [`BrokerClient`] handle, replacing
//! the per-component globals the source material used with a single
//! dependency-injected object.

pub mod rest;
pub mod types;
pub mod ws_executions;
pub mod ws_orderbook;

use crate::domain::{Instrument, Inventory, Order, OrderSide};
use crate::error::{RestError, WsError};
use crate::live_orders::LiveOrdersTable;
use rest::{AccessToken, RestClient};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Clone)]
pub struct BrokerClient {
    rest: RestClient,
    token: AccessToken,
}

impl BrokerClient {
    pub fn new(access_token: String, rest_timeout: Duration) -> Self {
        let token = AccessToken::new(access_token);
        let rest = RestClient::new(rest_timeout, token.clone());
        Self { rest, token }
    }

    pub fn set_access_token(&self, token: String) {
        self.token.set(token);
    }

    pub fn access_token_handle(&self) -> AccessToken {
        self.token.clone()
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    pub async fn place_limit(
        &self,
        instrument: &Instrument,
        side: OrderSide,
        price: f64,
        quantity: u64,
    ) -> Result<Order, RestError> {
        self.rest.place_limit(instrument, side, price, quantity).await
    }

    pub async fn cancel(&self, client_order_id: &str) -> Result<(), RestError> {
        self.rest.cancel(client_order_id).await
    }

    pub async fn edit(&self, client_order_id: &str, price: f64, quantity: u64) -> Result<String, RestError> {
        self.rest.edit(client_order_id, price, quantity).await
    }

    pub async fn get_order_status(
        &self,
        client_order_id: &str,
    ) -> Result<(crate::domain::OrderStatus, Option<u64>), RestError> {
        self.rest.get_order_status(client_order_id).await
    }

    pub async fn list_active_orders(&self) -> Result<Vec<Order>, RestError> {
        self.rest.list_active_orders().await
    }

    pub async fn poll_inventory(&self) -> Result<Inventory, RestError> {
        self.rest.poll_inventory().await
    }

    /// Long-running task: subscribes to the order-book feed for
    /// `instrument` and publishes snapshots onto `tx`. Runs until the
    /// process is shut down; reconnection is handled internally.
    pub async fn subscribe_order_book(
        &self,
        instrument: Instrument,
        depth: u32,
        tx: watch::Sender<Option<crate::domain::OrderBookSnapshot>>,
    ) -> Result<(), WsError> {
        ws_orderbook::run_order_book_feed(instrument, depth, self.token.clone(), tx).await
    }

    /// Long-running task: subscribes to the executions feed and applies
    /// every report directly to `table`.
    pub async fn subscribe_executions(&self, table: LiveOrdersTable) -> Result<(), WsError> {
        ws_executions::run_executions_feed(self.token.clone(), table).await
    }

    /// Long-running task: polls inventory on a fixed period and publishes
    /// the latest snapshot, swallowing individual poll failures so a
    /// transient broker hiccup never takes the refresher down.
    pub async fn inventory_refresher(
        &self,
        period: Duration,
        tx: watch::Sender<Option<Inventory>>,
    ) {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match self.poll_inventory().await {
                Ok(inventory) => {
                    let _ = tx.send(Some(inventory));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "inventory poll failed, will retry next tick");
                }
            }
        }
    }
}
