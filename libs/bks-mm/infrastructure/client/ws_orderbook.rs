//! Order-book WebSocket feed (C2): subscribes to the market-data socket
//! and publishes full-replacement [`OrderBookSnapshot`]s onto the event
//! bus. Reconnection, resubscription, and backoff are delegated entirely
//! to `hypersockets`; this module only supplies the parse/route/handle
//! glue and the subscribe frame.

use crate::domain::{Instrument, OrderBookSnapshot, PriceLevel};
use crate::error::WsError;
use async_trait::async_trait;
use hypersockets::{
    ExponentialBackoff, HeaderProvider, Headers, HyperSocketError, MessageHandler, MessageRouter,
    Result as HsResult, WsMessage,
};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::rest::AccessToken;
use super::types::{MarketDataMessage, SubscribeFrame};

const MARKET_DATA_WS_URL: &str =
    "wss://ws.broker.ru/trade-api-market-data-connector/api/v1/market-data/ws";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Route {
    Book,
}

struct BookRouter;

#[async_trait]
impl MessageRouter for BookRouter {
    type Message = MarketDataMessage;
    type RouteKey = Route;

    async fn parse(&self, message: WsMessage) -> HsResult<Self::Message> {
        let WsMessage::Text(text) = message else {
            return Err(HyperSocketError::ParseError("expected text frame".into()));
        };
        serde_json::from_str(&text).map_err(|e| HyperSocketError::ParseError(e.to_string()))
    }

    fn route_key(&self, _message: &Self::Message) -> Self::RouteKey {
        Route::Book
    }
}

struct BookHandler {
    instrument: Instrument,
    tx: watch::Sender<Option<OrderBookSnapshot>>,
}

impl MessageHandler<MarketDataMessage> for BookHandler {
    fn handle(&mut self, message: MarketDataMessage) -> HsResult<()> {
        match message {
            MarketDataMessage::OrderBookSuccess => {
                debug!(ticker = %self.instrument.ticker, "order book subscription acknowledged");
            }
            MarketDataMessage::OrderBook(payload) => {
                let snapshot = OrderBookSnapshot {
                    instrument: self.instrument.clone(),
                    bids: payload
                        .bids
                        .into_iter()
                        .map(|l| PriceLevel { price: l.price, quantity: l.quantity })
                        .collect(),
                    asks: payload
                        .asks
                        .into_iter()
                        .map(|l| PriceLevel { price: l.price, quantity: l.quantity })
                        .collect(),
                };
                let _ = self.tx.send(Some(snapshot));
            }
            MarketDataMessage::CandleStickSuccess | MarketDataMessage::CandleStick(_) => {}
            MarketDataMessage::Unknown => {
                warn!("unrecognized market-data message, dropping");
            }
        }
        Ok(())
    }
}

struct BearerHeaders {
    token: AccessToken,
}

#[async_trait]
impl HeaderProvider for BearerHeaders {
    async fn get_headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert("Authorization".to_string(), format!("Bearer {}", self.token.get()));
        headers
    }
}

/// Runs the order-book subscription until the shutdown flag set on the
/// returned client is cleared. Intended to be driven from a dedicated
/// supervised task; reconnects internally with capped exponential backoff.
pub async fn run_order_book_feed(
    instrument: Instrument,
    depth: u32,
    token: AccessToken,
    tx: watch::Sender<Option<OrderBookSnapshot>>,
) -> Result<(), WsError> {
    let subscribe = SubscribeFrame::order_book(&instrument.class_code, &instrument.ticker, depth);
    let subscribe_json = serde_json::to_string(&subscribe)
        .map_err(|e| WsError::MalformedMessage(e.to_string()))?;

    let client = hypersockets::builder()
        .url(MARKET_DATA_WS_URL)
        .router(BookRouter, move |routing| {
            routing.handler(Route::Book, BookHandler { instrument, tx })
        })
        .headers(BearerHeaders { token })
        .subscription(WsMessage::Text(subscribe_json))
        .reconnect_strategy(ExponentialBackoff::new(
            Duration::from_secs(1),
            Duration::from_secs(60),
            None,
        ))
        .build()
        .await
        .map_err(WsError::Transport)?;

    // The client drives itself on its own tokio task; this future just
    // keeps the handle alive for the supervisor to hold and shut down.
    std::future::pending::<()>().await;
    drop(client);
    Ok(())
}
