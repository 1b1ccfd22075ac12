//! Wire types for the broker's REST and WebSocket surfaces. Kept separate
//! from `domain` so the broker's own vocabulary (string-coded sides,
//! numeric status codes, `responseType` tags) never leaks past the
//! client boundary.

use serde::{Deserialize, Serialize};

// ---- WebSocket subscribe frame ----

#[derive(Debug, Clone, Serialize)]
pub struct SubscribeInstrument {
    #[serde(rename = "classCode")]
    pub class_code: String,
    pub ticker: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscribeFrame {
    #[serde(rename = "subscribeType")]
    pub subscribe_type: u8,
    #[serde(rename = "dataType")]
    pub data_type: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    pub instruments: Vec<SubscribeInstrument>,
}

impl SubscribeFrame {
    /// dataType 0 = order book.
    pub fn order_book(class_code: &str, ticker: &str, depth: u32) -> Self {
        Self {
            subscribe_type: 0,
            data_type: 0,
            depth: Some(depth),
            instruments: vec![SubscribeInstrument {
                class_code: class_code.to_string(),
                ticker: ticker.to_string(),
            }],
        }
    }
}

// ---- Order book WS payload ----

#[derive(Debug, Clone, Deserialize)]
pub struct WirePriceLevel {
    pub price: f64,
    pub quantity: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderBookPayload {
    pub ticker: String,
    #[serde(rename = "classCode")]
    pub class_code: String,
    #[serde(default)]
    pub bids: Vec<WirePriceLevel>,
    #[serde(default)]
    pub asks: Vec<WirePriceLevel>,
}

/// Tagged union over the `responseType` discriminator the market-data
/// socket multiplexes onto a single stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "responseType")]
pub enum MarketDataMessage {
    OrderBookSuccess,
    OrderBook(OrderBookPayload),
    CandleStickSuccess,
    CandleStick(serde_json::Value),
    #[serde(other)]
    Unknown,
}

// ---- Executions WS payload ----

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionData {
    #[serde(rename = "orderStatus")]
    pub order_status: i64,
    #[serde(rename = "remainedQuantity", default)]
    pub remained_quantity: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionReport {
    #[serde(rename = "clientOrderId")]
    pub client_order_id: String,
    pub data: ExecutionData,
}

// ---- REST payloads ----

#[derive(Debug, Clone, Serialize)]
pub struct PlaceOrderRequest<'a> {
    #[serde(rename = "clientOrderId")]
    pub client_order_id: &'a str,
    pub side: &'a str,
    #[serde(rename = "orderType")]
    pub order_type: &'a str,
    #[serde(rename = "orderQuantity")]
    pub order_quantity: u64,
    pub ticker: &'a str,
    #[serde(rename = "classCode")]
    pub class_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelOrderRequest<'a> {
    #[serde(rename = "clientOrderId")]
    pub client_order_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditOrderRequest<'a> {
    #[serde(rename = "clientOrderId")]
    pub client_order_id: &'a str,
    pub price: f64,
    #[serde(rename = "orderQuantity")]
    pub order_quantity: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderStatusData {
    #[serde(rename = "orderStatus")]
    pub order_status: i64,
    #[serde(rename = "remainedQuantity", default)]
    pub remained_quantity: Option<u64>,
    pub ticker: String,
    #[serde(rename = "classCode")]
    pub class_code: String,
    pub side: String,
    pub price: Option<f64>,
    #[serde(rename = "orderQuantity")]
    pub order_quantity: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderStatusResponse {
    pub data: OrderStatusData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioPosition {
    pub ticker: String,
    pub quantity: i64,
}
