use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A tradable instrument on the broker, identified by ticker + class code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub ticker: String,
    pub class_code: String,
}

impl Instrument {
    pub fn new(ticker: impl Into<String>, class_code: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            class_code: class_code.into(),
        }
    }
}

/// Side of a resting or target order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Bid,
    Ask,
}

impl OrderSide {
    /// Broker wire encoding: "1" = buy (bid), "0" = sell (ask).
    pub fn as_wire_code(self) -> &'static str {
        match self {
            OrderSide::Bid => "1",
            OrderSide::Ask => "0",
        }
    }
}

/// One price level in an order book snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub quantity: u64,
}

/// Full-replacement snapshot of the top of book for one instrument.
///
/// `bids` is ordered descending by price, `asks` ascending. Every snapshot
/// received over the wire is treated as a complete replacement, never a
/// diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub instrument: Instrument,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

impl OrderBookSnapshot {
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.first().copied()
    }

    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.first().copied()
    }
}

/// Full-replacement net position per ticker. A ticker absent from the map
/// is implicitly flat (zero).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory(HashMap<String, i64>);

impl Inventory {
    pub fn new(positions: HashMap<String, i64>) -> Self {
        Self(positions)
    }

    pub fn position(&self, ticker: &str) -> i64 {
        self.0.get(ticker).copied().unwrap_or(0)
    }
}

/// Numeric broker order-status codes, preserved verbatim from the wire
/// protocol rather than collapsed into a smaller set, since the forced
/// refresher and the execution-report stream both deliver these directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Replaced,
    Cancelling,
    Rejected,
    Replacing,
    PendingNew,
}

impl OrderStatus {
    /// Maps a broker numeric status code to a variant. Returns `None` for
    /// codes the protocol does not define (3 and 7 are unused).
    pub fn from_broker_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(OrderStatus::New),
            1 => Some(OrderStatus::PartiallyFilled),
            2 => Some(OrderStatus::Filled),
            4 => Some(OrderStatus::Cancelled),
            5 => Some(OrderStatus::Replaced),
            6 => Some(OrderStatus::Cancelling),
            8 => Some(OrderStatus::Rejected),
            9 => Some(OrderStatus::Replacing),
            10 => Some(OrderStatus::PendingNew),
            _ => None,
        }
    }

    /// An order in a terminal state is evicted from the live-orders table
    /// outright. `Cancelling` is terminal-for-eviction even though the
    /// broker may still be processing the cancel server-side.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Cancelled
                | OrderStatus::Cancelling
                | OrderStatus::Rejected
        )
    }
}

/// A live or recently-live order tracked by the Live-Orders Table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub client_order_id: String,
    pub instrument: Instrument,
    pub side: OrderSide,
    pub price: f64,
    pub quantity: u64,
    pub status: OrderStatus,
}

/// One side of a target quote pair: the price/size the strategy wants
/// resting at this instant. Absence of a side (size 0) means the manager
/// should cancel any existing order on that side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSide {
    pub price: f64,
    pub quantity: u64,
}

/// Output of one strategy tick: the desired bid/ask pair for an instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetQuote {
    pub instrument: Instrument,
    pub bid: Option<TargetSide>,
    pub ask: Option<TargetSide>,
}

/// OAuth-style session credentials: a long-lived refresh token and the
/// short-lived access token obtained from it.
#[derive(Debug, Clone)]
pub struct SessionCredentials {
    pub refresh_token: String,
    pub access_token: Option<String>,
}

impl SessionCredentials {
    pub fn from_refresh_token(refresh_token: impl Into<String>) -> Self {
        Self {
            refresh_token: refresh_token.into(),
            access_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_maps_known_codes() {
        assert_eq!(OrderStatus::from_broker_code(0), Some(OrderStatus::New));
        assert_eq!(OrderStatus::from_broker_code(2), Some(OrderStatus::Filled));
        assert_eq!(OrderStatus::from_broker_code(10), Some(OrderStatus::PendingNew));
        assert_eq!(OrderStatus::from_broker_code(3), None);
    }

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Cancelling.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(!OrderStatus::New.is_terminal());
        assert!(!OrderStatus::PartiallyFilled.is_terminal());
        assert!(!OrderStatus::Replacing.is_terminal());
        assert!(!OrderStatus::PendingNew.is_terminal());
    }

    #[test]
    fn inventory_defaults_to_flat() {
        let inv = Inventory::default();
        assert_eq!(inv.position("SBER"), 0);
    }

    #[test]
    fn book_best_levels() {
        let book = OrderBookSnapshot {
            instrument: Instrument::new("SBER", "TQBR"),
            bids: vec![PriceLevel { price: 100.0, quantity: 10 }],
            asks: vec![PriceLevel { price: 100.5, quantity: 5 }],
        };
        assert_eq!(book.best_bid().unwrap().price, 100.0);
        assert_eq!(book.best_ask().unwrap().price, 100.5);
    }
}
