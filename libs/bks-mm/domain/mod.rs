//! Core value types shared across the engine: instruments, book/inventory
//! snapshots, the order record and its status machine, and target quotes.

mod models;

pub use models::{
    Inventory, Instrument, Order, OrderSide, OrderStatus, OrderBookSnapshot, PriceLevel,
    SessionCredentials, TargetQuote, TargetSide,
};
