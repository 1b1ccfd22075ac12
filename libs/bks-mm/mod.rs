//! bks-mm: the quote-reconciliation control loop for an automated
//! market-making engine against an external broker's trading API.
//!
//! A single-threaded-cooperative event loop (see [`supervisor`]) wires
//! together:
//! - [`infrastructure::auth`] (C1) — OAuth2 refresh-token authorization
//! - [`infrastructure::client`] (C2) — the broker REST/WS surface
//! - [`bus`] (C3) — the order-book/inventory event bus
//! - [`strategy`] (C4) — the inventory-skewed quote model
//! - [`order_manager`] (C5) — diff/hysteresis reconciliation
//! - [`live_orders`] (C6) — the in-memory live-orders table
//! - [`supervisor`] (C7) — startup/shutdown orchestration

pub mod bus;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod live_orders;
pub mod order_manager;
pub mod strategy;
pub mod supervisor;

pub use config::EngineConfig;
pub use supervisor::Supervisor;
