pub mod auth;
pub mod client;
pub mod logging;
pub mod shutdown;

pub use client::BrokerClient;
pub use logging::{init_tracing, init_tracing_with_level};
pub use shutdown::ShutdownManager;
