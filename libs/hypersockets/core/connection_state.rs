//! Lock-free connection state and metrics tracking
//!
//! Connection state transitions and send/receive counters are hot-path data
//! touched from the I/O task, the handler threads, and anything polling
//! `WebSocketClient::metrics()`. Both are modeled as atomics rather than
//! behind a lock so none of those callers ever blocks on another.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Connection lifecycle state of a [`crate::client::WebSocketClient`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    ShuttingDown,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Disconnected,
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Reconnecting,
            4 => ConnectionState::ShuttingDown,
            _ => ConnectionState::Disconnected,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Reconnecting => 3,
            ConnectionState::ShuttingDown => 4,
        }
    }
}

/// Atomic storage for [`ConnectionState`]
///
/// Encoded as a single `u8` so reads and writes are a single atomic
/// operation with no locking.
pub struct AtomicConnectionState {
    inner: AtomicU8,
}

impl AtomicConnectionState {
    pub fn new(initial: ConnectionState) -> Self {
        Self {
            inner: AtomicU8::new(initial.as_u8()),
        }
    }

    /// Read the current state
    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.load(Ordering::Acquire))
    }

    /// Set the current state
    #[inline]
    pub fn set(&self, state: ConnectionState) {
        self.inner.store(state.as_u8(), Ordering::Release);
    }

    /// True if the current state is `Connected`
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Connected
    }

    /// True if the client has moved into `ShuttingDown`
    #[inline]
    pub fn is_shutting_down(&self) -> bool {
        self.get() == ConnectionState::ShuttingDown
    }

    /// True if the current state is `Disconnected`
    #[inline]
    pub fn is_disconnected(&self) -> bool {
        self.get() == ConnectionState::Disconnected
    }

    /// True while a connection attempt is in flight, initial or reconnect
    #[inline]
    pub fn is_connecting(&self) -> bool {
        matches!(
            self.get(),
            ConnectionState::Connecting | ConnectionState::Reconnecting
        )
    }

    /// Atomically transition from `current` to `new`.
    ///
    /// Returns `Ok(())` on success, or `Err(actual)` with the state that was
    /// observed instead if another writer won the race.
    pub fn compare_exchange(
        &self,
        current: ConnectionState,
        new: ConnectionState,
    ) -> Result<(), ConnectionState> {
        self.inner
            .compare_exchange(
                current.as_u8(),
                new.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(ConnectionState::from_u8)
    }
}

/// Lock-free counters backing [`crate::client::Metrics`]
pub struct AtomicMetrics {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    reconnect_count: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self {
            messages_sent: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            reconnect_count: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count.load(Ordering::Relaxed)
    }

    /// Zero all counters
    pub fn reset(&self) {
        self.messages_sent.store(0, Ordering::Relaxed);
        self.messages_received.store(0, Ordering::Relaxed);
        self.reconnect_count.store(0, Ordering::Relaxed);
    }
}

impl Default for AtomicMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_configured_state() {
        let state = AtomicConnectionState::new(ConnectionState::Disconnected);
        assert_eq!(state.get(), ConnectionState::Disconnected);
        assert!(!state.is_connected());
    }

    #[test]
    fn transitions_are_visible_immediately() {
        let state = AtomicConnectionState::new(ConnectionState::Connecting);
        state.set(ConnectionState::Connected);
        assert!(state.is_connected());
        state.set(ConnectionState::ShuttingDown);
        assert!(state.is_shutting_down());
    }

    #[test]
    fn compare_exchange_only_lets_one_winner_through() {
        let state = AtomicConnectionState::new(ConnectionState::Disconnected);
        assert!(state
            .compare_exchange(ConnectionState::Disconnected, ConnectionState::Connecting)
            .is_ok());
        assert_eq!(
            state.compare_exchange(ConnectionState::Disconnected, ConnectionState::Connecting),
            Err(ConnectionState::Connecting)
        );
    }

    #[test]
    fn metrics_accumulate() {
        let metrics = AtomicMetrics::new();
        metrics.increment_sent();
        metrics.increment_sent();
        metrics.increment_received();
        metrics.increment_reconnects();

        assert_eq!(metrics.messages_sent(), 2);
        assert_eq!(metrics.messages_received(), 1);
        assert_eq!(metrics.reconnect_count(), 1);
    }
}
