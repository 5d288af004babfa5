//! Signal Binding contract and transport error types.
//!
//! This module defines:
//! - `SignalBinding` trait - Handle to one remote discrete value
//! - `SignalTransport` trait - Factory that resolves addresses to bindings
//! - `SignalEvent` enum - Payload of change notifications
//! - `TransportError` enum - Error types for transport operations
//!
//! The transport owns its bindings. Devices only hold `Arc` references
//! and never assume anything about the wire protocol behind them.

use crate::signal::SignalValue;
use std::sync::Arc;
use thiserror::Error;

/// Error types for transport operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The signal is currently unreachable.
    #[error("Signal not connected: {0}")]
    NotConnected(String),

    /// Write attempted on a read-only binding.
    #[error("Signal is read-only: {0}")]
    ReadOnly(String),

    /// The transport does not know this address.
    #[error("Unknown signal address: {0}")]
    UnknownAddress(String),

    /// The remote end refused the write.
    #[error("Write to {address} rejected: {reason}")]
    WriteRejected {
        /// Resolved signal address.
        address: String,
        /// Transport-specific reason.
        reason: String,
    },
}

/// Requested access mode when binding an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Access {
    /// Readback only.
    #[default]
    ReadOnly,
    /// Readback and command writes.
    ReadWrite,
}

/// Change notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalEvent {
    /// The signal (re)connected or changed value.
    Value(SignalValue),
    /// The signal became unreachable. Its last value must no longer be
    /// trusted.
    Disconnected,
}

/// Subscriber callback. Invoked from the transport's delivery context.
pub type SignalCallback = Arc<dyn Fn(&SignalEvent) + Send + Sync>;

/// Identifies one subscription on one binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Handle to one remote discrete value.
///
/// # Delivery Contract
///
/// | Operation | Blocking | Notes |
/// |-----------|----------|-------|
/// | `read()` | No | Last value received from the remote end |
/// | `write()` | No | Returns once queued/acknowledged by the transport |
/// | `subscribe()` | No | Delivers the most recent value at least once after connect |
///
/// Callbacks may run on any thread. Implementations must not hold
/// internal locks while invoking them.
pub trait SignalBinding: Send + Sync {
    /// Resolved address of this binding.
    fn address(&self) -> &str;

    /// Access mode granted at bind time.
    fn access(&self) -> Access;

    /// Read the current value.
    ///
    /// # Errors
    /// `TransportError::NotConnected` while the signal is unreachable.
    fn read(&self) -> Result<SignalValue, TransportError>;

    /// Write a value to the remote end.
    ///
    /// # Errors
    /// `TransportError::ReadOnly` for read-only bindings,
    /// `TransportError::NotConnected` while unreachable.
    fn write(&self, value: SignalValue) -> Result<(), TransportError>;

    /// Register a change callback.
    ///
    /// If the signal is connected, the current value is delivered to the
    /// new subscriber before or shortly after this call returns.
    fn subscribe(&self, callback: SignalCallback) -> SubscriptionId;

    /// Remove a change callback. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);

    /// Whether the remote end is currently reachable.
    ///
    /// Default: a read succeeds.
    fn is_reachable(&self) -> bool {
        self.read().is_ok()
    }
}

/// Resolves signal addresses into shared bindings.
///
/// Binding the same address twice returns handles to the same underlying
/// signal.
pub trait SignalTransport: Send + Sync {
    /// Transport identifier (e.g. "simulation").
    fn name(&self) -> &'static str;

    /// Bind an address.
    ///
    /// # Errors
    /// `TransportError::UnknownAddress` if the transport cannot resolve it.
    fn bind(&self, address: &str, access: Access)
    -> Result<Arc<dyn SignalBinding>, TransportError>;
}
