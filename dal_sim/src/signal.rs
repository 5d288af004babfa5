//! Simulated signals and their bindings.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dal_common::signal::SignalValue;
use dal_common::transport::{
    Access, SignalBinding, SignalCallback, SignalEvent, SubscriptionId, TransportError,
};
use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, trace};

use crate::transport::SimShared;

/// Value, connection and write log of one signal.
#[derive(Debug)]
struct Slot {
    value: Option<SignalValue>,
    connected: bool,
    writes: Vec<SignalValue>,
    reject: Option<String>,
    /// Bumped on every value or connection change.
    seq: u64,
}

/// One simulated remote value.
///
/// A fresh signal is connected but has no value: reads fail with
/// `NotConnected` until something is put or written.
///
/// Deliveries for one signal are serialized and never go backwards: an
/// event older than one already delivered is dropped, so subscribers
/// always end on the stored value.
pub struct SimSignal {
    address: String,
    slot: Mutex<Slot>,
    subscribers: Mutex<BTreeMap<SubscriptionId, SignalCallback>>,
    next_subscription: AtomicU64,
    /// Sequence number of the last delivered event.
    delivered: ReentrantMutex<Cell<u64>>,
}

impl SimSignal {
    pub(crate) fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            slot: Mutex::new(Slot {
                value: None,
                connected: true,
                writes: Vec::new(),
                reject: None,
                seq: 0,
            }),
            subscribers: Mutex::new(BTreeMap::new()),
            next_subscription: AtomicU64::new(1),
            delivered: ReentrantMutex::new(Cell::new(0)),
        }
    }

    /// Signal address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Last value, even while disconnected.
    pub fn value(&self) -> Option<SignalValue> {
        self.slot.lock().value.clone()
    }

    /// Whether the signal is connected.
    pub fn is_connected(&self) -> bool {
        self.slot.lock().connected
    }

    /// Values written through bindings, oldest first.
    pub fn writes(&self) -> Vec<SignalValue> {
        self.slot.lock().writes.clone()
    }

    /// Set the value and notify subscribers.
    ///
    /// While disconnected the value is stored and delivered on reconnect.
    pub fn put(&self, value: SignalValue) {
        let (connected, seq) = {
            let mut slot = self.slot.lock();
            slot.value = Some(value.clone());
            slot.seq += 1;
            (slot.connected, slot.seq)
        };
        trace!("SIM {} = {}", self.address, value);
        if connected {
            self.notify(&SignalEvent::Value(value), seq);
        }
    }

    /// Drop the connection and notify subscribers.
    pub fn disconnect(&self) {
        let seq = {
            let mut slot = self.slot.lock();
            if !slot.connected {
                return;
            }
            slot.connected = false;
            slot.seq += 1;
            slot.seq
        };
        debug!("SIM {} disconnected", self.address);
        self.notify(&SignalEvent::Disconnected, seq);
    }

    /// Restore the connection and redeliver the current value.
    pub fn reconnect(&self) {
        let (value, seq) = {
            let mut slot = self.slot.lock();
            if slot.connected {
                return;
            }
            slot.connected = true;
            slot.seq += 1;
            (slot.value.clone(), slot.seq)
        };
        debug!("SIM {} reconnected", self.address);
        if let Some(value) = value {
            self.notify(&SignalEvent::Value(value), seq);
        }
    }

    /// Make writes fail with `WriteRejected` (`Some`) or succeed (`None`).
    pub fn reject_writes(&self, reason: Option<String>) {
        self.slot.lock().reject = reason;
    }

    fn read(&self) -> Result<SignalValue, TransportError> {
        let slot = self.slot.lock();
        match (&slot.value, slot.connected) {
            (Some(value), true) => Ok(value.clone()),
            _ => Err(TransportError::NotConnected(self.address.clone())),
        }
    }

    /// Check a binding write and append it to the write log.
    fn accept_write(&self, value: &SignalValue) -> Result<(), TransportError> {
        let mut slot = self.slot.lock();
        if !slot.connected {
            return Err(TransportError::NotConnected(self.address.clone()));
        }
        if let Some(reason) = &slot.reject {
            return Err(TransportError::WriteRejected {
                address: self.address.clone(),
                reason: reason.clone(),
            });
        }
        slot.writes.push(value.clone());
        Ok(())
    }

    fn subscribe(&self, callback: SignalCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().insert(id, Arc::clone(&callback));
        if let Ok(value) = self.read() {
            callback(&SignalEvent::Value(value));
        }
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.lock().remove(&id);
    }

    /// Deliver event `seq` unless a newer one already went out.
    fn notify(&self, event: &SignalEvent, seq: u64) {
        let delivered = self.delivered.lock();
        if delivered.get() >= seq {
            trace!("SIM {} dropped stale event {}", self.address, seq);
            return;
        }
        delivered.set(seq);

        let callbacks: Vec<SignalCallback> = self.subscribers.lock().values().cloned().collect();
        for callback in callbacks {
            // A callback that put a newer value has already delivered it.
            if delivered.get() != seq {
                break;
            }
            callback(event);
        }
    }
}

impl fmt::Debug for SimSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimSignal")
            .field("address", &self.address)
            .field("slot", &*self.slot.lock())
            .field("subscribers", &self.subscribers.lock().len())
            .finish()
    }
}

/// Binding handed to devices. Access is fixed at bind time.
#[derive(Debug)]
pub struct SimBinding {
    signal: Arc<SimSignal>,
    access: Access,
    shared: Arc<SimShared>,
}

impl SimBinding {
    pub(crate) fn new(signal: Arc<SimSignal>, access: Access, shared: Arc<SimShared>) -> Self {
        Self {
            signal,
            access,
            shared,
        }
    }
}

impl SignalBinding for SimBinding {
    fn address(&self) -> &str {
        self.signal.address()
    }

    fn access(&self) -> Access {
        self.access
    }

    fn read(&self) -> Result<SignalValue, TransportError> {
        self.signal.read()
    }

    fn write(&self, value: SignalValue) -> Result<(), TransportError> {
        if self.access == Access::ReadOnly {
            return Err(TransportError::ReadOnly(self.address().to_string()));
        }
        self.signal.accept_write(&value)?;
        self.signal.put(value.clone());
        self.shared.fire_reactions(self.address(), &value);
        Ok(())
    }

    fn subscribe(&self, callback: SignalCallback) -> SubscriptionId {
        self.signal.subscribe(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.signal.unsubscribe(id);
    }

    fn is_reachable(&self) -> bool {
        self.signal.is_connected()
    }
}
