//! Aggregate-state observers.
//!
//! Callbacks are collected under the device lock and invoked after it is
//! released, so an observer may call back into the device.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use dal_common::signal::StateLabel;

/// Aggregate state change delivered to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    /// Device name.
    pub device: Arc<str>,
    /// State before the change.
    pub previous: StateLabel,
    /// State after the change.
    pub current: StateLabel,
}

/// Observer callback.
pub type StateObserver = Arc<dyn Fn(&StateChange) + Send + Sync>;

/// Identifies one registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

#[derive(Default)]
pub(crate) struct ObserverRegistry {
    next: u64,
    observers: BTreeMap<ObserverId, StateObserver>,
}

impl ObserverRegistry {
    pub(crate) fn register(&mut self, observer: StateObserver) -> ObserverId {
        self.next += 1;
        let id = ObserverId(self.next);
        self.observers.insert(id, observer);
        id
    }

    pub(crate) fn remove(&mut self, id: ObserverId) -> bool {
        self.observers.remove(&id).is_some()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub(crate) fn snapshot(&self) -> Vec<StateObserver> {
        self.observers.values().cloned().collect()
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Change plus the observers to tell, built under the lock.
pub(crate) struct Notification {
    pub(crate) observers: Vec<StateObserver>,
    pub(crate) change: StateChange,
}

impl Notification {
    /// Invoke every observer. Call with no device lock held.
    pub(crate) fn dispatch(self) {
        for observer in &self.observers {
            observer(&self.change);
        }
    }
}
