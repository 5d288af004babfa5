//! Device runtime.
//!
//! A `Device` owns the bindings of one `DeviceDefinition` and runs the
//! completion tracker against them. All mutable state (signal values,
//! cached aggregate state, the pending move, observers) sits behind one
//! lock:
//!
//! - Signal notifications update a value, re-resolve the state and check
//!   the pending move in one critical section.
//! - Command writes run on a per-device writer task, outside the lock, in
//!   request order. Writes of a superseded move are skipped.
//! - The deadline timer starts when the writes are done (WATCHING) and
//!   resolves the move as timed out if it is still current.
//!
//! Observers run after the lock is released.

mod observers;

pub use observers::{ObserverId, StateChange, StateObserver};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use dal_common::signal::{SignalValue, StateLabel};
use dal_common::transport::{SignalBinding, SignalEvent, SignalTransport, SubscriptionId};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::command::dispatcher::CommandWrite;
use crate::definition::DeviceDefinition;
use crate::error::{DeviceError, MoveError};
use crate::motion::{MoveEvent, MoveId, MovePhase, MoveStatus, PendingMove};
use crate::state::SignalValues;
use crate::state::resolver::{self, Resolution};
use observers::{Notification, ObserverRegistry};

// ─── Snapshot ───────────────────────────────────────────────────────

/// Point-in-time view of a device, for status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSnapshot {
    /// Device name.
    pub name: String,
    /// Aggregate state.
    pub state: StateLabel,
    /// Whether the interlock is currently tripped.
    pub interlocked: bool,
    /// Whether every watched signal is reachable.
    pub reachable: bool,
    /// Target of the in-flight move, if any.
    pub moving_to: Option<StateLabel>,
}

// ─── Internals ──────────────────────────────────────────────────────

/// Writes queued for one move.
#[derive(Debug)]
struct CommandBatch {
    id: MoveId,
    writes: Vec<CommandWrite>,
}

/// State guarded by the device lock.
#[derive(Debug)]
struct DeviceCore {
    values: SignalValues,
    state: StateLabel,
    pending: Option<PendingMove>,
    observers: ObserverRegistry,
}

struct DeviceInner {
    name: Arc<str>,
    definition: DeviceDefinition,
    bindings: BTreeMap<String, Arc<dyn SignalBinding>>,
    subscriptions: Mutex<Vec<(Arc<dyn SignalBinding>, SubscriptionId)>>,
    core: Mutex<DeviceCore>,
    commands: mpsc::UnboundedSender<CommandBatch>,
    runtime: Handle,
}

// ─── Device ─────────────────────────────────────────────────────────

/// A commandable, observable device. Cheap to clone.
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

impl Device {
    /// Bind every declared signal through `transport` and start tracking.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// - `DeviceError::NoRuntime` outside a runtime
    /// - `DeviceError::Transport` if an address cannot be bound
    pub fn connect(
        definition: DeviceDefinition,
        transport: &dyn SignalTransport,
    ) -> Result<Self, DeviceError> {
        let runtime = Handle::try_current()
            .map_err(|_| DeviceError::NoRuntime(definition.name().to_string()))?;

        let mut bindings = BTreeMap::new();
        for (signal, address) in definition.addresses() {
            let binding = transport.bind(address, definition.access(signal))?;
            bindings.insert(signal.clone(), binding);
        }

        let mut values = SignalValues::new();
        for signal in definition.watched_signals() {
            if let Some(Ok(value)) = bindings.get(signal).map(|binding| binding.read()) {
                values.insert(signal.to_string(), value);
            }
        }
        let state = resolver::resolve(definition.table(), &values);

        let (commands, queue) = mpsc::unbounded_channel();
        let inner = Arc::new(DeviceInner {
            name: Arc::from(definition.name()),
            definition,
            bindings,
            subscriptions: Mutex::new(Vec::new()),
            core: Mutex::new(DeviceCore {
                values,
                state,
                pending: None,
                observers: ObserverRegistry::default(),
            }),
            commands,
            runtime,
        });

        inner
            .runtime
            .spawn(run_command_writer(Arc::downgrade(&inner), queue));
        inner.subscribe_signals();

        info!(
            "Device '{}' connected via {}: {} signals, state {}",
            inner.name,
            transport.name(),
            inner.bindings.len(),
            inner.core.lock().state,
        );
        Ok(Self { inner })
    }

    /// Device name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Definition this device was built from.
    pub fn definition(&self) -> &DeviceDefinition {
        &self.inner.definition
    }

    /// Cached aggregate state.
    pub fn current_state(&self) -> StateLabel {
        self.inner.core.lock().state.clone()
    }

    /// Last value reported by `signal`, if connected.
    pub fn signal_value(&self, signal: &str) -> Option<SignalValue> {
        self.inner.core.lock().values.get(signal).cloned()
    }

    /// Request a move to `target`.
    ///
    /// Never waits for the hardware: the returned handle resolves later.
    /// A move already in flight is superseded. If the interlock vetoes
    /// `target`, nothing is written and the handle is already resolved
    /// with `MoveError::InterlockTripped`.
    ///
    /// `timeout` overrides the definition's default.
    ///
    /// # Errors
    /// `DeviceError::UnreachableState` if `target` has no command entry.
    pub fn move_to(
        &self,
        target: impl Into<StateLabel>,
        timeout: Option<Duration>,
    ) -> Result<MoveStatus, DeviceError> {
        let inner = &self.inner;
        let target = target.into();
        let writes = inner.definition.dispatcher().commands_for(&target)?.to_vec();
        let timeout = timeout.unwrap_or_else(|| inner.definition.move_timeout());

        let mut core = inner.core.lock();
        if let Some(mut previous) = core.pending.take() {
            let replaced = previous.target().clone();
            warn!(
                "Device '{}': move {} to {} superseded by a move to {}",
                inner.name,
                previous.id(),
                replaced,
                target
            );
            previous.finish(
                MoveEvent::Cancel,
                Err(MoveError::Superseded { target: replaced }),
            );
        }

        let id = MoveId::next();
        let (mut pending, status) =
            PendingMove::new(id, Arc::clone(&inner.name), target.clone(), timeout);

        if let Some(guard) = inner.definition.interlock() {
            if guard.vetoes(&target, &core.values) {
                warn!(
                    "Device '{}': move {} to {} vetoed by interlock ({})",
                    inner.name,
                    id,
                    target,
                    guard.tripped_by(&core.values).unwrap_or("?")
                );
                pending.finish(
                    MoveEvent::InterlockVeto,
                    Err(MoveError::InterlockTripped { target }),
                );
                return Ok(status);
            }
        }

        pending.advance(MoveEvent::Requested);
        // Queued under the lock so the writer sees batches in id order.
        if inner.commands.send(CommandBatch { id, writes }).is_err() {
            return Err(DeviceError::NoRuntime(inner.name.to_string()));
        }
        core.pending = Some(pending);
        drop(core);

        info!(
            "Device '{}': move {} to {} requested (timeout {:?})",
            inner.name, id, target, timeout
        );
        Ok(status)
    }

    /// Cancel the move behind `status` if it is still in flight.
    ///
    /// Returns `false` if that move already finished, was replaced or
    /// belongs to another device.
    pub fn cancel(&self, status: &MoveStatus) -> bool {
        if status.device() != self.name() {
            return false;
        }
        let mut core = self.inner.core.lock();
        let Some(pending) = core.pending.as_mut() else {
            return false;
        };
        if pending.id() != status.id() {
            return false;
        }
        let target = pending.target().clone();
        pending.finish(MoveEvent::Cancel, Err(MoveError::Cancelled { target }));
        core.pending = None;
        info!("Device '{}': move {} cancelled", self.inner.name, status.id());
        true
    }

    /// Target of the in-flight move, if any.
    pub fn moving_to(&self) -> Option<StateLabel> {
        self.inner
            .core
            .lock()
            .pending
            .as_ref()
            .map(|pending| pending.target().clone())
    }

    /// Phase of the in-flight move, if any.
    pub fn move_phase(&self) -> Option<MovePhase> {
        self.inner.core.lock().pending.as_ref().map(PendingMove::phase)
    }

    /// Whether the interlock is tripped right now. `false` without one.
    pub fn interlocked(&self) -> bool {
        let core = self.inner.core.lock();
        self.inner
            .definition
            .interlock()
            .is_some_and(|guard| guard.is_tripped(&core.values))
    }

    /// Whether every watched signal is reachable.
    pub fn reachable(&self) -> bool {
        self.inner
            .definition
            .watched_signals()
            .into_iter()
            .filter_map(|signal| self.inner.bindings.get(signal))
            .all(|binding| binding.is_reachable())
    }

    /// Register an aggregate-state observer.
    ///
    /// With `run_now`, the observer is called once immediately with the
    /// current state as both `previous` and `current`.
    pub fn subscribe<F>(&self, observer: F, run_now: bool) -> ObserverId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        let observer: StateObserver = Arc::new(observer);
        let (id, current) = {
            let mut core = self.inner.core.lock();
            (core.observers.register(Arc::clone(&observer)), core.state.clone())
        };
        if run_now {
            observer(&StateChange {
                device: Arc::clone(&self.inner.name),
                previous: current.clone(),
                current,
            });
        }
        id
    }

    /// Remove an observer. Returns `false` for unknown ids.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.inner.core.lock().observers.remove(id)
    }

    /// Point-in-time view for status output.
    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            name: self.name().to_string(),
            state: self.current_state(),
            interlocked: self.interlocked(),
            reachable: self.reachable(),
            moving_to: self.moving_to(),
        }
    }

    // ─── Convenience ────────────────────────────────────────────────

    /// Move to `IN` with the default timeout.
    pub fn insert(&self) -> Result<MoveStatus, DeviceError> {
        self.move_to(StateLabel::IN, None)
    }

    /// Move to `OUT` with the default timeout.
    pub fn remove(&self) -> Result<MoveStatus, DeviceError> {
        self.move_to(StateLabel::OUT, None)
    }

    /// Open a valve (`OUT`).
    pub fn open(&self) -> Result<MoveStatus, DeviceError> {
        self.remove()
    }

    /// Close a valve (`IN`).
    pub fn close(&self) -> Result<MoveStatus, DeviceError> {
        self.insert()
    }

    /// Aggregate state is `IN`.
    pub fn inserted(&self) -> bool {
        self.current_state() == StateLabel::IN
    }

    /// Aggregate state is `OUT`.
    pub fn removed(&self) -> bool {
        self.current_state() == StateLabel::OUT
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.inner.name)
            .field("state", &self.current_state())
            .finish()
    }
}

// ─── Runtime internals ──────────────────────────────────────────────

impl DeviceInner {
    fn subscribe_signals(self: &Arc<Self>) {
        let mut subscriptions = Vec::new();
        for signal in self.definition.watched_signals() {
            let Some(binding) = self.bindings.get(signal) else {
                continue;
            };
            let device = Arc::downgrade(self);
            let signal_name = signal.to_string();
            let id = binding.subscribe(Arc::new(move |event: &SignalEvent| {
                if let Some(inner) = device.upgrade() {
                    inner.on_signal_event(&signal_name, event);
                }
            }));
            subscriptions.push((Arc::clone(binding), id));
        }
        *self.subscriptions.lock() = subscriptions;
    }

    fn on_signal_event(&self, signal: &str, event: &SignalEvent) {
        let notification = {
            let mut core = self.core.lock();
            match event {
                SignalEvent::Value(value) => {
                    trace!("Device '{}': {} = {}", self.name, signal, value);
                    core.values.insert(signal.to_string(), value.clone());
                }
                SignalEvent::Disconnected => {
                    debug!("Device '{}': {} disconnected", self.name, signal);
                    core.values.remove(signal);
                }
            }
            self.refresh(&mut core)
        };

        if let Some(notification) = notification {
            notification.dispatch();
        }
    }

    /// Re-resolve the aggregate state and check the pending move.
    fn refresh(&self, core: &mut DeviceCore) -> Option<Notification> {
        let resolution = resolver::explain(self.definition.table(), &core.values);
        if let Resolution::Conflict(first, second) = resolution {
            debug!(
                "Device '{}': conflicting state evidence ({} vs {})",
                self.name, first, second
            );
        }

        let state = resolution.state();
        let notification = if state != core.state {
            let previous = std::mem::replace(&mut core.state, state.clone());
            debug!("Device '{}': state {} → {}", self.name, previous, state);
            (!core.observers.is_empty()).then(|| Notification {
                observers: core.observers.snapshot(),
                change: StateChange {
                    device: Arc::clone(&self.name),
                    previous,
                    current: state,
                },
            })
        } else {
            None
        };

        self.check_pending(core);
        notification
    }

    /// Resolve a watched move that reached its target or hit the interlock.
    fn check_pending(&self, core: &mut DeviceCore) {
        let Some(pending) = core.pending.as_mut() else {
            return;
        };
        if pending.phase() != MovePhase::Watching {
            return;
        }

        if core.state == *pending.target() {
            info!(
                "Device '{}': move {} reached {} after {:?}",
                self.name,
                pending.id(),
                core.state,
                pending.elapsed()
            );
            pending.finish(MoveEvent::TargetReached, Ok(core.state.clone()));
        } else if self.trips_during_move(pending.target(), &core.values) {
            let target = pending.target().clone();
            warn!(
                "Device '{}': interlock tripped during move {} to {}",
                self.name,
                pending.id(),
                target
            );
            pending.finish(
                MoveEvent::InterlockTripped,
                Err(MoveError::InterlockTripped { target }),
            );
        } else {
            return;
        }
        core.pending = None;
    }

    fn trips_during_move(&self, target: &StateLabel, values: &SignalValues) -> bool {
        self.definition
            .interlock()
            .is_some_and(|guard| guard.check_during_move() && guard.vetoes(target, values))
    }

    /// Whether move `id` may write now: still current and not vetoed.
    ///
    /// A move whose interlock tripped after the request is finished here
    /// as `InterlockTripped` without writing.
    fn clear_to_issue(&self, id: MoveId) -> bool {
        let mut core = self.core.lock();
        let core = &mut *core;
        let Some(pending) = core.pending.as_mut() else {
            return false;
        };
        if pending.id() != id {
            debug!(
                "Device '{}': skipping writes of superseded move {}",
                self.name, id
            );
            return false;
        }

        let vetoed = self
            .definition
            .interlock()
            .is_some_and(|guard| guard.vetoes(pending.target(), &core.values));
        if !vetoed {
            return true;
        }

        let target = pending.target().clone();
        warn!(
            "Device '{}': interlock tripped before move {} to {} was issued",
            self.name, id, target
        );
        pending.finish(
            MoveEvent::InterlockVeto,
            Err(MoveError::InterlockTripped { target }),
        );
        core.pending = None;
        false
    }

    /// Perform a batch's writes, then enter WATCHING and arm the deadline.
    fn issue(self: &Arc<Self>, batch: CommandBatch) {
        if !self.clear_to_issue(batch.id) {
            return;
        }

        for write in &batch.writes {
            let Some(binding) = self.bindings.get(&write.signal) else {
                continue;
            };
            match binding.write(write.value.clone()) {
                Ok(()) => debug!(
                    "Device '{}': wrote {} to {}",
                    self.name,
                    write.value,
                    binding.address()
                ),
                Err(e) => warn!(
                    "Device '{}': write of {} to {} failed: {}",
                    self.name,
                    write.value,
                    binding.address(),
                    e
                ),
            }
        }

        let mut core = self.core.lock();
        let Some(pending) = core.pending.as_mut() else {
            return;
        };
        if pending.id() != batch.id {
            return;
        }
        pending.advance(MoveEvent::CommandsIssued);

        let deadline = Instant::now() + pending.timeout();
        let device = Arc::downgrade(self);
        let id = batch.id;
        let timer = self.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = device.upgrade() {
                inner.expire(id);
            }
        });
        pending.arm_timer(timer.abort_handle());

        self.check_pending(&mut core);
    }

    /// Deadline handler for move `id`.
    fn expire(&self, id: MoveId) {
        let mut core = self.core.lock();
        let last_state = core.state.clone();
        let Some(pending) = core.pending.as_mut() else {
            return;
        };
        if pending.id() != id || pending.phase() != MovePhase::Watching {
            return;
        }

        let target = pending.target().clone();
        let elapsed = pending.elapsed();
        warn!(
            "Device '{}': move {} to {} timed out after {:?} in state {}",
            self.name, id, target, elapsed, last_state
        );
        pending.finish(
            MoveEvent::DeadlineElapsed,
            Err(MoveError::Timeout {
                target,
                last_state,
                elapsed,
            }),
        );
        core.pending = None;
    }
}

impl Drop for DeviceInner {
    fn drop(&mut self) {
        for (binding, id) in self.subscriptions.get_mut().drain(..) {
            binding.unsubscribe(id);
        }
        debug!("Device '{}' released", self.name);
    }
}

/// Per-device FIFO writer. Ends when the device is dropped.
async fn run_command_writer(
    device: Weak<DeviceInner>,
    mut queue: mpsc::UnboundedReceiver<CommandBatch>,
) {
    while let Some(batch) = queue.recv().await {
        let Some(inner) = device.upgrade() else {
            break;
        };
        inner.issue(batch);
    }
}
