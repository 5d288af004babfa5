//! Simulation transport and linked reactions.

use std::collections::HashMap;
use std::sync::Arc;

use dal_common::signal::SignalValue;
use dal_common::simulation::{LinkedReaction, SimulationConfig};
use dal_common::transport::{Access, SignalBinding, SignalTransport, TransportError};
use parking_lot::RwLock;
use tokio::runtime::Handle;
use tracing::{debug, info, trace, warn};

use crate::signal::{SimBinding, SimSignal};

/// Signal table and reactions shared by the transport and its bindings.
#[derive(Debug, Default)]
pub(crate) struct SimShared {
    signals: RwLock<HashMap<String, Arc<SimSignal>>>,
    reactions: RwLock<Vec<LinkedReaction>>,
    strict: bool,
}

impl SimShared {
    fn get(&self, address: &str) -> Option<Arc<SimSignal>> {
        self.signals.read().get(address).cloned()
    }

    fn get_or_create(&self, address: &str) -> Arc<SimSignal> {
        if let Some(signal) = self.get(address) {
            return signal;
        }
        let mut signals = self.signals.write();
        Arc::clone(
            signals
                .entry(address.to_string())
                .or_insert_with(|| Arc::new(SimSignal::new(address))),
        )
    }

    /// Apply every reaction triggered by writing `value` to `address`.
    pub(crate) fn fire_reactions(&self, address: &str, value: &SignalValue) {
        let triggered: Vec<LinkedReaction> = self
            .reactions
            .read()
            .iter()
            .filter(|reaction| reaction.when == address && reaction.equals == *value)
            .cloned()
            .collect();

        for reaction in triggered {
            let target = self.get_or_create(&reaction.set);
            trace!(
                "SIM {} = {} -> queued {} = {} in {}ms",
                address, value, reaction.set, reaction.to, reaction.delay_ms
            );

            if reaction.delay_ms == 0 {
                target.put(reaction.to);
                continue;
            }

            match Handle::try_current() {
                Ok(runtime) => {
                    let delay = reaction.delay();
                    runtime.spawn(async move {
                        tokio::time::sleep(delay).await;
                        target.put(reaction.to);
                    });
                }
                Err(_) => {
                    warn!(
                        "SIM no runtime for delayed reaction on {}, applying now",
                        reaction.set
                    );
                    target.put(reaction.to);
                }
            }
        }
    }
}

/// In-memory signal transport.
///
/// Clones share the same signals.
#[derive(Debug, Clone, Default)]
pub struct SimTransport {
    shared: Arc<SimShared>,
}

impl SimTransport {
    /// Lenient transport: any address binds, creating the signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Strict transport: only addresses created beforehand (by
    /// `sim_put`, `signal` or config) bind; others fail with
    /// `UnknownAddress`.
    pub fn strict() -> Self {
        Self {
            shared: Arc::new(SimShared {
                strict: true,
                ..SimShared::default()
            }),
        }
    }

    /// Lenient transport seeded from `[simulation]`.
    pub fn from_config(config: &SimulationConfig) -> Self {
        let transport = Self::new();
        for initial in &config.initial {
            transport.sim_put(&initial.address, initial.value.clone());
        }
        for reaction in &config.reactions {
            transport.link(reaction.clone());
        }
        info!(
            "Simulation transport: {} initial values, {} reactions",
            config.initial.len(),
            config.reactions.len()
        );
        transport
    }

    /// Signal at `address`, created if needed.
    pub fn signal(&self, address: &str) -> Arc<SimSignal> {
        self.shared.get_or_create(address)
    }

    /// Set a signal value as if the remote end changed it.
    pub fn sim_put(&self, address: &str, value: impl Into<SignalValue>) {
        self.signal(address).put(value.into());
    }

    /// Current value of `address`, if it exists and has one.
    pub fn value(&self, address: &str) -> Option<SignalValue> {
        self.shared.get(address).and_then(|signal| signal.value())
    }

    /// Values written to `address` through bindings, oldest first.
    pub fn writes(&self, address: &str) -> Vec<SignalValue> {
        self.shared
            .get(address)
            .map(|signal| signal.writes())
            .unwrap_or_default()
    }

    /// Simulate loss of connection.
    pub fn disconnect(&self, address: &str) {
        self.signal(address).disconnect();
    }

    /// Restore a lost connection.
    pub fn reconnect(&self, address: &str) {
        self.signal(address).reconnect();
    }

    /// Make writes to `address` fail with `WriteRejected`.
    pub fn reject_writes(&self, address: &str, reason: impl Into<String>) {
        self.signal(address).reject_writes(Some(reason.into()));
    }

    /// Let writes to `address` succeed again.
    pub fn accept_writes(&self, address: &str) {
        self.signal(address).reject_writes(None);
    }

    /// Add a linked reaction.
    pub fn link(&self, reaction: LinkedReaction) {
        debug!(
            "SIM link: {} = {} -> {} = {} after {}ms",
            reaction.when, reaction.equals, reaction.set, reaction.to, reaction.delay_ms
        );
        self.shared.reactions.write().push(reaction);
    }

    /// Known signal addresses, sorted.
    pub fn addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.shared.signals.read().keys().cloned().collect();
        addresses.sort();
        addresses
    }
}

impl SignalTransport for SimTransport {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn bind(
        &self,
        address: &str,
        access: Access,
    ) -> Result<Arc<dyn SignalBinding>, TransportError> {
        let signal = if self.shared.strict {
            self.shared
                .get(address)
                .ok_or_else(|| TransportError::UnknownAddress(address.to_string()))?
        } else {
            self.shared.get_or_create(address)
        };
        trace!("SIM bind {} ({:?})", address, access);
        Ok(Arc::new(SimBinding::new(
            signal,
            access,
            Arc::clone(&self.shared),
        )))
    }
}
