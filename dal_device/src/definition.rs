//! Device definitions.
//!
//! A `DeviceDefinition` is the validated, immutable description of one
//! device: resolved signal addresses, state table, command dispatcher,
//! optional interlock and move timeout. It is produced by
//! `DefinitionBuilder::build`, either from a preset or from a
//! `DeviceConfig`, and every check happens there so a running device
//! never meets an inconsistent table.

pub mod presets;
pub mod template;

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use dal_common::consts::{DEFAULT_MOVE_TIMEOUT_MS, NAME_VAR, PREFIX_VAR};
use dal_common::device::{DeviceConfig, DeviceKind, InterlockConfig};
use dal_common::signal::{SignalValue, StateEntry, StateLabel};
use dal_common::transport::Access;
use thiserror::Error;

use crate::command::dispatcher::{CommandDispatcher, CommandWrite};
use crate::safety::interlock::InterlockGuard;
use crate::state::table::SignalStateTable;

// ─── Errors ─────────────────────────────────────────────────────────

/// Construction-time validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// No signal contributes to the aggregate state.
    #[error("Device '{device}': state table is empty")]
    EmptyStateTable {
        /// Device name.
        device: String,
    },

    /// A table, command or interlock names a signal that was never declared.
    #[error("Device '{device}': {usage} references undeclared signal '{signal}'")]
    UndeclaredSignal {
        /// Device name.
        device: String,
        /// Signal name.
        signal: String,
        /// Where the reference was found.
        usage: &'static str,
    },

    /// A command or guard target is not usable.
    #[error("Device '{device}': '{target}' is not a valid target: {reason}")]
    UnknownTarget {
        /// Device name.
        device: String,
        /// Offending target as written.
        target: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A label the table can produce is neither commandable nor read-only.
    #[error("Device '{device}': state {label} has no command and is not marked read-only")]
    LabelNotCommandable {
        /// Device name.
        device: String,
        /// Offending label.
        label: StateLabel,
    },

    /// A read-only label also has commands.
    #[error("Device '{device}': read-only state {label} has commands")]
    ReadOnlyCommanded {
        /// Device name.
        device: String,
        /// Offending label.
        label: StateLabel,
    },

    /// A signal address template references an undefined variable.
    #[error("Device '{device}': cannot resolve '{variable}' in address template '{template}'")]
    UnresolvedTemplate {
        /// Device name.
        device: String,
        /// Template as written.
        template: String,
        /// Undefined variable.
        variable: String,
    },

    /// A preset parameter is unusable.
    #[error("Device '{device}': {reason}")]
    InvalidParameter {
        /// Device name.
        device: String,
        /// What is wrong.
        reason: String,
    },
}

// ─── DeviceDefinition ───────────────────────────────────────────────

/// Validated device description.
#[derive(Debug, Clone)]
pub struct DeviceDefinition {
    name: String,
    addresses: BTreeMap<String, String>,
    table: SignalStateTable,
    dispatcher: CommandDispatcher,
    interlock: Option<InterlockGuard>,
    read_only: BTreeSet<StateLabel>,
    move_timeout: Duration,
}

impl DeviceDefinition {
    /// Start a definition. `name` and `prefix` become template variables.
    pub fn builder(name: impl Into<String>, prefix: impl Into<String>) -> DefinitionBuilder {
        DefinitionBuilder::new(name, prefix)
    }

    /// Build from a `[[device]]` entry.
    ///
    /// `default_timeout` applies when the entry sets no `move_timeout_ms`.
    pub fn from_config(
        config: &DeviceConfig,
        default_timeout: Duration,
    ) -> Result<Self, DefinitionError> {
        let builder = match config.kind {
            DeviceKind::Stopper => presets::stopper(&config.name, &config.prefix),
            DeviceKind::GateValve => presets::gate_valve(&config.name, &config.prefix),
            DeviceKind::PpsStopper => {
                let in_state = config.in_state.as_deref().unwrap_or(presets::PPS_IN_STATE);
                let out_state = config.out_state.as_deref().unwrap_or(presets::PPS_OUT_STATE);
                if in_state == out_state {
                    return Err(DefinitionError::InvalidParameter {
                        device: config.name.clone(),
                        reason: format!("in_state and out_state are both '{in_state}'"),
                    });
                }
                presets::pps_stopper(&config.name, &config.prefix, in_state, out_state)
            }
            DeviceKind::Custom => DefinitionBuilder::from_custom(config)?,
        };

        builder
            .params(config.params.clone())
            .move_timeout(config.move_timeout().unwrap_or(default_timeout))
            .build()
    }

    /// Device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signal name → resolved address.
    pub fn addresses(&self) -> &BTreeMap<String, String> {
        &self.addresses
    }

    /// Resolved address of `signal`.
    pub fn address(&self, signal: &str) -> Option<&str> {
        self.addresses.get(signal).map(String::as_str)
    }

    /// Access mode `signal` must be bound with.
    pub fn access(&self, signal: &str) -> Access {
        if self.dispatcher.signals().contains(signal) {
            Access::ReadWrite
        } else {
            Access::ReadOnly
        }
    }

    /// Signals whose changes feed state resolution or the interlock.
    pub fn watched_signals(&self) -> BTreeSet<&str> {
        let mut signals: BTreeSet<&str> = self.table.signals().collect();
        if let Some(guard) = &self.interlock {
            signals.extend(guard.signals());
        }
        signals
    }

    /// State table.
    pub fn table(&self) -> &SignalStateTable {
        &self.table
    }

    /// Command dispatcher.
    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    /// Interlock guard, if the device has one.
    pub fn interlock(&self) -> Option<&InterlockGuard> {
        self.interlock.as_ref()
    }

    /// Observable but never commanded labels.
    pub fn read_only(&self) -> &BTreeSet<StateLabel> {
        &self.read_only
    }

    /// Default move timeout.
    pub fn move_timeout(&self) -> Duration {
        self.move_timeout
    }
}

// ─── DefinitionBuilder ──────────────────────────────────────────────

/// Incremental device description. Nothing is checked until `build`.
#[derive(Debug, Clone)]
pub struct DefinitionBuilder {
    name: String,
    vars: BTreeMap<String, String>,
    signals: BTreeMap<String, String>,
    table: SignalStateTable,
    dispatcher: CommandDispatcher,
    interlock: Option<InterlockGuard>,
    read_only: BTreeSet<StateLabel>,
    move_timeout: Duration,
}

impl DefinitionBuilder {
    /// Empty builder.
    pub fn new(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        let name = name.into();
        let vars = BTreeMap::from([
            (PREFIX_VAR.to_string(), prefix.into()),
            (NAME_VAR.to_string(), name.clone()),
        ]);
        Self {
            name,
            vars,
            signals: BTreeMap::new(),
            table: SignalStateTable::new(),
            dispatcher: CommandDispatcher::new(),
            interlock: None,
            read_only: BTreeSet::new(),
            move_timeout: Duration::from_millis(DEFAULT_MOVE_TIMEOUT_MS),
        }
    }

    /// Builder for a `kind = "custom"` entry, without params or timeout.
    fn from_custom(config: &DeviceConfig) -> Result<Self, DefinitionError> {
        let mut builder = Self::new(&config.name, &config.prefix);

        for (signal, template) in &config.signals {
            builder = builder.signal(signal, template);
        }

        for (signal, rows) in &config.states {
            for (key, entry) in rows {
                builder
                    .table
                    .insert(signal, SignalValue::from_key(key), entry.clone());
            }
        }

        for (target, writes) in &config.commands {
            let label: StateLabel =
                target
                    .parse()
                    .map_err(|_| DefinitionError::UnknownTarget {
                        device: config.name.clone(),
                        target: target.clone(),
                        reason: "not a state label",
                    })?;
            for write in writes {
                builder
                    .dispatcher
                    .push(label.clone(), CommandWrite::new(&write.signal, write.value.clone()));
            }
        }

        builder.read_only.extend(config.read_only.iter().cloned());

        if let Some(interlock) = &config.interlock {
            builder.interlock = Some(interlock_from_config(interlock));
        }

        Ok(builder)
    }

    /// Add a template variable. `prefix` and `name` cannot be overridden.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if key != PREFIX_VAR && key != NAME_VAR {
            self.vars.insert(key, value.into());
        }
        self
    }

    /// Add several template variables.
    pub fn params(self, params: impl IntoIterator<Item = (String, String)>) -> Self {
        params
            .into_iter()
            .fold(self, |builder, (key, value)| builder.param(key, value))
    }

    /// Declare a signal and its address template.
    pub fn signal(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.signals.insert(name.into(), template.into());
        self
    }

    /// Add a whole state table for `signal`.
    pub fn states<I, V>(mut self, signal: impl Into<String>, rows: I) -> Self
    where
        I: IntoIterator<Item = (V, StateEntry)>,
        V: Into<SignalValue>,
    {
        self.table = self.table.with_signal(signal, rows);
        self
    }

    /// Append a write to `target`'s command sequence.
    pub fn command(
        mut self,
        target: StateLabel,
        signal: impl Into<String>,
        value: impl Into<SignalValue>,
    ) -> Self {
        self.dispatcher.push(target, CommandWrite::new(signal, value));
        self
    }

    /// Mark `label` observable but never commanded.
    pub fn read_only(mut self, label: StateLabel) -> Self {
        self.read_only.insert(label);
        self
    }

    /// Attach an interlock guard.
    pub fn interlock(mut self, guard: InterlockGuard) -> Self {
        self.interlock = Some(guard);
        self
    }

    /// Default timeout for moves that do not pass one.
    pub fn move_timeout(mut self, timeout: Duration) -> Self {
        self.move_timeout = timeout;
        self
    }

    /// Resolve templates and validate.
    ///
    /// # Errors
    /// Any `DefinitionError`; see the variants for the checks performed.
    pub fn build(self) -> Result<DeviceDefinition, DefinitionError> {
        let device = self.name.clone();

        let mut addresses = BTreeMap::new();
        for (signal, template) in &self.signals {
            let address = template::render(template, &self.vars).map_err(|unresolved| {
                DefinitionError::UnresolvedTemplate {
                    device: device.clone(),
                    template: template.clone(),
                    variable: unresolved.0,
                }
            })?;
            addresses.insert(signal.clone(), address);
        }

        let undeclared = |signal: &str, usage: &'static str| {
            if addresses.contains_key(signal) {
                Ok(())
            } else {
                Err(DefinitionError::UndeclaredSignal {
                    device: device.clone(),
                    signal: signal.to_string(),
                    usage,
                })
            }
        };

        if self.table.is_empty() {
            return Err(DefinitionError::EmptyStateTable { device });
        }
        for signal in self.table.signals() {
            undeclared(signal, "state table")?;
        }

        let observable = self.table.labels();
        for (target, writes) in self.dispatcher.iter() {
            let invalid = |reason| DefinitionError::UnknownTarget {
                device: device.clone(),
                target: target.to_string(),
                reason,
            };
            if target.is_unknown() {
                return Err(invalid("UNKNOWN can never be commanded"));
            }
            if writes.is_empty() {
                return Err(invalid("command has no writes"));
            }
            if self.read_only.contains(target) {
                return Err(DefinitionError::ReadOnlyCommanded {
                    device,
                    label: target.clone(),
                });
            }
            if !observable.contains(target) {
                return Err(invalid("no state table row reports it"));
            }
            for write in writes {
                undeclared(&write.signal, "command")?;
            }
        }

        for label in &observable {
            if label.is_unknown() {
                continue;
            }
            if !self.dispatcher.is_commandable(label) && !self.read_only.contains(label) {
                return Err(DefinitionError::LabelNotCommandable {
                    device,
                    label: label.clone(),
                });
            }
        }

        if let Some(guard) = &self.interlock {
            for signal in guard.signals() {
                undeclared(signal, "interlock")?;
            }
            for target in guard.guarded_targets() {
                if !self.dispatcher.is_commandable(target) {
                    return Err(DefinitionError::UnknownTarget {
                        device,
                        target: target.to_string(),
                        reason: "guarded target has no command",
                    });
                }
            }
        }

        Ok(DeviceDefinition {
            name: self.name,
            addresses,
            table: self.table,
            dispatcher: self.dispatcher,
            interlock: self.interlock,
            read_only: self.read_only,
            move_timeout: self.move_timeout,
        })
    }
}

fn interlock_from_config(config: &InterlockConfig) -> InterlockGuard {
    let mut guard = InterlockGuard::new()
        .guarding(config.guards.iter().cloned())
        .checked_during_move(config.check_during_move);
    for (signal, rows) in &config.signals {
        guard = guard.with_signal(
            signal,
            rows.iter()
                .map(|(key, tripped)| (SignalValue::from_key(key), *tripped)),
        );
    }
    guard
}
