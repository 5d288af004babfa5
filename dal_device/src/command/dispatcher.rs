//! Command Dispatcher.
//!
//! Each commandable target owns an ordered, non-empty list of
//! `(signal, value)` writes. UNKNOWN and read-only labels have no entry
//! and are rejected synchronously.

use std::collections::{BTreeMap, BTreeSet};

use dal_common::signal::{SignalValue, StateLabel};

use crate::error::DeviceError;

/// One write issued for a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandWrite {
    /// Declared signal name.
    pub signal: String,
    /// Value written to it.
    pub value: SignalValue,
}

impl CommandWrite {
    /// Convenience constructor.
    pub fn new(signal: impl Into<String>, value: impl Into<SignalValue>) -> Self {
        Self {
            signal: signal.into(),
            value: value.into(),
        }
    }
}

/// Target label → ordered writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandDispatcher {
    commands: BTreeMap<StateLabel, Vec<CommandWrite>>,
}

impl CommandDispatcher {
    /// Dispatcher with no commandable targets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a write to `target`'s sequence.
    pub fn push(&mut self, target: StateLabel, write: CommandWrite) {
        self.commands.entry(target).or_default().push(write);
    }

    /// Builder form of [`push`](Self::push).
    pub fn with_write(
        mut self,
        target: StateLabel,
        signal: impl Into<String>,
        value: impl Into<SignalValue>,
    ) -> Self {
        self.push(target, CommandWrite::new(signal, value));
        self
    }

    /// Writes that request `target`, in issue order.
    ///
    /// # Errors
    /// `DeviceError::UnreachableState` if `target` is UNKNOWN or has no
    /// entry.
    pub fn commands_for(&self, target: &StateLabel) -> Result<&[CommandWrite], DeviceError> {
        if target.is_unknown() {
            return Err(DeviceError::UnreachableState(target.clone()));
        }
        match self.commands.get(target) {
            Some(writes) if !writes.is_empty() => Ok(writes),
            _ => Err(DeviceError::UnreachableState(target.clone())),
        }
    }

    /// Whether `target` can be commanded.
    pub fn is_commandable(&self, target: &StateLabel) -> bool {
        self.commands_for(target).is_ok()
    }

    /// Commandable targets.
    pub fn targets(&self) -> impl Iterator<Item = &StateLabel> {
        self.commands.keys()
    }

    /// Every signal written by any target.
    pub fn signals(&self) -> BTreeSet<&str> {
        self.commands
            .values()
            .flatten()
            .map(|write| write.signal.as_str())
            .collect()
    }

    /// Iterate `(target, writes)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&StateLabel, &[CommandWrite])> {
        self.commands
            .iter()
            .map(|(target, writes)| (target, writes.as_slice()))
    }
}
