//! Interlock Guard.
//!
//! Each interlock signal has a raw value → tripped table. The guard is
//! tripped when any signal reports a tripping value. A signal that is
//! missing or carries an unmapped value also trips it.
//!
//! `guards` scopes the veto to particular targets (e.g. only "open" on a
//! gate valve). An empty set guards every target.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use dal_common::signal::{SignalValue, StateLabel};

use crate::state::SignalValues;

/// Interlock predicate over a set of signals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterlockGuard {
    signals: BTreeMap<String, HashMap<SignalValue, bool>>,
    guards: BTreeSet<StateLabel>,
    check_during_move: bool,
}

impl InterlockGuard {
    /// Guard with no signals (never tripped) covering every target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a signal and its raw value → tripped table.
    pub fn with_signal<I, V>(mut self, signal: impl Into<String>, rows: I) -> Self
    where
        I: IntoIterator<Item = (V, bool)>,
        V: Into<SignalValue>,
    {
        let table = self.signals.entry(signal.into()).or_default();
        for (value, tripped) in rows {
            table.insert(value.into(), tripped);
        }
        self
    }

    /// Restrict the veto to `targets`. Empty = every target.
    pub fn guarding(mut self, targets: impl IntoIterator<Item = StateLabel>) -> Self {
        self.guards = targets.into_iter().collect();
        self
    }

    /// Also evaluate while a move is being watched.
    pub fn checked_during_move(mut self, enabled: bool) -> Self {
        self.check_during_move = enabled;
        self
    }

    /// Interlock signal names.
    pub fn signals(&self) -> impl Iterator<Item = &str> {
        self.signals.keys().map(String::as_str)
    }

    /// Explicitly guarded targets. Empty = every target.
    pub fn guarded_targets(&self) -> &BTreeSet<StateLabel> {
        &self.guards
    }

    /// Whether the guard is re-evaluated while a move is watched.
    #[inline]
    pub fn check_during_move(&self) -> bool {
        self.check_during_move
    }

    /// First signal currently tripping the guard, if any.
    pub fn tripped_by(&self, values: &SignalValues) -> Option<&str> {
        self.signals
            .iter()
            .find(|(signal, rows)| {
                values
                    .get(signal.as_str())
                    .and_then(|value| rows.get(value))
                    .copied()
                    .unwrap_or(true)
            })
            .map(|(signal, _)| signal.as_str())
    }

    /// Whether any interlock signal is tripped.
    #[inline]
    pub fn is_tripped(&self, values: &SignalValues) -> bool {
        self.tripped_by(values).is_some()
    }

    /// Whether a move to `target` is subject to this guard.
    #[inline]
    pub fn guards(&self, target: &StateLabel) -> bool {
        self.guards.is_empty() || self.guards.contains(target)
    }

    /// Whether a move to `target` must be refused under `values`.
    pub fn vetoes(&self, target: &StateLabel, values: &SignalValues) -> bool {
        self.guards(target) && self.is_tripped(values)
    }
}
