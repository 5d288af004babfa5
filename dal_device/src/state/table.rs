//! Signal State Table.
//!
//! For each contributing signal, a map from raw value to either a
//! `StateLabel` or DEFER. Immutable once the device is built.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use dal_common::signal::{SignalValue, StateEntry, StateLabel};

/// Raw value → entry map of one signal.
pub type ValueTable = HashMap<SignalValue, StateEntry>;

/// Per-signal state tables, keyed by declared signal name.
///
/// Signals are kept in name order so resolution visits them
/// deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalStateTable {
    signals: BTreeMap<String, ValueTable>,
}

impl SignalStateTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert) for a whole signal.
    pub fn with_signal<I, V>(mut self, signal: impl Into<String>, rows: I) -> Self
    where
        I: IntoIterator<Item = (V, StateEntry)>,
        V: Into<SignalValue>,
    {
        let table = self.signals.entry(signal.into()).or_default();
        for (value, entry) in rows {
            table.insert(value.into(), entry);
        }
        self
    }

    /// Add or replace one row. Creates the signal if needed.
    pub fn insert(&mut self, signal: impl Into<String>, value: SignalValue, entry: StateEntry) {
        self.signals
            .entry(signal.into())
            .or_default()
            .insert(value, entry);
    }

    /// Number of contributing signals.
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// True if no signal contributes.
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Contributing signal names in resolution order.
    pub fn signals(&self) -> impl Iterator<Item = &str> {
        self.signals.keys().map(String::as_str)
    }

    /// Whether `signal` contributes to the aggregate state.
    pub fn contains_signal(&self, signal: &str) -> bool {
        self.signals.contains_key(signal)
    }

    /// Entry for `value` on `signal`.
    ///
    /// `None` when the signal does not contribute or the value is unmapped.
    #[inline]
    pub fn lookup(&self, signal: &str, value: &SignalValue) -> Option<&StateEntry> {
        self.signals.get(signal).and_then(|rows| rows.get(value))
    }

    /// Iterate `(signal, rows)` pairs in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ValueTable)> {
        self.signals.iter().map(|(name, rows)| (name.as_str(), rows))
    }

    /// Every label any row can produce. DEFER is not a label.
    pub fn labels(&self) -> BTreeSet<StateLabel> {
        self.signals
            .values()
            .flat_map(|rows| rows.values())
            .filter_map(StateEntry::label)
            .cloned()
            .collect()
    }
}
