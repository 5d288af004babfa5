//! State Resolver: DEFER tie-break over the signal state table.
//!
//! Each contributing signal maps its current value to an entry:
//! - DEFER entries are dropped.
//! - An unmapped value or a missing (disconnected) signal contributes
//!   UNKNOWN, which competes like any other label.
//!
//! Zero remaining labels → UNKNOWN. Exactly one distinct label → that
//! label. Two or more distinct labels → UNKNOWN (conflicting evidence).
//!
//! Resolution is a pure function of the table and the value map; the
//! previous aggregate state never feeds back in.

use dal_common::signal::{StateEntry, StateLabel};

use super::SignalValues;
use super::table::SignalStateTable;

/// Why the resolver produced its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// Every non-DEFER signal agrees.
    Resolved(&'a StateLabel),
    /// Every signal deferred.
    AllDeferred,
    /// A signal is missing or carries a value absent from its table.
    Unmapped(&'a str),
    /// Two signals named different labels.
    Conflict(&'a StateLabel, &'a StateLabel),
}

impl Resolution<'_> {
    /// Aggregate state for this resolution.
    pub fn state(&self) -> StateLabel {
        match self {
            Self::Resolved(label) => (*label).clone(),
            Self::AllDeferred | Self::Unmapped(_) | Self::Conflict(..) => StateLabel::UNKNOWN,
        }
    }
}

/// Resolve with diagnostics.
///
/// An explicit UNKNOWN row alongside another label counts as a conflict;
/// an unmapped value short-circuits to `Unmapped` since it would only add
/// UNKNOWN to the set.
pub fn explain<'a>(table: &'a SignalStateTable, values: &SignalValues) -> Resolution<'a> {
    let mut agreed: Option<&'a StateLabel> = None;

    for (signal, rows) in table.iter() {
        let label = match values.get(signal).and_then(|value| rows.get(value)) {
            Some(StateEntry::Defer) => continue,
            Some(StateEntry::Label(label)) => label,
            None => return Resolution::Unmapped(signal),
        };

        match agreed {
            None => agreed = Some(label),
            Some(previous) if previous == label => {}
            Some(previous) => return Resolution::Conflict(previous, label),
        }
    }

    match agreed {
        Some(label) => Resolution::Resolved(label),
        None => Resolution::AllDeferred,
    }
}

/// Aggregate state of `values` under `table`.
#[inline]
pub fn resolve(table: &SignalStateTable, values: &SignalValues) -> StateLabel {
    explain(table, values).state()
}
