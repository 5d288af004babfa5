//! Built-in device layouts.
//!
//! Each preset returns a `DefinitionBuilder` so callers can still add
//! params or change the timeout before `build()`. Variation between
//! device classes lives entirely in these tables.

use dal_common::signal::{SignalValue, StateEntry, StateLabel};

use super::DefinitionBuilder;
use crate::safety::interlock::InterlockGuard;

/// Open limit switch signal name.
pub const OPEN_LIMIT: &str = "open_limit";
/// Closed limit switch signal name.
pub const CLOSED_LIMIT: &str = "closed_limit";
/// Command word signal name.
pub const COMMAND: &str = "command";
/// Gate valve open-permission signal name.
pub const INTERLOCK: &str = "interlock";
/// PPS summary signal name.
pub const SUMMARY: &str = "summary";

/// Default PPS summary string for the inserted stopper.
pub const PPS_IN_STATE: &str = "IN";
/// Default PPS summary string for the removed stopper.
pub const PPS_OUT_STATE: &str = "OUT";

/// Two limit switches, one command word: 0 closes (IN), 1 opens (OUT).
fn limit_switches(builder: DefinitionBuilder) -> DefinitionBuilder {
    builder
        .states(
            OPEN_LIMIT,
            [(0, StateEntry::Defer), (1, StateEntry::Label(StateLabel::OUT))],
        )
        .states(
            CLOSED_LIMIT,
            [(0, StateEntry::Defer), (1, StateEntry::Label(StateLabel::IN))],
        )
        .command(StateLabel::IN, COMMAND, 0)
        .command(StateLabel::OUT, COMMAND, 1)
}

/// Controls stopper: `{prefix}:OPEN`, `{prefix}:CLOSE`, `{prefix}:CMD`.
pub fn stopper(name: &str, prefix: &str) -> DefinitionBuilder {
    limit_switches(DefinitionBuilder::new(name, prefix))
        .signal(OPEN_LIMIT, "{prefix}:OPEN")
        .signal(CLOSED_LIMIT, "{prefix}:CLOSE")
        .signal(COMMAND, "{prefix}:CMD")
}

/// Vacuum gate valve with an open-permission interlock.
///
/// `{prefix}:OPN_OK` = 1 trips the interlock. Only opening (OUT) is
/// guarded; closing is always allowed.
pub fn gate_valve(name: &str, prefix: &str) -> DefinitionBuilder {
    limit_switches(DefinitionBuilder::new(name, prefix))
        .signal(OPEN_LIMIT, "{prefix}:OPN_DI")
        .signal(CLOSED_LIMIT, "{prefix}:CLS_DI")
        .signal(COMMAND, "{prefix}:OPN_SW")
        .signal(INTERLOCK, "{prefix}:OPN_OK")
        .interlock(
            InterlockGuard::new()
                .with_signal(INTERLOCK, [(0, false), (1, true)])
                .guarding([StateLabel::OUT]),
        )
}

/// Personnel-protection stopper: one read-only summary string at
/// `{prefix}`. Any other summary value resolves to UNKNOWN.
pub fn pps_stopper(name: &str, prefix: &str, in_state: &str, out_state: &str) -> DefinitionBuilder {
    DefinitionBuilder::new(name, prefix)
        .signal(SUMMARY, "{prefix}")
        .states(
            SUMMARY,
            [
                (SignalValue::from(in_state), StateEntry::Label(StateLabel::IN)),
                (SignalValue::from(out_state), StateEntry::Label(StateLabel::OUT)),
            ],
        )
        .read_only(StateLabel::IN)
        .read_only(StateLabel::OUT)
}
