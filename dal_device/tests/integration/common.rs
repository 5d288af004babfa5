//! Shared fixtures.

use dal_common::simulation::LinkedReaction;
use dal_device::prelude::*;
use dal_sim::SimTransport;

pub const STOPPER: &str = "TST:STP:01";
pub const VALVE: &str = "TST:VGC:01";

pub fn addr(prefix: &str, suffix: &str) -> String {
    format!("{prefix}:{suffix}")
}

/// Limit switches showing `state` (IN or OUT).
pub fn put_limits(transport: &SimTransport, open: &str, closed: &str, state: &StateLabel) {
    let out = i64::from(*state == StateLabel::OUT);
    transport.sim_put(open, out);
    transport.sim_put(closed, 1 - out);
}

/// Make `command` writes move the limit switches after `delay_ms`.
pub fn link_limits(
    transport: &SimTransport,
    command: &str,
    open: &str,
    closed: &str,
    delay_ms: u64,
) {
    for (cmd, open_value, closed_value) in [(1, 1, 0), (0, 0, 1)] {
        for (set, to) in [(open, open_value), (closed, closed_value)] {
            transport.link(LinkedReaction {
                when: command.to_string(),
                equals: SignalValue::Int(cmd),
                set: set.to_string(),
                to: SignalValue::Int(to),
                delay_ms,
            });
        }
    }
}

/// Stopper at `STOPPER`, initially in `state`.
pub fn stopper(transport: &SimTransport, state: StateLabel) -> Device {
    put_limits(
        transport,
        &addr(STOPPER, "OPEN"),
        &addr(STOPPER, "CLOSE"),
        &state,
    );
    let definition = presets::stopper("st1", STOPPER).build().unwrap();
    Device::connect(definition, transport).unwrap()
}

/// Stopper whose limits follow the command after `delay_ms`.
pub fn moving_stopper(transport: &SimTransport, state: StateLabel, delay_ms: u64) -> Device {
    link_limits(
        transport,
        &addr(STOPPER, "CMD"),
        &addr(STOPPER, "OPEN"),
        &addr(STOPPER, "CLOSE"),
        delay_ms,
    );
    stopper(transport, state)
}

/// Gate valve at `VALVE`, closed, with the interlock set as given.
pub fn valve(transport: &SimTransport, interlocked: bool) -> Device {
    put_limits(
        transport,
        &addr(VALVE, "OPN_DI"),
        &addr(VALVE, "CLS_DI"),
        &StateLabel::IN,
    );
    transport.sim_put(&addr(VALVE, "OPN_OK"), interlocked);
    let definition = presets::gate_valve("vgc1", VALVE).build().unwrap();
    Device::connect(definition, transport).unwrap()
}
