//! Aggregate state tracking through live signal changes.

use std::sync::Arc;
use std::thread;

use dal_device::prelude::*;
use dal_sim::SimTransport;
use parking_lot::Mutex;

use super::common::{STOPPER, addr, stopper};

fn two_signal_device(transport: &SimTransport) -> Device {
    let definition = DeviceDefinition::builder("pair", "TST:PAIR")
        .signal("a", "{prefix}:A")
        .signal("b", "{prefix}:B")
        .signal("cmd", "{prefix}:CMD")
        .states(
            "a",
            [(0, StateEntry::Defer), (1, StateEntry::Label(StateLabel::IN))],
        )
        .states(
            "b",
            [(0, StateEntry::Defer), (1, StateEntry::Label(StateLabel::OUT))],
        )
        .command(StateLabel::IN, "cmd", 0)
        .command(StateLabel::OUT, "cmd", 1)
        .build()
        .unwrap();
    Device::connect(definition, transport).unwrap()
}

#[tokio::test]
async fn defer_tie_break_scenario() {
    let transport = SimTransport::new();
    let device = two_signal_device(&transport);
    assert_eq!(device.current_state(), StateLabel::UNKNOWN);

    transport.sim_put("TST:PAIR:A", 1);
    transport.sim_put("TST:PAIR:B", 0);
    assert_eq!(device.current_state(), StateLabel::IN);

    transport.sim_put("TST:PAIR:B", 1);
    assert_eq!(device.current_state(), StateLabel::UNKNOWN);

    transport.sim_put("TST:PAIR:A", 0);
    assert_eq!(device.current_state(), StateLabel::OUT);

    transport.sim_put("TST:PAIR:B", 0);
    assert_eq!(device.current_state(), StateLabel::UNKNOWN);
}

#[tokio::test]
async fn unmapped_value_and_reconnect() {
    let transport = SimTransport::new();
    let device = stopper(&transport, StateLabel::OUT);
    assert!(device.removed());

    transport.sim_put(&addr(STOPPER, "CLOSE"), 7);
    assert_eq!(device.current_state(), StateLabel::UNKNOWN);
    transport.sim_put(&addr(STOPPER, "CLOSE"), 0);
    assert!(device.removed());

    transport.disconnect(&addr(STOPPER, "OPEN"));
    assert_eq!(device.current_state(), StateLabel::UNKNOWN);
    transport.reconnect(&addr(STOPPER, "OPEN"));
    assert!(device.removed());
}

#[tokio::test]
async fn observers_see_changes_in_order() {
    let transport = SimTransport::new();
    let device = stopper(&transport, StateLabel::IN);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    device.subscribe(
        move |change: &StateChange| {
            sink.lock()
                .push((change.previous.clone(), change.current.clone()));
        },
        false,
    );

    transport.sim_put(&addr(STOPPER, "CLOSE"), 0);
    transport.sim_put(&addr(STOPPER, "OPEN"), 1);
    // Same state again: no notification.
    transport.sim_put(&addr(STOPPER, "OPEN"), 1);

    assert_eq!(
        *seen.lock(),
        vec![
            (StateLabel::IN, StateLabel::UNKNOWN),
            (StateLabel::UNKNOWN, StateLabel::OUT),
        ]
    );
}

#[tokio::test]
async fn observer_may_call_back_into_device() {
    let transport = SimTransport::new();
    let device = stopper(&transport, StateLabel::IN);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handle = device.clone();
    device.subscribe(
        move |change: &StateChange| {
            // Runs outside the device lock.
            assert_eq!(handle.current_state(), change.current);
            sink.lock().push(handle.snapshot().state);
        },
        true,
    );

    transport.sim_put(&addr(STOPPER, "CLOSE"), 0);
    assert_eq!(*seen.lock(), vec![StateLabel::IN, StateLabel::UNKNOWN]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_notifications_settle_consistently() {
    let transport = SimTransport::new();
    let device = stopper(&transport, StateLabel::OUT);

    let open = addr(STOPPER, "OPEN");
    let closed = addr(STOPPER, "CLOSE");
    let writers: Vec<_> = [(open, 0), (closed, 1)]
        .into_iter()
        .map(|(address, last)| {
            let transport = transport.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    transport.sim_put(&address, i % 2);
                }
                transport.sim_put(&address, last);
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    assert_eq!(device.current_state(), StateLabel::IN);
    assert_eq!(device.signal_value("open_limit"), Some(SignalValue::Int(0)));
    assert_eq!(device.signal_value("closed_limit"), Some(SignalValue::Int(1)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_puts_to_one_signal_leave_no_stale_value() {
    let transport = SimTransport::new();
    let device = stopper(&transport, StateLabel::OUT);
    let closed = addr(STOPPER, "CLOSE");

    let writers: Vec<_> = (0..4)
        .map(|_| {
            let transport = transport.clone();
            let address = closed.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    transport.sim_put(&address, i % 2);
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    assert_eq!(device.signal_value("closed_limit"), transport.value(&closed));
    assert_eq!(device.signal_value("closed_limit"), Some(SignalValue::Int(1)));
}
