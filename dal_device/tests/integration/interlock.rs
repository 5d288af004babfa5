//! Interlock veto and in-move interlock checks.

use std::time::Duration;

use dal_device::prelude::*;
use dal_sim::SimTransport;

use super::common::{VALVE, addr, link_limits, valve};

#[tokio::test]
async fn tripped_interlock_vetoes_without_writing() {
    let transport = SimTransport::new();
    let device = valve(&transport, true);
    assert!(device.interlocked());

    let status = device.open().unwrap();
    // Resolved before returning; nothing queued.
    assert_eq!(
        status.outcome(),
        Some(Err(MoveError::InterlockTripped {
            target: StateLabel::OUT
        }))
    );
    assert!(device.moving_to().is_none());

    tokio::task::yield_now().await;
    assert!(transport.writes(&addr(VALVE, "OPN_SW")).is_empty());
    assert!(device.inserted());
}

#[tokio::test]
async fn interlock_tripping_before_writes_blocks_command() {
    let transport = SimTransport::new();
    let device = valve(&transport, false);

    let status = device.open().unwrap();
    assert!(status.outcome().is_none());
    // Trips while the writes are still queued.
    transport.sim_put(&addr(VALVE, "OPN_OK"), 1);

    assert_eq!(
        status.wait().await,
        Err(MoveError::InterlockTripped {
            target: StateLabel::OUT
        })
    );
    assert!(transport.writes(&addr(VALVE, "OPN_SW")).is_empty());
    assert!(device.moving_to().is_none());
    assert!(device.inserted());
}

#[tokio::test]
async fn closing_is_not_guarded() {
    let transport = SimTransport::new();
    link_limits(
        &transport,
        &addr(VALVE, "OPN_SW"),
        &addr(VALVE, "OPN_DI"),
        &addr(VALVE, "CLS_DI"),
        5,
    );
    let device = valve(&transport, false);

    device.open().unwrap().wait().await.unwrap();
    assert!(device.removed());

    transport.sim_put(&addr(VALVE, "OPN_OK"), 1);
    assert!(device.interlocked());
    assert_eq!(device.close().unwrap().wait().await, Ok(StateLabel::IN));
}

#[tokio::test]
async fn veto_still_supersedes_pending_move() {
    let transport = SimTransport::new();
    let device = valve(&transport, false);

    let first = device
        .move_to(StateLabel::OUT, Some(Duration::from_secs(5)))
        .unwrap();
    transport.sim_put(&addr(VALVE, "OPN_OK"), 1);
    let second = device.open().unwrap();

    assert!(matches!(
        first.outcome(),
        Some(Err(MoveError::Superseded { .. }))
    ));
    assert!(matches!(
        second.outcome(),
        Some(Err(MoveError::InterlockTripped { .. }))
    ));
    assert!(device.moving_to().is_none());
}

#[tokio::test]
async fn disconnected_interlock_counts_as_tripped() {
    let transport = SimTransport::new();
    let device = valve(&transport, false);
    assert!(!device.interlocked());

    transport.disconnect(&addr(VALVE, "OPN_OK"));
    assert!(device.interlocked());
    assert!(matches!(
        device.open().unwrap().outcome(),
        Some(Err(MoveError::InterlockTripped { .. }))
    ));

    transport.reconnect(&addr(VALVE, "OPN_OK"));
    assert!(!device.interlocked());
}

fn guarded_filter(transport: &SimTransport) -> Device {
    transport.sim_put("TST:FLT:IN", 1);
    transport.sim_put("TST:FLT:OUT", 0);
    transport.sim_put("TST:FLT:PERMIT", 1);

    let definition = DeviceDefinition::builder("filter", "TST:FLT")
        .signal("in_limit", "{prefix}:IN")
        .signal("out_limit", "{prefix}:OUT")
        .signal("cmd", "{prefix}:GO")
        .signal("permit", "{prefix}:PERMIT")
        .states(
            "in_limit",
            [(0, StateEntry::Defer), (1, StateEntry::Label(StateLabel::IN))],
        )
        .states(
            "out_limit",
            [(0, StateEntry::Defer), (1, StateEntry::Label(StateLabel::OUT))],
        )
        .command(StateLabel::IN, "cmd", 0)
        .command(StateLabel::OUT, "cmd", 1)
        .interlock(
            InterlockGuard::new()
                .with_signal("permit", [(1, false), (0, true)])
                .checked_during_move(true),
        )
        .build()
        .unwrap();
    Device::connect(definition, transport).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn interlock_trip_during_move_fails_it() {
    let transport = SimTransport::new();
    let device = guarded_filter(&transport);

    let status = device
        .move_to(StateLabel::OUT, Some(Duration::from_secs(5)))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    transport.sim_put("TST:FLT:PERMIT", 0);

    let outcome = tokio::time::timeout(Duration::from_secs(1), status.wait())
        .await
        .expect("interlock should end the move well before its deadline");
    assert_eq!(
        outcome,
        Err(MoveError::InterlockTripped {
            target: StateLabel::OUT
        })
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn trip_during_move_ignored_without_in_move_checks() {
    let transport = SimTransport::new();
    let device = valve(&transport, false);

    let status = device
        .move_to(StateLabel::OUT, Some(Duration::from_millis(80)))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    transport.sim_put(&addr(VALVE, "OPN_OK"), 1);

    assert!(matches!(
        status.wait().await,
        Err(MoveError::Timeout { .. })
    ));
}
