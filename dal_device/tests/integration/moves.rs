//! Move completion, timeout, supersede and cancel.

use std::time::{Duration, Instant};

use dal_device::prelude::*;
use dal_sim::SimTransport;

use super::common::{STOPPER, addr, moving_stopper, put_limits, stopper};

#[tokio::test]
async fn move_completes_when_limits_report_target() {
    let transport = SimTransport::new();
    let device = moving_stopper(&transport, StateLabel::IN, 20);

    let status = device.remove().unwrap();
    assert_eq!(status.target(), &StateLabel::OUT);
    assert!(!status.is_done());

    assert_eq!(status.wait().await, Ok(StateLabel::OUT));
    assert!(status.success());
    assert!(device.removed());
    assert!(device.moving_to().is_none());
    assert_eq!(transport.writes(&addr(STOPPER, "CMD")), vec![SignalValue::Int(1)]);
}

#[tokio::test]
async fn move_to_current_state_completes_on_issue() {
    let transport = SimTransport::new();
    let device = stopper(&transport, StateLabel::IN);

    let status = device.insert().unwrap();
    assert_eq!(status.wait().await, Ok(StateLabel::IN));
    // The command is still written.
    assert_eq!(transport.writes(&addr(STOPPER, "CMD")), vec![SignalValue::Int(0)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn move_times_out_with_last_state() {
    let transport = SimTransport::new();
    let device = stopper(&transport, StateLabel::IN);

    let started = Instant::now();
    let status = device
        .move_to(StateLabel::OUT, Some(Duration::from_millis(50)))
        .unwrap();
    let outcome = status.wait().await;
    let waited = started.elapsed();

    match outcome {
        Err(MoveError::Timeout {
            target,
            last_state,
            elapsed,
        }) => {
            assert_eq!(target, StateLabel::OUT);
            assert_eq!(last_state, StateLabel::IN);
            assert!(elapsed >= Duration::from_millis(50), "elapsed {elapsed:?}");
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(waited >= Duration::from_millis(50));
    assert!(waited < Duration::from_millis(300), "waited {waited:?}");
    assert!(device.moving_to().is_none());
}

#[tokio::test]
async fn second_move_supersedes_first() {
    let transport = SimTransport::new();
    let device = stopper(&transport, StateLabel::IN);

    let first = device
        .move_to(StateLabel::OUT, Some(Duration::from_secs(5)))
        .unwrap();
    let second = device
        .move_to(StateLabel::IN, Some(Duration::from_secs(5)))
        .unwrap();

    // Released before the second move does anything.
    assert_eq!(
        first.outcome(),
        Some(Err(MoveError::Superseded {
            target: StateLabel::OUT
        }))
    );
    assert_ne!(first.id(), second.id());

    assert_eq!(second.wait().await, Ok(StateLabel::IN));
    // The superseded move never wrote.
    assert_eq!(transport.writes(&addr(STOPPER, "CMD")), vec![SignalValue::Int(0)]);
    assert!(matches!(
        first.wait().await,
        Err(MoveError::Superseded { .. })
    ));
}

#[tokio::test]
async fn cancel_releases_waiters() {
    let transport = SimTransport::new();
    let device = stopper(&transport, StateLabel::IN);

    let status = device
        .move_to(StateLabel::OUT, Some(Duration::from_secs(5)))
        .unwrap();
    let waiter = status.clone();
    let task = tokio::spawn(async move { waiter.wait().await });

    tokio::task::yield_now().await;
    assert_eq!(device.moving_to(), Some(StateLabel::OUT));
    assert!(device.cancel(&status));
    assert!(!device.cancel(&status));

    let expected = Err(MoveError::Cancelled {
        target: StateLabel::OUT,
    });
    assert_eq!(task.await.unwrap(), expected);
    assert_eq!(status.wait().await, expected);
    assert!(device.moving_to().is_none());
}

#[tokio::test]
async fn cancel_ignores_handle_from_another_device() {
    let transport = SimTransport::new();
    let first = stopper(&transport, StateLabel::IN);
    put_limits(
        &transport,
        "TST:STP:02:OPEN",
        "TST:STP:02:CLOSE",
        &StateLabel::IN,
    );
    let definition = presets::stopper("st2", "TST:STP:02").build().unwrap();
    let second = Device::connect(definition, &transport).unwrap();

    let first_move = first
        .move_to(StateLabel::OUT, Some(Duration::from_secs(5)))
        .unwrap();
    let second_move = second
        .move_to(StateLabel::OUT, Some(Duration::from_secs(5)))
        .unwrap();
    assert_ne!(first_move.id(), second_move.id());

    assert!(!first.cancel(&second_move));
    assert!(first_move.outcome().is_none());
    assert!(second_move.outcome().is_none());
    assert_eq!(first.moving_to(), Some(StateLabel::OUT));

    assert!(second.cancel(&second_move));
    assert!(matches!(
        second_move.outcome(),
        Some(Err(MoveError::Cancelled { .. }))
    ));
    assert!(first_move.outcome().is_none());
}

#[tokio::test]
async fn move_phase_tracks_writer_progress() {
    let transport = SimTransport::new();
    let device = stopper(&transport, StateLabel::IN);
    assert_eq!(device.move_phase(), None);

    let status = device
        .move_to(StateLabel::OUT, Some(Duration::from_secs(5)))
        .unwrap();
    // The writer task has not run yet.
    assert_eq!(device.move_phase(), Some(MovePhase::Issued));

    for _ in 0..100 {
        if device.move_phase() != Some(MovePhase::Issued) {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(device.move_phase(), Some(MovePhase::Watching));
    assert_eq!(transport.writes(&addr(STOPPER, "CMD")), vec![SignalValue::Int(1)]);

    assert!(device.cancel(&status));
    assert_eq!(device.move_phase(), None);
}

#[tokio::test]
async fn cancel_ignores_finished_move() {
    let transport = SimTransport::new();
    let device = stopper(&transport, StateLabel::IN);

    let status = device.insert().unwrap();
    status.wait().await.unwrap();
    assert!(!device.cancel(&status));
    assert_eq!(status.outcome(), Some(Ok(StateLabel::IN)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn disconnect_during_move_times_out_unknown() {
    let transport = SimTransport::new();
    let device = stopper(&transport, StateLabel::IN);

    let status = device
        .move_to(StateLabel::OUT, Some(Duration::from_millis(80)))
        .unwrap();
    transport.disconnect(&addr(STOPPER, "CLOSE"));
    assert_eq!(device.current_state(), StateLabel::UNKNOWN);
    assert!(!device.reachable());

    match status.wait().await {
        Err(MoveError::Timeout { last_state, .. }) => assert!(last_state.is_unknown()),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_write_surfaces_as_timeout() {
    let transport = SimTransport::new();
    let device = moving_stopper(&transport, StateLabel::IN, 0);
    transport.reject_writes(&addr(STOPPER, "CMD"), "IOC busy");

    let status = device
        .move_to(StateLabel::OUT, Some(Duration::from_millis(60)))
        .unwrap();
    assert!(matches!(
        status.wait().await,
        Err(MoveError::Timeout { .. })
    ));
    assert!(transport.writes(&addr(STOPPER, "CMD")).is_empty());
    assert!(device.inserted());
}

#[tokio::test]
async fn dropping_device_cancels_pending_move() {
    let transport = SimTransport::new();
    let device = stopper(&transport, StateLabel::IN);

    let status = device
        .move_to(StateLabel::OUT, Some(Duration::from_secs(5)))
        .unwrap();
    drop(device);

    assert!(matches!(
        status.wait().await,
        Err(MoveError::Cancelled { .. })
    ));
}

#[tokio::test]
async fn every_waiter_sees_the_same_outcome() {
    let transport = SimTransport::new();
    let device = moving_stopper(&transport, StateLabel::IN, 10);

    let status = device.remove().unwrap();
    let waiters: Vec<_> = (0..4)
        .map(|_| {
            let status = status.clone();
            tokio::spawn(async move { status.wait().await })
        })
        .collect();

    for waiter in waiters {
        assert_eq!(waiter.await.unwrap(), Ok(StateLabel::OUT));
    }
}

#[tokio::test]
async fn read_only_target_is_rejected_synchronously() {
    let transport = SimTransport::new();
    transport.sim_put("TST:PPS:01", "IN");
    let definition = presets::pps_stopper("pps1", "TST:PPS:01", "IN", "OUT")
        .build()
        .unwrap();
    let device = Device::connect(definition, &transport).unwrap();

    assert_eq!(device.current_state(), StateLabel::IN);
    assert!(matches!(
        device.remove(),
        Err(DeviceError::UnreachableState(ref target)) if *target == StateLabel::OUT
    ));
    assert!(device.moving_to().is_none());
}

#[tokio::test]
async fn round_trip_between_states() {
    let transport = SimTransport::new();
    let device = moving_stopper(&transport, StateLabel::IN, 5);

    device.open().unwrap().wait().await.unwrap();
    assert!(device.removed());
    device.close().unwrap().wait().await.unwrap();
    assert!(device.inserted());
    assert_eq!(
        transport.writes(&addr(STOPPER, "CMD")),
        vec![SignalValue::Int(1), SignalValue::Int(0)]
    );
}
