//! The shipped sample configuration, end to end over the simulator.

use std::path::Path;

use dal_common::config::{ConfigLoader, DalConfig};
use dal_device::prelude::*;
use dal_sim::SimTransport;

fn load() -> (SimTransport, DeviceRegistry) {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../dal/config/devices.toml");
    let config = DalConfig::load(&path).unwrap();
    config.validate().unwrap();
    let transport = SimTransport::from_config(&config.simulation);
    let registry = DeviceRegistry::from_config(&config, &transport).unwrap();
    (transport, registry)
}

#[tokio::test]
async fn every_device_starts_inserted() {
    let (_transport, registry) = load();
    assert_eq!(registry.names().collect::<Vec<_>>(), ["flt1", "pps1", "st1", "vgc1"]);
    for snapshot in registry.snapshots() {
        assert_eq!(snapshot.state, StateLabel::IN, "{}", snapshot.name);
        assert!(snapshot.reachable);
        assert!(!snapshot.interlocked);
    }
}

#[tokio::test]
async fn stopper_follows_simulated_limits() {
    let (_transport, registry) = load();
    let st1 = registry.require("st1").unwrap();

    assert_eq!(st1.open().unwrap().wait().await, Ok(StateLabel::OUT));
    assert_eq!(st1.close().unwrap().wait().await, Ok(StateLabel::IN));
}

#[tokio::test]
async fn filter_permit_vetoes_removal() {
    let (transport, registry) = load();
    let flt1 = registry.require("flt1").unwrap();

    transport.sim_put("HXR:FLT:PERMIT", 0);
    assert!(flt1.interlocked());
    assert!(matches!(
        flt1.remove().unwrap().outcome(),
        Some(Err(MoveError::InterlockTripped { .. }))
    ));
    assert!(transport.writes("HXR:FLT:01:GO").is_empty());
}

#[tokio::test]
async fn pps_summary_uses_configured_strings() {
    let (transport, registry) = load();
    let pps1 = registry.require("pps1").unwrap();

    transport.sim_put("HXR:PPS:STP:01", "REMOVED");
    assert!(pps1.removed());
    transport.sim_put("HXR:PPS:STP:01", "FAULT");
    assert!(pps1.current_state().is_unknown());
}
