//! Device Registry: every configured device, by name.
//!
//! Built at startup from `DalConfig`. Immutable after construction; the
//! devices inside it are live.

use std::collections::BTreeMap;

use dal_common::config::DalConfig;
use dal_common::transport::SignalTransport;
use tracing::info;

use crate::definition::DeviceDefinition;
use crate::device::{Device, DeviceSnapshot};
use crate::error::DeviceError;

/// Named collection of connected devices, in name order.
#[derive(Debug, Default, Clone)]
pub struct DeviceRegistry {
    devices: BTreeMap<String, Device>,
}

impl DeviceRegistry {
    /// Validate `config`, then build and connect every `[[device]]` entry.
    ///
    /// Fails on an invalid configuration (duplicate device names included)
    /// or on the first definition or binding error. Must run inside a
    /// Tokio runtime.
    pub fn from_config(
        config: &DalConfig,
        transport: &dyn SignalTransport,
    ) -> Result<Self, DeviceError> {
        config.validate()?;
        let default_timeout = config.shared.default_move_timeout();
        let mut registry = Self::default();

        for device_config in &config.devices {
            let definition = DeviceDefinition::from_config(device_config, default_timeout)?;
            registry.insert(Device::connect(definition, transport)?);
        }

        info!(
            "DeviceRegistry built: {} devices via {}",
            registry.len(),
            transport.name()
        );
        Ok(registry)
    }

    /// Add a device, replacing any device with the same name.
    pub fn insert(&mut self, device: Device) -> Option<Device> {
        self.devices.insert(device.name().to_string(), device)
    }

    /// Device by name.
    pub fn get(&self, name: &str) -> Option<&Device> {
        self.devices.get(name)
    }

    /// Device by name, as a `Result`.
    ///
    /// # Errors
    /// `DeviceError::UnknownDevice` if no such device exists.
    pub fn require(&self, name: &str) -> Result<&Device, DeviceError> {
        self.get(name)
            .ok_or_else(|| DeviceError::UnknownDevice(name.to_string()))
    }

    /// Device names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    /// Devices in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    /// Snapshot of every device.
    pub fn snapshots(&self) -> Vec<DeviceSnapshot> {
        self.iter().map(Device::snapshot).collect()
    }

    /// Number of devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// True if no devices are registered.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
