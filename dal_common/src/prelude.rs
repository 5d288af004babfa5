//! Prelude module for common re-exports.
//!
//! ```rust
//! use dal_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, DalConfig, SharedConfig};
pub use crate::device::{CommandConfig, DeviceConfig, DeviceKind, InterlockConfig};
pub use crate::simulation::{InitialValue, LinkedReaction, SimulationConfig};

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::DEFAULT_MOVE_TIMEOUT_MS;

// ─── Signals ────────────────────────────────────────────────────────
pub use crate::signal::{SignalValue, StateEntry, StateLabel};
pub use crate::transport::{
    Access, SignalBinding, SignalCallback, SignalEvent, SignalTransport, SubscriptionId,
    TransportError,
};
