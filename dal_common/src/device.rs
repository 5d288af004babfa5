//! Device configuration structs.
//!
//! Deserialized from the `[[device]]` array of the main TOML file. A
//! device is either one of the built-in kinds (whose tables are built in
//! code) or `custom`, in which case signals, state tables, commands and
//! the interlock are spelled out as data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::signal::{SignalValue, StateEntry, StateLabel};

// ─── DeviceKind ─────────────────────────────────────────────────────

/// Built-in device layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Controls-commandable stopper (open/closed limits + command word).
    Stopper,
    /// Vacuum gate valve with an open-permission interlock.
    GateValve,
    /// Personnel-protection stopper: read-only summary signal.
    PpsStopper,
    /// Fully data-defined device.
    #[default]
    Custom,
}

// ─── CommandConfig ──────────────────────────────────────────────────

/// One command write: `signal` receives `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Declared signal name (key of `signals`).
    pub signal: String,
    /// Value to write.
    pub value: SignalValue,
}

// ─── InterlockConfig ────────────────────────────────────────────────

/// Interlock guard definition.
///
/// `signals` maps each contributing signal to a raw-value table whose
/// entries say whether that value trips the interlock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterlockConfig {
    /// Signal name → raw value key → tripped.
    #[serde(default)]
    pub signals: BTreeMap<String, BTreeMap<String, bool>>,

    /// Targets vetoed while tripped. Empty = every target.
    #[serde(default)]
    pub guards: Vec<StateLabel>,

    /// Re-evaluate while a move is in flight and fail it on trip.
    #[serde(default)]
    pub check_during_move: bool,
}

// ─── DeviceConfig ───────────────────────────────────────────────────

/// A single device definition from the `[[device]]` array.
///
/// Kind-specific fields use `Option` / `#[serde(default)]`; they are
/// validated when the device definition is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique device name.
    pub name: String,

    /// Base address substituted for `{prefix}` in signal templates.
    #[serde(default)]
    pub prefix: String,

    /// Device layout. Default: `custom`.
    #[serde(default)]
    pub kind: DeviceKind,

    /// Per-device move timeout [ms]. Default: `[shared] default_move_timeout_ms`.
    #[serde(default)]
    pub move_timeout_ms: Option<u64>,

    /// Extra template variables available to signal addresses.
    #[serde(default)]
    pub params: BTreeMap<String, String>,

    // ── pps_stopper ─────────────────────────────────────────────────

    /// Summary string reported when inserted. Default: "IN".
    #[serde(default)]
    pub in_state: Option<String>,

    /// Summary string reported when removed. Default: "OUT".
    #[serde(default)]
    pub out_state: Option<String>,

    // ── custom ──────────────────────────────────────────────────────

    /// Signal name → address template.
    #[serde(default)]
    pub signals: BTreeMap<String, String>,

    /// Signal name → raw value key → label or `"defer"`.
    #[serde(default)]
    pub states: BTreeMap<String, BTreeMap<String, StateEntry>>,

    /// Target label → ordered command writes.
    #[serde(default)]
    pub commands: BTreeMap<String, Vec<CommandConfig>>,

    /// Labels that can be observed but never commanded.
    #[serde(default)]
    pub read_only: Vec<StateLabel>,

    /// Optional interlock guard.
    #[serde(default)]
    pub interlock: Option<InterlockConfig>,
}

impl DeviceConfig {
    /// Parse a single device from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Configured move timeout, if any.
    pub fn move_timeout(&self) -> Option<Duration> {
        self.move_timeout_ms.map(Duration::from_millis)
    }
}
