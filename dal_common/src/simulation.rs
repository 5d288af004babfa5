//! Simulation transport configuration.
//!
//! Initial signal values and linked reactions for the in-memory
//! transport. A linked reaction models hardware responding to a command:
//! when `when` is written with `equals`, `set` changes to `to` after
//! `delay_ms`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::signal::SignalValue;

/// Initial value of one simulated signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialValue {
    /// Resolved signal address.
    pub address: String,
    /// Value present at startup.
    pub value: SignalValue,
}

/// Linked reaction: a write to one signal schedules a change on another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedReaction {
    /// Address whose writes trigger this reaction.
    pub when: String,
    /// Written value that triggers this reaction.
    pub equals: SignalValue,
    /// Address to change.
    pub set: String,
    /// New value of `set`.
    pub to: SignalValue,
    /// Delay before `set` changes [ms]. 0 = applied synchronously.
    #[serde(default)]
    pub delay_ms: u64,
}

impl LinkedReaction {
    /// Reaction delay as `Duration`.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// `[simulation]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// `[[simulation.initial]]` entries.
    #[serde(default)]
    pub initial: Vec<InitialValue>,

    /// `[[simulation.reaction]]` entries.
    #[serde(default, rename = "reaction")]
    pub reactions: Vec<LinkedReaction>,
}
