//! Device error types.
//!
//! Two families, split by when they surface:
//! - `DeviceError` - returned synchronously from construction and from
//!   `move_to` before anything is written.
//! - `MoveError` - delivered later through a `MoveStatus` handle once the
//!   move reaches a terminal phase.

use std::time::Duration;

use dal_common::config::ConfigError;
use dal_common::signal::StateLabel;
use dal_common::transport::TransportError;
use thiserror::Error;

use crate::definition::DefinitionError;

/// Synchronous device failures.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The target has no command entry (read-only, UNKNOWN or undeclared).
    #[error("State {0} cannot be commanded")]
    UnreachableState(StateLabel),

    /// The device definition failed validation.
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// Binding a signal failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// No Tokio runtime is available to drive deadlines and command writes.
    #[error("Device '{0}' requires a Tokio runtime")]
    NoRuntime(String),

    /// The configuration failed validation.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Registry lookup by name failed.
    #[error("Unknown device: {0}")]
    UnknownDevice(String),
}

/// Terminal failure of one move request.
///
/// `Clone` so every waiter on the same handle receives the same value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    /// The interlock vetoed the move, either up front or while watching.
    #[error("Move to {target} blocked by interlock")]
    InterlockTripped {
        /// Requested target.
        target: StateLabel,
    },

    /// The deadline elapsed before the aggregate state reached the target.
    #[error("Move to {target} timed out after {elapsed:?} (last state {last_state})")]
    Timeout {
        /// Requested target.
        target: StateLabel,
        /// Aggregate state observed at expiry.
        last_state: StateLabel,
        /// Time from request to expiry.
        elapsed: Duration,
    },

    /// A newer move request replaced this one.
    #[error("Move to {target} superseded by a newer request")]
    Superseded {
        /// Target of the replaced move.
        target: StateLabel,
    },

    /// The caller cancelled the move or the device went away.
    #[error("Move to {target} cancelled")]
    Cancelled {
        /// Requested target.
        target: StateLabel,
    },
}

impl MoveError {
    /// Target of the failed move.
    pub fn target(&self) -> &StateLabel {
        match self {
            Self::InterlockTripped { target }
            | Self::Timeout { target, .. }
            | Self::Superseded { target }
            | Self::Cancelled { target } => target,
        }
    }
}

/// Terminal result of a move: the reached state or the failure.
pub type MoveOutcome = Result<StateLabel, MoveError>;
