//! Prelude module for common re-exports.
//!
//! ```rust
//! use dal_device::prelude::*;
//! ```

pub use crate::command::dispatcher::{CommandDispatcher, CommandWrite};
pub use crate::definition::{DefinitionBuilder, DefinitionError, DeviceDefinition, presets};
pub use crate::device::{Device, DeviceSnapshot, ObserverId, StateChange};
pub use crate::error::{DeviceError, MoveError, MoveOutcome};
pub use crate::motion::{MoveId, MovePhase, MoveStatus};
pub use crate::registry::DeviceRegistry;
pub use crate::safety::interlock::InterlockGuard;
pub use crate::state::SignalValues;
pub use crate::state::table::SignalStateTable;

pub use dal_common::prelude::{SignalValue, StateEntry, StateLabel};
