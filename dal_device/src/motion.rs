//! Move completion tracking.
//!
//! - `phase` - the per-move phase machine (IDLE → ISSUED → WATCHING → terminal).
//! - `pending` - the in-flight record owned by the device runtime.
//! - `handle` - the caller-side `MoveStatus` completion handle.

pub mod handle;
pub mod pending;
pub mod phase;

pub use handle::MoveStatus;
pub use pending::{MoveId, PendingMove};
pub use phase::{MoveEvent, MovePhase, PhaseTransition};
