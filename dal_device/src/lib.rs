//! # DAL Device Engine
//!
//! Turns a handful of discrete signals into one observable, commandable
//! device:
//!
//! - **State resolution** (`state`) - per-signal value tables with a DEFER
//!   tie-break, folded into one aggregate `StateLabel`.
//! - **Command dispatch** (`command`) - target label → ordered signal writes.
//! - **Interlock** (`safety`) - veto predicate over interlock signals.
//! - **Completion tracking** (`motion`) - per-move phase machine and the
//!   awaitable `MoveStatus` handle.
//! - **Device runtime** (`device`) - glues the above to live signal
//!   bindings under a single critical section.
//! - **Definitions** (`definition`) - validated construction from config
//!   or presets.
//!
//! ```rust,no_run
//! use dal_device::prelude::*;
//! use dal_sim::SimTransport;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = SimTransport::new();
//! let definition = presets::stopper("st1", "HXR:STP:01").build()?;
//! let device = Device::connect(definition, &transport)?;
//! let status = device.remove()?;
//! status.wait().await?;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod definition;
pub mod device;
pub mod error;
pub mod motion;
pub mod prelude;
pub mod registry;
pub mod safety;
pub mod state;

pub use definition::presets;
