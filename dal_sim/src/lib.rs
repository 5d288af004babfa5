//! # DAL Simulation Transport
//!
//! In-memory implementation of the Signal Binding contract:
//!
//! - Signals are created on first bind or `sim_put` and shared by address.
//! - Tests and the CLI drive values with `sim_put`, `disconnect` and
//!   `reconnect`, and inspect command writes with `writes`.
//! - Linked reactions model hardware: a write of `equals` to `when`
//!   changes `set` to `to` after `delay_ms`.
//!
//! Callbacks are invoked synchronously from the thread that changed the
//! value (or from a Tokio task for delayed reactions), with no internal
//! lock held.

pub mod signal;
pub mod transport;

pub use signal::{SimBinding, SimSignal};
pub use transport::SimTransport;
