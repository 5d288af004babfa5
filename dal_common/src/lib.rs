//! DAL Common Library
//!
//! Shared vocabulary for every crate of the device abstraction layer:
//! raw signal values, semantic state labels, the Signal Binding contract
//! implemented by transports, and TOML configuration loading.
//!
//! # Module Structure
//!
//! - [`signal`] - `SignalValue`, `StateLabel`, `StateEntry`
//! - [`transport`] - `SignalBinding` / `SignalTransport` traits and `TransportError`
//! - [`device`] - Per-device configuration structs
//! - [`simulation`] - Simulation transport configuration
//! - [`config`] - Configuration loading traits and the top-level `DalConfig`
//! - [`consts`] - Workspace-wide defaults
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! dal_common = { path = "../dal_common" }
//! ```
//!
//! ```rust
//! use dal_common::prelude::*;
//!
//! let value = SignalValue::from_key("1");
//! assert_eq!(value, SignalValue::Int(1));
//! assert!(StateLabel::new("unknown").is_unknown());
//! ```

pub mod config;
pub mod consts;
pub mod device;
pub mod prelude;
pub mod signal;
pub mod simulation;
pub mod transport;
