//! State resolution module root.
//!
//! `table` holds the per-signal raw value → entry maps, `resolver` folds
//! the current values through them into one aggregate `StateLabel`.

pub mod resolver;
pub mod table;

use std::collections::HashMap;

use dal_common::signal::SignalValue;

/// Latest value per contributing signal name. A missing entry means the
/// signal is disconnected or has not reported yet.
pub type SignalValues = HashMap<String, SignalValue>;
