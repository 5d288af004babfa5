//! Safety module root.
//!
//! Interlock evaluation. The guard only decides; the device runtime
//! applies the veto before issuing writes and while a move is watched.

pub mod interlock;
