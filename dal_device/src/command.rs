//! Command module root.
//!
//! Maps a target state onto the signal writes that request it.

pub mod dispatcher;
