mod common;
mod interlock;
mod moves;
mod signals;
mod sample_config;
