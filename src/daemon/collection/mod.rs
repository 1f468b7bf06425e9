//! Producers of the engine's input: the one second tick and the session lock signal.

pub mod session;
pub mod ticker;
