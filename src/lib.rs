//! Daily computer time budget. A small daemon counts active seconds against a per-weekday budget,
//! opens an overtime window when the budget runs out and charges that overtime to the next day.
//! The cli talks to the daemon over a local control channel.

pub mod accounting;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod fs;
pub mod session;
pub mod utils;
