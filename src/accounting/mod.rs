//! Pure accounting core. Nothing in here touches the clock of the machine, the file system or
//! the session directly, those are handed in through [engine::AccrualEngine].

pub mod budget;
pub mod carryover;
pub mod display;
pub mod engine;
pub mod notifier;
pub mod pause;
pub mod records;
