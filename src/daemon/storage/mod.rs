//! Storage of the accounting state is organized through [state_store::FileStateStore].
//!  - One JSON document holds the whole snapshot.
//!  - Saves go through a temporary file and a rename, guarded by a lock file.
//!  - Overtime is written as decimal minutes, elapsed time as whole seconds.

pub mod entities;
pub mod state_store;
