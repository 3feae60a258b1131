//! Job records, the in-memory job store and the lifecycle manager
//!
//! The manager owns the store and is the only thing that mutates job records. Everything
//! outside this module sees cloned snapshots.

pub mod error;
pub mod manager;
pub mod record;
pub mod state;
pub mod store;
/// Per-job working directories
pub mod workdir;
