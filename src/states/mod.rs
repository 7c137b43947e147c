//! # States Module
//!
//! Per-title versioned save-states: a keyed local store of named
//! snapshot slots (compressed bytes + thumbnail) and the manager that
//! moves snapshots between the store and the execution unit.

pub mod manager;
pub mod models;
pub mod store;

#[cfg(test)]
mod tests;

pub use manager::{compress, decompress, StateManager};
pub use models::{GameStateEntry, StateEntry, QUICK_SAVE_SLOT};
pub use store::{LocalStateStore, StateStoreError};
