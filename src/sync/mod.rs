//! # Sync Module
//!
//! Routes battery-backup traffic between the cloud store and local
//! storage based on authentication state. One conceptual save per title
//! lives in exactly one authoritative location at a time: the cloud
//! folder while signed in, the local key-value medium otherwise. Last
//! writer wins; there are no merge semantics.

pub mod orchestrator;

#[cfg(test)]
mod tests;

pub use orchestrator::SyncOrchestrator;
