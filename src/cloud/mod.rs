//! # Cloud Module
//!
//! REST client for the Drive-backed object store. Every call is gated
//! through the token lifecycle: an expired token triggers one silent
//! re-authentication (timeout-bound, single-flight), and any rejected
//! call demotes the subsystem to offline mode.

pub mod client;
pub mod models;


pub use client::CloudClient;
pub use models::{FileList, FileMetadata, SaveEntry};
