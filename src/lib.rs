//! Save/state synchronization for an emulator-style application.
//!
//! Two stores hold a player's artifacts: a local SQLite database (always
//! available) and a Drive-backed cloud folder (available while a bearer
//! token is live). Every remote call goes through [`CloudClient::request_json`]
//! or [`CloudClient::request_bytes`], which gate on the token lifecycle and
//! demote the session to offline mode when the provider rejects a call.
//! Save-states are versioned per title in the local store and never leave
//! the device; the battery-backup blob is routed to whichever store is
//! authoritative at the moment.

use tracing_subscriber::EnvFilter;

pub mod auth;
pub mod cloud;
pub mod common;
pub mod emulator;
pub mod states;
pub mod storage;
pub mod sync;

pub use auth::{
    restore_session, AuthError, AuthFinished, AuthFlow, AuthSession, SignInDriver, TokenStore,
};
pub use cloud::{CloudClient, SaveEntry};
pub use common::{SyncConfig, SyncContext, SyncError};
pub use emulator::EmulatorCore;
pub use states::{GameStateEntry, LocalStateStore, StateEntry, StateManager, QUICK_SAVE_SLOT};
pub use sync::SyncOrchestrator;

/// Initialise tracing for host binaries. Respects `RUST_LOG`, defaults to
/// `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}
