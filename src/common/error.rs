// Error taxonomy shared by the sync components

use thiserror::Error;

/// Failures a sync operation can surface to its caller.
///
/// Cloud operations translate these into `None`/`false` sentinels at the
/// public boundary; the UI layer decides the user-visible fallback (use
/// local storage, offer a retry, or silently no-op).
#[derive(Debug, Error)]
pub enum SyncError {
    /// Token missing or past its expiry and silent re-authentication did
    /// not complete. Not surfaced to the user unless the silent flow also
    /// fails.
    #[error("access token missing or expired")]
    AuthExpired,

    /// The provider answered a gated call with a non-success status. The
    /// session is cleared and the subsystem runs offline until the next
    /// sign-in.
    #[error("cloud request rejected with HTTP {status}")]
    AuthRejected { status: u16 },

    /// A query matched no remote file. Callers handle this as "create
    /// new", not as an error.
    #[error("no cloud file named {0}")]
    NotFound(String),

    /// The request never reached the provider. Unlike `AuthRejected` this
    /// does not demote the session.
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// The durable local medium failed to open or answer. Fatal for
    /// persistence-dependent operations, never for the execution unit.
    #[error("local storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),

    /// A user-supplied import does not belong to the loaded title and the
    /// caller has not confirmed the mismatch.
    #[error("import {found:?} does not match the loaded title {expected:?}")]
    NameMismatch { expected: String, found: String },
}
