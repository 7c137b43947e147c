// Environment-driven configuration

use std::env;
use std::time::Duration;

use dotenv::dotenv;

const DEFAULT_AUTH_BASE: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DEFAULT_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
const DEFAULT_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Configuration for the sync subsystem.
///
/// Every provider endpoint is overridable so tests (and self-hosted
/// deployments) can point the client at a different object store.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// OAuth client id registered with the provider.
    pub client_id: String,
    /// Redirect target of the implicit-grant flow. Stored without a
    /// trailing slash; the provider compares it literally.
    pub redirect_uri: String,
    /// Authorization endpoint.
    pub auth_base: String,
    /// Object-store REST base (metadata, queries, downloads, deletes).
    pub api_base: String,
    /// Object-store binary upload base.
    pub upload_base: String,
    /// Endpoint answering the signed-in account's email.
    pub userinfo_url: String,
    /// Name of the reserved cloud folder holding all save files.
    pub folder_name: String,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// How long a gated call waits for silent re-authentication before
    /// resolving empty.
    pub reauth_timeout: Duration,
    /// SQLite database URL for the local stores.
    pub database_url: String,
}

impl SyncConfig {
    /// Read configuration from `SAVE_SYNC_*` environment variables,
    /// falling back to the real provider endpoints.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();

        let redirect_uri = env::var("SAVE_SYNC_REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());

        let reauth_secs: u64 = match env::var("SAVE_SYNC_REAUTH_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| anyhow::anyhow!("SAVE_SYNC_REAUTH_TIMEOUT_SECS is not a number"))?,
            Err(_) => 15,
        };

        Ok(Self {
            client_id: env::var("SAVE_SYNC_CLIENT_ID").unwrap_or_default(),
            redirect_uri: redirect_uri.trim_end_matches('/').to_string(),
            auth_base: env::var("SAVE_SYNC_AUTH_BASE")
                .unwrap_or_else(|_| DEFAULT_AUTH_BASE.to_string()),
            api_base: env::var("SAVE_SYNC_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            upload_base: env::var("SAVE_SYNC_UPLOAD_BASE")
                .unwrap_or_else(|_| DEFAULT_UPLOAD_BASE.to_string()),
            userinfo_url: env::var("SAVE_SYNC_USERINFO_URL")
                .unwrap_or_else(|_| DEFAULT_USERINFO_URL.to_string()),
            folder_name: env::var("SAVE_SYNC_FOLDER").unwrap_or_else(|_| "emu-saves".to_string()),
            request_timeout: Duration::from_secs(30),
            reauth_timeout: Duration::from_secs(reauth_secs),
            database_url: env::var("SAVE_SYNC_DB")
                .unwrap_or_else(|_| "sqlite://save_sync.db".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_uri_loses_trailing_slash() {
        std::env::set_var("SAVE_SYNC_REDIRECT_URI", "http://localhost:9999/");
        let config = SyncConfig::from_env().unwrap();
        assert_eq!(config.redirect_uri, "http://localhost:9999");
        std::env::remove_var("SAVE_SYNC_REDIRECT_URI");
    }
}
