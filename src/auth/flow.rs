// OAuth implicit-grant flow: interactive popup, silent hidden frame,
// redirect completion and the cross-context finished signal

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::auth::models::{parse_fragment, AuthSession};
use crate::auth::token_store::TokenStore;
use crate::common::SyncConfig;
use crate::storage::KvError;

/// File-scoped object storage plus the account email for the login hint.
const SCOPES: &str =
    "https://www.googleapis.com/auth/drive.file https://www.googleapis.com/auth/userinfo.email";

/// Sentinel broadcast when a redirect context finished writing the token
/// store. Carries no payload; receivers re-read the store.
#[derive(Debug, Clone, Copy)]
pub struct AuthFinished;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("sign-in window could not be opened: {0}")]
    DriverFailed(String),

    #[error("storage error: {0}")]
    Storage(#[from] KvError),

    #[error("userinfo request failed: {0}")]
    RequestFailed(String),
}

/// The host UI's browser contexts. `open_popup` shows the provider's
/// sign-in page in a new top-level window; `open_hidden` loads it into an
/// invisible frame where `prompt=none` either succeeds silently or fails
/// silently. Either context lands on the redirect page, which feeds its
/// URL fragment back through [`AuthFlow::complete_from_redirect`].
#[async_trait]
pub trait SignInDriver: Send + Sync {
    async fn open_popup(&self, url: &str) -> Result<(), AuthError>;
    async fn open_hidden(&self, url: &str) -> Result<(), AuthError>;
}

/// Drives sign-in and owns the auth-finished broadcast channel.
pub struct AuthFlow {
    config: SyncConfig,
    http: Client,
    tokens: Arc<TokenStore>,
    driver: Arc<dyn SignInDriver>,
    finished_tx: broadcast::Sender<AuthFinished>,
}

impl AuthFlow {
    pub fn new(
        config: SyncConfig,
        http: Client,
        tokens: Arc<TokenStore>,
        driver: Arc<dyn SignInDriver>,
    ) -> Self {
        let (finished_tx, _) = broadcast::channel(8);
        Self {
            config,
            http,
            tokens,
            driver,
            finished_tx,
        }
    }

    /// Subscribe to the auth-finished signal. Subscribe before starting a
    /// sign-in attempt or the signal can be missed.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthFinished> {
        self.finished_tx.subscribe()
    }

    fn base_authorization_url(&self) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=token&scope={}",
            self.config.auth_base,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(SCOPES),
        )
    }

    /// Build the provider authorization URL. Silent mode adds
    /// `prompt=none` and the cached account email as the login hint;
    /// without a cached email there is nothing to hint with and `None` is
    /// returned.
    pub async fn authorization_url(&self, silent: bool) -> Option<String> {
        let mut url = self.base_authorization_url();

        if silent {
            let email = self.tokens.load().await.user_email?;
            url.push_str(&format!(
                "&prompt=none&login_hint={}",
                urlencoding::encode(&email)
            ));
        }

        Some(url)
    }

    /// Open the provider sign-in page in a popup. Returns once the popup
    /// is open; completion is observed through [`AuthFlow::subscribe`],
    /// never through this future — the redirect page is a separate
    /// browser context.
    pub async fn begin_interactive_sign_in(&self) -> Result<(), AuthError> {
        let url = self.base_authorization_url();
        debug!("opening interactive sign-in popup");
        self.driver.open_popup(&url).await
    }

    /// Attempt a non-interactive re-authentication in a hidden frame.
    /// Returns `Ok(false)` without touching the driver when no account
    /// email is cached (nothing to hint the provider with).
    pub async fn begin_silent_sign_in(&self) -> Result<bool, AuthError> {
        let Some(url) = self.authorization_url(true).await else {
            debug!("no cached email, skipping silent sign-in");
            return Ok(false);
        };

        debug!("starting silent sign-in");
        self.driver.open_hidden(&url).await?;
        Ok(true)
    }

    /// Invoked in the redirect target context with the redirect URL (or
    /// its bare fragment). Parses `access_token`/`expires_in`, persists
    /// the session, best-effort caches the account email, and broadcasts
    /// the finished signal. Returns `Ok(false)` when the fragment carried
    /// no token.
    pub async fn complete_from_redirect(&self, redirect: &str) -> Result<bool, AuthError> {
        let fragment = parse_fragment(redirect);

        let Some(access_token) = fragment.access_token else {
            debug!("redirect carried no access token");
            return Ok(false);
        };

        let mut session = self.tokens.load().await;
        session.access_token = access_token;
        session.authenticated = true;
        if let Some(expires_in) = fragment.expires_in {
            session.expires_at = Utc::now().timestamp() + expires_in;
        }
        self.tokens.save(&session).await?;

        match self.fetch_user_email(&session.access_token).await {
            Ok(email) => {
                session.user_email = Some(email);
                self.tokens.save(&session).await?;
            }
            Err(e) => debug!(error = %e, "could not fetch account email"),
        }

        // fire-and-forget: nobody listening is fine
        let _ = self.finished_tx.send(AuthFinished);

        info!("sign-in completed");
        Ok(true)
    }

    /// Drop the session. The caller reverts to offline mode.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.tokens.clear().await?;
        info!("signed out");
        Ok(())
    }

    async fn fetch_user_email(&self, access_token: &str) -> Result<String, AuthError> {
        #[derive(Deserialize)]
        struct UserInfo {
            email: String,
        }

        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "userinfo request rejected");
            return Err(AuthError::RequestFailed(
                "failed to get user info".to_string(),
            ));
        }

        let user_info = response
            .json::<UserInfo>()
            .await
            .map_err(|e| AuthError::RequestFailed(e.to_string()))?;

        Ok(user_info.email)
    }
}

/// Restore the persisted session on startup, mirroring what a page load
/// did in the original design: a stored, unexpired token keeps the user
/// signed in; an expired one is dropped and a silent re-authentication is
/// attempted.
pub async fn restore_session(flow: &AuthFlow, tokens: &TokenStore) -> AuthSession {
    let session = tokens.load().await;

    if !session.authenticated {
        return session;
    }

    if !session.is_expired(Utc::now().timestamp()) {
        info!(email = ?session.user_email, "restored stored session");
        return session;
    }

    debug!("stored token expired, attempting silent sign-in");
    if let Err(e) = tokens.drop_credentials().await {
        warn!(error = %e, "could not drop expired session");
    }
    if let Err(e) = flow.begin_silent_sign_in().await {
        warn!(error = %e, "silent sign-in failed to start");
    }

    // The silent flow completes through the redirect context; this is the
    // pre-completion snapshot. Callers observe the refresh via subscribe().
    tokens.load().await
}
