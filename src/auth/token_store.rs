// Durable session storage over the key-value medium

use std::sync::Arc;

use tracing::{debug, warn};

use crate::auth::models::{AuthSession, NO_KNOWN_EXPIRY};
use crate::storage::kv::{
    KvStore, KEY_ACCESS_EXPIRES, KEY_ACCESS_TOKEN, KEY_FOLDER_ID, KEY_USER_EMAIL,
};
use crate::storage::KvError;

/// Persists the OAuth session under fixed keys of the durable medium.
///
/// Reads are infallible: absent or corrupt stored data yields a
/// signed-out session, never an error.
#[derive(Debug)]
pub struct TokenStore {
    kv: Arc<KvStore>,
}

impl TokenStore {
    pub fn new(kv: Arc<KvStore>) -> Self {
        Self { kv }
    }

    pub async fn load(&self) -> AuthSession {
        let access_token = match self.kv.get(KEY_ACCESS_TOKEN).await {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "could not read stored token, treating as signed out");
                return AuthSession::signed_out();
            }
        };

        let expires_at = match self.kv.get(KEY_ACCESS_EXPIRES).await {
            Ok(Some(raw)) => raw.parse().unwrap_or(NO_KNOWN_EXPIRY),
            Ok(None) => NO_KNOWN_EXPIRY,
            Err(_) => NO_KNOWN_EXPIRY,
        };

        let user_email = self.kv.get(KEY_USER_EMAIL).await.unwrap_or(None);

        let authenticated = !access_token.is_empty();
        AuthSession {
            access_token,
            expires_at,
            user_email,
            authenticated,
        }
    }

    pub async fn save(&self, session: &AuthSession) -> Result<(), KvError> {
        self.kv.set(KEY_ACCESS_TOKEN, &session.access_token).await?;
        self.kv
            .set(KEY_ACCESS_EXPIRES, &session.expires_at.to_string())
            .await?;
        if let Some(email) = &session.user_email {
            self.kv.set(KEY_USER_EMAIL, email).await?;
        }

        debug!("session persisted");
        Ok(())
    }

    /// Drop the credentials but keep the cached account email, which the
    /// next silent sign-in needs as its login hint.
    pub async fn drop_credentials(&self) -> Result<(), KvError> {
        self.kv.remove(KEY_ACCESS_TOKEN).await?;
        self.kv.remove(KEY_ACCESS_EXPIRES).await?;
        self.kv.remove(KEY_FOLDER_ID).await?;

        debug!("credentials dropped");
        Ok(())
    }

    /// Drop every cached auth field, including the reserved-folder id: a
    /// rejected call invalidates all of them at once.
    pub async fn clear(&self) -> Result<(), KvError> {
        self.kv.remove(KEY_ACCESS_TOKEN).await?;
        self.kv.remove(KEY_ACCESS_EXPIRES).await?;
        self.kv.remove(KEY_USER_EMAIL).await?;
        self.kv.remove(KEY_FOLDER_ID).await?;

        debug!("session cleared");
        Ok(())
    }
}
