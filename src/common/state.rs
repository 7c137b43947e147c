// Subsystem context shared across the sync components

use std::str::FromStr;
use std::sync::Arc;

use reqwest::Client;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::auth::{AuthFlow, SignInDriver, TokenStore};
use crate::cloud::CloudClient;
use crate::common::{migrations, SyncConfig, SyncError};
use crate::states::LocalStateStore;
use crate::storage::KvStore;
use crate::sync::SyncOrchestrator;

/// Everything the sync components share: the database pool, one HTTP
/// client, and the wired services. Passed by reference where the original
/// design kept ambient globals; its lifetime is the subsystem's lifetime.
#[derive(Clone)]
pub struct SyncContext {
    pub db: SqlitePool,
    pub http: Client,
    pub config: SyncConfig,
    pub kv: Arc<KvStore>,
    pub tokens: Arc<TokenStore>,
    pub flow: Arc<AuthFlow>,
    pub cloud: Arc<CloudClient>,
    pub states: LocalStateStore,
    pub orchestrator: Arc<SyncOrchestrator>,
}

impl SyncContext {
    /// Open the local database, run migrations and wire the components.
    ///
    /// The driver is the host UI's pair of browser contexts (popup and
    /// hidden frame); everything else is owned here.
    pub async fn new(
        config: SyncConfig,
        driver: Arc<dyn SignInDriver>,
    ) -> Result<Self, SyncError> {
        let connect_options =
            SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
        let db = SqlitePoolOptions::new().connect_with(connect_options).await?;

        migrations::run(&db).await?;

        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        let kv = Arc::new(KvStore::new(db.clone()));
        let tokens = Arc::new(TokenStore::new(kv.clone()));
        let flow = Arc::new(AuthFlow::new(
            config.clone(),
            http.clone(),
            tokens.clone(),
            driver,
        ));
        let cloud = Arc::new(CloudClient::new(
            config.clone(),
            http.clone(),
            tokens.clone(),
            flow.clone(),
            kv.clone(),
        ));
        let states = LocalStateStore::new(db.clone());
        let orchestrator = Arc::new(SyncOrchestrator::new(cloud.clone(), kv.clone()));

        Ok(Self {
            db,
            http,
            config,
            kv,
            tokens,
            flow,
            cloud,
            states,
            orchestrator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::auth::AuthError;

    struct NullDriver;

    #[async_trait]
    impl SignInDriver for NullDriver {
        async fn open_popup(&self, _url: &str) -> Result<(), AuthError> {
            Ok(())
        }

        async fn open_hidden(&self, _url: &str) -> Result<(), AuthError> {
            Ok(())
        }
    }

    fn memory_config() -> SyncConfig {
        SyncConfig {
            client_id: "client-123".to_string(),
            redirect_uri: "http://localhost:8080".to_string(),
            auth_base: "http://127.0.0.1:1/auth".to_string(),
            api_base: "http://127.0.0.1:1".to_string(),
            upload_base: "http://127.0.0.1:1/upload".to_string(),
            userinfo_url: "http://127.0.0.1:1/userinfo".to_string(),
            folder_name: "emu-saves".to_string(),
            request_timeout: Duration::from_secs(1),
            reauth_timeout: Duration::from_millis(100),
            database_url: "sqlite::memory:".to_string(),
        }
    }

    #[tokio::test]
    async fn context_wires_a_working_offline_subsystem() {
        let context = SyncContext::new(memory_config(), Arc::new(NullDriver))
            .await
            .unwrap();

        assert!(!context.cloud.using_cloud().await);
        assert!(context.orchestrator.persist_backup("Pokemon", &[1]).await);
        assert_eq!(
            context.orchestrator.load_backup("Pokemon").await,
            Some(vec![1])
        );

        context
            .states
            .create_or_update_state("Pokemon", vec![2], "img", "quick_save.state", false)
            .await
            .unwrap();
        assert_eq!(
            context
                .states
                .load_state("Pokemon", "quick_save.state")
                .await
                .unwrap(),
            Some(vec![2])
        );
    }
}

