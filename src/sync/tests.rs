//! Tests for the sync module
//!
//! Offline routing: with no authenticated session every battery-backup
//! operation must resolve through the local key-value medium.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::Mutex;

use crate::auth::flow::AuthError;
use crate::auth::{AuthFlow, SignInDriver, TokenStore};
use crate::cloud::CloudClient;
use crate::common::{migrations, SyncConfig, SyncError};
use crate::emulator::EmulatorCore;
use crate::storage::kv::{backup_key, KvStore};
use crate::sync::SyncOrchestrator;

fn offline_config() -> SyncConfig {
    SyncConfig {
        client_id: "client-123".to_string(),
        redirect_uri: "http://localhost:8080".to_string(),
        auth_base: "http://127.0.0.1:1/auth".to_string(),
        // closed port: any stray network call would fail loudly
        api_base: "http://127.0.0.1:1".to_string(),
        upload_base: "http://127.0.0.1:1/upload".to_string(),
        userinfo_url: "http://127.0.0.1:1/userinfo".to_string(),
        folder_name: "emu-saves".to_string(),
        request_timeout: std::time::Duration::from_secs(1),
        reauth_timeout: std::time::Duration::from_millis(100),
        database_url: "sqlite::memory:".to_string(),
    }
}

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

async fn setup() -> (SyncOrchestrator, Arc<KvStore>) {
    let pool = SqlitePoolOptions::new()
        .connect("sqlite::memory:")
        .await
        .unwrap();
    migrations::run(&pool).await.unwrap();

    let kv = Arc::new(KvStore::new(pool));
    let tokens = Arc::new(TokenStore::new(kv.clone()));
    let http = reqwest::Client::new();
    let config = offline_config();
    let flow = Arc::new(AuthFlow::new(
        config.clone(),
        http.clone(),
        tokens.clone(),
        Arc::new(NullDriver),
    ));
    let cloud = Arc::new(CloudClient::new(config, http, tokens, flow, kv.clone()));

    (SyncOrchestrator::new(cloud, kv.clone()), kv)
}

struct SavingCore {
    backup: Vec<u8>,
    saved: bool,
}

impl EmulatorCore for SavingCore {
    fn load_bios(&mut self, _bytes: &[u8]) {}
    fn load_rom(&mut self, _bytes: &[u8]) {}
    fn load_backup(&mut self, _bytes: &[u8]) {}
    fn load_snapshot(&mut self, _bytes: &[u8]) {}

    fn snapshot(&self) -> Vec<u8> {
        Vec::new()
    }

    fn backup(&self) -> Vec<u8> {
        self.backup.clone()
    }

    fn take_saved(&mut self) -> bool {
        std::mem::take(&mut self.saved)
    }

    fn frame_rgba(&self) -> (Vec<u8>, u32, u32) {
        (Vec::new(), 0, 0)
    }
}

#[tokio::test]
async fn offline_backup_round_trips_through_local_storage() {
    let (orchestrator, kv) = setup().await;

    assert!(orchestrator.persist_backup("Pokemon", &[1, 2, 3]).await);
    assert_eq!(
        orchestrator.load_backup("Pokemon").await,
        Some(vec![1, 2, 3])
    );

    // stored under the per-title key as a JSON byte array
    assert_eq!(
        kv.get(&backup_key("Pokemon")).await.unwrap(),
        Some("[1,2,3]".to_string())
    );
}

#[tokio::test]
async fn missing_backup_loads_nothing() {
    let (orchestrator, _kv) = setup().await;
    assert_eq!(orchestrator.load_backup("Pokemon").await, None);
}

#[tokio::test]
async fn import_requires_confirmation_on_name_mismatch() {
    let (orchestrator, kv) = setup().await;

    let result = orchestrator
        .import_backup("Pokemon", "Zelda.sav", &[1], false)
        .await;
    assert!(matches!(result, Err(SyncError::NameMismatch { .. })));
    assert_eq!(kv.get(&backup_key("Pokemon")).await.unwrap(), None);

    orchestrator
        .import_backup("Pokemon", "Zelda.sav", &[1], true)
        .await
        .unwrap();
    assert_eq!(orchestrator.load_backup("Pokemon").await, Some(vec![1]));
}

#[tokio::test]
async fn import_with_matching_stem_needs_no_confirmation() {
    let (orchestrator, _kv) = setup().await;

    orchestrator
        .import_backup("Pokemon", "Pokemon.sav", &[4, 2], false)
        .await
        .unwrap();
    assert_eq!(orchestrator.load_backup("Pokemon").await, Some(vec![4, 2]));
}

#[tokio::test]
async fn bios_round_trips_through_local_storage() {
    let (orchestrator, _kv) = setup().await;

    assert_eq!(orchestrator.load_bios().await, None);
    assert!(orchestrator.store_bios(&[0xde, 0xad]).await);
    assert_eq!(orchestrator.load_bios().await, Some(vec![0xde, 0xad]));
}

#[tokio::test]
async fn pump_persists_only_on_the_saved_flag() {
    let (orchestrator, kv) = setup().await;
    let core = Mutex::new(SavingCore {
        backup: vec![7, 7],
        saved: false,
    });

    assert!(!orchestrator.pump_backup(&core, "Pokemon").await);
    assert_eq!(kv.get(&backup_key("Pokemon")).await.unwrap(), None);

    core.lock().await.saved = true;
    assert!(orchestrator.pump_backup(&core, "Pokemon").await);
    assert_eq!(orchestrator.load_backup("Pokemon").await, Some(vec![7, 7]));

    // the flag was consumed
    assert!(!orchestrator.pump_backup(&core, "Pokemon").await);
}
