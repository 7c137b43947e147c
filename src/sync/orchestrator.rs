// Battery-backup routing between cloud and local storage

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cloud::CloudClient;
use crate::common::SyncError;
use crate::emulator::EmulatorCore;
use crate::storage::kv::{backup_key, KEY_BIOS};
use crate::storage::KvStore;

/// Decides, per title, whether battery-backup data is read from and
/// written to the cloud store or local storage.
pub struct SyncOrchestrator {
    cloud: Arc<CloudClient>,
    kv: Arc<KvStore>,
}

impl SyncOrchestrator {
    pub fn new(cloud: Arc<CloudClient>, kv: Arc<KvStore>) -> Self {
        Self { cloud, kv }
    }

    /// Fetch a title's battery backup from the authoritative location.
    /// A cloud miss (or cloud failure) falls back to the local copy.
    pub async fn load_backup(&self, game_name: &str) -> Option<Vec<u8>> {
        if self.cloud.using_cloud().await {
            if let Some(entry) = self.cloud.download_save(game_name).await {
                if !entry.data.is_empty() {
                    debug!(game = %game_name, bytes = entry.data.len(), "loaded cloud save");
                    return Some(entry.data);
                }
            }
        }

        self.load_local(game_name).await
    }

    /// Persist a title's battery backup. Goes to the cloud while signed
    /// in; a failed upload falls back to a local write so the bytes are
    /// never lost.
    pub async fn persist_backup(&self, game_name: &str, data: &[u8]) -> bool {
        if self.cloud.using_cloud().await {
            if self.cloud.upload_save(game_name, data).await {
                debug!(game = %game_name, bytes = data.len(), "uploaded save");
                return true;
            }
            warn!(game = %game_name, "cloud upload failed, keeping local copy");
        }

        self.store_local(game_name, data).await
    }

    /// Poll the execution unit's saved flag once and persist the backup
    /// on a transition. Returns whether a write happened.
    pub async fn pump_backup<C: EmulatorCore>(
        &self,
        core: &Mutex<C>,
        game_name: &str,
    ) -> bool {
        let data = {
            let mut core = core.lock().await;
            if !core.take_saved() {
                return false;
            }
            core.backup()
        };

        self.persist_backup(game_name, &data).await
    }

    /// Accept a user-supplied save file. Rejected with
    /// [`SyncError::NameMismatch`] unless the file stem matches the
    /// loaded title or the caller already confirmed the mismatch.
    pub async fn import_backup(
        &self,
        game_name: &str,
        file_name: &str,
        data: &[u8],
        confirmed: bool,
    ) -> Result<(), SyncError> {
        let stem = file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(file_name);

        if stem != game_name && !confirmed {
            return Err(SyncError::NameMismatch {
                expected: game_name.to_string(),
                found: file_name.to_string(),
            });
        }

        self.persist_backup(game_name, data).await;
        info!(game = %game_name, bytes = data.len(), "save imported");
        Ok(())
    }

    pub async fn store_bios(&self, data: &[u8]) -> bool {
        self.store_blob(KEY_BIOS, data).await
    }

    pub async fn load_bios(&self) -> Option<Vec<u8>> {
        self.load_blob(KEY_BIOS).await
    }

    async fn load_local(&self, game_name: &str) -> Option<Vec<u8>> {
        self.load_blob(&backup_key(game_name)).await
    }

    async fn store_local(&self, game_name: &str, data: &[u8]) -> bool {
        self.store_blob(&backup_key(game_name), data).await
    }

    async fn load_blob(&self, key: &str) -> Option<Vec<u8>> {
        let raw = self.kv.get(key).await.ok().flatten()?;
        match serde_json::from_str(&raw) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(key = %key, error = %e, "corrupt stored blob");
                None
            }
        }
    }

    async fn store_blob(&self, key: &str, data: &[u8]) -> bool {
        let encoded = match serde_json::to_string(data) {
            Ok(json) => json,
            Err(e) => {
                warn!(key = %key, error = %e, "could not encode blob");
                return false;
            }
        };

        match self.kv.set(key, &encoded).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "could not store blob");
                false
            }
        }
    }
}
