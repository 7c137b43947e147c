// Snapshot capture, compression and restore for the loaded title

use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::emulator::EmulatorCore;
use crate::states::models::StateEntry;
use crate::states::store::LocalStateStore;

/// Gzip the snapshot. The format is self-describing; no parameters are
/// needed to reverse it.
pub fn compress(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

/// Exact inverse of [`compress`].
pub fn decompress(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(bytes).read_to_end(&mut out)?;
    Ok(out)
}

/// Moves snapshots between the execution unit and the local store for the
/// currently loaded title.
pub struct StateManager<C: EmulatorCore> {
    core: Arc<Mutex<C>>,
    store: LocalStateStore,
    current_game: RwLock<Option<String>>,
}

impl<C: EmulatorCore> StateManager<C> {
    pub fn new(core: Arc<Mutex<C>>, store: LocalStateStore) -> Self {
        Self {
            core,
            store,
            current_game: RwLock::new(None),
        }
    }

    /// Record which title is loaded. Save-state operations are no-ops
    /// until this is set.
    pub async fn set_game(&self, game_name: &str) {
        *self.current_game.write().await = Some(game_name.to_string());
    }

    pub async fn game(&self) -> Option<String> {
        self.current_game.read().await.clone()
    }

    /// Capture the execution unit's snapshot, compress it and store it
    /// under the given slot name with the supplied thumbnail.
    pub async fn create_save_state(
        &self,
        image_url: &str,
        state_name: &str,
        is_update: bool,
    ) -> Option<StateEntry> {
        let game_name = self.game().await?;

        let snapshot = self.core.lock().await.snapshot();
        let compressed = match compress(&snapshot) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "snapshot compression failed");
                return None;
            }
        };
        debug!(
            game = %game_name,
            slot = %state_name,
            raw = snapshot.len(),
            compressed = compressed.len(),
            "snapshot captured"
        );

        match self
            .store
            .create_or_update_state(&game_name, compressed, image_url, state_name, is_update)
            .await
        {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "could not store save-state");
                None
            }
        }
    }

    /// Load one slot, decompress it and hand the snapshot to the
    /// execution unit. False when the slot is missing or unreadable.
    pub async fn load_save_state(&self, state_name: &str) -> bool {
        let Some(game_name) = self.game().await else {
            return false;
        };

        let compressed = match self.store.load_state(&game_name, state_name).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(game = %game_name, slot = %state_name, "no such save-state");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "could not read save-state");
                return false;
            }
        };

        let snapshot = match decompress(&compressed) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "corrupt save-state");
                return false;
            }
        };

        self.core.lock().await.load_snapshot(&snapshot);
        true
    }

    /// Encode the execution unit's current frame as a PNG data URI for
    /// use as a save-state thumbnail.
    pub async fn capture_thumbnail(&self) -> Option<String> {
        let (rgba, width, height) = self.core.lock().await.frame_rgba();

        let image = image::RgbaImage::from_raw(width, height, rgba)?;
        let mut png = Vec::new();
        if let Err(e) = image.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png) {
            warn!(error = %e, "thumbnail encoding failed");
            return None;
        }

        Some(format!("data:image/png;base64,{}", STANDARD.encode(&png)))
    }
}
