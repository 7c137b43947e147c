// Per-title save-state store over the save_states table

use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, warn};

use crate::states::models::{GameStateEntry, StateEntry, QUICK_SAVE_SLOT};

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Keyed store of [`GameStateEntry`] records, one row per title.
///
/// Every mutation is a read-modify-write of one title's record inside a
/// single transaction: writers to different titles never contend, and
/// writers to the same title are serialized by the database.
#[derive(Debug, Clone)]
pub struct LocalStateStore {
    db: SqlitePool,
}

impl LocalStateStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Store a snapshot under the given slot name.
    ///
    /// An unused name creates a new slot. An existing slot is overwritten
    /// in place — unless `is_update` is set and the slot is not the
    /// quick-save singleton, in which case the slot is renamed: a fresh
    /// timestamp-derived name replaces the old key. Returns the entry
    /// that was actually stored (the renamed one when a rename occurred).
    pub async fn create_or_update_state(
        &self,
        game_name: &str,
        data: Vec<u8>,
        image_url: &str,
        state_name: &str,
        is_update: bool,
    ) -> Result<StateEntry, StateStoreError> {
        let mut tx = self.db.begin().await?;

        let mut entry = match Self::fetch_entry(&mut tx, game_name).await? {
            Some(existing) => existing,
            None => GameStateEntry::empty(game_name),
        };

        let stored = match entry.states.remove(state_name) {
            None => StateEntry {
                state_name: state_name.to_string(),
                state: data,
                image_url: image_url.to_string(),
            },
            Some(mut existing) => {
                existing.state = data;
                existing.image_url = image_url.to_string();

                if is_update && state_name != QUICK_SAVE_SLOT {
                    // "update" = rename: the old key stays removed, a
                    // fresh timestamp-derived one takes its place
                    existing.state_name = format!("{}.state", Utc::now().timestamp());
                }
                existing
            }
        };
        entry
            .states
            .insert(stored.state_name.clone(), stored.clone());

        Self::upsert_entry(&mut tx, game_name, &entry).await?;
        tx.commit().await?;

        debug!(game = %game_name, slot = %stored.state_name, "save-state stored");
        Ok(stored)
    }

    /// Remove one slot. False (store untouched) when the title has no
    /// record or the slot does not exist.
    pub async fn delete_state(
        &self,
        game_name: &str,
        state_name: &str,
    ) -> Result<bool, StateStoreError> {
        let mut tx = self.db.begin().await?;

        let Some(mut entry) = Self::fetch_entry(&mut tx, game_name).await? else {
            return Ok(false);
        };

        if entry.states.remove(state_name).is_none() {
            return Ok(false);
        }

        Self::upsert_entry(&mut tx, game_name, &entry).await?;
        tx.commit().await?;

        debug!(game = %game_name, slot = %state_name, "save-state deleted");
        Ok(true)
    }

    /// All save-states of one title.
    pub async fn get_states(
        &self,
        game_name: &str,
    ) -> Result<Option<GameStateEntry>, StateStoreError> {
        let mut tx = self.db.begin().await?;
        let entry = Self::fetch_entry(&mut tx, game_name).await?;
        tx.commit().await?;
        Ok(entry)
    }

    /// The still-compressed snapshot bytes of one slot.
    pub async fn load_state(
        &self,
        game_name: &str,
        state_name: &str,
    ) -> Result<Option<Vec<u8>>, StateStoreError> {
        let entry = self.get_states(game_name).await?;
        Ok(entry.and_then(|e| e.states.get(state_name).map(|s| s.state.clone())))
    }

    async fn fetch_entry(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        game_name: &str,
    ) -> Result<Option<GameStateEntry>, StateStoreError> {
        let row =
            sqlx::query_as::<_, (String,)>("SELECT entry FROM save_states WHERE game_name = ?")
                .bind(game_name)
                .fetch_optional(&mut **tx)
                .await?;

        let Some((raw,)) = row else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                // a corrupt record must not poison the title forever
                warn!(game = %game_name, error = %e, "corrupt state record, starting fresh");
                Ok(Some(GameStateEntry::empty(game_name)))
            }
        }
    }

    async fn upsert_entry(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        game_name: &str,
        entry: &GameStateEntry,
    ) -> Result<(), StateStoreError> {
        let encoded = serde_json::to_string(entry)?;

        sqlx::query(
            r#"
            INSERT INTO save_states (game_name, entry, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(game_name) DO UPDATE SET
                entry = excluded.entry,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(game_name)
        .bind(&encoded)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
