// Durable key-value medium backed by the app_settings table

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;

/// Cached OAuth access token.
pub const KEY_ACCESS_TOKEN: &str = "access_token";
/// Absolute token expiry in epoch seconds; `-1` means "no known expiry".
pub const KEY_ACCESS_EXPIRES: &str = "access_expires";
/// Email of the signed-in account, used as the silent sign-in login hint.
pub const KEY_USER_EMAIL: &str = "user_email";
/// Cached id of the reserved cloud folder.
pub const KEY_FOLDER_ID: &str = "saves_folder_id";
/// BIOS blob, JSON-encoded byte array.
pub const KEY_BIOS: &str = "bios";

/// Key of the battery-backup blob for one title.
pub fn backup_key(game_name: &str) -> String {
    format!("save.{}", game_name)
}

#[derive(Debug, Error)]
pub enum KvError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Process-wide key-value store over the `app_settings` table.
#[derive(Debug, Clone)]
pub struct KvStore {
    db: SqlitePool,
}

impl KvStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let row = sqlx::query_as::<_, (String,)>("SELECT value FROM app_settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.db)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        sqlx::query(
            r#"
            INSERT INTO app_settings (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.db)
        .await?;

        debug!(key = %key, "setting stored");
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<(), KvError> {
        sqlx::query("DELETE FROM app_settings WHERE key = ?")
            .bind(key)
            .execute(&self.db)
            .await?;

        debug!(key = %key, "setting removed");
        Ok(())
    }
}
