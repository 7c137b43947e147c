//! Database schema management

use sqlx::SqlitePool;
use tracing::info;

/// Create the local tables if they do not exist yet.
///
/// `app_settings` is the durable key-value medium (token fields, cached
/// folder id, battery-backup and BIOS blobs); `save_states` holds one
/// JSON-encoded state record per title.
pub async fn run(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS app_settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS save_states (
            game_name TEXT PRIMARY KEY,
            entry TEXT NOT NULL,
            updated_at TEXT DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("database schema ready");
    Ok(())
}
