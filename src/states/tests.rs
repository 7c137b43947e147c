//! Tests for the states module
//!
//! These tests verify the save-state store semantics:
//! - quick-save round trips and in-place overwrites
//! - the rename-on-update path for named slots
//! - delete behaviour and the empty-entry terminal state
//! - compression round trips through the manager

use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::emulator::EmulatorCore;
use crate::states::manager::{compress, decompress, StateManager};
use crate::states::models::QUICK_SAVE_SLOT;
use crate::states::store::LocalStateStore;

async fn setup_store() -> (LocalStateStore, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .connect("sqlite::memory:")
        .await
        .unwrap();
    crate::common::migrations::run(&pool).await.unwrap();
    (LocalStateStore::new(pool.clone()), pool)
}

struct MockCore {
    snapshot: Vec<u8>,
    loaded: Option<Vec<u8>>,
    frame: (Vec<u8>, u32, u32),
}

impl MockCore {
    fn new(snapshot: Vec<u8>) -> Self {
        Self {
            snapshot,
            loaded: None,
            frame: (vec![0xff; 16], 2, 2),
        }
    }
}

impl EmulatorCore for MockCore {
    fn load_bios(&mut self, _bytes: &[u8]) {}
    fn load_rom(&mut self, _bytes: &[u8]) {}
    fn load_backup(&mut self, _bytes: &[u8]) {}

    fn load_snapshot(&mut self, bytes: &[u8]) {
        self.loaded = Some(bytes.to_vec());
    }

    fn snapshot(&self) -> Vec<u8> {
        self.snapshot.clone()
    }

    fn backup(&self) -> Vec<u8> {
        Vec::new()
    }

    fn take_saved(&mut self) -> bool {
        false
    }

    fn frame_rgba(&self) -> (Vec<u8>, u32, u32) {
        self.frame.clone()
    }
}

#[tokio::test]
async fn quick_save_round_trip() {
    let (store, _pool) = setup_store().await;

    store
        .create_or_update_state("Pokemon", vec![1, 2, 3], "data:img", QUICK_SAVE_SLOT, false)
        .await
        .unwrap();

    let bytes = store.load_state("Pokemon", QUICK_SAVE_SLOT).await.unwrap();
    assert_eq!(bytes, Some(vec![1, 2, 3]));
}

#[tokio::test]
async fn quick_save_is_overwritten_in_place() {
    let (store, _pool) = setup_store().await;

    store
        .create_or_update_state("Pokemon", vec![1], "img-a", QUICK_SAVE_SLOT, false)
        .await
        .unwrap();
    let stored = store
        .create_or_update_state("Pokemon", vec![2], "img-b", QUICK_SAVE_SLOT, true)
        .await
        .unwrap();

    // the singleton slot is never renamed, even on update
    assert_eq!(stored.state_name, QUICK_SAVE_SLOT);

    let entry = store.get_states("Pokemon").await.unwrap().unwrap();
    assert_eq!(entry.states.len(), 1);
    assert_eq!(entry.states[QUICK_SAVE_SLOT].state, vec![2]);
    assert_eq!(entry.states[QUICK_SAVE_SLOT].image_url, "img-b");
}

#[tokio::test]
async fn timestamped_state_sits_next_to_the_quick_save() {
    let (store, _pool) = setup_store().await;

    store
        .create_or_update_state("Pokemon", vec![1, 2, 3], "img-a", QUICK_SAVE_SLOT, false)
        .await
        .unwrap();
    store
        .create_or_update_state("Pokemon", vec![4, 5, 6], "img-b", "1700000000.state", false)
        .await
        .unwrap();

    let entry = store.get_states("Pokemon").await.unwrap().unwrap();
    assert_eq!(entry.states.len(), 2);
    assert_eq!(entry.states[QUICK_SAVE_SLOT].state, vec![1, 2, 3]);
    assert_eq!(entry.states["1700000000.state"].state, vec![4, 5, 6]);
}

#[tokio::test]
async fn update_renames_instead_of_duplicating() {
    let (store, _pool) = setup_store().await;

    store
        .create_or_update_state("Pokemon", vec![1], "img-a", "1000.state", false)
        .await
        .unwrap();
    let stored = store
        .create_or_update_state("Pokemon", vec![2], "img-b", "1000.state", true)
        .await
        .unwrap();

    assert_ne!(stored.state_name, "1000.state");
    assert!(stored.state_name.ends_with(".state"));

    let entry = store.get_states("Pokemon").await.unwrap().unwrap();
    assert_eq!(entry.states.len(), 1);
    assert!(!entry.states.contains_key("1000.state"));
    assert_eq!(entry.states[&stored.state_name].state, vec![2]);
    assert_eq!(entry.states[&stored.state_name].image_url, "img-b");
}

#[tokio::test]
async fn plain_overwrite_keeps_the_slot_name() {
    let (store, _pool) = setup_store().await;

    store
        .create_or_update_state("Pokemon", vec![1], "img-a", "1000.state", false)
        .await
        .unwrap();
    let stored = store
        .create_or_update_state("Pokemon", vec![2], "img-b", "1000.state", false)
        .await
        .unwrap();

    assert_eq!(stored.state_name, "1000.state");
    let entry = store.get_states("Pokemon").await.unwrap().unwrap();
    assert_eq!(entry.states.len(), 1);
}

#[tokio::test]
async fn deleting_a_missing_slot_reports_failure() {
    let (store, _pool) = setup_store().await;

    assert!(!store.delete_state("Pokemon", QUICK_SAVE_SLOT).await.unwrap());

    store
        .create_or_update_state("Pokemon", vec![1], "img", QUICK_SAVE_SLOT, false)
        .await
        .unwrap();
    assert!(!store.delete_state("Pokemon", "1000.state").await.unwrap());

    // the store is unchanged
    let entry = store.get_states("Pokemon").await.unwrap().unwrap();
    assert_eq!(entry.states.len(), 1);
    assert!(entry.states.contains_key(QUICK_SAVE_SLOT));
}

#[tokio::test]
async fn deleting_the_last_slot_leaves_an_empty_entry() {
    let (store, _pool) = setup_store().await;

    store
        .create_or_update_state("Pokemon", vec![1], "img", QUICK_SAVE_SLOT, false)
        .await
        .unwrap();
    assert!(store.delete_state("Pokemon", QUICK_SAVE_SLOT).await.unwrap());

    let entry = store.get_states("Pokemon").await.unwrap().unwrap();
    assert!(entry.states.is_empty());
}

#[tokio::test]
async fn titles_do_not_interfere() {
    let (store, _pool) = setup_store().await;

    store
        .create_or_update_state("Pokemon", vec![1], "img", QUICK_SAVE_SLOT, false)
        .await
        .unwrap();
    store
        .create_or_update_state("Zelda", vec![2], "img", QUICK_SAVE_SLOT, false)
        .await
        .unwrap();

    assert_eq!(
        store.load_state("Pokemon", QUICK_SAVE_SLOT).await.unwrap(),
        Some(vec![1])
    );
    assert_eq!(
        store.load_state("Zelda", QUICK_SAVE_SLOT).await.unwrap(),
        Some(vec![2])
    );
}

#[tokio::test]
async fn corrupt_record_starts_fresh_instead_of_poisoning_the_title() {
    let (store, pool) = setup_store().await;

    sqlx::query("INSERT INTO save_states (game_name, entry) VALUES (?, ?)")
        .bind("Pokemon")
        .bind("{not json")
        .execute(&pool)
        .await
        .unwrap();

    let stored = store
        .create_or_update_state("Pokemon", vec![1], "img", QUICK_SAVE_SLOT, false)
        .await
        .unwrap();
    assert_eq!(stored.state_name, QUICK_SAVE_SLOT);
    assert_eq!(
        store.load_state("Pokemon", QUICK_SAVE_SLOT).await.unwrap(),
        Some(vec![1])
    );
}

#[test]
fn compression_round_trips_exactly() {
    let payload: Vec<u8> = (0..=255u8).cycle().take(64 * 1024).collect();
    let compressed = compress(&payload).unwrap();
    assert_ne!(compressed, payload);
    assert_eq!(decompress(&compressed).unwrap(), payload);
}

#[tokio::test]
async fn manager_round_trips_a_snapshot_through_the_store() {
    let (store, _pool) = setup_store().await;
    let core = Arc::new(Mutex::new(MockCore::new(vec![5, 6, 7, 8])));
    let manager = StateManager::new(core.clone(), store.clone());

    manager.set_game("Pokemon").await;
    let entry = manager
        .create_save_state("data:img", QUICK_SAVE_SLOT, false)
        .await
        .unwrap();

    // stored bytes are compressed, not the raw snapshot
    assert_ne!(entry.state, vec![5, 6, 7, 8]);
    assert_eq!(decompress(&entry.state).unwrap(), vec![5, 6, 7, 8]);

    assert!(manager.load_save_state(QUICK_SAVE_SLOT).await);
    assert_eq!(core.lock().await.loaded, Some(vec![5, 6, 7, 8]));
}

#[tokio::test]
async fn manager_is_inert_until_a_game_is_loaded() {
    let (store, _pool) = setup_store().await;
    let core = Arc::new(Mutex::new(MockCore::new(vec![1])));
    let manager = StateManager::new(core, store);

    assert!(manager
        .create_save_state("data:img", QUICK_SAVE_SLOT, false)
        .await
        .is_none());
    assert!(!manager.load_save_state(QUICK_SAVE_SLOT).await);
}

#[tokio::test]
async fn thumbnail_is_a_png_data_uri() {
    let (store, _pool) = setup_store().await;
    let core = Arc::new(Mutex::new(MockCore::new(vec![1])));
    let manager = StateManager::new(core, store);

    let uri = manager.capture_thumbnail().await.unwrap();
    assert!(uri.starts_with("data:image/png;base64,"));
}
