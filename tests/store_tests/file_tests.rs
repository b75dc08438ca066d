//! Tests for FileStore
//!
//! These tests verify:
//! - Records survive close and reopen
//! - Each sync strategy snapshots when it should
//! - Corrupt snapshots are refused

use std::fs;

use atlasorm::store::FileStore;
use atlasorm::{Config, Direction, KeyValueStore, OrmError, SortScore, SyncStrategy};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store(strategy: SyncStrategy) -> (TempDir, FileStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::open_path(&temp_dir.path().join("store.db"), strategy).unwrap();
    (temp_dir, store)
}

fn fill(store: &FileStore) {
    store.set("doc:users:1", b"JSON{}").unwrap();
    store.set_add("idx:users:by_email:a@b.c", "1").unwrap();
    store.sorted_set_upsert("srt:users:age", "1", SortScore::Number(36.0)).unwrap();
    store.sorted_set_upsert("srt:users:name", "1", SortScore::from("Ada")).unwrap();
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_records_survive_reopen() {
    let (temp_dir, store) = setup_temp_store(SyncStrategy::EveryWrite);
    let path = store.path().to_path_buf();
    fill(&store);
    drop(store);

    let reopened = FileStore::open_path(&path, SyncStrategy::EveryWrite).unwrap();

    assert_eq!(reopened.get("doc:users:1").unwrap().as_deref(), Some(b"JSON{}".as_slice()));
    assert_eq!(reopened.set_members("idx:users:by_email:a@b.c").unwrap(), vec!["1"]);
    assert_eq!(
        reopened.sorted_set_score("srt:users:age", "1").unwrap(),
        Some(SortScore::Number(36.0))
    );
    assert_eq!(
        reopened.sorted_set_score("srt:users:name", "1").unwrap(),
        Some(SortScore::Text("Ada".to_string()))
    );
    drop(temp_dir);
}

#[test]
fn test_open_from_config_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_file(temp_dir.path().join("nested/dir/store.db"))
        .sync_strategy(SyncStrategy::EveryWrite)
        .build();

    let store = FileStore::open(&config).unwrap();
    store.set("k", b"v").unwrap();

    assert!(temp_dir.path().join("nested/dir/store.db").exists());
}

#[test]
fn test_open_rejects_invalid_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_file(temp_dir.path().join("store.db"))
        .sync_strategy(SyncStrategy::EveryNWrites { count: 0 })
        .build();

    assert!(matches!(FileStore::open(&config), Err(OrmError::Config(_))));
}

#[test]
fn test_missing_file_opens_empty() {
    let (_temp_dir, store) = setup_temp_store(SyncStrategy::Manual);

    assert!(store.memory().is_empty());
    assert!(!store.path().exists());
}

// =============================================================================
// Sync Strategy Tests
// =============================================================================

#[test]
fn test_every_write_flushes_immediately() {
    let (_temp_dir, store) = setup_temp_store(SyncStrategy::EveryWrite);

    store.set("k", b"v").unwrap();

    assert_eq!(store.pending_writes(), 0);
    assert!(store.path().exists());
}

#[test]
fn test_every_n_writes_flushes_on_threshold() {
    let (_temp_dir, store) = setup_temp_store(SyncStrategy::EveryNWrites { count: 3 });

    store.set("a", b"1").unwrap();
    store.set("b", b"2").unwrap();
    assert_eq!(store.pending_writes(), 2);
    assert!(!store.path().exists());

    store.set("c", b"3").unwrap();
    assert_eq!(store.pending_writes(), 0);
    assert!(store.path().exists());
}

#[test]
fn test_manual_flushes_on_request_and_drop() {
    let (temp_dir, store) = setup_temp_store(SyncStrategy::Manual);
    let path = store.path().to_path_buf();

    store.set("a", b"1").unwrap();
    store.set_add("s", "m").unwrap();
    assert_eq!(store.pending_writes(), 2);
    assert!(!path.exists());

    store.flush().unwrap();
    assert_eq!(store.pending_writes(), 0);

    store.set("b", b"2").unwrap();
    drop(store);

    let reopened = FileStore::open_path(&path, SyncStrategy::Manual).unwrap();
    assert_eq!(reopened.memory().len(), 3);
    drop(temp_dir);
}

#[test]
fn test_reads_do_not_count_as_writes() {
    let (_temp_dir, store) = setup_temp_store(SyncStrategy::Manual);
    store.set("a", b"1").unwrap();

    store.get("a").unwrap();
    store.set_members("missing").unwrap();
    store.sorted_set_range("missing", 0, -1, Direction::Asc).unwrap();

    assert_eq!(store.pending_writes(), 1);
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_checksum_mismatch_is_refused() {
    let (_temp_dir, store) = setup_temp_store(SyncStrategy::EveryWrite);
    let path = store.path().to_path_buf();
    fill(&store);
    drop(store);

    let mut bytes = fs::read(&path).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    let result = FileStore::open_path(&path, SyncStrategy::EveryWrite);

    assert!(matches!(result, Err(OrmError::Store(msg)) if msg.contains("checksum")));
}

#[test]
fn test_bad_magic_is_refused() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.db");
    fs::write(&path, b"NOPE\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00").unwrap();

    let result = FileStore::open_path(&path, SyncStrategy::Manual);

    assert!(matches!(result, Err(OrmError::Store(msg)) if msg.contains("magic")));
}

#[test]
fn test_truncated_snapshot_is_refused() {
    let (_temp_dir, store) = setup_temp_store(SyncStrategy::EveryWrite);
    let path = store.path().to_path_buf();
    fill(&store);
    drop(store);

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 10]).unwrap();

    assert!(matches!(
        FileStore::open_path(&path, SyncStrategy::EveryWrite),
        Err(OrmError::Store(_))
    ));
}

#[test]
fn test_oversized_length_header_is_refused() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.db");
    let mut bytes = b"AORM".to_vec();
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&u64::MAX.to_le_bytes());
    bytes.extend_from_slice(&[0u8; 4]);
    fs::write(&path, &bytes).unwrap();

    let result = FileStore::open_path(&path, SyncStrategy::Manual);

    assert!(matches!(result, Err(OrmError::Store(msg)) if msg.contains("length")));
}
