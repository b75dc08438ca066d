//! Tests for MemoryStore
//!
//! These tests verify:
//! - Plain values, sets and sorted sets
//! - Wrong-type access is an error
//! - Emptied collections disappear
//! - Rank ranges with negative bounds in both directions

use std::sync::Arc;
use std::thread;

use atlasorm::store::{MemoryStore, StoredValue};
use atlasorm::{Direction, KeyValueStore, OrmError, SortScore};

fn scored(store: &MemoryStore) {
    store.sorted_set_upsert("s", "c", SortScore::Number(3.0)).unwrap();
    store.sorted_set_upsert("s", "a", SortScore::Number(1.0)).unwrap();
    store.sorted_set_upsert("s", "b", SortScore::Number(2.0)).unwrap();
    store.sorted_set_upsert("s", "d", SortScore::Number(4.0)).unwrap();
}

// =============================================================================
// Value Tests
// =============================================================================

#[test]
fn test_set_get_delete() {
    let store = MemoryStore::new();

    store.set("k", b"v1").unwrap();
    store.set("k", b"v2").unwrap();
    assert_eq!(store.get("k").unwrap().as_deref(), Some(b"v2".as_slice()));

    store.delete("k").unwrap();
    assert_eq!(store.get("k").unwrap(), None);

    // deleting a missing key is fine
    store.delete("k").unwrap();
}

#[test]
fn test_wrong_type_access_is_store_error() {
    let store = MemoryStore::new();
    store.set("value", b"x").unwrap();
    store.set_add("set", "m").unwrap();

    assert!(matches!(store.set_members("value"), Err(OrmError::Store(_))));
    assert!(matches!(store.set_add("value", "m"), Err(OrmError::Store(_))));
    assert!(matches!(store.get("set"), Err(OrmError::Store(_))));
    assert!(matches!(store.sorted_set_len("set"), Err(OrmError::Store(_))));
    assert!(matches!(
        store.sorted_set_upsert("value", "m", SortScore::Number(1.0)),
        Err(OrmError::Store(_))
    ));
}

#[test]
fn test_delete_removes_any_type() {
    let store = MemoryStore::new();
    store.set_add("set", "m").unwrap();
    scored(&store);

    store.delete("set").unwrap();
    store.delete("s").unwrap();

    assert!(store.is_empty());
}

// =============================================================================
// Set Tests
// =============================================================================

#[test]
fn test_set_members_are_unique_and_ordered() {
    let store = MemoryStore::new();

    store.set_add("tags", "b").unwrap();
    store.set_add("tags", "a").unwrap();
    store.set_add("tags", "b").unwrap();

    assert_eq!(store.set_members("tags").unwrap(), vec!["a", "b"]);
    assert!(store.set_members("missing").unwrap().is_empty());
}

#[test]
fn test_emptied_set_is_removed() {
    let store = MemoryStore::new();
    store.set_add("tags", "a").unwrap();

    store.set_remove("tags", "a").unwrap();
    store.set_remove("tags", "a").unwrap();

    assert_eq!(store.entry("tags"), None);
    assert_eq!(store.len(), 0);
}

// =============================================================================
// Sorted Set Tests
// =============================================================================

#[test]
fn test_sorted_range_ascending_and_descending() {
    let store = MemoryStore::new();
    scored(&store);

    assert_eq!(
        store.sorted_set_range("s", 0, -1, Direction::Asc).unwrap(),
        vec!["a", "b", "c", "d"]
    );
    assert_eq!(
        store.sorted_set_range("s", 0, -1, Direction::Desc).unwrap(),
        vec!["d", "c", "b", "a"]
    );
    assert_eq!(store.sorted_set_range("s", 0, 1, Direction::Desc).unwrap(), vec!["d", "c"]);
}

#[test]
fn test_sorted_range_negative_bounds() {
    let store = MemoryStore::new();
    scored(&store);

    assert_eq!(store.sorted_set_range("s", -2, -1, Direction::Asc).unwrap(), vec!["c", "d"]);
    assert_eq!(store.sorted_set_range("s", 0, -2, Direction::Asc).unwrap(), vec!["a", "b", "c"]);
    assert_eq!(store.sorted_set_range("s", -100, 100, Direction::Asc).unwrap().len(), 4);
}

#[test]
fn test_sorted_range_selecting_nothing() {
    let store = MemoryStore::new();
    scored(&store);

    assert!(store.sorted_set_range("s", 4, 10, Direction::Asc).unwrap().is_empty());
    assert!(store.sorted_set_range("s", 3, 1, Direction::Asc).unwrap().is_empty());
    assert!(store.sorted_set_range("missing", 0, -1, Direction::Asc).unwrap().is_empty());
}

#[test]
fn test_sorted_upsert_rescores() {
    let store = MemoryStore::new();
    scored(&store);

    store.sorted_set_upsert("s", "a", SortScore::Number(10.0)).unwrap();

    assert_eq!(store.sorted_set_len("s").unwrap(), 4);
    assert_eq!(store.sorted_set_score("s", "a").unwrap(), Some(SortScore::Number(10.0)));
    assert_eq!(store.sorted_set_range("s", -1, -1, Direction::Asc).unwrap(), vec!["a"]);
}

#[test]
fn test_text_scores_sort_after_numbers() {
    let store = MemoryStore::new();
    store.sorted_set_upsert("mixed", "word", SortScore::from("apple")).unwrap();
    store.sorted_set_upsert("mixed", "big", SortScore::from(1e12)).unwrap();
    store.sorted_set_upsert("mixed", "zed", SortScore::from("zebra")).unwrap();

    assert_eq!(
        store.sorted_set_range("mixed", 0, -1, Direction::Asc).unwrap(),
        vec!["big", "word", "zed"]
    );
}

#[test]
fn test_emptied_sorted_set_is_removed() {
    let store = MemoryStore::new();
    store.sorted_set_upsert("s", "a", SortScore::Number(1.0)).unwrap();

    store.sorted_set_remove("s", "a").unwrap();

    assert_eq!(store.sorted_set_len("s").unwrap(), 0);
    assert!(store.entry("s").is_none());
}

// =============================================================================
// Inspection Tests
// =============================================================================

#[test]
fn test_keys_by_prefix() {
    let store = MemoryStore::new();
    store.set("doc:users:1", b"{}").unwrap();
    store.set("doc:users:2", b"{}").unwrap();
    store.set("doc:posts:1", b"{}").unwrap();
    store.set_add("idx:users:by_email:x", "1").unwrap();

    assert_eq!(store.keys("doc:users:"), vec!["doc:users:1", "doc:users:2"]);
    assert_eq!(store.keys("").len(), 4);
    assert!(store.keys("zzz").is_empty());
}

#[test]
fn test_snapshot_restores_every_type() {
    let store = MemoryStore::new();
    store.set("v", b"1").unwrap();
    store.set_add("set", "m").unwrap();
    scored(&store);

    let restored = MemoryStore::from_snapshot(store.snapshot());

    assert_eq!(restored.len(), 3);
    assert!(matches!(restored.entry("set"), Some(StoredValue::Set(_))));
    assert_eq!(restored.sorted_set_range("s", 0, 0, Direction::Desc).unwrap(), vec!["d"]);
}

#[test]
fn test_concurrent_writers() {
    let store = Arc::new(MemoryStore::new());
    let mut handles = Vec::new();

    for t in 0..4 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..100 {
                let member = format!("{}-{}", t, i);
                store.set_add("shared", &member).unwrap();
                store
                    .sorted_set_upsert("ranked", &member, SortScore::Number(i as f64))
                    .unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.set_members("shared").unwrap().len(), 400);
    assert_eq!(store.sorted_set_len("ranked").unwrap(), 400);
}
