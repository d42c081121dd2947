//! End-to-end scenarios against the public `Store` API, each against its
//! own hermetic temp directory.

use lsmkv::{Store, StoreConfig};
use pretty_assertions::assert_eq;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn empty_store_has_nothing() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    assert_eq!(store.get("nonexistent").unwrap(), None);
}

#[test]
fn single_put_is_readable_and_other_keys_are_absent() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();

    store.put("key1", "value1").unwrap();

    assert_eq!(store.get("key1").unwrap(), Some("value1".to_string()));
    assert_eq!(store.get("key2").unwrap(), None);
}

#[test]
fn overwrite_across_segments_returns_latest_value() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open_with_config(StoreConfig::new(dir.path()).with_segment_size_limit(3)).unwrap();

    store.put("key1", "old").unwrap();
    store.put("key2", "v2").unwrap();
    store.put("key3", "v3").unwrap(); // flush -> seg-1 (key1=old, key2, key3)
    store.put("key4", "v4").unwrap();
    store.put("key1", "new").unwrap(); // buffer: key4, key1=new

    assert_eq!(store.get("key1").unwrap(), Some("new".to_string()));
    assert_eq!(store.get("key4").unwrap(), Some("v4".to_string()));

    assert_eq!(store.list_on_disk_segments().len(), 1);
}

#[test]
fn reopening_the_same_directory_recovers_every_key() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    {
        let store =
            Store::open_with_config(StoreConfig::new(dir.path()).with_segment_size_limit(5)).unwrap();
        for i in 0..10 {
            store.put(format!("key{i}"), format!("value{i}")).unwrap();
        }
    }

    let reopened =
        Store::open_with_config(StoreConfig::new(dir.path()).with_segment_size_limit(5)).unwrap();
    for i in 0..10 {
        assert_eq!(
            reopened.get(&format!("key{i}")).unwrap(),
            Some(format!("value{i}"))
        );
    }
}

#[test]
fn flush_fires_exactly_at_the_size_limit_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open_with_config(StoreConfig::new(dir.path()).with_segment_size_limit(5)).unwrap();

    for i in 0..5 {
        store.put(format!("key{i}"), format!("value{i}")).unwrap();
    }
    assert_eq!(store.list_on_disk_segments().len(), 1);

    store.put("key5", "value5").unwrap();
    // The sixth put lives in the buffer; no second segment yet.
    assert_eq!(store.list_on_disk_segments().len(), 1);
    assert_eq!(store.get("key5").unwrap(), Some("value5".to_string()));
}

#[test]
fn merge_collapses_segments_and_keeps_the_latest_overwrite() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open_with_config(StoreConfig::new(dir.path()).with_segment_size_limit(3)).unwrap();

    for i in 0..10 {
        store.put(format!("key{i}"), format!("value{i}")).unwrap();
    }
    for i in 10..13 {
        // push the key5 overwrite and the trailing keys onto disk too,
        // so the merge has every write to fold over.
        store.put(format!("key{i}"), format!("value{i}")).unwrap();
    }
    store.put("key5", "v5new").unwrap();
    store.put("key13", "value13").unwrap();
    store.put("key14", "value14").unwrap(); // forces the buffer (incl. key5) to flush

    store.merge().unwrap();

    assert_eq!(store.list_on_disk_segments().len(), 1);
    assert_eq!(store.get("key5").unwrap(), Some("v5new".to_string()));
    for i in 0..15 {
        if i != 5 {
            assert_eq!(
                store.get(&format!("key{i}")).unwrap(),
                Some(format!("value{i}"))
            );
        }
    }
}

#[test]
fn empty_key_and_empty_value_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();

    store.put("", "empty_key").unwrap();
    store.put("empty_value", "").unwrap();

    assert_eq!(store.get("").unwrap(), Some("empty_key".to_string()));
    assert_eq!(store.get("empty_value").unwrap(), Some(String::new()));
}

#[test]
fn keys_interleaved_between_and_around_sparse_index_samples() {
    let dir = tempfile::tempdir().unwrap();
    // Sample factor is fixed at 10; 35 keys exercises a sample at 0, 10,
    // 20, 30, plus keys strictly between and past the last sample.
    let store = Store::open_with_config(StoreConfig::new(dir.path()).with_segment_size_limit(35)).unwrap();

    for i in 0..35 {
        store.put(format!("k{i:04}"), format!("v{i}")).unwrap();
    }
    store.put("k9999", "sentinel").unwrap(); // forces the flush at 35 entries

    for i in 0..35 {
        assert_eq!(
            store.get(&format!("k{i:04}")).unwrap(),
            Some(format!("v{i}"))
        );
    }
    assert_eq!(store.get("k0000a").unwrap(), None);
    assert_eq!(store.get("a").unwrap(), None);
}

#[test]
fn many_small_keys_survive_multiple_flushes() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open_with_config(StoreConfig::new(dir.path()).with_segment_size_limit(64)).unwrap();

    let count = 2_000;
    for i in 0..count {
        store
            .put(format!("key_{i:05}"), format!("value_{i}"))
            .unwrap();
    }

    assert_eq!(store.get("key_00000").unwrap(), Some("value_0".to_string()));
    assert_eq!(store.get("key_01000").unwrap(), Some("value_1000".to_string()));
    assert_eq!(
        store.get(&format!("key_{:05}", count - 1)).unwrap(),
        Some(format!("value_{}", count - 1))
    );
}
