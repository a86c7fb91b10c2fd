use crate::compaction::CompactionStrategyType;
use crate::engine::EngineConfig;
use crate::kv::Environment;

fn test_config() -> EngineConfig {
    EngineConfig {
        write_buffer_size: 4096,
        compaction_strategy: CompactionStrategyType::Stcs,
        bucket_low: 0.5,
        bucket_high: 1.5,
        min_sstable_size: 50,
        min_threshold: 4,
        max_threshold: 32,
        tombstone_ratio_threshold: 0.3,
        tombstone_compaction_interval: 0,
        tombstone_bloom_fallback: true,
        tombstone_range_drop: true,
        thread_pool_size: 1,
    }
}

#[test]
fn put_get_commit_is_visible() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::open(dir.path(), &["a", "b"], test_config(), 8).unwrap();

    let mut txn = env.begin_write().unwrap();
    txn.put("a", b"k1".to_vec(), b"v1".to_vec()).unwrap();
    txn.commit().unwrap();

    let read = env.begin_read().unwrap();
    assert_eq!(read.get("a", b"k1").unwrap(), Some(b"v1".to_vec()));
    assert_eq!(read.get("b", b"k1").unwrap(), None);
}

#[test]
fn abort_never_reaches_engine() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::open(dir.path(), &["a"], test_config(), 8).unwrap();

    let mut txn = env.begin_write().unwrap();
    txn.put("a", b"k1".to_vec(), b"v1".to_vec()).unwrap();
    txn.abort();

    let read = env.begin_read().unwrap();
    assert_eq!(read.get("a", b"k1").unwrap(), None);
}

#[test]
fn write_txn_sees_its_own_staged_writes() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::open(dir.path(), &["a"], test_config(), 8).unwrap();

    let mut txn = env.begin_write().unwrap();
    txn.put("a", b"k1".to_vec(), b"v1".to_vec()).unwrap();
    assert_eq!(txn.get("a", b"k1").unwrap(), Some(b"v1".to_vec()));
    txn.commit().unwrap();
}

#[test]
fn read_txn_cannot_write() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::open(dir.path(), &["a"], test_config(), 8).unwrap();

    let mut txn = env.begin_read().unwrap();
    let err = txn.put("a", b"k1".to_vec(), b"v1".to_vec()).unwrap_err();
    assert!(matches!(err, super::KvError::ReadOnly));
}

#[test]
fn scan_merges_staged_and_committed() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::open(dir.path(), &["a"], test_config(), 8).unwrap();

    let mut txn = env.begin_write().unwrap();
    txn.put("a", b"k1".to_vec(), b"v1".to_vec()).unwrap();
    txn.commit().unwrap();

    let mut txn = env.begin_write().unwrap();
    txn.put("a", b"k2".to_vec(), b"v2".to_vec()).unwrap();
    txn.delete("a", b"k1".to_vec()).unwrap();
    let seen: Vec<_> = txn.scan("a", b"k0", b"k9").unwrap().collect();
    assert_eq!(seen, vec![(b"k2".to_vec(), b"v2".to_vec())]);
}

#[test]
fn unknown_dbi_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::open(dir.path(), &["a"], test_config(), 8).unwrap();
    let txn = env.begin_read().unwrap();
    assert!(txn.get("missing", b"k").is_err());
}
