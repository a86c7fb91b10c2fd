use time::OffsetDateTime;

use crate::compaction::CompactionStrategyType;
use crate::kv::Environment;

fn test_env(dir: &std::path::Path) -> Environment {
    let config = crate::engine::EngineConfig {
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
    };
    Environment::open(dir, &["a"], config, 8).unwrap()
}

fn epoch() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH
}

#[test]
fn commit_drains_recorded_events_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let env = test_env(dir.path());
    let mut txn = super::RepoTxn::begin_write(&env, epoch()).unwrap();
    txn.record_event(super::ChangeEvent {
        event_type: super::EventType::Created,
        uid: "one".to_string(),
        timestamp: txn.now(),
        resource_types: Vec::new(),
        actor: None,
    });
    txn.record_event(super::ChangeEvent {
        event_type: super::EventType::Updated,
        uid: "two".to_string(),
        timestamp: txn.now(),
        resource_types: Vec::new(),
        actor: None,
    });
    let drained = txn.commit().unwrap();
    assert_eq!(drained.len(), 2);
    assert_eq!(drained[0].uid, "one");
    assert_eq!(drained[1].uid, "two");
}

#[test]
fn abort_discards_changelog_and_writes() {
    let dir = tempfile::tempdir().unwrap();
    let env = test_env(dir.path());
    let mut txn = super::RepoTxn::begin_write(&env, epoch()).unwrap();
    txn.inner_mut().put("a", b"k".to_vec(), b"v".to_vec()).unwrap();
    txn.record_event(super::ChangeEvent {
        event_type: super::EventType::Created,
        uid: "one".to_string(),
        timestamp: txn.now(),
        resource_types: Vec::new(),
        actor: None,
    });
    txn.abort();

    let read = env.begin_read().unwrap();
    assert_eq!(read.get("a", b"k").unwrap(), None);
}

#[test]
fn same_now_is_shared_across_the_transaction() {
    let dir = tempfile::tempdir().unwrap();
    let env = test_env(dir.path());
    let now = epoch();
    let txn = super::RepoTxn::begin_write(&env, now).unwrap();
    assert_eq!(txn.now(), now);
    assert_eq!(txn.now(), txn.now());
}

#[test]
fn begin_read_allows_concurrent_readers() {
    let dir = tempfile::tempdir().unwrap();
    let env = test_env(dir.path());
    let r1 = super::RepoTxn::begin_read(&env, epoch()).unwrap();
    let r2 = super::RepoTxn::begin_read(&env, epoch()).unwrap();
    assert!(!r1.inner().is_writable());
    assert!(!r2.inner().is_writable());
}
