use crate::compaction::CompactionStrategyType;
use crate::digest::DigestAlgo;
use crate::encoding::{decode_from_slice, encode_to_vec};
use crate::engine::EngineConfig;
use crate::kv::Environment;

use super::{Term, TermDictionary, DBI_NAMES};

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
fn named_node_round_trips_through_encoding() {
    let term = Term::iri("http://example.org/alice").unwrap();
    let bytes = encode_to_vec(&term).unwrap();
    let (decoded, _) = decode_from_slice::<Term>(&bytes).unwrap();
    assert_eq!(term, decoded);
}

#[test]
fn literal_with_language_round_trips() {
    let term = Term::Literal(oxrdf::Literal::new_language_tagged_literal("hello", "en").unwrap());
    let bytes = encode_to_vec(&term).unwrap();
    let (decoded, _) = decode_from_slice::<Term>(&bytes).unwrap();
    assert_eq!(term, decoded);
}

#[test]
fn literal_with_datatype_round_trips() {
    let dt = oxrdf::NamedNode::new("http://www.w3.org/2001/XMLSchema#integer").unwrap();
    let term = Term::Literal(oxrdf::Literal::new_typed_literal("42", dt));
    let bytes = encode_to_vec(&term).unwrap();
    let (decoded, _) = decode_from_slice::<Term>(&bytes).unwrap();
    assert_eq!(term, decoded);
}

#[test]
fn get_or_insert_is_stable_and_bijective() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::open(dir.path(), &DBI_NAMES, test_config(), 4).unwrap();
    let dict = TermDictionary::new(DigestAlgo::Sha1);

    let term = Term::iri("http://example.org/alice").unwrap();
    let mut txn = env.begin_write().unwrap();
    let key1 = dict.get_or_insert(&mut txn, &term).unwrap();
    let key2 = dict.get_or_insert(&mut txn, &term).unwrap();
    assert_eq!(key1, key2);

    let resolved = dict.resolve_term(&txn, key1).unwrap().unwrap();
    assert_eq!(resolved, term);
    txn.commit().unwrap();
}

#[test]
fn distinct_terms_get_distinct_keys() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::open(dir.path(), &DBI_NAMES, test_config(), 4).unwrap();
    let dict = TermDictionary::new(DigestAlgo::Sha1);

    let mut txn = env.begin_write().unwrap();
    let a = dict
        .get_or_insert(&mut txn, &Term::iri("http://example.org/a").unwrap())
        .unwrap();
    let b = dict
        .get_or_insert(&mut txn, &Term::iri("http://example.org/b").unwrap())
        .unwrap();
    assert_ne!(a, b);
    txn.commit().unwrap();
}

#[test]
fn first_allocated_key_is_never_all_zero() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::open(dir.path(), &DBI_NAMES, test_config(), 4).unwrap();
    let dict = TermDictionary::new(DigestAlgo::Sha1);

    let mut txn = env.begin_write().unwrap();
    let key = dict
        .get_or_insert(&mut txn, &Term::iri("http://example.org/first").unwrap())
        .unwrap();
    txn.commit().unwrap();

    assert_ne!(key.as_bytes(), &[0, 0, 0, 0, 0]);
}

#[test]
fn resolve_key_without_insert_returns_none_for_unseen_term() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::open(dir.path(), &DBI_NAMES, test_config(), 4).unwrap();
    let dict = TermDictionary::new(DigestAlgo::Sha1);

    let txn = env.begin_read().unwrap();
    let term = Term::iri("http://example.org/never-seen").unwrap();
    assert_eq!(dict.resolve_key(&txn, &term).unwrap(), None);
}
