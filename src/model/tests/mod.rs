use super::*;
use crate::compaction::CompactionStrategyType;
use crate::config::RepoConfig;
use crate::dict::TermDictionary;
use crate::engine::EngineConfig;
use crate::kv::Environment;
use crate::txn::RepoTxn;
use time::OffsetDateTime;

fn test_engine_config() -> EngineConfig {
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

fn harness(dir: &std::path::Path) -> (Environment, TermDictionary, RepoConfig) {
    let mut names: Vec<&str> = crate::quadstore::DBI_NAMES.to_vec();
    names.extend_from_slice(&crate::dict::DBI_NAMES);
    let env = Environment::open(dir, &names, test_engine_config(), 8).unwrap();
    let dict = TermDictionary::new(crate::digest::DigestAlgo::Sha1);
    let config = RepoConfig::testing(dir);
    (env, dict, config)
}

fn now() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH
}

fn rdf(triples: Vec<(&str, &str, &str)>) -> Payload {
    Payload::Rdf(
        triples
            .into_iter()
            .map(|(s, p, o)| ImrTriple {
                subject: Term::iri(s.to_string()).unwrap(),
                predicate: Term::iri(p.to_string()).unwrap(),
                object: Term::iri(o.to_string()).unwrap(),
            })
            .collect(),
    )
}

#[test]
fn create_then_replace_an_rdf_source() {
    let dir = tempfile::tempdir().unwrap();
    let (env, dict, config) = harness(dir.path());

    let mut txn = RepoTxn::begin_write(&env, now()).unwrap();
    let outcome = create_or_replace(
        &mut txn,
        &dict,
        &config,
        "a",
        rdf(vec![("urn:fcres:a", "http://example.org/title", "urn:lit:hello")]),
        Some("alice".to_string()),
        None,
    )
    .unwrap();
    assert_eq!(outcome, CreateOutcome::Created);
    let events = txn.commit().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::Created);

    let mut txn = RepoTxn::begin_write(&env, now()).unwrap();
    let outcome = create_or_replace(
        &mut txn,
        &dict,
        &config,
        "a",
        rdf(vec![("urn:fcres:a", "http://example.org/title", "urn:lit:goodbye")]),
        Some("alice".to_string()),
        None,
    )
    .unwrap();
    assert_eq!(outcome, CreateOutcome::Updated);
    txn.commit().unwrap();

    let txn = env.begin_read().unwrap();
    let imr = layout::compose_imr(&txn, &dict, "a").unwrap();
    assert!(imr.iter().any(|t| term_iri(&t.object) == Some("urn:lit:goodbye")));
    assert!(!imr.iter().any(|t| term_iri(&t.object) == Some("urn:lit:hello")));
}

#[test]
fn single_subject_violation_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (env, dict, config) = harness(dir.path());
    let mut txn = RepoTxn::begin_write(&env, now()).unwrap();
    let err = create_or_replace(
        &mut txn,
        &dict,
        &config,
        "a",
        rdf(vec![("urn:fcres:other", "http://example.org/title", "urn:lit:x")]),
        None,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, ModelError::SingleSubject { .. }));
}

#[test]
fn server_managed_predicate_rejected_in_strict_mode() {
    let dir = tempfile::tempdir().unwrap();
    let (env, dict, config) = harness(dir.path());
    let mut txn = RepoTxn::begin_write(&env, now()).unwrap();
    let err = create_or_replace(
        &mut txn,
        &dict,
        &config,
        "a",
        rdf(vec![("urn:fcres:a", srv_mgd::FCREPO_CREATED, "urn:lit:x")]),
        None,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, ModelError::ServerManagedTerm { .. }));
}

#[test]
fn server_managed_predicate_stripped_in_lenient_mode() {
    let dir = tempfile::tempdir().unwrap();
    let (env, dict, mut config) = harness(dir.path());
    config.server_managed_handling = crate::config::ServerManagedHandling::Lenient;
    let mut txn = RepoTxn::begin_write(&env, now()).unwrap();
    create_or_replace(
        &mut txn,
        &dict,
        &config,
        "a",
        rdf(vec![("urn:fcres:a", srv_mgd::FCREPO_CREATED, "urn:lit:x")]),
        None,
        None,
    )
    .unwrap();
}

#[test]
fn containment_auto_creates_missing_pairtree_ancestors() {
    let dir = tempfile::tempdir().unwrap();
    let (env, dict, config) = harness(dir.path());
    let mut txn = RepoTxn::begin_write(&env, now()).unwrap();
    create_or_replace(&mut txn, &dict, &config, "a/b/c", rdf(vec![]), None, None).unwrap();
    txn.commit().unwrap();

    let txn = env.begin_read().unwrap();
    assert!(resource_exists(&txn, &dict, "a").unwrap());
    assert!(resource_exists(&txn, &dict, "a/b").unwrap());
    assert!(resource_exists(&txn, &dict, "a/b/c").unwrap());

    let a_imr = layout::compose_imr(&txn, &dict, "a").unwrap();
    assert!(a_imr.iter().any(|t| is_rdf_type(t, srv_mgd::FCSYSTEM_PAIRTREE)));
    let struct_a = layout::compose_imr(&txn, &dict, "a").unwrap();
    assert!(struct_a.iter().any(|t| term_iri(&t.predicate) == Some(srv_mgd::LDP_CONTAINS)
        && term_iri(&t.object) == Some("urn:fcres:a/b")));
}

#[test]
fn direct_container_propagates_membership_triple() {
    let dir = tempfile::tempdir().unwrap();
    let (env, dict, config) = harness(dir.path());

    let mut txn = RepoTxn::begin_write(&env, now()).unwrap();
    create_or_replace(&mut txn, &dict, &config, "members", rdf(vec![]), None, None).unwrap();
    create_or_replace(
        &mut txn,
        &dict,
        &config,
        "coll",
        rdf(vec![
            ("urn:fcres:coll", "http://www.w3.org/1999/02/22-rdf-syntax-ns#type", srv_mgd::LDP_DIRECT_CONTAINER),
            ("urn:fcres:coll", srv_mgd::LDP_MEMBERSHIP_RESOURCE, "urn:fcres:members"),
            ("urn:fcres:coll", srv_mgd::LDP_HAS_MEMBER_RELATION, "http://example.org/hasMember"),
        ]),
        None,
        None,
    )
    .unwrap();
    create_or_replace(&mut txn, &dict, &config, "coll/item1", rdf(vec![]), None, None).unwrap();
    txn.commit().unwrap();

    let txn = env.begin_read().unwrap();
    let members_imr = layout::compose_imr(&txn, &dict, "members").unwrap();
    assert!(members_imr.iter().any(|t| term_iri(&t.predicate) == Some("http://example.org/hasMember")
        && term_iri(&t.object) == Some("urn:fcres:coll/item1")));
}

#[test]
fn referential_integrity_strict_rejects_dangling_reference() {
    let dir = tempfile::tempdir().unwrap();
    let (env, dict, config) = harness(dir.path());
    let mut txn = RepoTxn::begin_write(&env, now()).unwrap();
    let err = create_or_replace(
        &mut txn,
        &dict,
        &config,
        "a",
        rdf(vec![("urn:fcres:a", "http://example.org/linksTo", "urn:fcres:does-not-exist")]),
        None,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, ModelError::RefIntViolation(_)));
}

#[test]
fn referential_integrity_off_allows_dangling_reference() {
    let dir = tempfile::tempdir().unwrap();
    let (env, dict, mut config) = harness(dir.path());
    config.referential_integrity = crate::config::ReferentialIntegrityPolicy::Off;
    let mut txn = RepoTxn::begin_write(&env, now()).unwrap();
    create_or_replace(
        &mut txn,
        &dict,
        &config,
        "a",
        rdf(vec![("urn:fcres:a", "http://example.org/linksTo", "urn:fcres:does-not-exist")]),
        None,
        None,
    )
    .unwrap();
}

#[test]
fn bury_then_resurrect_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let (env, dict, config) = harness(dir.path());
    let mut txn = RepoTxn::begin_write(&env, now()).unwrap();
    create_or_replace(&mut txn, &dict, &config, "a", rdf(vec![]), None, None).unwrap();
    txn.commit().unwrap();

    let mut txn = RepoTxn::begin_write(&env, now()).unwrap();
    delete(&mut txn, &dict, "a", true, None).unwrap();
    txn.commit().unwrap();

    let txn = env.begin_read().unwrap();
    assert!(is_tombstone(&txn, &dict, "a").unwrap());
    drop(txn);

    let mut txn = RepoTxn::begin_write(&env, now()).unwrap();
    resurrect(&mut txn, &dict, "a", None).unwrap();
    txn.commit().unwrap();

    let txn = env.begin_read().unwrap();
    assert!(!is_tombstone(&txn, &dict, "a").unwrap());
    assert!(resource_exists(&txn, &dict, "a").unwrap());
}

#[test]
fn create_or_replace_on_a_buried_uid_is_rejected_as_tombstone() {
    let dir = tempfile::tempdir().unwrap();
    let (env, dict, config) = harness(dir.path());
    let mut txn = RepoTxn::begin_write(&env, now()).unwrap();
    create_or_replace(&mut txn, &dict, &config, "a", rdf(vec![]), None, None).unwrap();
    txn.commit().unwrap();

    let mut txn = RepoTxn::begin_write(&env, now()).unwrap();
    delete(&mut txn, &dict, "a", true, None).unwrap();
    txn.commit().unwrap();

    // A buried "a" no longer satisfies resource_exists (bury_one strips
    // rdf:type ldp:Resource), so PUTting over it must not be treated as a
    // fresh create — it has to surface the tombstone.
    let mut txn = RepoTxn::begin_write(&env, now()).unwrap();
    let err = create_or_replace(&mut txn, &dict, &config, "a", rdf(vec![]), None, None).unwrap_err();
    assert!(matches!(err, ModelError::Tombstone { uid, .. } if uid == "a"));
}

#[test]
fn forget_clears_every_graph() {
    let dir = tempfile::tempdir().unwrap();
    let (env, dict, config) = harness(dir.path());
    let mut txn = RepoTxn::begin_write(&env, now()).unwrap();
    create_or_replace(
        &mut txn,
        &dict,
        &config,
        "a",
        rdf(vec![("urn:fcres:a", "http://example.org/title", "urn:lit:hello")]),
        None,
        None,
    )
    .unwrap();
    txn.commit().unwrap();

    let mut txn = RepoTxn::begin_write(&env, now()).unwrap();
    delete(&mut txn, &dict, "a", false, None).unwrap();
    txn.commit().unwrap();

    let txn = env.begin_read().unwrap();
    let imr = layout::compose_imr(&txn, &dict, "a").unwrap();
    assert!(imr.is_empty());
}

#[test]
fn update_delta_removes_and_adds_triples() {
    let dir = tempfile::tempdir().unwrap();
    let (env, dict, config) = harness(dir.path());
    let mut txn = RepoTxn::begin_write(&env, now()).unwrap();
    create_or_replace(
        &mut txn,
        &dict,
        &config,
        "a",
        rdf(vec![("urn:fcres:a", "http://example.org/title", "urn:lit:hello")]),
        None,
        None,
    )
    .unwrap();
    txn.commit().unwrap();

    let mut txn = RepoTxn::begin_write(&env, now()).unwrap();
    update_delta(
        &mut txn,
        &dict,
        &config,
        "a",
        vec![PatternTriple {
            subject: None,
            predicate: Some(Term::iri("http://example.org/title").unwrap()),
            object: None,
        }],
        vec![ImrTriple {
            subject: Term::iri("urn:fcres:a").unwrap(),
            predicate: Term::iri("http://example.org/title").unwrap(),
            object: Term::iri("urn:lit:updated").unwrap(),
        }],
    )
    .unwrap();
    txn.commit().unwrap();

    let txn = env.begin_read().unwrap();
    let imr = layout::compose_imr(&txn, &dict, "a").unwrap();
    assert!(imr.iter().any(|t| term_iri(&t.object) == Some("urn:lit:updated")));
    assert!(!imr.iter().any(|t| term_iri(&t.object) == Some("urn:lit:hello")));
}

#[test]
fn create_mints_a_uid_under_parent() {
    let dir = tempfile::tempdir().unwrap();
    let (env, dict, config) = harness(dir.path());
    let mut txn = RepoTxn::begin_write(&env, now()).unwrap();
    let uid = create(&mut txn, &dict, &config, "parent", Some("child"), rdf(vec![]), None, None).unwrap();
    assert_eq!(uid, "parent/child");

    // requesting the same slug again falls back to a generated UID, since
    // "parent/child" is already taken
    let second = create(&mut txn, &dict, &config, "parent", Some("child"), rdf(vec![]), None, None).unwrap();
    assert_ne!(second, "parent/child");
}

#[test]
fn create_without_slug_splits_into_pairtree_segments_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let (env, dict, mut config) = harness(dir.path());
    config.legacy_pairtree_split = true;
    config.pairtree_branch_length = 2;
    config.pairtree_branches = 2;

    let mut txn = RepoTxn::begin_write(&env, now()).unwrap();
    let uid = create(&mut txn, &dict, &config, "", None, rdf(vec![]), None, None).unwrap();
    txn.commit().unwrap();

    let segments: Vec<&str> = uid.split('/').collect();
    assert_eq!(segments.len(), 3, "expected two branch segments plus the full id, got {uid:?}");
    assert_eq!(segments[0].len(), 2);
    assert_eq!(segments[1].len(), 2);
    assert!(segments[2].contains('-'), "leaf segment should be the unsplit UUID");

    let txn = env.begin_read().unwrap();
    assert!(resource_exists(&txn, &dict, &uid).unwrap());
}
