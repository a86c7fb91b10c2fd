use crate::compaction::CompactionStrategyType;
use crate::digest::DigestAlgo;
use crate::dict::{Term, TermDictionary};
use crate::engine::EngineConfig;
use crate::kv::Environment;
use crate::quadstore::{self, Quad};

use super::*;

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

fn open_env(dir: &tempfile::TempDir) -> Environment {
    let mut names: Vec<&str> = crate::dict::DBI_NAMES.to_vec();
    names.extend_from_slice(&crate::quadstore::DBI_NAMES);
    Environment::open(dir.path(), &names, test_config(), 8).unwrap()
}

#[test]
fn route_for_predicate_sends_contains_to_struct() {
    assert_eq!(route_for_predicate(srv_mgd::LDP_CONTAINS), GraphRoute::Struct);
    assert_eq!(
        route_for_predicate(srv_mgd::FCREPO_HAS_PARENT),
        GraphRoute::Admin
    );
    assert_eq!(
        route_for_predicate("http://purl.org/dc/terms/title"),
        GraphRoute::User
    );
}

#[test]
fn uid_from_resource_uri_strips_fragment() {
    assert_eq!(uid_from_resource_uri("urn:fcres:foo/bar"), Some("foo/bar"));
    assert_eq!(
        uid_from_resource_uri("urn:fcres:foo/bar#fcr:admin"),
        Some("foo/bar")
    );
    assert_eq!(uid_from_resource_uri("http://example.org/x"), None);
}

#[test]
fn compose_imr_merges_admin_user_struct_not_hist() {
    let dir = tempfile::tempdir().unwrap();
    let env = open_env(&dir);
    let dict = TermDictionary::new(DigestAlgo::Sha1);
    let mut txn = env.begin_write().unwrap();

    let uid = "foo";
    let subject = Term::iri(resource_uri(uid)).unwrap();
    let title_pred = Term::iri("http://purl.org/dc/terms/title").unwrap();
    let created_pred = Term::iri(srv_mgd::FCREPO_HAS_PARENT).unwrap();
    let value = Term::Literal(oxrdf::Literal::new_simple_literal("hello"));
    let parent = Term::iri("urn:fcres:somewhere").unwrap();

    let s = dict.get_or_insert(&mut txn, &subject).unwrap();
    let p_user = dict.get_or_insert(&mut txn, &title_pred).unwrap();
    let p_admin = dict.get_or_insert(&mut txn, &created_pred).unwrap();
    let o_user = dict.get_or_insert(&mut txn, &value).unwrap();
    let o_admin = dict.get_or_insert(&mut txn, &parent).unwrap();

    let user_graph = Term::iri(user_graph_uri(uid)).unwrap();
    let admin_graph = Term::iri(admin_graph_uri(uid)).unwrap();
    let hist_graph = Term::iri(hist_graph_uri(uid, Some("v1"))).unwrap();

    let c_user = dict.get_or_insert(&mut txn, &user_graph).unwrap();
    let c_admin = dict.get_or_insert(&mut txn, &admin_graph).unwrap();
    let c_hist = dict.get_or_insert(&mut txn, &hist_graph).unwrap();

    quadstore::insert_quad(&mut txn, Quad::new(s, p_user, o_user, c_user)).unwrap();
    quadstore::insert_quad(&mut txn, Quad::new(s, p_admin, o_admin, c_admin)).unwrap();
    quadstore::insert_quad(&mut txn, Quad::new(s, p_admin, o_admin, c_hist)).unwrap();

    let imr = compose_imr(&txn, &dict, uid).unwrap();
    assert_eq!(imr.len(), 2, "hist graph triples must not appear in the IMR");
    txn.commit().unwrap();
}

#[test]
fn list_descendants_follows_contains_edges() {
    let dir = tempfile::tempdir().unwrap();
    let env = open_env(&dir);
    let dict = TermDictionary::new(DigestAlgo::Sha1);
    let mut txn = env.begin_write().unwrap();

    let parent_uid = "parent";
    let child_uid = "parent/child";

    let parent_subject = dict
        .get_or_insert(&mut txn, &Term::iri(resource_uri(parent_uid)).unwrap())
        .unwrap();
    let contains = dict
        .get_or_insert(&mut txn, &Term::iri(srv_mgd::LDP_CONTAINS).unwrap())
        .unwrap();
    let child_object = dict
        .get_or_insert(&mut txn, &Term::iri(resource_uri(child_uid)).unwrap())
        .unwrap();
    let struct_ctx = dict
        .get_or_insert(&mut txn, &Term::iri(struct_graph_uri(parent_uid)).unwrap())
        .unwrap();

    quadstore::insert_quad(
        &mut txn,
        Quad::new(parent_subject, contains, child_object, struct_ctx),
    )
    .unwrap();

    let descendants = list_descendants(&txn, &dict, parent_uid).unwrap();
    assert_eq!(descendants, vec![child_uid.to_string()]);
    txn.commit().unwrap();
}

#[test]
fn referential_integrity_scan_finds_dangling_parent() {
    let dir = tempfile::tempdir().unwrap();
    let env = open_env(&dir);
    let dict = TermDictionary::new(DigestAlgo::Sha1);
    let mut txn = env.begin_write().unwrap();

    let child_uid = "child";
    let missing_parent_uid = "nonexistent";

    let subject = dict
        .get_or_insert(&mut txn, &Term::iri(resource_uri(child_uid)).unwrap())
        .unwrap();
    let has_parent = dict
        .get_or_insert(&mut txn, &Term::iri(srv_mgd::FCREPO_HAS_PARENT).unwrap())
        .unwrap();
    let object = dict
        .get_or_insert(
            &mut txn,
            &Term::iri(resource_uri(missing_parent_uid)).unwrap(),
        )
        .unwrap();
    let admin_ctx = dict
        .get_or_insert(&mut txn, &Term::iri(admin_graph_uri(child_uid)).unwrap())
        .unwrap();

    quadstore::insert_quad(&mut txn, Quad::new(subject, has_parent, object, admin_ctx)).unwrap();

    let dangling = referential_integrity_scan(&txn, &dict, |_| false).unwrap();
    assert_eq!(dangling.len(), 1);
    assert_eq!(dangling[0].from_uid, child_uid);
    assert_eq!(dangling[0].predicate, srv_mgd::FCREPO_HAS_PARENT);
    assert_eq!(dangling[0].missing_uid, missing_parent_uid);
    txn.commit().unwrap();
}

#[test]
fn referential_integrity_scan_finds_a_dangling_contains_edge() {
    let dir = tempfile::tempdir().unwrap();
    let env = open_env(&dir);
    let dict = TermDictionary::new(DigestAlgo::Sha1);
    let mut txn = env.begin_write().unwrap();

    let parent_uid = "parent";
    let missing_child_uid = "parent/gone";

    let subject = dict
        .get_or_insert(&mut txn, &Term::iri(resource_uri(parent_uid)).unwrap())
        .unwrap();
    let contains = dict
        .get_or_insert(&mut txn, &Term::iri(srv_mgd::LDP_CONTAINS).unwrap())
        .unwrap();
    let object = dict
        .get_or_insert(&mut txn, &Term::iri(resource_uri(missing_child_uid)).unwrap())
        .unwrap();
    let struct_ctx = dict
        .get_or_insert(&mut txn, &Term::iri(struct_graph_uri(parent_uid)).unwrap())
        .unwrap();

    quadstore::insert_quad(&mut txn, Quad::new(subject, contains, object, struct_ctx)).unwrap();

    let dangling = referential_integrity_scan(&txn, &dict, |_| false).unwrap();
    assert_eq!(dangling.len(), 1);
    assert_eq!(dangling[0].from_uid, parent_uid);
    assert_eq!(dangling[0].predicate, srv_mgd::LDP_CONTAINS);
    assert_eq!(dangling[0].missing_uid, missing_child_uid);
    txn.commit().unwrap();
}

#[test]
fn referential_integrity_scan_skips_version_endpoint_references() {
    let dir = tempfile::tempdir().unwrap();
    let env = open_env(&dir);
    let dict = TermDictionary::new(DigestAlgo::Sha1);
    let mut txn = env.begin_write().unwrap();

    let uid = "a";
    let subject = dict
        .get_or_insert(&mut txn, &Term::iri(resource_uri(uid)).unwrap())
        .unwrap();
    let has_version = dict
        .get_or_insert(&mut txn, &Term::iri(srv_mgd::FCREPO_HAS_VERSION).unwrap())
        .unwrap();
    let version_uri = hist_graph_uri(uid, Some("v1"));
    let object = dict
        .get_or_insert(&mut txn, &Term::iri(version_uri).unwrap())
        .unwrap();
    let admin_ctx = dict
        .get_or_insert(&mut txn, &Term::iri(admin_graph_uri(uid)).unwrap())
        .unwrap();

    quadstore::insert_quad(&mut txn, Quad::new(subject, has_version, object, admin_ctx)).unwrap();

    // "a" itself never existing makes every other predicate's reference a
    // dangling hit too were it not excluded; only hasVersion is in play here.
    let dangling = referential_integrity_scan(&txn, &dict, |_| false).unwrap();
    assert!(dangling.is_empty());
    txn.commit().unwrap();
}
