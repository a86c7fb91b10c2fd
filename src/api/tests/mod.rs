use super::*;
use crate::config::RepoConfig;
use crate::dict::Term;
use crate::model::Payload;

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

fn api(dir: &std::path::Path) -> ResourceApi {
    ResourceApi::open(RepoConfig::testing(dir)).unwrap()
}

#[test]
fn create_and_get_round_trips_an_rdf_source() {
    let dir = tempfile::tempdir().unwrap();
    let api = api(dir.path());

    let (outcome, events) = api
        .create_or_replace(
            "a",
            rdf(vec![("urn:fcres:a", "http://example.org/title", "urn:lit:v1")]),
            Some("alice".to_string()),
            None,
        )
        .unwrap();
    assert_eq!(outcome, CreateOutcome::Created);
    assert_eq!(events.len(), 1);

    assert!(api.exists("a").unwrap());
    let imr = api.get("a").unwrap().unwrap();
    assert!(imr.iter().any(|t| matches!(&t.object, Term::NamedNode(n) if n.as_str() == "urn:lit:v1")));
    assert!(api.get("missing").unwrap().is_none());
}

#[test]
fn create_mints_a_uid_under_the_given_parent() {
    let dir = tempfile::tempdir().unwrap();
    let api = api(dir.path());

    api.create_or_replace("parent", rdf(vec![]), None, None).unwrap();
    let (uid, _) = api
        .create("parent", Some("child"), rdf(vec![]), None, None)
        .unwrap();
    assert_eq!(uid, "parent/child");
    assert!(api.exists("parent/child").unwrap());
}

#[test]
fn etag_is_stable_and_absent_for_missing_resources() {
    let dir = tempfile::tempdir().unwrap();
    let api = api(dir.path());
    api.create_or_replace(
        "a",
        rdf(vec![("urn:fcres:a", "http://example.org/title", "urn:lit:v1")]),
        None,
        None,
    )
    .unwrap();

    let first = api.etag("a").unwrap();
    let second = api.etag("a").unwrap();
    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(api.etag("missing").unwrap(), None);
}

#[test]
fn update_runs_sparql_against_only_this_resources_graph() {
    let dir = tempfile::tempdir().unwrap();
    let api = api(dir.path());
    api.create_or_replace(
        "a",
        rdf(vec![("urn:fcres:a", "http://purl.org/dc/terms/title", "urn:lit:old")]),
        None,
        None,
    )
    .unwrap();

    api.update(
        "a",
        "DELETE {<> <http://purl.org/dc/terms/title> <urn:lit:old>} \
         INSERT {<> <http://purl.org/dc/terms/title> <urn:lit:new>} WHERE {}",
    )
    .unwrap();

    let imr = api.get("a").unwrap().unwrap();
    assert!(imr.iter().any(|t| matches!(&t.object, Term::NamedNode(n) if n.as_str() == "urn:lit:new")));
    assert!(!imr.iter().any(|t| matches!(&t.object, Term::NamedNode(n) if n.as_str() == "urn:lit:old")));
}

#[test]
fn create_or_replace_binary_stores_payload_and_stamps_fixity() {
    let dir = tempfile::tempdir().unwrap();
    let api = api(dir.path());

    let (outcome, _) = api
        .create_or_replace_binary("a/bin", b"hello world".to_vec(), "text/plain".to_string(), None)
        .unwrap();
    assert_eq!(outcome, CreateOutcome::Created);

    let meta = api.get_metadata("a/bin").unwrap().unwrap();
    assert!(meta.triples.iter().any(
        |t| matches!(&t.predicate, Term::NamedNode(n) if n.as_str() == crate::layout::srv_mgd::EBUCORE_HAS_MIME_TYPE)
    ));
}

#[test]
fn delete_with_tombstone_then_resurrect_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let api = api(dir.path());
    api.create_or_replace("a", rdf(vec![]), None, None).unwrap();

    api.delete("a", true, None).unwrap();
    assert!(!api.exists("a").unwrap());

    api.resurrect("a", None).unwrap();
    assert!(api.exists("a").unwrap());
}

#[test]
fn get_on_a_buried_resource_errors_as_tombstone_not_missing() {
    use crate::model::ModelError;

    let dir = tempfile::tempdir().unwrap();
    let api = api(dir.path());
    api.create_or_replace("a", rdf(vec![]), None, None).unwrap();
    api.delete("a", true, None).unwrap();

    let err = api.get("a").unwrap_err();
    assert!(matches!(err, RepoError::Model(ModelError::Tombstone { uid, .. }) if uid == "a"));

    let err = api.get_metadata("a").unwrap_err();
    assert!(matches!(err, RepoError::Model(ModelError::Tombstone { uid, .. }) if uid == "a"));
}

#[test]
fn create_version_then_revert_restores_content() {
    let dir = tempfile::tempdir().unwrap();
    let api = api(dir.path());
    api.create_or_replace(
        "a",
        rdf(vec![("urn:fcres:a", "http://example.org/title", "urn:lit:v1")]),
        None,
        None,
    )
    .unwrap();
    let (label, _) = api.create_version("a", Some("v1"), None).unwrap();

    api.create_or_replace(
        "a",
        rdf(vec![("urn:fcres:a", "http://example.org/title", "urn:lit:v2")]),
        None,
        None,
    )
    .unwrap();
    assert!(api
        .get("a")
        .unwrap()
        .unwrap()
        .iter()
        .any(|t| matches!(&t.object, Term::NamedNode(n) if n.as_str() == "urn:lit:v2")));

    api.revert_to_version("a", &label, None).unwrap();
    let imr = api.get("a").unwrap().unwrap();
    assert!(imr.iter().any(|t| matches!(&t.object, Term::NamedNode(n) if n.as_str() == "urn:lit:v1")));

    let version = api.get_version("a", &label).unwrap();
    assert!(version.iter().any(|t| matches!(&t.object, Term::NamedNode(n) if n.as_str() == "urn:lit:v1")));
}

#[test]
fn referential_integrity_strict_rejects_a_dangling_reference_at_write_time() {
    let dir = tempfile::tempdir().unwrap();
    let api = api(dir.path());

    let err = api
        .create_or_replace(
            "a",
            rdf(vec![("urn:fcres:a", "http://example.org/references", "urn:fcres:missing")]),
            None,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::Model(ModelError::RefIntViolation(_))));
}

#[test]
fn integrity_check_is_empty_for_a_consistent_store_with_auto_created_ancestors() {
    let dir = tempfile::tempdir().unwrap();
    let api = api(dir.path());

    // "a/b/c" auto-creates pairtree containers for "a" and "a/b" before
    // linking "a/b/c" under them, so every fcrepo:hasParent reference
    // this produces resolves.
    api.create_or_replace("a/b/c", rdf(vec![]), None, None).unwrap();

    assert!(api.integrity_check().unwrap().is_empty());
}
