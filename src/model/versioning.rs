//! Version snapshots.
//!
//! A version is a frozen copy of a resource's live admin+user triples,
//! subject-rewritten to a version URI and stored in the resource's hist
//! graph. `fcrepo:hasVersion`/`fcrepo:hasVersions` pointers on the live
//! resource record which labels exist and in what order.

use time::OffsetDateTime;

use crate::config::ServerManagedHandling;
use crate::dict::{Term, TermDictionary};
use crate::digest::DigestAlgo;
use crate::layout::{self, srv_mgd, ImrTriple};
use crate::txn::{ChangeEvent, EventType, RepoTxn};

use super::{
    add_admin_triple, clear_admin_predicates, filter_server_managed, now_literal, put_triple,
    remove_triple, resource_exists, term_iri, ModelError,
};

/// Predicates not carried into a version snapshot: version bookkeeping
/// itself, and bookkeeping that only makes sense for the live resource.
const NON_VERSIONED_PREDICATES: &[&str] = &[
    srv_mgd::FCREPO_HAS_VERSION,
    srv_mgd::FCREPO_HAS_VERSIONS,
    srv_mgd::FCREPO_LAST_MODIFIED,
    srv_mgd::FCREPO_LAST_MODIFIED_BY,
];

/// Snapshots `uid`'s current admin+user+struct graph into a new version
/// labeled `label` (or an RFC3339 timestamp if `None`), returning the
/// label used.
pub fn create_version(
    txn: &mut RepoTxn<'_>,
    dict: &TermDictionary,
    _digest_algo: DigestAlgo,
    uid: &str,
    label: Option<&str>,
    actor: Option<String>,
) -> Result<String, ModelError> {
    if !resource_exists(txn.inner(), dict, uid)? {
        return Err(ModelError::NotExists(uid.to_string()));
    }
    let now = txn.now();
    let label = label
        .map(str::to_string)
        .unwrap_or_else(|| now.unix_timestamp().to_string());

    let version_uri = layout::hist_graph_uri(uid, Some(&label));
    let hist_graph = layout::hist_graph_uri(uid, None);
    let resource_subject = layout::resource_uri(uid);
    let version_subject = format!("{version_uri}#subject");

    let live = layout::compose_imr(txn.inner(), dict, uid)?;
    for t in &live {
        let predicate_iri = term_iri(&t.predicate).unwrap_or_default();
        if NON_VERSIONED_PREDICATES.contains(&predicate_iri) {
            continue;
        }
        let rewritten = ImrTriple {
            subject: rewrite_subject(&t.subject, &resource_subject, &version_subject),
            predicate: t.predicate.clone(),
            object: rewrite_subject(&t.object, &resource_subject, &version_subject),
        };
        put_triple(txn.inner_mut(), dict, &hist_graph, &rewritten)?;
    }

    add_admin_triple(
        txn.inner_mut(),
        dict,
        uid,
        srv_mgd::FCREPO_HAS_VERSION,
        Term::iri(version_uri.clone()).expect("well-formed IRI"),
    )?;
    add_admin_triple(
        txn.inner_mut(),
        dict,
        uid,
        srv_mgd::FCREPO_HAS_VERSIONS,
        Term::Literal(oxrdf::Literal::new_simple_literal(label.clone())),
    )?;

    txn.record_event(ChangeEvent {
        event_type: EventType::VersionCreated,
        uid: uid.to_string(),
        timestamp: now,
        resource_types: Vec::new(),
        actor,
    });
    Ok(label)
}

fn rewrite_subject(term: &Term, from: &str, to: &str) -> Term {
    match term {
        Term::NamedNode(n) if n.as_str() == from => {
            Term::iri(to.to_string()).expect("well-formed IRI")
        }
        other => other.clone(),
    }
}

/// Restores `uid`'s live non-server-managed triples from the version
/// labeled `label`.
pub fn revert_to_version(
    txn: &mut RepoTxn<'_>,
    dict: &TermDictionary,
    uid: &str,
    label: &str,
    actor: Option<String>,
) -> Result<(), ModelError> {
    if !resource_exists(txn.inner(), dict, uid)? {
        return Err(ModelError::NotExists(uid.to_string()));
    }
    let now = txn.now();
    let version_uri = layout::hist_graph_uri(uid, Some(label));
    let hist_graph = layout::hist_graph_uri(uid, None);
    let resource_subject = layout::resource_uri(uid);
    let version_subject = format!("{version_uri}#subject");

    let Some(hist_graph_key) = dict.resolve_key(
        txn.inner(),
        &Term::iri(hist_graph.clone()).expect("well-formed IRI"),
    )?
    else {
        return Err(ModelError::NotExists(format!("{uid}@{label}")));
    };
    let _ = hist_graph_key;

    let snapshot = layout::compose_imr(txn.inner(), dict, uid)?;
    for t in &snapshot {
        remove_triple(txn.inner_mut(), dict, &layout::user_graph_uri(uid), t)?;
    }

    let version_triples = version_triples(txn, dict, &hist_graph, &version_subject)?;
    let restored: Vec<ImrTriple> = version_triples
        .iter()
        .map(|t| ImrTriple {
            subject: rewrite_subject(&t.subject, &version_subject, &resource_subject),
            predicate: t.predicate.clone(),
            object: rewrite_subject(&t.object, &version_subject, &resource_subject),
        })
        .collect();
    // The snapshot also carries the admin-graph triples it was taken
    // with (types, fcrepo:created, fcrepo:hasParent, fixity...); revert
    // only ever restores the live resource's user graph, so strip those
    // back out rather than inject them as ordinary user-graph triples.
    let restored = filter_server_managed(restored, false, ServerManagedHandling::Lenient)?;
    for t in &restored {
        put_triple(txn.inner_mut(), dict, &layout::user_graph_uri(uid), t)?;
    }

    clear_admin_predicates(
        txn.inner_mut(),
        dict,
        uid,
        &[srv_mgd::FCREPO_LAST_MODIFIED, srv_mgd::FCREPO_LAST_MODIFIED_BY],
    )?;
    add_admin_triple(txn.inner_mut(), dict, uid, srv_mgd::FCREPO_LAST_MODIFIED, now_literal(now))?;

    txn.record_event(ChangeEvent {
        event_type: EventType::VersionReverted,
        uid: uid.to_string(),
        timestamp: now,
        resource_types: Vec::new(),
        actor,
    });
    Ok(())
}

/// Reads back the version labeled `label` for `uid`, with its subject
/// rewritten from the internal version URI to the resource's own URI so
/// callers see the same shape they would from [`layout::compose_imr`].
pub fn get_version(
    txn: &RepoTxn<'_>,
    dict: &TermDictionary,
    uid: &str,
    label: &str,
) -> Result<Vec<ImrTriple>, ModelError> {
    let version_uri = layout::hist_graph_uri(uid, Some(label));
    let hist_graph = layout::hist_graph_uri(uid, None);
    let resource_subject = layout::resource_uri(uid);
    let version_subject = format!("{version_uri}#subject");

    let triples = version_triples(txn, dict, &hist_graph, &version_subject)?;
    Ok(triples
        .into_iter()
        .map(|t| ImrTriple {
            subject: rewrite_subject(&t.subject, &version_subject, &resource_subject),
            predicate: t.predicate,
            object: rewrite_subject(&t.object, &version_subject, &resource_subject),
        })
        .collect())
}

fn version_triples(
    txn: &RepoTxn<'_>,
    dict: &TermDictionary,
    hist_graph: &str,
    version_subject: &str,
) -> Result<Vec<ImrTriple>, ModelError> {
    let Some(c) = dict.resolve_key(txn.inner(), &Term::iri(hist_graph.to_string()).expect("well-formed IRI"))?
    else {
        return Ok(Vec::new());
    };
    let quads = crate::quadstore::match_pattern(
        txn.inner(),
        crate::quadstore::Pattern {
            c: Some(c),
            ..Default::default()
        },
    )?;
    let mut out = Vec::new();
    for q in quads {
        let subject = dict.resolve_term(txn.inner(), q.s)?;
        let predicate = dict.resolve_term(txn.inner(), q.p)?;
        let object = dict.resolve_term(txn.inner(), q.o)?;
        if let (Some(subject), Some(predicate), Some(object)) = (subject, predicate, object) {
            if term_iri(&subject) == Some(version_subject) {
                out.push(ImrTriple { subject, predicate, object });
            }
        }
    }
    Ok(out)
}
