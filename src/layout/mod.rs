//! Resource-centric graph cluster.
//!
//! Every resource UID maps to four named graphs:
//!
//! - **admin** — server-managed triples (`fcrepo:created`, digests, …).
//! - **user** — the client-provided triples for the resource itself; its
//!   context is the resource's own URI (`urn:fcres:<uid>`), so a plain
//!   `GRAPH <urn:fcres:uid> { ... }` query sees exactly what the client
//!   last wrote.
//! - **struct** — containment (`ldp:contains`) and membership triples.
//! - **hist** — version snapshots.
//!
//! [`route_for_predicate`] decides which of the four a given triple
//! belongs to; [`compose_imr`] merges admin+user+struct (never hist) into
//! a resource's in-memory representation (IMR).

pub mod srv_mgd;

use thiserror::Error;

use crate::dict::{DictError, Term, TermDictionary};
use crate::kv::{KvError, Txn};
use crate::quadstore::{self, Pattern, Quad, QuadStoreError};

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error(transparent)]
    Kv(#[from] KvError),
    #[error(transparent)]
    Dict(#[from] DictError),
    #[error(transparent)]
    QuadStore(#[from] QuadStoreError),
}

/// Which of a resource's four named graphs a triple belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphRoute {
    Admin,
    User,
    Struct,
    Hist,
}

/// The internal URI identifying the resource itself: `urn:fcres:<uid>`.
///
/// This is the scheme decided in the open-question log (SPEC_FULL.md §9.a).
pub fn resource_uri(uid: &str) -> String {
    format!("urn:fcres:{uid}")
}

pub fn admin_graph_uri(uid: &str) -> String {
    format!("urn:fcres:{uid}#fcr:admin")
}

pub fn user_graph_uri(uid: &str) -> String {
    resource_uri(uid)
}

pub fn struct_graph_uri(uid: &str) -> String {
    format!("urn:fcres:{uid}#fcr:struct")
}

pub fn hist_graph_uri(uid: &str, version_label: Option<&str>) -> String {
    match version_label {
        Some(label) => format!("urn:fcres:{uid}#fcr:hist/{label}"),
        None => format!("urn:fcres:{uid}#fcr:hist"),
    }
}

/// Recovers `uid` from a `urn:fcres:<uid>` resource URI, ignoring any
/// `#fcr:...` fragment (admin/struct/hist graph URIs, or `<>`'s
/// fragment-of-self forms resolve to the same UID as the bare resource).
pub fn uid_from_resource_uri(uri: &str) -> Option<&str> {
    let rest = uri.strip_prefix("urn:fcres:")?;
    Some(rest.split('#').next().unwrap_or(rest))
}

/// Decides which named graph a client- or server-provided triple with
/// `predicate` belongs to.
pub fn route_for_predicate(predicate: &str) -> GraphRoute {
    if predicate == srv_mgd::LDP_CONTAINS {
        GraphRoute::Struct
    } else if srv_mgd::is_server_managed_predicate(predicate) {
        GraphRoute::Admin
    } else {
        GraphRoute::User
    }
}

/// A resolved triple in a resource's in-memory representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImrTriple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

/// Every triple stored in the single named graph `graph_uri`.
pub fn graph_triples(
    txn: &Txn<'_>,
    dict: &TermDictionary,
    graph_uri: &str,
) -> Result<Vec<ImrTriple>, LayoutError> {
    let graph_term = Term::iri(graph_uri.to_string()).expect("well-formed IRI");
    let Some(c) = dict.resolve_key(txn, &graph_term)? else {
        return Ok(Vec::new());
    };
    let quads = quadstore::match_pattern(
        txn,
        Pattern {
            c: Some(c),
            ..Default::default()
        },
    )?;
    quads.into_iter().map(|q| resolve_triple(txn, dict, q)).collect()
}

/// Composes a resource's in-memory representation: every triple in its
/// admin, user, and struct graphs (never hist — versions are retrieved
/// explicitly).
pub fn compose_imr(
    txn: &Txn<'_>,
    dict: &TermDictionary,
    uid: &str,
) -> Result<Vec<ImrTriple>, LayoutError> {
    let mut out = Vec::new();
    for graph_uri in [
        admin_graph_uri(uid),
        user_graph_uri(uid),
        struct_graph_uri(uid),
    ] {
        out.extend(graph_triples(txn, dict, &graph_uri)?);
    }
    Ok(out)
}

fn resolve_triple(txn: &Txn<'_>, dict: &TermDictionary, q: Quad) -> Result<ImrTriple, LayoutError> {
    let subject = dict.resolve_term(txn, q.s)?.ok_or(DictError::UnknownKey)?;
    let predicate = dict.resolve_term(txn, q.p)?.ok_or(DictError::UnknownKey)?;
    let object = dict.resolve_term(txn, q.o)?.ok_or(DictError::UnknownKey)?;
    Ok(ImrTriple { subject, predicate, object })
}

/// Lists every descendant of `uid` reachable via `ldp:contains` in the
/// struct graph, depth-first, `uid` itself excluded.
pub fn list_descendants(
    txn: &Txn<'_>,
    dict: &TermDictionary,
    uid: &str,
) -> Result<Vec<String>, LayoutError> {
    let mut out = Vec::new();
    let mut stack = vec![uid.to_string()];
    let mut seen = std::collections::HashSet::new();

    while let Some(current) = stack.pop() {
        let struct_graph = Term::iri(struct_graph_uri(&current)).expect("well-formed IRI");
        let Some(c) = dict.resolve_key(txn, &struct_graph)? else {
            continue;
        };
        let subject = Term::iri(resource_uri(&current)).expect("well-formed IRI");
        let Some(s) = dict.resolve_key(txn, &subject)? else {
            continue;
        };
        let contains = Term::iri(srv_mgd::LDP_CONTAINS).expect("well-formed IRI");
        let Some(p) = dict.resolve_key(txn, &contains)? else {
            continue;
        };

        let quads = quadstore::match_pattern(
            txn,
            Pattern {
                s: Some(s),
                p: Some(p),
                c: Some(c),
                ..Default::default()
            },
        )?;

        for q in quads {
            let Some(Term::NamedNode(child_uri)) = dict.resolve_term(txn, q.o)? else {
                continue;
            };
            if let Some(child_uid) = uid_from_resource_uri(child_uri.as_str()) {
                if seen.insert(child_uid.to_string()) {
                    out.push(child_uid.to_string());
                    stack.push(child_uid.to_string());
                }
            }
        }
    }

    Ok(out)
}

/// A quad referencing an in-repo resource uid that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    pub from_uid: String,
    pub predicate: String,
    pub missing_uid: String,
}

/// Predicates excluded from the scan: their object is a versions/fixity
/// endpoint URI (`#fcr:hist`-qualified), not a reference to a separately
/// tracked resource.
const VERSIONS_ENDPOINT_PREDICATES: &[&str] = &[srv_mgd::FCREPO_HAS_VERSION, srv_mgd::FCREPO_HAS_VERSIONS];

/// Scans every quad in the store whose object is a `urn:fcres:...` IRI and
/// reports those whose referenced uid does not satisfy `exists` — a
/// dangling `fcrepo:hasParent` pointer, a stale `ldp:contains` edge left
/// behind by an out-of-band deletion, or any other cross-resource
/// reference. Versions/fixity endpoint predicates are skipped: their
/// object addresses a hist-graph snapshot, not a resource in its own
/// right.
pub fn referential_integrity_scan(
    txn: &Txn<'_>,
    dict: &TermDictionary,
    exists: impl Fn(&str) -> bool,
) -> Result<Vec<DanglingReference>, LayoutError> {
    let quads = quadstore::match_pattern(txn, Pattern::default())?;

    let mut out = Vec::new();
    for q in quads {
        let (Some(Term::NamedNode(predicate_uri)), Some(Term::NamedNode(object_uri))) =
            (dict.resolve_term(txn, q.p)?, dict.resolve_term(txn, q.o)?)
        else {
            continue;
        };
        if VERSIONS_ENDPOINT_PREDICATES.contains(&predicate_uri.as_str()) {
            continue;
        }
        let Some(missing_uid) = uid_from_resource_uri(object_uri.as_str()) else {
            continue;
        };
        if object_uri.as_str().contains("#fcr:hist") {
            continue;
        }
        if exists(missing_uid) {
            continue;
        }
        let Some(Term::NamedNode(subject_uri)) = dict.resolve_term(txn, q.s)? else {
            continue;
        };
        let Some(from_uid) = uid_from_resource_uri(subject_uri.as_str()) else {
            continue;
        };
        out.push(DanglingReference {
            from_uid: from_uid.to_string(),
            predicate: predicate_uri.as_str().to_string(),
            missing_uid: missing_uid.to_string(),
        });
    }
    Ok(out)
}
