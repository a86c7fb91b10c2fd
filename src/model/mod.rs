//! LDP resource model and factory.
//!
//! Dispatches a provided payload to one of the LDP variants, stamps the
//! server-managed triples onto it, computes containment and membership,
//! and drives the version/tombstone lifecycle. Built directly on
//! [`crate::layout`] and [`crate::quadstore`] rather than through a shared
//! base type — the six variants differ enough in their create/replace
//! behavior that a tagged enum plus free functions reads clearer than an
//! inheritance hierarchy.

pub mod canon;
pub mod versioning;

pub use crate::layout::srv_mgd;

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{instrument, warn};

use crate::config::{ReferentialIntegrityPolicy, RepoConfig, ServerManagedHandling};
use crate::dict::{DictError, Term, TermDictionary};
use crate::kv::Txn;
use crate::layout::{self, GraphRoute, ImrTriple, LayoutError};
use crate::quadstore::{self, Pattern, QuadStoreError};
use crate::txn::{ChangeEvent, EventType, RepoTxn};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Dict(#[from] DictError),
    #[error(transparent)]
    QuadStore(#[from] QuadStoreError),
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("resource {0} does not exist")]
    NotExists(String),
    #[error("resource {uid} was deleted at {deleted_at}")]
    Tombstone {
        uid: String,
        deleted_at: OffsetDateTime,
    },

    #[error("provided graph for {uid} has more than one subject: {subjects:?}")]
    SingleSubject { uid: String, subjects: Vec<String> },

    #[error("server-managed terms rejected: {terms:?} ({position})")]
    ServerManagedTerm {
        terms: Vec<String>,
        position: &'static str,
    },

    #[error("referential integrity violation: {0} does not exist")]
    RefIntViolation(String),
}

/// The six LDP resource variants this model dispatches over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    RdfSource,
    BasicContainer,
    DirectContainer,
    IndirectContainer,
    NonRdfSource,
    Pairtree,
    Version,
    Tombstone,
}

/// A client-supplied payload: either an RDF graph or binary content with
/// its declared MIME type.
#[derive(Debug, Clone)]
pub enum Payload {
    Rdf(Vec<ImrTriple>),
    Binary { bytes: Vec<u8>, mime_type: String },
}

/// Fixity/size metadata for a Non-RDF Source, computed by the caller via
/// [`crate::binary::BinaryStore::persist`] before invoking the model.
#[derive(Debug, Clone)]
pub struct NrInfo {
    pub digest_algo: crate::digest::DigestAlgo,
    pub digest_hex: String,
    pub size: u64,
    pub mime_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    Updated,
}

/// A remove-set entry for [`update_delta`]: `None` in any position matches
/// every triple at that position of the live IMR.
#[derive(Debug, Clone, Default)]
pub struct PatternTriple {
    pub subject: Option<Term>,
    pub predicate: Option<Term>,
    pub object: Option<Term>,
}

impl PatternTriple {
    fn matches(&self, t: &ImrTriple) -> bool {
        (self.subject.is_none() || self.subject.as_ref() == Some(&t.subject))
            && (self.predicate.is_none() || self.predicate.as_ref() == Some(&t.predicate))
            && (self.object.is_none() || self.object.as_ref() == Some(&t.object))
    }
}

fn term_iri(t: &Term) -> Option<&str> {
    match t {
        Term::NamedNode(n) => Some(n.as_str()),
        _ => None,
    }
}

fn base_types(variant: Variant) -> Vec<&'static str> {
    use Variant::*;
    match variant {
        RdfSource => vec![srv_mgd::LDP_RESOURCE, srv_mgd::LDP_RDF_SOURCE],
        BasicContainer => vec![
            srv_mgd::LDP_RESOURCE,
            srv_mgd::LDP_RDF_SOURCE,
            srv_mgd::LDP_CONTAINER,
            srv_mgd::LDP_BASIC_CONTAINER,
            srv_mgd::FCREPO_CONTAINER,
        ],
        DirectContainer | IndirectContainer => vec![
            srv_mgd::LDP_RESOURCE,
            srv_mgd::LDP_RDF_SOURCE,
            srv_mgd::LDP_CONTAINER,
            srv_mgd::FCREPO_CONTAINER,
        ],
        NonRdfSource => vec![
            srv_mgd::LDP_RESOURCE,
            srv_mgd::LDP_NON_RDF_SOURCE,
            srv_mgd::FCREPO_BINARY,
        ],
        Pairtree => vec![srv_mgd::LDP_RESOURCE, srv_mgd::FCSYSTEM_PAIRTREE],
        Version => vec![],
        Tombstone => vec![srv_mgd::FCSYSTEM_TOMBSTONE_TYPE],
    }
}

fn is_rdf_type(t: &ImrTriple, iri: &str) -> bool {
    term_iri(&t.predicate) == Some(srv_mgd::RDF_TYPE) && term_iri(&t.object) == Some(iri)
}

fn detect_variant(payload: &Payload) -> Variant {
    match payload {
        Payload::Binary { .. } => Variant::NonRdfSource,
        Payload::Rdf(triples) => {
            if triples
                .iter()
                .any(|t| is_rdf_type(t, srv_mgd::LDP_DIRECT_CONTAINER))
            {
                Variant::DirectContainer
            } else if triples
                .iter()
                .any(|t| is_rdf_type(t, srv_mgd::LDP_INDIRECT_CONTAINER))
            {
                Variant::IndirectContainer
            } else if triples
                .iter()
                .any(|t| is_rdf_type(t, srv_mgd::LDP_BASIC_CONTAINER))
            {
                Variant::BasicContainer
            } else {
                Variant::RdfSource
            }
        }
    }
}

/// `true` if `subject_uri` denotes the resource itself or one of its
/// hash-fragment identities (`urn:fcres:<uid>#frag`, from a `<#frag>`
/// relative reference in a SPARQL-Update).
fn is_own_subject(resource: &str, subject_uri: &str) -> bool {
    subject_uri == resource || subject_uri.strip_prefix(resource).is_some_and(|rest| rest.starts_with('#'))
}

fn enforce_single_subject(uid: &str, triples: &[ImrTriple]) -> Result<(), ModelError> {
    let resource = layout::resource_uri(uid);
    let mut others = std::collections::HashSet::new();
    for t in triples {
        let subject_key = match &t.subject {
            Term::NamedNode(n) => n.as_str().to_string(),
            Term::BlankNode(b) => format!("_:{}", b.as_str()),
            Term::Literal(_) => continue,
        };
        if !is_own_subject(&resource, &subject_key) {
            others.insert(subject_key);
        }
    }
    if others.len() > 1 {
        let mut subjects: Vec<String> = others.into_iter().collect();
        subjects.sort();
        return Err(ModelError::SingleSubject {
            uid: uid.to_string(),
            subjects,
        });
    }
    Ok(())
}

fn filter_server_managed(
    triples: Vec<ImrTriple>,
    on_create: bool,
    handling: ServerManagedHandling,
) -> Result<Vec<ImrTriple>, ModelError> {
    let mut offending = Vec::new();
    let mut kept = Vec::new();
    for t in triples {
        let pred = term_iri(&t.predicate).unwrap_or_default();
        let managed = srv_mgd::is_server_managed_predicate(pred)
            || (pred == srv_mgd::RDF_TYPE
                && term_iri(&t.object)
                    .map(|o| srv_mgd::is_server_managed_type(o, on_create))
                    .unwrap_or(false));
        if managed {
            offending.push(pred.to_string());
        } else {
            kept.push(t);
        }
    }
    if offending.is_empty() {
        return Ok(kept);
    }
    match handling {
        ServerManagedHandling::Strict => Err(ModelError::ServerManagedTerm {
            terms: offending,
            position: "object",
        }),
        ServerManagedHandling::Lenient => {
            warn!(count = offending.len(), "stripped server-managed triples");
            Ok(kept)
        }
    }
}

fn apply_referential_integrity(
    txn: &Txn<'_>,
    dict: &TermDictionary,
    uid: &str,
    triples: Vec<ImrTriple>,
    policy: ReferentialIntegrityPolicy,
) -> Result<Vec<ImrTriple>, ModelError> {
    if matches!(policy, ReferentialIntegrityPolicy::Off) {
        return Ok(triples);
    }
    let mut kept = Vec::with_capacity(triples.len());
    for t in triples {
        if let Some(obj_uri) = term_iri(&t.object) {
            if let Some(target_uid) = layout::uid_from_resource_uri(obj_uri) {
                if target_uid != uid && !resource_exists(txn, dict, target_uid)? {
                    match policy {
                        ReferentialIntegrityPolicy::Strict => {
                            return Err(ModelError::RefIntViolation(obj_uri.to_string()));
                        }
                        ReferentialIntegrityPolicy::Lenient => {
                            warn!(object = obj_uri, "dangling in-repo reference pruned");
                            continue;
                        }
                        ReferentialIntegrityPolicy::Off => unreachable!(),
                    }
                }
            }
        }
        kept.push(t);
    }
    Ok(kept)
}

/// `true` if `uid` denotes a live, non-tombstoned resource.
pub fn resource_exists(txn: &Txn<'_>, dict: &TermDictionary, uid: &str) -> Result<bool, ModelError> {
    triple_present(
        txn,
        dict,
        &layout::resource_uri(uid),
        srv_mgd::RDF_TYPE,
        srv_mgd::LDP_RESOURCE,
    )
}

/// `true` if `uid` denotes a buried tombstone.
pub fn is_tombstone(txn: &Txn<'_>, dict: &TermDictionary, uid: &str) -> Result<bool, ModelError> {
    triple_present(
        txn,
        dict,
        &layout::resource_uri(uid),
        srv_mgd::RDF_TYPE,
        srv_mgd::FCSYSTEM_TOMBSTONE_TYPE,
    )
}

/// Builds a [`ModelError::Tombstone`] for a buried `uid`, reading the
/// `fcsystem:buried` timestamp `bury_one` stamped on its admin graph.
pub fn tombstone_error(txn: &Txn<'_>, dict: &TermDictionary, uid: &str) -> Result<ModelError, ModelError> {
    let admin = layout::graph_triples(txn, dict, &layout::admin_graph_uri(uid))?;
    let deleted_at = admin
        .iter()
        .find_map(|t| match (&t.predicate, &t.object) {
            (Term::NamedNode(p), Term::Literal(lit)) if p.as_str() == srv_mgd::FCSYSTEM_BURIED => {
                OffsetDateTime::parse(lit.value(), &Rfc3339).ok()
            }
            _ => None,
        })
        .unwrap_or(OffsetDateTime::UNIX_EPOCH);
    Ok(ModelError::Tombstone {
        uid: uid.to_string(),
        deleted_at,
    })
}

fn triple_present(
    txn: &Txn<'_>,
    dict: &TermDictionary,
    subject_uri: &str,
    predicate_uri: &str,
    object_uri: &str,
) -> Result<bool, ModelError> {
    let Some(s) = dict.resolve_key(txn, &Term::iri(subject_uri.to_string()).expect("well-formed IRI"))? else {
        return Ok(false);
    };
    let Some(p) = dict.resolve_key(txn, &Term::iri(predicate_uri.to_string()).expect("well-formed IRI"))? else {
        return Ok(false);
    };
    let Some(o) = dict.resolve_key(txn, &Term::iri(object_uri.to_string()).expect("well-formed IRI"))? else {
        return Ok(false);
    };
    Ok(quadstore::triple_exists(txn, s, p, o)?)
}

fn put_triple(
    txn: &mut Txn<'_>,
    dict: &TermDictionary,
    graph_uri: &str,
    triple: &ImrTriple,
) -> Result<(), ModelError> {
    let c = dict.get_or_insert(txn, &Term::iri(graph_uri.to_string()).expect("well-formed IRI"))?;
    let s = dict.get_or_insert(txn, &triple.subject)?;
    let p = dict.get_or_insert(txn, &triple.predicate)?;
    let o = dict.get_or_insert(txn, &triple.object)?;
    quadstore::insert_quad(txn, quadstore::Quad::new(s, p, o, c))?;
    Ok(())
}

fn remove_triple(
    txn: &mut Txn<'_>,
    dict: &TermDictionary,
    graph_uri: &str,
    triple: &ImrTriple,
) -> Result<(), ModelError> {
    let Some(c) = dict.resolve_key(txn, &Term::iri(graph_uri.to_string()).expect("well-formed IRI"))? else {
        return Ok(());
    };
    let (Some(s), Some(p), Some(o)) = (
        dict.resolve_key(txn, &triple.subject)?,
        dict.resolve_key(txn, &triple.predicate)?,
        dict.resolve_key(txn, &triple.object)?,
    ) else {
        return Ok(());
    };
    quadstore::remove_quad(txn, quadstore::Quad::new(s, p, o, c))?;
    Ok(())
}

fn clear_graph(txn: &mut Txn<'_>, dict: &TermDictionary, graph_uri: &str) -> Result<(), ModelError> {
    let Some(c) = dict.resolve_key(txn, &Term::iri(graph_uri.to_string()).expect("well-formed IRI"))? else {
        return Ok(());
    };
    let quads = quadstore::match_pattern(
        txn,
        Pattern {
            c: Some(c),
            ..Default::default()
        },
    )?;
    for q in quads {
        quadstore::remove_quad(txn, q)?;
    }
    Ok(())
}

fn clear_admin_predicates(
    txn: &mut Txn<'_>,
    dict: &TermDictionary,
    uid: &str,
    predicates: &[&str],
) -> Result<(), ModelError> {
    let admin_graph = layout::admin_graph_uri(uid);
    let Some(c) = dict.resolve_key(txn, &Term::iri(admin_graph).expect("well-formed IRI"))? else {
        return Ok(());
    };
    let Some(s) = dict.resolve_key(txn, &Term::iri(layout::resource_uri(uid)).expect("well-formed IRI"))? else {
        return Ok(());
    };
    for pred in predicates {
        let Some(p) = dict.resolve_key(txn, &Term::iri((*pred).to_string()).expect("well-formed IRI"))? else {
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
            quadstore::remove_quad(txn, q)?;
        }
    }
    Ok(())
}

fn add_admin_triple(
    txn: &mut Txn<'_>,
    dict: &TermDictionary,
    uid: &str,
    predicate: &str,
    object: Term,
) -> Result<(), ModelError> {
    let triple = ImrTriple {
        subject: Term::iri(layout::resource_uri(uid)).expect("well-formed IRI"),
        predicate: Term::iri(predicate.to_string()).expect("well-formed IRI"),
        object,
    };
    put_triple(txn, dict, &layout::admin_graph_uri(uid), &triple)
}

fn now_literal(now: OffsetDateTime) -> Term {
    let text = now
        .format(&Rfc3339)
        .expect("OffsetDateTime always formats as RFC3339");
    Term::Literal(oxrdf::Literal::new_simple_literal(text))
}

fn touch_last_modified(
    txn: &mut Txn<'_>,
    dict: &TermDictionary,
    uid: &str,
    now: OffsetDateTime,
    actor: Option<&str>,
) -> Result<(), ModelError> {
    clear_admin_predicates(
        txn,
        dict,
        uid,
        &[srv_mgd::FCREPO_LAST_MODIFIED, srv_mgd::FCREPO_LAST_MODIFIED_BY],
    )?;
    add_admin_triple(txn, dict, uid, srv_mgd::FCREPO_LAST_MODIFIED, now_literal(now))?;
    if let Some(actor) = actor {
        add_admin_triple(
            txn,
            dict,
            uid,
            srv_mgd::FCREPO_LAST_MODIFIED_BY,
            Term::Literal(oxrdf::Literal::new_simple_literal(actor.to_string())),
        )?;
    }
    Ok(())
}

fn add_admin_triples(
    txn: &mut Txn<'_>,
    dict: &TermDictionary,
    uid: &str,
    variant: Variant,
    now: OffsetDateTime,
    actor: Option<&str>,
    nr_info: Option<&NrInfo>,
    exists: bool,
) -> Result<(), ModelError> {
    for type_iri in base_types(variant) {
        add_admin_triple(
            txn,
            dict,
            uid,
            srv_mgd::RDF_TYPE,
            Term::iri(type_iri.to_string()).expect("well-formed IRI"),
        )?;
    }

    if !exists {
        add_admin_triple(txn, dict, uid, srv_mgd::FCREPO_CREATED, now_literal(now))?;
        if let Some(actor) = actor {
            add_admin_triple(
                txn,
                dict,
                uid,
                srv_mgd::FCREPO_CREATED_BY,
                Term::Literal(oxrdf::Literal::new_simple_literal(actor.to_string())),
            )?;
        }
    } else {
        clear_admin_predicates(
            txn,
            dict,
            uid,
            &[
                srv_mgd::PREMIS_HAS_SIZE,
                srv_mgd::PREMIS_HAS_MESSAGE_DIGEST,
                srv_mgd::EBUCORE_HAS_MIME_TYPE,
            ],
        )?;
    }
    touch_last_modified(txn, dict, uid, now, actor)?;

    if let Some(info) = nr_info {
        add_admin_triple(
            txn,
            dict,
            uid,
            srv_mgd::PREMIS_HAS_SIZE,
            Term::Literal(oxrdf::Literal::new_typed_literal(
                info.size.to_string(),
                oxrdf::NamedNode::new("http://www.w3.org/2001/XMLSchema#nonNegativeInteger")
                    .expect("well-formed IRI"),
            )),
        )?;
        add_admin_triple(
            txn,
            dict,
            uid,
            srv_mgd::PREMIS_HAS_MESSAGE_DIGEST,
            Term::Literal(oxrdf::Literal::new_simple_literal(format!(
                "urn:{}:{}",
                info.digest_algo.label(),
                info.digest_hex
            ))),
        )?;
        add_admin_triple(
            txn,
            dict,
            uid,
            srv_mgd::EBUCORE_HAS_MIME_TYPE,
            Term::Literal(oxrdf::Literal::new_simple_literal(info.mime_type.clone())),
        )?;
    }
    Ok(())
}

fn parent_path(uid: &str) -> Option<&str> {
    match uid.rfind('/') {
        Some(idx) => Some(&uid[..idx]),
        None if uid.is_empty() => None,
        None => Some(""),
    }
}

fn link_parent_child(
    txn: &mut Txn<'_>,
    dict: &TermDictionary,
    parent_uid: &str,
    child_uid: &str,
) -> Result<(), ModelError> {
    let contains_triple = ImrTriple {
        subject: Term::iri(layout::resource_uri(parent_uid)).expect("well-formed IRI"),
        predicate: Term::iri(srv_mgd::LDP_CONTAINS).expect("well-formed IRI"),
        object: Term::iri(layout::resource_uri(child_uid)).expect("well-formed IRI"),
    };
    put_triple(txn, dict, &layout::struct_graph_uri(parent_uid), &contains_triple)?;
    add_admin_triple(
        txn,
        dict,
        child_uid,
        srv_mgd::FCREPO_HAS_PARENT,
        Term::iri(layout::resource_uri(parent_uid)).expect("well-formed IRI"),
    )
}

/// Walks up `uid`'s path to the nearest existing ancestor, auto-creating
/// pairtree containers for any missing intermediate segments, and links
/// `uid` under it. Returns `None` only for the repository root, which has
/// no parent.
fn compute_containment(
    txn: &mut Txn<'_>,
    dict: &TermDictionary,
    uid: &str,
) -> Result<Option<String>, ModelError> {
    let Some(mut candidate) = parent_path(uid).map(str::to_string) else {
        return Ok(None);
    };

    let mut missing = Vec::new();
    loop {
        if candidate.is_empty() || resource_exists(txn, dict, &candidate)? {
            break;
        }
        missing.push(candidate.clone());
        match parent_path(&candidate) {
            Some(p) => candidate = p.to_string(),
            None => break,
        }
    }

    for segment in missing.into_iter().rev() {
        add_admin_triple(
            txn,
            dict,
            &segment,
            srv_mgd::RDF_TYPE,
            Term::iri(srv_mgd::LDP_RESOURCE).expect("well-formed IRI"),
        )?;
        add_admin_triple(
            txn,
            dict,
            &segment,
            srv_mgd::RDF_TYPE,
            Term::iri(srv_mgd::FCSYSTEM_PAIRTREE).expect("well-formed IRI"),
        )?;
        if let Some(grandparent) = parent_path(&segment) {
            link_parent_child(txn, dict, grandparent, &segment)?;
        }
    }

    let parent_uid = parent_path(uid).unwrap_or("").to_string();
    link_parent_child(txn, dict, &parent_uid, uid)?;
    Ok(Some(parent_uid))
}

fn route_graph_uri(uid: &str, t: &ImrTriple) -> String {
    let pred = term_iri(&t.predicate).unwrap_or_default();
    match layout::route_for_predicate(pred) {
        GraphRoute::Admin => layout::admin_graph_uri(uid),
        GraphRoute::User => layout::user_graph_uri(uid),
        GraphRoute::Struct => layout::struct_graph_uri(uid),
        GraphRoute::Hist => layout::hist_graph_uri(uid, None),
    }
}

/// Adds the LDP membership triple to a Direct/Indirect Container ancestor
/// when `child_uid` is created or replaced under it.
fn apply_membership(
    txn: &mut Txn<'_>,
    dict: &TermDictionary,
    parent_uid: &str,
    child_uid: &str,
    provided: &[ImrTriple],
) -> Result<(), ModelError> {
    let parent_imr = layout::compose_imr(txn, dict, parent_uid)?;
    let is_direct = parent_imr
        .iter()
        .any(|t| is_rdf_type(t, srv_mgd::LDP_DIRECT_CONTAINER));
    let is_indirect = parent_imr
        .iter()
        .any(|t| is_rdf_type(t, srv_mgd::LDP_INDIRECT_CONTAINER));
    if !is_direct && !is_indirect {
        return Ok(());
    }

    let Some(has_member_relation) = parent_imr
        .iter()
        .find(|t| term_iri(&t.predicate) == Some(srv_mgd::LDP_HAS_MEMBER_RELATION))
        .and_then(|t| term_iri(&t.object).map(str::to_string))
    else {
        warn!(parent = parent_uid, "container missing ldp:hasMemberRelation, skipping membership");
        return Ok(());
    };

    let membership_resource = parent_imr
        .iter()
        .find(|t| term_iri(&t.predicate) == Some(srv_mgd::LDP_MEMBERSHIP_RESOURCE))
        .map(|t| t.object.clone())
        .unwrap_or_else(|| Term::iri(layout::resource_uri(parent_uid)).expect("well-formed IRI"));

    let Term::NamedNode(member_subject) = membership_resource else {
        warn!(parent = parent_uid, "membershipResource is not a named node, skipping membership");
        return Ok(());
    };
    let Some(member_uid) = layout::uid_from_resource_uri(member_subject.as_str()).map(str::to_string) else {
        return Ok(());
    };

    let object = if is_indirect {
        let inserted_content_relation = parent_imr
            .iter()
            .find(|t| term_iri(&t.predicate) == Some(srv_mgd::LDP_INSERTED_CONTENT_RELATION))
            .and_then(|t| term_iri(&t.object).map(str::to_string));
        match inserted_content_relation {
            Some(rel) => provided
                .iter()
                .find(|t| term_iri(&t.predicate) == Some(rel.as_str()))
                .map(|t| t.object.clone())
                .unwrap_or_else(|| Term::iri(layout::resource_uri(child_uid)).expect("well-formed IRI")),
            None => Term::iri(layout::resource_uri(child_uid)).expect("well-formed IRI"),
        }
    } else {
        Term::iri(layout::resource_uri(child_uid)).expect("well-formed IRI")
    };

    let membership_triple = ImrTriple {
        subject: Term::NamedNode(member_subject),
        predicate: Term::iri(has_member_relation).expect("well-formed IRI"),
        object,
    };
    put_triple(txn, dict, &layout::user_graph_uri(&member_uid), &membership_triple)
}

/// Runs the create/replace algorithm against `uid`: dispatches the
/// variant, stamps server-managed triples, checks referential integrity,
/// computes containment and membership, and records a changelog entry.
#[instrument(skip(txn, dict, config, payload, nr_info), fields(uid = %uid))]
pub fn create_or_replace(
    txn: &mut RepoTxn<'_>,
    dict: &TermDictionary,
    config: &RepoConfig,
    uid: &str,
    payload: Payload,
    actor: Option<String>,
    nr_info: Option<NrInfo>,
) -> Result<CreateOutcome, ModelError> {
    // Checked independently of `exists` below: `bury_one` clears the
    // `rdf:type ldp:Resource` triple `resource_exists` looks for, so a
    // buried uid would otherwise look identical to one that never existed.
    if is_tombstone(txn.inner(), dict, uid)? {
        return Err(tombstone_error(txn.inner(), dict, uid)?);
    }
    let exists = resource_exists(txn.inner(), dict, uid)?;

    let variant = detect_variant(&payload);
    let now = txn.now();

    if exists && config.auto_version {
        versioning::create_version(txn, dict, config.digest_algo, uid, None, actor.clone())?;
    }

    let provided = match payload {
        Payload::Rdf(triples) => {
            enforce_single_subject(uid, &triples)?;
            filter_server_managed(triples, !exists, config.server_managed_handling)?
        }
        Payload::Binary { .. } => Vec::new(),
    };
    let provided = apply_referential_integrity(txn.inner(), dict, uid, provided, config.referential_integrity)?;

    if exists {
        clear_graph(txn.inner_mut(), dict, &layout::user_graph_uri(uid))?;
    }
    for t in &provided {
        put_triple(txn.inner_mut(), dict, &layout::user_graph_uri(uid), t)?;
    }

    add_admin_triples(
        txn.inner_mut(),
        dict,
        uid,
        variant,
        now,
        actor.as_deref(),
        nr_info.as_ref(),
        exists,
    )?;

    if let Some(parent_uid) = compute_containment(txn.inner_mut(), dict, uid)? {
        apply_membership(txn.inner_mut(), dict, &parent_uid, uid, &provided)?;
    }

    let outcome = if exists {
        CreateOutcome::Updated
    } else {
        CreateOutcome::Created
    };
    txn.record_event(ChangeEvent {
        event_type: if exists { EventType::Updated } else { EventType::Created },
        uid: uid.to_string(),
        timestamp: now,
        resource_types: base_types(variant).iter().map(|s| s.to_string()).collect(),
        actor,
    });

    Ok(outcome)
}

/// Splits `raw_id`'s leading hex-ish characters into
/// `branch_length`-character path segments, `branches` levels deep,
/// before the full id — the same grouping [`crate::binary::BinaryStore`]
/// applies to digests, applied here to a server-minted UID so that
/// large auto-assigned collections don't land flat in one container.
fn pairtree_split_leaf(raw_id: &str, branch_length: usize, branches: usize) -> String {
    let compact: String = raw_id.chars().filter(|c| *c != '-').collect();
    let chars: Vec<char> = compact.chars().collect();
    let mut segments: Vec<String> = chars
        .chunks(branch_length.max(1))
        .take(branches)
        .map(|chunk| chunk.iter().collect())
        .collect();
    segments.push(raw_id.to_string());
    segments.join("/")
}

fn mint_leaf(config: &RepoConfig) -> String {
    let raw_id = uuid::Uuid::new_v4().to_string();
    if config.legacy_pairtree_split {
        pairtree_split_leaf(&raw_id, config.pairtree_branch_length, config.pairtree_branches)
    } else {
        raw_id
    }
}

/// Mints a new UID under `parent_uid` (the given slug, or a generated one
/// if none or already taken — split into pairtree-shaped path segments
/// first if `config.legacy_pairtree_split` is set) and creates it.
#[instrument(skip(txn, dict, config, payload, nr_info), fields(parent_uid = %parent_uid))]
pub fn create(
    txn: &mut RepoTxn<'_>,
    dict: &TermDictionary,
    config: &RepoConfig,
    parent_uid: &str,
    slug: Option<&str>,
    payload: Payload,
    actor: Option<String>,
    nr_info: Option<NrInfo>,
) -> Result<String, ModelError> {
    let mut leaf = slug.map(str::to_string).unwrap_or_else(|| mint_leaf(config));
    let mut uid = if parent_uid.is_empty() {
        leaf.clone()
    } else {
        format!("{parent_uid}/{leaf}")
    };
    while resource_exists(txn.inner(), dict, &uid)? {
        leaf = mint_leaf(config);
        uid = if parent_uid.is_empty() {
            leaf.clone()
        } else {
            format!("{parent_uid}/{leaf}")
        };
    }
    create_or_replace(txn, dict, config, &uid, payload, actor, nr_info)?;
    Ok(uid)
}

/// Applies a `(remove_patterns, add)` delta to `uid`'s live graph.
/// Wildcards (`None`) in a remove pattern expand against the live IMR
/// before being applied.
#[instrument(skip(txn, dict, config, remove_patterns, add), fields(uid = %uid))]
pub fn update_delta(
    txn: &mut RepoTxn<'_>,
    dict: &TermDictionary,
    config: &RepoConfig,
    uid: &str,
    remove_patterns: Vec<PatternTriple>,
    add: Vec<ImrTriple>,
) -> Result<(), ModelError> {
    if !resource_exists(txn.inner(), dict, uid)? {
        return Err(ModelError::NotExists(uid.to_string()));
    }
    let now = txn.now();
    if config.auto_version {
        versioning::create_version(txn, dict, config.digest_algo, uid, None, None)?;
    }

    let imr = layout::compose_imr(txn.inner(), dict, uid)?;
    let mut to_remove = Vec::new();
    for pattern in &remove_patterns {
        for t in &imr {
            if pattern.matches(t) {
                to_remove.push(t.clone());
            }
        }
    }
    let to_remove = filter_server_managed(to_remove, false, config.server_managed_handling)?;
    enforce_single_subject(uid, &add)?;
    let add = filter_server_managed(add, false, config.server_managed_handling)?;
    let add = apply_referential_integrity(txn.inner(), dict, uid, add, config.referential_integrity)?;

    for t in &to_remove {
        remove_triple(txn.inner_mut(), dict, &route_graph_uri(uid, t), t)?;
    }
    for t in &add {
        put_triple(txn.inner_mut(), dict, &route_graph_uri(uid, t), t)?;
    }

    touch_last_modified(txn.inner_mut(), dict, uid, now, None)?;

    txn.record_event(ChangeEvent {
        event_type: EventType::Updated,
        uid: uid.to_string(),
        timestamp: now,
        resource_types: Vec::new(),
        actor: None,
    });
    Ok(())
}

fn bury_one(
    txn: &mut Txn<'_>,
    dict: &TermDictionary,
    uid: &str,
    now: OffsetDateTime,
    tombstone_of: Option<&str>,
) -> Result<(), ModelError> {
    clear_graph(txn, dict, &layout::admin_graph_uri(uid))?;
    add_admin_triple(
        txn,
        dict,
        uid,
        srv_mgd::RDF_TYPE,
        Term::iri(srv_mgd::FCSYSTEM_TOMBSTONE_TYPE).expect("well-formed IRI"),
    )?;
    add_admin_triple(txn, dict, uid, srv_mgd::FCSYSTEM_BURIED, now_literal(now))?;
    if let Some(parent) = tombstone_of {
        add_admin_triple(
            txn,
            dict,
            uid,
            srv_mgd::FCSYSTEM_TOMBSTONE_PRED,
            Term::iri(layout::resource_uri(parent)).expect("well-formed IRI"),
        )?;
    }
    Ok(())
}

fn forget_one(txn: &mut Txn<'_>, dict: &TermDictionary, uid: &str) -> Result<(), ModelError> {
    for graph in [
        layout::admin_graph_uri(uid),
        layout::user_graph_uri(uid),
        layout::struct_graph_uri(uid),
    ] {
        clear_graph(txn, dict, &graph)?;
    }
    Ok(())
}

/// Deletes `uid`. Soft-deletes (`leave_tombstone`) recursively bury every
/// descendant with a pointer back to this resource's tombstone;
/// hard-deletes recursively forget them.
#[instrument(skip(txn, dict), fields(uid = %uid))]
pub fn delete(
    txn: &mut RepoTxn<'_>,
    dict: &TermDictionary,
    uid: &str,
    leave_tombstone: bool,
    actor: Option<String>,
) -> Result<(), ModelError> {
    if !resource_exists(txn.inner(), dict, uid)? {
        return Err(ModelError::NotExists(uid.to_string()));
    }
    let now = txn.now();
    let descendants = layout::list_descendants(txn.inner(), dict, uid)?;

    if leave_tombstone {
        bury_one(txn.inner_mut(), dict, uid, now, None)?;
        for d in &descendants {
            bury_one(txn.inner_mut(), dict, d, now, Some(uid))?;
        }
    } else {
        forget_one(txn.inner_mut(), dict, uid)?;
        for d in &descendants {
            forget_one(txn.inner_mut(), dict, d)?;
        }
    }

    txn.record_event(ChangeEvent {
        event_type: EventType::Deleted,
        uid: uid.to_string(),
        timestamp: now,
        resource_types: Vec::new(),
        actor,
    });
    Ok(())
}

fn resurrect_one(txn: &mut Txn<'_>, dict: &TermDictionary, uid: &str) -> Result<(), ModelError> {
    remove_triple(
        txn,
        dict,
        &layout::admin_graph_uri(uid),
        &ImrTriple {
            subject: Term::iri(layout::resource_uri(uid)).expect("well-formed IRI"),
            predicate: Term::iri(srv_mgd::RDF_TYPE).expect("well-formed IRI"),
            object: Term::iri(srv_mgd::FCSYSTEM_TOMBSTONE_TYPE).expect("well-formed IRI"),
        },
    )?;
    clear_admin_predicates(
        txn,
        dict,
        uid,
        &[srv_mgd::FCSYSTEM_BURIED, srv_mgd::FCSYSTEM_TOMBSTONE_PRED],
    )?;
    add_admin_triple(
        txn,
        dict,
        uid,
        srv_mgd::RDF_TYPE,
        Term::iri(srv_mgd::LDP_RESOURCE).expect("well-formed IRI"),
    )
}

/// Resurrects a buried `uid` and every descendant buried alongside it.
#[instrument(skip(txn, dict), fields(uid = %uid))]
pub fn resurrect(
    txn: &mut RepoTxn<'_>,
    dict: &TermDictionary,
    uid: &str,
    actor: Option<String>,
) -> Result<(), ModelError> {
    if !is_tombstone(txn.inner(), dict, uid)? {
        return Err(ModelError::NotExists(uid.to_string()));
    }
    let now = txn.now();
    let descendants = layout::list_descendants(txn.inner(), dict, uid)?;
    resurrect_one(txn.inner_mut(), dict, uid)?;
    for d in &descendants {
        resurrect_one(txn.inner_mut(), dict, d)?;
    }
    txn.record_event(ChangeEvent {
        event_type: EventType::Resurrected,
        uid: uid.to_string(),
        timestamp: now,
        resource_types: Vec::new(),
        actor,
    });
    Ok(())
}
