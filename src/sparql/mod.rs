//! SPARQL-Update delta evaluation.
//!
//! A SPARQL-Update string is run against a resource's own triples only:
//! its pre-image IMR is loaded into a fresh, ephemeral `oxigraph::store::Store`
//! (the evaluator this crate delegates parsing and execution to, never
//! query planning against the resident quad store directly), the update is
//! applied, and the post-image is diffed against the pre-image to produce
//! `(remove, add)` sets. Because the working store never holds any other
//! resource's triples, a variable binding that would reach outside this
//! resource's graph simply has nothing to match — the scope is enforced by
//! construction, not by a filter pass.

use oxigraph::model::{GraphName, Quad as OxQuad};
use oxigraph::sparql::{EvaluationError, Update};
use oxigraph::store::StorageError;
use thiserror::Error;
use tracing::instrument;

use crate::dict::Term;
use crate::layout::ImrTriple;

#[derive(Debug, Error)]
pub enum SparqlError {
    #[error("invalid SPARQL-Update: {0}")]
    Parse(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error("term not representable in this store: {0}")]
    UnsupportedTerm(String),
}

/// Rewrites `<>` to `<resource_uri>` and `<#frag>` to
/// `<resource_uri#frag>` everywhere they appear as bracketed IRI
/// references in `query`, leaving every other bracketed IRI untouched.
fn rewrite_relative_refs(query: &str, resource_uri: &str) -> String {
    let mut out = String::with_capacity(query.len());
    let mut rest = query;
    while let Some(idx) = rest.find('<') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        if let Some(after) = tail.strip_prefix("<>") {
            out.push('<');
            out.push_str(resource_uri);
            out.push('>');
            rest = after;
        } else if tail.starts_with("<#") {
            match tail.find('>') {
                Some(end) => {
                    let fragment = &tail[1..end];
                    out.push('<');
                    out.push_str(resource_uri);
                    out.push_str(fragment);
                    out.push('>');
                    rest = &tail[end + 1..];
                }
                None => {
                    out.push_str(tail);
                    rest = "";
                }
            }
        } else {
            out.push('<');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

fn to_oxrdf_term(term: &Term) -> oxrdf::Term {
    match term {
        Term::NamedNode(n) => oxrdf::Term::NamedNode(n.clone()),
        Term::BlankNode(b) => oxrdf::Term::BlankNode(b.clone()),
        Term::Literal(l) => oxrdf::Term::Literal(l.clone()),
    }
}

fn to_oxrdf_subject(term: &Term) -> Result<oxrdf::NamedOrBlankNode, SparqlError> {
    match term {
        Term::NamedNode(n) => Ok(oxrdf::NamedOrBlankNode::NamedNode(n.clone())),
        Term::BlankNode(b) => Ok(oxrdf::NamedOrBlankNode::BlankNode(b.clone())),
        Term::Literal(l) => Err(SparqlError::UnsupportedTerm(format!(
            "literal cannot appear as a subject: {l}"
        ))),
    }
}

fn from_oxrdf_term(term: oxrdf::Term) -> Result<Term, SparqlError> {
    match term {
        oxrdf::Term::NamedNode(n) => Ok(Term::NamedNode(n)),
        oxrdf::Term::BlankNode(b) => Ok(Term::BlankNode(b)),
        oxrdf::Term::Literal(l) => Ok(Term::Literal(l)),
        other => Err(SparqlError::UnsupportedTerm(format!("{other}"))),
    }
}

fn load_working_graph(triples: &[ImrTriple]) -> Result<oxigraph::store::Store, SparqlError> {
    let store = oxigraph::store::Store::new()?;
    for t in triples {
        let quad = OxQuad::new(
            to_oxrdf_subject(&t.subject)?,
            match &t.predicate {
                Term::NamedNode(n) => n.clone(),
                other => {
                    return Err(SparqlError::UnsupportedTerm(format!(
                        "non-IRI predicate: {other}"
                    )))
                }
            },
            to_oxrdf_term(&t.object),
            GraphName::DefaultGraph,
        );
        store.insert(&quad)?;
    }
    Ok(store)
}

fn read_working_graph(store: &oxigraph::store::Store) -> Result<Vec<ImrTriple>, SparqlError> {
    let mut out = Vec::new();
    for quad in store.iter() {
        let quad = quad?;
        out.push(ImrTriple {
            subject: from_oxrdf_term(quad.subject.into())?,
            predicate: Term::NamedNode(quad.predicate),
            object: from_oxrdf_term(quad.object)?,
        });
    }
    Ok(out)
}

/// Applies `update_str` (after relative-reference rewriting) to
/// `pre_image` and returns the `(remove, add)` delta against it.
#[instrument(skip(pre_image, update_str))]
pub fn sparql_delta(
    resource_uri: &str,
    pre_image: &[ImrTriple],
    update_str: &str,
) -> Result<(Vec<ImrTriple>, Vec<ImrTriple>), SparqlError> {
    let rewritten = rewrite_relative_refs(update_str, resource_uri);
    let store = load_working_graph(pre_image)?;

    let update = Update::parse(&rewritten, None).map_err(|e| SparqlError::Parse(e.to_string()))?;
    store.update(update)?;

    let post_image = read_working_graph(&store)?;

    let remove: Vec<ImrTriple> = pre_image
        .iter()
        .filter(|t| !post_image.contains(t))
        .cloned()
        .collect();
    let add: Vec<ImrTriple> = post_image
        .iter()
        .filter(|t| !pre_image.contains(t))
        .cloned()
        .collect();
    Ok((remove, add))
}
