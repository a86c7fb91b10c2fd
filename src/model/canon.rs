//! Graph canonicalization for RDF Source ETags.
//!
//! Resolves the open question of whether RS responses carry an ETag: they
//! do, computed by sorting a resource's IMR as N-Triples-shaped lines and
//! hashing the sorted stream block by block. Resources containing blank
//! nodes fall back to no ETag — canonicalizing a graph with blank nodes
//! requires isomorphism testing, out of scope here.

use crate::digest::{to_hex, DigestAlgo};
use crate::layout::ImrTriple;

/// Computes a deterministic hash of `triples`, or `None` if any triple
/// touches a blank node.
pub fn hash_graph(digest_algo: DigestAlgo, triples: &[ImrTriple]) -> Option<String> {
    if triples
        .iter()
        .any(|t| t.subject.is_blank_node() || t.object.is_blank_node())
    {
        return None;
    }

    let mut lines: Vec<String> = triples
        .iter()
        .map(|t| format!("{} {} {} .\n", t.subject, t.predicate, t.object))
        .collect();
    lines.sort();

    let mut hasher = digest_algo.hasher();
    for line in &lines {
        hasher.update(line.as_bytes());
    }
    Some(to_hex(&hasher.finalize()))
}
