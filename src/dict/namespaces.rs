//! Namespace prefix registry, seeded with the core vocabulary set a fresh
//! repository needs before any resource is created.

use tracing::debug;

use crate::encoding::{decode_from_slice, encode_to_vec};
use crate::kv::{KvError, Txn};

use super::DBI_NAMESPACES;

/// `(prefix, namespace IRI)` pairs seeded into a fresh repository.
pub const CORE_NAMESPACES: &[(&str, &str)] = &[
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("ldp", "http://www.w3.org/ns/ldp#"),
    ("fcrepo", "http://fedora.info/definitions/v4/repository#"),
    ("fcsystem", "http://fedora.info/definitions/v4/system#"),
    ("premis", "http://www.loc.gov/premis/rdf/v1#"),
    ("ebucore", "http://www.ebu.ch/metadata/ontologies/ebucore/ebucore#"),
    ("dcterms", "http://purl.org/dc/terms/"),
    ("ore", "http://www.openarchives.org/ore/terms/"),
    ("iana", "http://www.iana.org/assignments/relation/"),
];

/// Inserts [`CORE_NAMESPACES`] into `dbi` if the prefix registry is
/// currently empty. Idempotent: safe to call on every [`crate::kv::Environment::open`].
pub fn seed(txn: &mut Txn<'_>) -> Result<(), KvError> {
    let existing = txn.scan(DBI_NAMESPACES, b"", &[0xff; 1])?.next();
    if existing.is_some() {
        return Ok(());
    }

    for (prefix, ns) in CORE_NAMESPACES {
        let key = encode_to_vec(&prefix.to_string()).expect("string encoding cannot fail");
        let value = encode_to_vec(&ns.to_string()).expect("string encoding cannot fail");
        txn.put(DBI_NAMESPACES, key, value)?;
    }
    debug!(count = CORE_NAMESPACES.len(), "seeded core namespace prefixes");
    Ok(())
}

/// Looks up the namespace IRI registered for `prefix`.
pub fn resolve(txn: &Txn<'_>, prefix: &str) -> Result<Option<String>, KvError> {
    let key = encode_to_vec(&prefix.to_string()).expect("string encoding cannot fail");
    match txn.get(DBI_NAMESPACES, &key)? {
        Some(bytes) => Ok(Some(
            decode_from_slice::<String>(&bytes)
                .expect("namespace value was written by this module")
                .0,
        )),
        None => Ok(None),
    }
}

/// Registers a new prefix ↦ namespace mapping (e.g. discovered from a
/// client-provided Turtle document's `@prefix` declarations).
pub fn register(txn: &mut Txn<'_>, prefix: &str, namespace: &str) -> Result<(), KvError> {
    let key = encode_to_vec(&prefix.to_string()).expect("string encoding cannot fail");
    let value = encode_to_vec(&namespace.to_string()).expect("string encoding cannot fail");
    txn.put(DBI_NAMESPACES, key, value)
}
