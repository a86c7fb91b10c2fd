//! Term dictionary and key allocator.
//!
//! Bijects canonical RDF terms to fixed-length, monotonically allocated
//! keys so every other layer (the quad store's eight indices, the
//! resource-centric layout) can store and compare small fixed-width keys
//! instead of variable-length term text.
//!
//! Three sub-databases back the dictionary:
//!
//! - `th:t` — term hash → key, for lookup-by-value.
//! - `t:st` — key → canonical encoded term, for lookup-by-key.
//! - `dict:seq` — single counter entry, the next key to allocate.

pub mod namespaces;

use thiserror::Error;
use tracing::trace;

use crate::digest::DigestAlgo;
use crate::encoding::{decode_from_slice, encode_to_vec, Decode, Encode, EncodingError};
use crate::kv::{KvError, Txn};

/// Dbi name for the hash → key lookup table.
pub const DBI_HASH_TO_KEY: &str = "th_t";
/// Dbi name for the key → encoded term table.
pub const DBI_KEY_TO_TERM: &str = "t_st";
/// Dbi name for the term-key allocation counter.
pub const DBI_SEQUENCE: &str = "dict_seq";
/// Dbi name for the namespace prefix registry (see [`namespaces`]).
pub const DBI_NAMESPACES: &str = "pfx_ns";

/// All sub-database names the term dictionary needs opened in its
/// [`crate::kv::Environment`].
pub const DBI_NAMES: [&str; 4] = [
    DBI_HASH_TO_KEY,
    DBI_KEY_TO_TERM,
    DBI_SEQUENCE,
    DBI_NAMESPACES,
];

#[derive(Debug, Error)]
pub enum DictError {
    #[error(transparent)]
    Kv(#[from] KvError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("unknown term key")]
    UnknownKey,
}

/// A fixed-length, monotonically allocated term key.
///
/// Five bytes give roughly one trillion distinct terms before exhaustion,
/// matching the budget a single repository's term universe needs while
/// keeping every quad-store index key small.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TermKey(pub [u8; 5]);

impl TermKey {
    fn from_u64(n: u64) -> Self {
        let b = n.to_be_bytes();
        TermKey([b[3], b[4], b[5], b[6], b[7]])
    }

    fn to_u64(self) -> u64 {
        let b = self.0;
        u64::from_be_bytes([0, 0, 0, b[0], b[1], b[2], b[3], b[4]])
    }

    pub fn as_bytes(&self) -> &[u8; 5] {
        &self.0
    }
}

impl Encode for TermKey {
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.0.encode_to(buf)
    }
}

impl Decode for TermKey {
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        let (bytes, n) = <[u8; 5]>::decode_from(buf)?;
        Ok((TermKey(bytes), n))
    }
}

/// A canonical RDF term: an IRI, a blank node, or a literal.
///
/// Thin wrappers around `oxrdf`'s term types so the rest of the crate
/// works with a closed, three-way enum instead of `oxrdf::Term`'s RDF-star
/// variants, which this store does not support.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    NamedNode(oxrdf::NamedNode),
    BlankNode(oxrdf::BlankNode),
    Literal(oxrdf::Literal),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Result<Self, oxrdf::IriParseError> {
        Ok(Term::NamedNode(oxrdf::NamedNode::new(iri)?))
    }

    pub fn is_named_node(&self) -> bool {
        matches!(self, Term::NamedNode(_))
    }

    pub fn is_blank_node(&self) -> bool {
        matches!(self, Term::BlankNode(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::NamedNode(n) => write!(f, "{}", n),
            Term::BlankNode(b) => write!(f, "{}", b),
            Term::Literal(l) => write!(f, "{}", l),
        }
    }
}

impl From<oxrdf::NamedNode> for Term {
    fn from(n: oxrdf::NamedNode) -> Self {
        Term::NamedNode(n)
    }
}

impl From<oxrdf::BlankNode> for Term {
    fn from(b: oxrdf::BlankNode) -> Self {
        Term::BlankNode(b)
    }
}

impl From<oxrdf::Literal> for Term {
    fn from(l: oxrdf::Literal) -> Self {
        Term::Literal(l)
    }
}

const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

const TAG_NAMED_NODE: u32 = 0;
const TAG_BLANK_NODE: u32 = 1;
const TAG_LITERAL_SIMPLE: u32 = 2;
const TAG_LITERAL_LANG: u32 = 3;
const TAG_LITERAL_DATATYPE: u32 = 4;

impl Encode for Term {
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        match self {
            Term::NamedNode(n) => {
                TAG_NAMED_NODE.encode_to(buf)?;
                n.as_str().encode_to(buf)
            }
            Term::BlankNode(b) => {
                TAG_BLANK_NODE.encode_to(buf)?;
                b.as_str().encode_to(buf)
            }
            Term::Literal(l) => {
                if let Some(lang) = l.language() {
                    TAG_LITERAL_LANG.encode_to(buf)?;
                    l.value().encode_to(buf)?;
                    lang.encode_to(buf)
                } else if l.datatype().as_str() == XSD_STRING {
                    TAG_LITERAL_SIMPLE.encode_to(buf)?;
                    l.value().encode_to(buf)
                } else {
                    TAG_LITERAL_DATATYPE.encode_to(buf)?;
                    l.value().encode_to(buf)?;
                    l.datatype().as_str().encode_to(buf)
                }
            }
        }
    }
}

impl Decode for Term {
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        let (tag, mut offset) = u32::decode_from(buf)?;
        match tag {
            TAG_NAMED_NODE => {
                let (iri, n) = String::decode_from(&buf[offset..])?;
                offset += n;
                let node = oxrdf::NamedNode::new(iri).map_err(|e| {
                    EncodingError::Custom(format!("invalid named node IRI: {e}"))
                })?;
                Ok((Term::NamedNode(node), offset))
            }
            TAG_BLANK_NODE => {
                let (id, n) = String::decode_from(&buf[offset..])?;
                offset += n;
                let node = oxrdf::BlankNode::new(id)
                    .map_err(|e| EncodingError::Custom(format!("invalid blank node id: {e}")))?;
                Ok((Term::BlankNode(node), offset))
            }
            TAG_LITERAL_SIMPLE => {
                let (value, n) = String::decode_from(&buf[offset..])?;
                offset += n;
                Ok((Term::Literal(oxrdf::Literal::new_simple_literal(value)), offset))
            }
            TAG_LITERAL_LANG => {
                let (value, n) = String::decode_from(&buf[offset..])?;
                offset += n;
                let (lang, n) = String::decode_from(&buf[offset..])?;
                offset += n;
                let lit = oxrdf::Literal::new_language_tagged_literal(value, lang)
                    .map_err(|e| EncodingError::Custom(format!("invalid language tag: {e}")))?;
                Ok((Term::Literal(lit), offset))
            }
            TAG_LITERAL_DATATYPE => {
                let (value, n) = String::decode_from(&buf[offset..])?;
                offset += n;
                let (dt, n) = String::decode_from(&buf[offset..])?;
                offset += n;
                let dt = oxrdf::NamedNode::new(dt)
                    .map_err(|e| EncodingError::Custom(format!("invalid datatype IRI: {e}")))?;
                Ok((Term::Literal(oxrdf::Literal::new_typed_literal(value, dt)), offset))
            }
            other => Err(EncodingError::InvalidTag {
                tag: other,
                type_name: "Term",
            }),
        }
    }
}

/// Bijects [`Term`]s to [`TermKey`]s, backed by an environment's
/// `th_t`/`t_st`/`dict_seq` sub-databases.
pub struct TermDictionary {
    digest_algo: DigestAlgo,
}

impl TermDictionary {
    pub fn new(digest_algo: DigestAlgo) -> Self {
        Self { digest_algo }
    }

    fn hash_key(&self, term: &Term) -> Result<Vec<u8>, DictError> {
        Ok(self.digest_algo.digest(&encode_to_vec(term)?))
    }

    /// Looks up the key for `term` without allocating one if absent.
    pub fn resolve_key(&self, txn: &Txn<'_>, term: &Term) -> Result<Option<TermKey>, DictError> {
        let hash = self.hash_key(term)?;
        match txn.get(DBI_HASH_TO_KEY, &hash)? {
            Some(bytes) => Ok(Some(decode_from_slice::<TermKey>(&bytes)?.0)),
            None => Ok(None),
        }
    }

    /// Looks up the term stored under `key`.
    pub fn resolve_term(&self, txn: &Txn<'_>, key: TermKey) -> Result<Option<Term>, DictError> {
        match txn.get(DBI_KEY_TO_TERM, key.as_bytes())? {
            Some(bytes) => Ok(Some(decode_from_slice::<Term>(&bytes)?.0)),
            None => Ok(None),
        }
    }

    /// Returns the key for `term`, allocating and persisting a new one if
    /// this is the first time the term has been seen.
    pub fn get_or_insert(&self, txn: &mut Txn<'_>, term: &Term) -> Result<TermKey, DictError> {
        let hash = self.hash_key(term)?;
        if let Some(bytes) = txn.get(DBI_HASH_TO_KEY, &hash)? {
            return Ok(decode_from_slice::<TermKey>(&bytes)?.0);
        }

        let key = self.next_key(txn)?;
        let key_bytes = encode_to_vec(&key)?;
        let term_bytes = encode_to_vec(term)?;

        txn.put(DBI_HASH_TO_KEY, hash, key_bytes.clone())?;
        txn.put(DBI_KEY_TO_TERM, key.as_bytes().to_vec(), term_bytes)?;

        trace!(term = %term, "allocated new term key");
        Ok(key)
    }

    fn next_key(&self, txn: &mut Txn<'_>) -> Result<TermKey, DictError> {
        const SEQ_KEY: &[u8] = b"next";
        // Starts at 1, not 0: an all-zero TermKey is reserved (§3), so the
        // low byte of the first allocated key must never be 0x00.
        let current = match txn.get(DBI_SEQUENCE, SEQ_KEY)? {
            Some(bytes) => decode_from_slice::<u64>(&bytes)?.0,
            None => 1,
        };
        let next = current + 1;
        txn.put(DBI_SEQUENCE, SEQ_KEY.to_vec(), encode_to_vec(&next)?)?;
        Ok(TermKey::from_u64(current))
    }
}
