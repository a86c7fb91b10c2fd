//! Eight-index quad store.
//!
//! A quad `(s, p, o, c)` is stored redundantly across ordered physical
//! sub-databases so that any bound/unbound combination of terms can be
//! resolved with a single ordered range scan instead of a full scan +
//! filter:
//!
//! | Logical index | Physical dbi | Key order | Resolves |
//! |----------------|--------------|-----------|----------|
//! | `spo:c`         | `idx_spo_c`  | s,p,o,c   | contexts containing a given triple |
//! | `c:spo`         | `idx_c_spo`  | c,s,p,o   | all triples in a given graph |
//! | `s:po`, `sp:o`  | `idx_spo`    | s,p,o     | triples (any graph) with bound s, or bound s+p |
//! | `p:so`          | `idx_pso`    | p,s,o     | triples with bound p |
//! | `po:s`          | `idx_pos`    | p,o,s     | triples with bound p+o |
//! | `o:sp`          | `idx_osp`    | o,s,p     | triples with bound o |
//! | `so:p`          | `idx_sop`    | s,o,p     | triples with bound s+o |
//!
//! `s:po` and `sp:o` share one physical ordering: a query with only `s`
//! bound and one with `s` and `p` bound both resolve against `idx_spo`,
//! simply with a longer scan prefix in the latter case — keeping a second,
//! byte-identical copy of that ordering would buy nothing. The five
//! triple-level dbis (`idx_spo`, `idx_pso`, `idx_pos`, `idx_osp`,
//! `idx_sop`) ignore graph membership: they answer "does this triple
//! exist in *some* graph" and are reference-counted so a triple shared by
//! two graphs survives removal from one of them.

use thiserror::Error;
use tracing::trace;

use crate::dict::TermKey;
use crate::encoding::{decode_from_slice, encode_to_vec, EncodingError};
use crate::kv::{KvError, Txn};

pub const DBI_SPO_C: &str = "idx_spo_c";
pub const DBI_C_SPO: &str = "idx_c_spo";
pub const DBI_SPO: &str = "idx_spo";
pub const DBI_PSO: &str = "idx_pso";
pub const DBI_POS: &str = "idx_pos";
pub const DBI_OSP: &str = "idx_osp";
pub const DBI_SOP: &str = "idx_sop";

pub const DBI_NAMES: [&str; 7] = [
    DBI_SPO_C, DBI_C_SPO, DBI_SPO, DBI_PSO, DBI_POS, DBI_OSP, DBI_SOP,
];

#[derive(Debug, Error)]
pub enum QuadStoreError {
    #[error(transparent)]
    Kv(#[from] KvError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// A quad of term keys: subject, predicate, object, and context (named
/// graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quad {
    pub s: TermKey,
    pub p: TermKey,
    pub o: TermKey,
    pub c: TermKey,
}

impl Quad {
    pub fn new(s: TermKey, p: TermKey, o: TermKey, c: TermKey) -> Self {
        Self { s, p, o, c }
    }
}

/// Smallest byte string that is strictly greater than every string with
/// `prefix` as a prefix: increments the rightmost byte that isn't `0xff`
/// and truncates everything after it. If `prefix` is all `0xff` (never
/// happens for our fixed-width keys in practice), pads instead.
fn prefix_upper_bound(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last != 0xff {
            end.push(last + 1);
            return end;
        }
    }
    vec![0xff; prefix.len() + 8]
}

fn concat(keys: &[TermKey]) -> Vec<u8> {
    let mut out = Vec::with_capacity(keys.len() * 5);
    for k in keys {
        out.extend_from_slice(k.as_bytes());
    }
    out
}

/// A pattern with zero or more bound terms; `None` means unbound.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pattern {
    pub s: Option<TermKey>,
    pub p: Option<TermKey>,
    pub o: Option<TermKey>,
    pub c: Option<TermKey>,
}

/// Adds `quad` to the store. Idempotent: re-adding an already-present
/// quad is a no-op.
pub fn insert_quad(txn: &mut Txn<'_>, quad: Quad) -> Result<bool, QuadStoreError> {
    let spo_c_key = concat(&[quad.s, quad.p, quad.o, quad.c]);
    if txn.get(DBI_SPO_C, &spo_c_key)?.is_some() {
        return Ok(false);
    }

    txn.put(DBI_SPO_C, spo_c_key, Vec::new())?;
    txn.put(DBI_C_SPO, concat(&[quad.c, quad.s, quad.p, quad.o]), Vec::new())?;

    bump_triple_index(txn, DBI_SPO, &[quad.s, quad.p, quad.o], 1)?;
    bump_triple_index(txn, DBI_PSO, &[quad.p, quad.s, quad.o], 1)?;
    bump_triple_index(txn, DBI_POS, &[quad.p, quad.o, quad.s], 1)?;
    bump_triple_index(txn, DBI_OSP, &[quad.o, quad.s, quad.p], 1)?;
    bump_triple_index(txn, DBI_SOP, &[quad.s, quad.o, quad.p], 1)?;

    trace!("quad inserted");
    Ok(true)
}

/// Removes `quad` from the store. Returns `false` if it was not present.
pub fn remove_quad(txn: &mut Txn<'_>, quad: Quad) -> Result<bool, QuadStoreError> {
    let spo_c_key = concat(&[quad.s, quad.p, quad.o, quad.c]);
    if txn.get(DBI_SPO_C, &spo_c_key)?.is_none() {
        return Ok(false);
    }

    txn.delete(DBI_SPO_C, spo_c_key)?;
    txn.delete(DBI_C_SPO, concat(&[quad.c, quad.s, quad.p, quad.o]))?;

    bump_triple_index(txn, DBI_SPO, &[quad.s, quad.p, quad.o], -1)?;
    bump_triple_index(txn, DBI_PSO, &[quad.p, quad.s, quad.o], -1)?;
    bump_triple_index(txn, DBI_POS, &[quad.p, quad.o, quad.s], -1)?;
    bump_triple_index(txn, DBI_OSP, &[quad.o, quad.s, quad.p], -1)?;
    bump_triple_index(txn, DBI_SOP, &[quad.s, quad.o, quad.p], -1)?;

    trace!("quad removed");
    Ok(true)
}

fn bump_triple_index(
    txn: &mut Txn<'_>,
    dbi: &str,
    ordered: &[TermKey; 3],
    delta: i32,
) -> Result<(), QuadStoreError> {
    let key = concat(ordered);
    let current = match txn.get(dbi, &key)? {
        Some(bytes) => decode_from_slice::<u32>(&bytes)?.0,
        None => 0,
    };
    let next = (current as i64 + delta as i64).max(0) as u32;
    if next == 0 {
        txn.delete(dbi, key)?;
    } else {
        txn.put(dbi, key, encode_to_vec(&next)?)?;
    }
    Ok(())
}

/// Does `(s, p, o)` exist in *any* graph?
pub fn triple_exists(txn: &Txn<'_>, s: TermKey, p: TermKey, o: TermKey) -> Result<bool, QuadStoreError> {
    Ok(txn.get(DBI_SPO, &concat(&[s, p, o]))?.is_some())
}

/// Enumerates the contexts a given triple appears in.
pub fn contexts_of(
    txn: &Txn<'_>,
    s: TermKey,
    p: TermKey,
    o: TermKey,
) -> Result<Vec<TermKey>, QuadStoreError> {
    let prefix = concat(&[s, p, o]);
    let end = prefix_upper_bound(&prefix);
    let mut out = Vec::new();
    for (key, _) in txn.scan(DBI_SPO_C, &prefix, &end)? {
        if key.len() == 20 {
            let c = TermKey(key[15..20].try_into().expect("slice is exactly 5 bytes"));
            out.push(c);
        }
    }
    Ok(out)
}

/// Resolves a [`Pattern`] against the index best suited to its bound
/// terms, yielding matching [`Quad`]s.
///
/// Selection order favors the most-specific index available, and among
/// equally specific two-term patterns prefers binding order `s < o < p`
/// (the fixed static preference in place of runtime fan-out estimation).
pub fn match_pattern(txn: &Txn<'_>, pattern: Pattern) -> Result<Vec<Quad>, QuadStoreError> {
    if let (Some(s), Some(p), Some(o), Some(c)) = (pattern.s, pattern.p, pattern.o, pattern.c) {
        let key = concat(&[s, p, o, c]);
        return Ok(if txn.get(DBI_SPO_C, &key)?.is_some() {
            vec![Quad::new(s, p, o, c)]
        } else {
            vec![]
        });
    }

    if let Some(c) = pattern.c {
        return scan_context(txn, c, pattern);
    }

    match (pattern.s, pattern.p, pattern.o) {
        (Some(s), Some(p), Some(o)) => {
            let contexts = contexts_of(txn, s, p, o)?;
            Ok(contexts.into_iter().map(|c| Quad::new(s, p, o, c)).collect())
        }
        (Some(s), Some(p), None) => scan_spo_prefix(txn, &[s, p]),
        (Some(s), None, None) => scan_spo_prefix(txn, &[s]),
        (None, Some(p), Some(o)) => scan_pos_prefix(txn, p, o),
        (None, Some(p), None) => scan_pso_prefix(txn, p),
        (Some(s), None, Some(o)) => scan_sop_prefix(txn, s, o),
        (None, None, Some(o)) => scan_osp_prefix(txn, o),
        (None, None, None) => scan_all(txn),
    }
}

fn scan_sop_prefix(txn: &Txn<'_>, s: TermKey, o: TermKey) -> Result<Vec<Quad>, QuadStoreError> {
    let prefix = concat(&[s, o]);
    scan_triples_with_prefix(txn, DBI_SOP, &prefix, |bytes| {
        let s = TermKey(bytes[0..5].try_into().expect("5 bytes"));
        let o = TermKey(bytes[5..10].try_into().expect("5 bytes"));
        let p = TermKey(bytes[10..15].try_into().expect("5 bytes"));
        (s, p, o)
    })
}

fn scan_context(txn: &Txn<'_>, c: TermKey, pattern: Pattern) -> Result<Vec<Quad>, QuadStoreError> {
    let prefix = c.as_bytes().to_vec();
    let end = prefix_upper_bound(&prefix);
    let mut out = Vec::new();
    for (key, _) in txn.scan(DBI_C_SPO, &prefix, &end)? {
        if key.len() != 20 {
            continue;
        }
        let s = TermKey(key[5..10].try_into().expect("5 bytes"));
        let p = TermKey(key[10..15].try_into().expect("5 bytes"));
        let o = TermKey(key[15..20].try_into().expect("5 bytes"));
        if pattern.s.is_some_and(|b| b != s) {
            continue;
        }
        if pattern.p.is_some_and(|b| b != p) {
            continue;
        }
        if pattern.o.is_some_and(|b| b != o) {
            continue;
        }
        out.push(Quad::new(s, p, o, c));
    }
    Ok(out)
}

fn scan_spo_prefix(txn: &Txn<'_>, bound: &[TermKey]) -> Result<Vec<Quad>, QuadStoreError> {
    let prefix = concat(bound);
    scan_triples_with_prefix(txn, DBI_SPO, &prefix, |bytes| {
        let s = TermKey(bytes[0..5].try_into().expect("5 bytes"));
        let p = TermKey(bytes[5..10].try_into().expect("5 bytes"));
        let o = TermKey(bytes[10..15].try_into().expect("5 bytes"));
        (s, p, o)
    })
}

fn scan_pso_prefix(txn: &Txn<'_>, p: TermKey) -> Result<Vec<Quad>, QuadStoreError> {
    scan_triples_with_prefix(txn, DBI_PSO, p.as_bytes(), |bytes| {
        let p = TermKey(bytes[0..5].try_into().expect("5 bytes"));
        let s = TermKey(bytes[5..10].try_into().expect("5 bytes"));
        let o = TermKey(bytes[10..15].try_into().expect("5 bytes"));
        (s, p, o)
    })
}

fn scan_pos_prefix(txn: &Txn<'_>, p: TermKey, o: TermKey) -> Result<Vec<Quad>, QuadStoreError> {
    let prefix = concat(&[p, o]);
    scan_triples_with_prefix(txn, DBI_POS, &prefix, |bytes| {
        let p = TermKey(bytes[0..5].try_into().expect("5 bytes"));
        let o = TermKey(bytes[5..10].try_into().expect("5 bytes"));
        let s = TermKey(bytes[10..15].try_into().expect("5 bytes"));
        (s, p, o)
    })
}

fn scan_osp_prefix(txn: &Txn<'_>, o: TermKey) -> Result<Vec<Quad>, QuadStoreError> {
    scan_triples_with_prefix(txn, DBI_OSP, o.as_bytes(), |bytes| {
        let o = TermKey(bytes[0..5].try_into().expect("5 bytes"));
        let s = TermKey(bytes[5..10].try_into().expect("5 bytes"));
        let p = TermKey(bytes[10..15].try_into().expect("5 bytes"));
        (s, p, o)
    })
}

fn scan_triples_with_prefix(
    txn: &Txn<'_>,
    dbi: &str,
    prefix: &[u8],
    unpack: impl Fn(&[u8]) -> (TermKey, TermKey, TermKey),
) -> Result<Vec<Quad>, QuadStoreError> {
    let end = prefix_upper_bound(prefix);
    let mut out = Vec::new();
    for (key, _) in txn.scan(dbi, prefix, &end)? {
        if key.len() != 15 {
            continue;
        }
        let (s, p, o) = unpack(&key);
        for c in contexts_of(txn, s, p, o)? {
            out.push(Quad::new(s, p, o, c));
        }
    }
    Ok(out)
}

fn scan_all(txn: &Txn<'_>) -> Result<Vec<Quad>, QuadStoreError> {
    let mut out = Vec::new();
    for (key, _) in txn.scan(DBI_SPO_C, &[], &[0xff; 20])? {
        if key.len() != 20 {
            continue;
        }
        let s = TermKey(key[0..5].try_into().expect("5 bytes"));
        let p = TermKey(key[5..10].try_into().expect("5 bytes"));
        let o = TermKey(key[10..15].try_into().expect("5 bytes"));
        let c = TermKey(key[15..20].try_into().expect("5 bytes"));
        out.push(Quad::new(s, p, o, c));
    }
    Ok(out)
}
