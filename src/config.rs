//! Repository configuration.
//!
//! A plain data contract mirroring the recognized configuration options:
//! nothing in this crate reads a file or an environment variable to
//! populate it. Callers (an HTTP server, a CLI, a test harness) build one
//! however they like and hand it to [`crate::api::ResourceApi::open`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::compaction::CompactionStrategyType;
use crate::digest::DigestAlgo;
use crate::engine::EngineConfig;

/// Policy applied when a provided graph references an in-repo resource
/// (via `fcrepo:hasParent` or a membership/containment triple) that does
/// not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferentialIntegrityPolicy {
    /// Reject the operation with `RepoError::RefIntViolation`.
    Strict,
    /// Log and silently prune the dangling triples.
    Lenient,
    /// Do not check.
    Off,
}

impl Default for ReferentialIntegrityPolicy {
    fn default() -> Self {
        ReferentialIntegrityPolicy::Strict
    }
}

/// Policy applied when a client-provided graph sets a server-managed
/// predicate or `rdf:type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerManagedHandling {
    /// Reject the operation with `RepoError::ServerManagedTerm`.
    Strict,
    /// Silently strip the offending triples.
    Lenient,
}

impl Default for ServerManagedHandling {
    fn default() -> Self {
        ServerManagedHandling::Strict
    }
}

/// Root configuration for an open repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Root directory for all persisted state (quad store dbis, term
    /// dictionary, binary store pairtree, manifests).
    pub data_dir: PathBuf,

    /// Digest algorithm used for term-key hashing and binary fixity.
    #[serde(default)]
    pub digest_algo: DigestAlgo,

    /// Maximum number of concurrently open read transactions before the
    /// reader registry recycles its oldest slots.
    #[serde(default = "default_max_readers")]
    pub max_readers: usize,

    /// Worker/background-thread budget handed to each underlying storage
    /// engine for flush and compaction work.
    #[serde(default = "default_thread_pool_size")]
    pub thread_pool_size: usize,

    /// Memtable size (bytes) before an engine freezes it and begins a
    /// flush to SSTable.
    #[serde(default = "default_write_buffer_size")]
    pub write_buffer_size: usize,

    /// Compaction strategy applied to every sub-database.
    #[serde(default)]
    pub compaction_strategy: CompactionStrategyType,

    /// Whether `create_or_replace` on an existing resource auto-creates a
    /// version snapshot of its pre-image before applying the replace.
    #[serde(default)]
    pub auto_version: bool,

    /// Whether RDF Source ETags are computed via graph canonicalization
    /// (blank-node-free resources only; see design notes on the
    /// canonicalization open question).
    #[serde(default = "default_true")]
    pub canonical_etags: bool,

    /// How a dangling in-repo reference in a provided graph is handled.
    #[serde(default)]
    pub referential_integrity: ReferentialIntegrityPolicy,

    /// How a client-provided server-managed triple is handled.
    #[serde(default)]
    pub server_managed_handling: ServerManagedHandling,

    /// Root directory for the content-addressed binary store.
    pub binary_store_path: PathBuf,

    /// Number of leading hex characters from a digest used per pairtree
    /// branch level.
    #[serde(default = "default_pairtree_branch_length")]
    pub pairtree_branch_length: usize,

    /// Number of pairtree branch levels derived from a digest before the
    /// full-digest-named leaf file.
    #[serde(default = "default_pairtree_branches")]
    pub pairtree_branches: usize,

    /// Whether a server-minted UID (no `slug` given to `create`) is split
    /// into `pairtree_branch_length`/`pairtree_branches`-shaped path
    /// segments before its full generated id, the way a legacy Fedora 3
    /// pairtree grouped auto-assigned ids for filesystem-friendly
    /// browsing. Off by default: a flat UUID leaf needs no splitting to
    /// stay usable in this store's own layout.
    #[serde(default)]
    pub legacy_pairtree_split: bool,
}

fn default_max_readers() -> usize {
    128
}

fn default_thread_pool_size() -> usize {
    2
}

fn default_write_buffer_size() -> usize {
    4 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

fn default_pairtree_branch_length() -> usize {
    2
}

fn default_pairtree_branches() -> usize {
    4
}

impl RepoConfig {
    /// A configuration suitable for tests: small buffers, one background
    /// thread, rooted at the given directory.
    pub fn testing(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let binary_store_path = data_dir.join("binaries");
        Self {
            data_dir,
            digest_algo: DigestAlgo::Sha1,
            max_readers: 8,
            thread_pool_size: 1,
            write_buffer_size: 4096,
            compaction_strategy: CompactionStrategyType::Stcs,
            auto_version: false,
            canonical_etags: true,
            referential_integrity: ReferentialIntegrityPolicy::Strict,
            server_managed_handling: ServerManagedHandling::Strict,
            binary_store_path,
            pairtree_branch_length: default_pairtree_branch_length(),
            pairtree_branches: default_pairtree_branches(),
            legacy_pairtree_split: false,
        }
    }

    /// Derives the [`EngineConfig`] shared by every sub-database.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            write_buffer_size: self.write_buffer_size,
            compaction_strategy: self.compaction_strategy,
            bucket_low: 0.5,
            bucket_high: 1.5,
            min_sstable_size: 50,
            min_threshold: 4,
            max_threshold: 32,
            tombstone_ratio_threshold: 0.3,
            tombstone_compaction_interval: 0,
            tombstone_bloom_fallback: true,
            tombstone_range_drop: true,
            thread_pool_size: self.thread_pool_size,
        }
    }
}
