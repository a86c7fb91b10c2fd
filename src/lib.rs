//! # A content-addressed, transactionally-consistent Linked Data Platform store
//!
//! An embeddable repository for RDF and binary resources, modeled on the
//! Fedora4/LDP resource hierarchy: containers, RDF sources, Non-RDF
//! sources, versions, and tombstones, addressed by opaque UIDs and backed
//! by a durable key-value engine built on a **Log-Structured Merge Tree
//! (LSM-tree)**.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      api::ResourceApi                        │
//! │   create / create_or_replace / update / delete / versions    │
//! └───────────────┬───────────────────────────────┬──────────────┘
//!                 │                               │
//! ┌───────────────▼──────────────┐   ┌────────────▼─────────────┐
//! │   model — LDP variant        │   │  sparql — SPARQL-Update   │
//! │   dispatch, containment,     │   │  evaluated against an     │
//! │   membership, tombstones     │   │  ephemeral resource copy  │
//! └───────────────┬──────────────┘   └────────────┬─────────────┘
//!                 │                               │
//! ┌───────────────▼───────────────────────────────▼─────────────┐
//! │   layout — four named graphs (admin/user/struct/hist) per    │
//! │   resource UID, routed by predicate                          │
//! └───────────────┬────────────────────────────────┬─────────────┘
//!                 │                                │
//! ┌───────────────▼──────────────┐   ┌─────────────▼─────────────┐
//! │   quadstore — eight-index    │   │  dict — term ↔ fixed-width │
//! │   quad store                 │   │  key bijection              │
//! └───────────────┬──────────────┘   └─────────────┬─────────────┘
//!                 │                                │
//! ┌───────────────▼────────────────────────────────▼─────────────┐
//! │   kv::Environment — one Engine (LSM-tree) per sub-database,   │
//! │   single writer, staged-buffer commit/abort                   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Binary content bypasses the quad store entirely: [`binary::BinaryStore`]
//! persists Non-RDF Source bytes in a content-addressed pairtree, and only
//! the resulting digest, size, and MIME type are stamped onto the
//! resource's admin graph.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`api`] | `ResourceApi`, the public facade wrapping every operation in a transaction |
//! | [`model`] | LDP resource variants, create/replace/delete/resurrect, versioning |
//! | [`sparql`] | SPARQL-Update delta evaluation scoped to one resource |
//! | [`layout`] | Resource-centric named graph cluster and server-managed predicate catalogue |
//! | [`quadstore`] | Eight-index quad store |
//! | [`dict`] | Term ↔ fixed-width key dictionary |
//! | [`binary`] | Content-addressed pairtree binary store |
//! | [`txn`] | Transaction and changelog facade |
//! | [`config`] | Repository configuration |
//! | [`engine`] | Underlying LSM-tree storage engine — open, read, write, scan, flush, compact |
//! | [`memtable`] | In-memory write buffer with multi-version entries and range tombstones |
//! | [`wal`] | Generic, CRC-protected write-ahead log for crash recovery |
//! | [`sstable`] | Immutable, sorted, on-disk tables with bloom filters and block indices |
//! | [`manifest`] | Persistent metadata manager (WAL + snapshot model) |
//! | [`compaction`] | Size-tiered, tombstone, and major compaction strategies |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ldpstore::api::ResourceApi;
//! use ldpstore::config::RepoConfig;
//! use ldpstore::model::Payload;
//!
//! let config = RepoConfig::testing("/tmp/my_repo");
//! let repo = ResourceApi::open(config).unwrap();
//!
//! let (uid, _events) = repo
//!     .create("", Some("hello"), Payload::Rdf(Vec::new()), None, None)
//!     .unwrap();
//! assert!(repo.exists(&uid).unwrap());
//! ```

#![allow(dead_code)]

pub mod compaction;
pub mod encoding;
pub mod engine;
pub mod manifest;
pub mod memtable;
pub mod sstable;
pub mod wal;

pub mod api;
pub mod binary;
pub mod config;
pub mod dict;
pub mod digest;
pub mod kv;
pub mod layout;
pub mod model;
pub mod quadstore;
pub mod sparql;
pub mod txn;
