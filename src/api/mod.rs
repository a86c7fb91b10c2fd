//! Resource API facade.
//!
//! `ResourceApi` is the single entry point this crate exposes. It owns
//! the environment, term dictionary, and binary store, and wraps every
//! operation in one [`RepoTxn`]: write entry points commit on success and
//! drain the changelog, or abort and propagate the error; read entry
//! points open a read transaction that releases its reader slot on drop.

use thiserror::Error;
use time::OffsetDateTime;
use tracing::instrument;

use crate::binary::{BinaryError, BinaryStore};
use crate::config::RepoConfig;
use crate::dict::TermDictionary;
use crate::kv::{Environment, KvError};
use crate::layout::{self, DanglingReference, ImrTriple, LayoutError};
use crate::model::{self, CreateOutcome, ModelError, NrInfo, Payload, PatternTriple};
use crate::quadstore;
use crate::sparql::{self, SparqlError};
use crate::txn::{ChangeEvent, RepoTxn, TxnError};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Txn(#[from] TxnError),
    #[error(transparent)]
    Binary(#[from] BinaryError),
    #[error(transparent)]
    Sparql(#[from] SparqlError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Kv(#[from] KvError),
}

/// A resource's admin-graph-only view: the server-managed triples
/// (`fcrepo:created`, digests, version pointers, …) without its user or
/// struct graph.
#[derive(Debug, Clone)]
pub struct ResourceMetadata {
    pub uid: String,
    pub triples: Vec<ImrTriple>,
}

/// The repository facade: one open environment, term dictionary, and
/// content-addressed binary store, configured by one [`RepoConfig`].
pub struct ResourceApi {
    env: Environment,
    dict: TermDictionary,
    binaries: BinaryStore,
    config: RepoConfig,
}

impl ResourceApi {
    /// Opens (creating if necessary) every sub-database this crate needs
    /// under `config.data_dir`, plus the binary store under
    /// `config.binary_store_path`.
    #[instrument(skip(config))]
    pub fn open(config: RepoConfig) -> Result<Self, RepoError> {
        let mut dbi_names: Vec<&str> = quadstore::DBI_NAMES.to_vec();
        dbi_names.extend_from_slice(&crate::dict::DBI_NAMES);
        let env = Environment::open(
            &config.data_dir,
            &dbi_names,
            config.engine_config(),
            config.max_readers,
        )?;
        let dict = TermDictionary::new(config.digest_algo);
        let binaries = BinaryStore::open_with_pairtree(
            &config.binary_store_path,
            config.digest_algo,
            config.pairtree_branch_length,
            config.pairtree_branches,
        )?;
        Ok(Self {
            env,
            dict,
            binaries,
            config,
        })
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// The content-addressed binary store backing Non-RDF Source bytes.
    pub fn binaries(&self) -> &BinaryStore {
        &self.binaries
    }

    /// `true` if `uid` denotes a live, non-tombstoned resource.
    #[instrument(skip(self), fields(uid = %uid))]
    pub fn exists(&self, uid: &str) -> Result<bool, RepoError> {
        let txn = RepoTxn::begin_read(&self.env, OffsetDateTime::now_utc())?;
        Ok(model::resource_exists(txn.inner(), &self.dict, uid)?)
    }

    /// Returns `uid`'s full in-memory representation (admin ∪ user ∪
    /// struct), or `None` if it does not exist. Errors with
    /// `RepoError::Model(ModelError::Tombstone { .. })` if `uid` is buried —
    /// callers map this to 410 Gone rather than 404.
    #[instrument(skip(self), fields(uid = %uid))]
    pub fn get(&self, uid: &str) -> Result<Option<Vec<ImrTriple>>, RepoError> {
        let txn = RepoTxn::begin_read(&self.env, OffsetDateTime::now_utc())?;
        // Checked before `resource_exists`: `bury_one` clears the admin
        // graph's `rdf:type ldp:Resource` triple, so a buried resource
        // would otherwise look identical to one that never existed.
        if model::is_tombstone(txn.inner(), &self.dict, uid)? {
            return Err(model::tombstone_error(txn.inner(), &self.dict, uid)?.into());
        }
        if !model::resource_exists(txn.inner(), &self.dict, uid)? {
            return Ok(None);
        }
        Ok(Some(layout::compose_imr(txn.inner(), &self.dict, uid)?))
    }

    /// Returns only `uid`'s admin graph, or `None` if it does not exist.
    /// Errors the same way as [`Self::get`] if `uid` is buried.
    #[instrument(skip(self), fields(uid = %uid))]
    pub fn get_metadata(&self, uid: &str) -> Result<Option<ResourceMetadata>, RepoError> {
        let txn = RepoTxn::begin_read(&self.env, OffsetDateTime::now_utc())?;
        if model::is_tombstone(txn.inner(), &self.dict, uid)? {
            return Err(model::tombstone_error(txn.inner(), &self.dict, uid)?.into());
        }
        if !model::resource_exists(txn.inner(), &self.dict, uid)? {
            return Ok(None);
        }
        let triples = layout::graph_triples(txn.inner(), &self.dict, &layout::admin_graph_uri(uid))?;
        Ok(Some(ResourceMetadata {
            uid: uid.to_string(),
            triples,
        }))
    }

    /// A deterministic ETag for `uid`'s current representation, or `None`
    /// if canonical ETags are disabled in config, the resource does not
    /// exist, or its graph contains a blank node.
    #[instrument(skip(self), fields(uid = %uid))]
    pub fn etag(&self, uid: &str) -> Result<Option<String>, RepoError> {
        if !self.config.canonical_etags {
            return Ok(None);
        }
        let Some(imr) = self.get(uid)? else {
            return Ok(None);
        };
        Ok(model::canon::hash_graph(self.config.digest_algo, &imr))
    }

    /// Mints a new UID under `parent_uid` (the given slug, or a generated
    /// one if absent or already taken) and creates it.
    #[instrument(skip(self, payload, nr_info), fields(parent_uid = %parent_uid, actor = ?actor))]
    pub fn create(
        &self,
        parent_uid: &str,
        slug: Option<&str>,
        payload: Payload,
        actor: Option<String>,
        nr_info: Option<NrInfo>,
    ) -> Result<(String, Vec<ChangeEvent>), RepoError> {
        let mut txn = RepoTxn::begin_write(&self.env, OffsetDateTime::now_utc())?;
        match model::create(
            &mut txn,
            &self.dict,
            &self.config,
            parent_uid,
            slug,
            payload,
            actor,
            nr_info,
        ) {
            Ok(uid) => {
                let events = txn.commit()?;
                Ok((uid, events))
            }
            Err(e) => {
                txn.abort();
                Err(e.into())
            }
        }
    }

    /// Creates or fully replaces `uid`.
    #[instrument(skip(self, payload, nr_info), fields(uid = %uid, actor = ?actor))]
    pub fn create_or_replace(
        &self,
        uid: &str,
        payload: Payload,
        actor: Option<String>,
        nr_info: Option<NrInfo>,
    ) -> Result<(CreateOutcome, Vec<ChangeEvent>), RepoError> {
        let mut txn = RepoTxn::begin_write(&self.env, OffsetDateTime::now_utc())?;
        match model::create_or_replace(&mut txn, &self.dict, &self.config, uid, payload, actor, nr_info) {
            Ok(outcome) => {
                let events = txn.commit()?;
                Ok((outcome, events))
            }
            Err(e) => {
                txn.abort();
                Err(e.into())
            }
        }
    }

    /// Persists `bytes` to the binary store and creates or replaces `uid`
    /// as a Non-RDF Source pointing at the resulting digest.
    #[instrument(skip(self, bytes), fields(uid = %uid, actor = ?actor))]
    pub fn create_or_replace_binary(
        &self,
        uid: &str,
        bytes: Vec<u8>,
        mime_type: String,
        actor: Option<String>,
    ) -> Result<(CreateOutcome, Vec<ChangeEvent>), RepoError> {
        let persisted = self.binaries.persist(bytes.as_slice())?;
        let nr_info = NrInfo {
            digest_algo: persisted.digest_algo,
            digest_hex: persisted.digest_hex,
            size: persisted.size,
            mime_type: mime_type.clone(),
        };
        self.create_or_replace(uid, Payload::Binary { bytes, mime_type }, actor, Some(nr_info))
    }

    /// Applies a SPARQL-Update string scoped to `uid`'s own graph: the
    /// update runs against an ephemeral copy of the resource's own
    /// triples, and the resulting delta is applied through
    /// [`model::update_delta`].
    #[instrument(skip(self, update_str), fields(uid = %uid))]
    pub fn update(&self, uid: &str, update_str: &str) -> Result<Vec<ChangeEvent>, RepoError> {
        let mut txn = RepoTxn::begin_write(&self.env, OffsetDateTime::now_utc())?;
        let outcome = (|| -> Result<(), RepoError> {
            if !model::resource_exists(txn.inner(), &self.dict, uid)? {
                return Err(ModelError::NotExists(uid.to_string()).into());
            }
            let resource_uri = layout::resource_uri(uid);
            let pre_image = layout::compose_imr(txn.inner(), &self.dict, uid)?;
            let (remove, add) = sparql::sparql_delta(&resource_uri, &pre_image, update_str)?;
            let remove_patterns = remove
                .into_iter()
                .map(|t| PatternTriple {
                    subject: Some(t.subject),
                    predicate: Some(t.predicate),
                    object: Some(t.object),
                })
                .collect();
            model::update_delta(&mut txn, &self.dict, &self.config, uid, remove_patterns, add)?;
            Ok(())
        })();
        match outcome {
            Ok(()) => Ok(txn.commit()?),
            Err(e) => {
                txn.abort();
                Err(e)
            }
        }
    }

    /// Applies a pre-computed `(remove_patterns, add)` delta to `uid`'s
    /// live graph, bypassing SPARQL-Update evaluation.
    #[instrument(skip(self, remove_patterns, add), fields(uid = %uid))]
    pub fn update_delta(
        &self,
        uid: &str,
        remove_patterns: Vec<PatternTriple>,
        add: Vec<ImrTriple>,
    ) -> Result<Vec<ChangeEvent>, RepoError> {
        let mut txn = RepoTxn::begin_write(&self.env, OffsetDateTime::now_utc())?;
        match model::update_delta(&mut txn, &self.dict, &self.config, uid, remove_patterns, add) {
            Ok(()) => Ok(txn.commit()?),
            Err(e) => {
                txn.abort();
                Err(e.into())
            }
        }
    }

    /// Deletes `uid`. Soft-deletes (`leave_tombstone`) recursively bury
    /// every descendant; hard-deletes recursively forget them.
    #[instrument(skip(self), fields(uid = %uid, actor = ?actor))]
    pub fn delete(
        &self,
        uid: &str,
        leave_tombstone: bool,
        actor: Option<String>,
    ) -> Result<Vec<ChangeEvent>, RepoError> {
        let mut txn = RepoTxn::begin_write(&self.env, OffsetDateTime::now_utc())?;
        match model::delete(&mut txn, &self.dict, uid, leave_tombstone, actor) {
            Ok(()) => Ok(txn.commit()?),
            Err(e) => {
                txn.abort();
                Err(e.into())
            }
        }
    }

    /// Resurrects a buried `uid` and every descendant buried alongside it.
    #[instrument(skip(self), fields(uid = %uid, actor = ?actor))]
    pub fn resurrect(&self, uid: &str, actor: Option<String>) -> Result<Vec<ChangeEvent>, RepoError> {
        let mut txn = RepoTxn::begin_write(&self.env, OffsetDateTime::now_utc())?;
        match model::resurrect(&mut txn, &self.dict, uid, actor) {
            Ok(()) => Ok(txn.commit()?),
            Err(e) => {
                txn.abort();
                Err(e.into())
            }
        }
    }

    /// Snapshots `uid`'s current content into a new version, labeled
    /// `label` (or an RFC3339-derived timestamp if `None`).
    #[instrument(skip(self), fields(uid = %uid, actor = ?actor))]
    pub fn create_version(
        &self,
        uid: &str,
        label: Option<&str>,
        actor: Option<String>,
    ) -> Result<(String, Vec<ChangeEvent>), RepoError> {
        let mut txn = RepoTxn::begin_write(&self.env, OffsetDateTime::now_utc())?;
        match model::versioning::create_version(&mut txn, &self.dict, self.config.digest_algo, uid, label, actor) {
            Ok(label) => {
                let events = txn.commit()?;
                Ok((label, events))
            }
            Err(e) => {
                txn.abort();
                Err(e.into())
            }
        }
    }

    /// Reads back the version labeled `label` for `uid`.
    #[instrument(skip(self), fields(uid = %uid, label = %label))]
    pub fn get_version(&self, uid: &str, label: &str) -> Result<Vec<ImrTriple>, RepoError> {
        let txn = RepoTxn::begin_read(&self.env, OffsetDateTime::now_utc())?;
        Ok(model::versioning::get_version(&txn, &self.dict, uid, label)?)
    }

    /// Restores `uid`'s live non-server-managed triples from the version
    /// labeled `label`.
    #[instrument(skip(self), fields(uid = %uid, label = %label, actor = ?actor))]
    pub fn revert_to_version(
        &self,
        uid: &str,
        label: &str,
        actor: Option<String>,
    ) -> Result<Vec<ChangeEvent>, RepoError> {
        let mut txn = RepoTxn::begin_write(&self.env, OffsetDateTime::now_utc())?;
        match model::versioning::revert_to_version(&mut txn, &self.dict, uid, label, actor) {
            Ok(()) => Ok(txn.commit()?),
            Err(e) => {
                txn.abort();
                Err(e.into())
            }
        }
    }

    /// Scans every `fcrepo:hasParent` reference in the store and reports
    /// those whose target does not exist. An out-of-band check,
    /// independent of the per-write `referential_integrity` policy —
    /// useful after a bulk import or a lenient-mode write.
    #[instrument(skip(self))]
    pub fn integrity_check(&self) -> Result<Vec<DanglingReference>, RepoError> {
        let txn = RepoTxn::begin_read(&self.env, OffsetDateTime::now_utc())?;
        let dict = &self.dict;
        Ok(layout::referential_integrity_scan(txn.inner(), dict, |uid| {
            model::resource_exists(txn.inner(), dict, uid).unwrap_or(false)
        })?)
    }
}
