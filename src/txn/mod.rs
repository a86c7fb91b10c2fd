//! Transaction and changelog facade.
//!
//! `RepoTxn` wraps one [`kv::Txn`], stamping a single logical timestamp at
//! `begin` so that every triple written during the operation (`created`,
//! `lastModified`, version labels) shares one instant, and accumulating a
//! FIFO changelog drained by the caller after `commit`.

use thiserror::Error;
use time::OffsetDateTime;

use crate::kv::{Environment, KvError, Txn};

#[derive(Debug, Error)]
pub enum TxnError {
    #[error(transparent)]
    Kv(#[from] KvError),
}

/// What kind of mutation an operation performed, for the external
/// messaging collaborator to interpret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Created,
    Updated,
    Deleted,
    Resurrected,
    VersionCreated,
    VersionReverted,
}

/// One entry in the per-transaction changelog: the triples removed and
/// added by one logical operation, plus its provenance.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub event_type: EventType,
    pub uid: String,
    pub timestamp: OffsetDateTime,
    pub resource_types: Vec<String>,
    pub actor: Option<String>,
}

/// Wraps one read or write [`kv::Txn`], stamping it with a logical clock
/// reading and collecting the operations performed under it.
pub struct RepoTxn<'env> {
    inner: Txn<'env>,
    now: OffsetDateTime,
    changelog: Vec<ChangeEvent>,
}

impl<'env> RepoTxn<'env> {
    pub fn begin_write(env: &'env Environment, now: OffsetDateTime) -> Result<Self, TxnError> {
        Ok(Self {
            inner: env.begin_write()?,
            now,
            changelog: Vec::new(),
        })
    }

    pub fn begin_read(env: &'env Environment, now: OffsetDateTime) -> Result<Self, TxnError> {
        Ok(Self {
            inner: env.begin_read()?,
            now,
            changelog: Vec::new(),
        })
    }

    /// The instant stamped at `begin`, shared by every triple this
    /// transaction's operation writes.
    pub fn now(&self) -> OffsetDateTime {
        self.now
    }

    pub fn inner(&self) -> &Txn<'env> {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut Txn<'env> {
        &mut self.inner
    }

    pub fn record_event(&mut self, event: ChangeEvent) {
        self.changelog.push(event);
    }

    /// Commits the underlying store transaction and returns the drained
    /// changelog. Nothing is visible to other readers until this returns.
    pub fn commit(self) -> Result<Vec<ChangeEvent>, TxnError> {
        self.inner.commit()?;
        Ok(self.changelog)
    }

    /// Discards the underlying store transaction; none of its buffered
    /// writes ever reach the engine. The changelog is dropped with it.
    pub fn abort(self) {
        self.inner.abort();
    }
}
