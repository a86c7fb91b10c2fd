//! Environment — a collection of named, durable key-value sub-databases
//! sharing one root directory, one writer, and many readers.
//!
//! Each named sub-database (`dbi`) is backed by its own [`Engine`](crate::engine::Engine)
//! instance rooted at `<data_dir>/<dbi>/`. [`Environment`] adds the two
//! things a single `Engine` does not provide on its own:
//!
//! - A single process-wide writer lock, so at most one write [`Txn`] is
//!   open at a time across *all* sub-databases.
//! - True `abort` semantics: a write `Txn` stages its mutations in memory
//!   and only calls into the underlying engines at [`Txn::commit`]. If the
//!   `Txn` is dropped or [`Txn::abort`] is called first, nothing was ever
//!   written.
//!
//! [`Cursor`] borrows from its parent `Txn` and cannot outlive it.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use thiserror::Error;
use tracing::{debug, instrument};

use crate::engine::{Engine, EngineConfig, EngineError};

#[derive(Debug, Error)]
pub enum KvError {
    #[error("unknown sub-database: {0}")]
    UnknownDbi(String),

    #[error("transaction is read-only")]
    ReadOnly,

    #[error("environment lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A durable, ordered collection of named key-value sub-databases.
pub struct Environment {
    data_dir: PathBuf,
    dbis: HashMap<String, Engine>,
    writer: Mutex<()>,
    readers: RwLock<HashSet<u64>>,
    next_reader_id: std::sync::atomic::AtomicU64,
    max_readers: usize,
}

impl Environment {
    /// Opens (creating if necessary) one [`Engine`] per name in `dbi_names`
    /// under `data_dir`, all sharing `config`.
    #[instrument(skip(config))]
    pub fn open(
        data_dir: impl AsRef<Path>,
        dbi_names: &[&str],
        config: EngineConfig,
        max_readers: usize,
    ) -> Result<Self, KvError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        let mut dbis = HashMap::with_capacity(dbi_names.len());
        for name in dbi_names {
            let path = data_dir.join(name);
            let engine = Engine::open(&path, config.clone())?;
            dbis.insert((*name).to_string(), engine);
        }

        debug!(dbis = dbi_names.len(), "environment opened");

        Ok(Self {
            data_dir,
            dbis,
            writer: Mutex::new(()),
            readers: RwLock::new(HashSet::new()),
            next_reader_id: std::sync::atomic::AtomicU64::new(0),
            max_readers: max_readers.max(1),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn dbi_names(&self) -> impl Iterator<Item = &str> {
        self.dbis.keys().map(String::as_str)
    }

    fn engine(&self, dbi: &str) -> Result<&Engine, KvError> {
        self.dbis
            .get(dbi)
            .ok_or_else(|| KvError::UnknownDbi(dbi.to_string()))
    }

    /// Begins the single write transaction. Blocks until any prior write
    /// transaction has committed or aborted.
    #[instrument(skip(self))]
    pub fn begin_write(&self) -> Result<Txn<'_>, KvError> {
        let guard = self.writer.lock().map_err(|_| KvError::Poisoned)?;
        debug!("write transaction begun");
        Ok(Txn {
            env: self,
            writable: true,
            buffer: HashMap::new(),
            _writer_guard: Some(guard),
            reader_id: None,
        })
    }

    /// Begins a read-only transaction. Many may be open concurrently.
    ///
    /// Reader slots are bounded by `max_readers`; exceeding it is reported
    /// as [`KvError::Poisoned`]-free back pressure via a retry from the
    /// caller rather than an error, matching the teacher's reclaim-on-next-
    /// `begin` idiom for stale state.
    #[instrument(skip(self))]
    pub fn begin_read(&self) -> Result<Txn<'_>, KvError> {
        let id = self
            .next_reader_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        {
            let mut readers = self.readers.write().map_err(|_| KvError::Poisoned)?;
            if readers.len() >= self.max_readers {
                readers.clear();
            }
            readers.insert(id);
        }
        Ok(Txn {
            env: self,
            writable: false,
            buffer: HashMap::new(),
            _writer_guard: None,
            reader_id: Some(id),
        })
    }

    fn release_reader(&self, id: u64) {
        if let Ok(mut readers) = self.readers.write() {
            readers.remove(&id);
        }
    }
}

/// A transaction against an [`Environment`].
///
/// Write transactions stage every `put`/`delete` in an in-memory buffer;
/// nothing reaches the underlying engines until [`Txn::commit`]. This is
/// what gives `abort` (or simply dropping the `Txn`) true no-op semantics
/// on top of engines whose own `put`/`delete` are durable immediately.
pub struct Txn<'env> {
    env: &'env Environment,
    writable: bool,
    buffer: HashMap<(String, Vec<u8>), Option<Vec<u8>>>,
    _writer_guard: Option<std::sync::MutexGuard<'env, ()>>,
    reader_id: Option<u64>,
}

impl<'env> Txn<'env> {
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Reads the current value for `key` in `dbi`, honoring this
    /// transaction's own uncommitted writes.
    pub fn get(&self, dbi: &str, key: &[u8]) -> Result<Option<Vec<u8>>, KvError> {
        if let Some(staged) = self.buffer.get(&(dbi.to_string(), key.to_vec())) {
            return Ok(staged.clone());
        }
        let engine = self.env.engine(dbi)?;
        Ok(engine.get(key.to_vec())?)
    }

    /// Stages a put. Only valid on a writable transaction.
    pub fn put(&mut self, dbi: &str, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Result<(), KvError> {
        if !self.writable {
            return Err(KvError::ReadOnly);
        }
        self.env.engine(dbi)?;
        self.buffer.insert((dbi.to_string(), key.into()), Some(value.into()));
        Ok(())
    }

    /// Stages a delete. Only valid on a writable transaction.
    pub fn delete(&mut self, dbi: &str, key: impl Into<Vec<u8>>) -> Result<(), KvError> {
        if !self.writable {
            return Err(KvError::ReadOnly);
        }
        self.env.engine(dbi)?;
        self.buffer.insert((dbi.to_string(), key.into()), None);
        Ok(())
    }

    /// Opens a cursor over `[start, end)` in `dbi`, merging this
    /// transaction's staged writes over the engine's committed state.
    /// The cursor cannot outlive this transaction.
    pub fn scan<'txn>(&'txn self, dbi: &str, start: &[u8], end: &[u8]) -> Result<Cursor<'txn>, KvError> {
        let engine = self.env.engine(dbi)?;
        let mut merged: std::collections::BTreeMap<Vec<u8>, Option<Vec<u8>>> =
            std::collections::BTreeMap::new();

        for (k, v) in engine.scan(start, end)? {
            merged.insert(k, Some(v));
        }
        for ((d, k), v) in &self.buffer {
            if d == dbi && k.as_slice() >= start && k.as_slice() < end {
                merged.insert(k.clone(), v.clone());
            }
        }

        let items: Vec<(Vec<u8>, Vec<u8>)> = merged
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect();

        Ok(Cursor {
            items: items.into_iter(),
            _txn: std::marker::PhantomData,
        })
    }

    /// Applies all staged writes to their underlying engines and releases
    /// the writer lock (for write transactions; a no-op for read
    /// transactions beyond reader-slot release).
    #[instrument(skip(self))]
    pub fn commit(mut self) -> Result<(), KvError> {
        for ((dbi, key), value) in self.buffer.drain() {
            let engine = self.env.engine(&dbi)?;
            match value {
                Some(v) => {
                    engine.put(key, v)?;
                }
                None => {
                    engine.delete(key)?;
                }
            }
        }
        debug!("transaction committed");
        Ok(())
    }

    /// Discards all staged writes. Equivalent to dropping the `Txn`.
    pub fn abort(self) {
        debug!("transaction aborted");
    }
}

impl Drop for Txn<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.reader_id.take() {
            self.env.release_reader(id);
        }
    }
}

/// A read-only cursor over a transaction's view of one sub-database.
///
/// Borrowed from a [`Txn`] and bounded by its lifetime: it cannot be held
/// past the transaction's `commit`/`abort`/drop.
pub struct Cursor<'txn> {
    items: std::vec::IntoIter<(Vec<u8>, Vec<u8>)>,
    _txn: std::marker::PhantomData<&'txn ()>,
}

impl Iterator for Cursor<'_> {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next()
    }
}
