//! Content-addressed binary store.
//!
//! Payloads are stored once, keyed by digest, in a pairtree layout under
//! the store root: `<root>/<d0><d1>/<d2><d3>/<full-hex-digest>`. A
//! `persist` call streams its input once, hashing incrementally, into a
//! temp file that is atomically renamed into place on success — mirroring
//! the teacher's WAL segment rotation idiom (write fully, then become
//! current) applied to binary payloads instead of log segments.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::digest::{to_hex, DigestAlgo};

#[derive(Debug, Error)]
pub enum BinaryError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("no binary stored for digest {0}")]
    NotFound(String),

    #[error("fixity check failed: expected {expected}, computed {computed}")]
    FixityMismatch { expected: String, computed: String },
}

/// Result of successfully persisting a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedBinary {
    pub digest_algo: DigestAlgo,
    pub digest_hex: String,
    pub size: u64,
    /// `true` if this digest was already present (the new stream was
    /// read, hashed, and discarded rather than stored a second time).
    pub deduplicated: bool,
}

pub struct BinaryStore {
    root: PathBuf,
    digest_algo: DigestAlgo,
    branch_length: usize,
    branches: usize,
}

impl BinaryStore {
    pub fn open(root: impl Into<PathBuf>, digest_algo: DigestAlgo) -> Result<Self, BinaryError> {
        Self::open_with_pairtree(root, digest_algo, 2, 4)
    }

    /// Opens the store with a configurable pairtree shape: `branch_length`
    /// hex characters per directory level, `branches` levels deep before
    /// the full-digest-named leaf file.
    pub fn open_with_pairtree(
        root: impl Into<PathBuf>,
        digest_algo: DigestAlgo,
        branch_length: usize,
        branches: usize,
    ) -> Result<Self, BinaryError> {
        let root = root.into();
        fs::create_dir_all(root.join("tmp"))?;
        Ok(Self {
            root,
            digest_algo,
            branch_length: branch_length.max(1),
            branches,
        })
    }

    fn pairtree_path(&self, digest_hex: &str) -> PathBuf {
        let mut path = self.root.clone();
        let chars: Vec<char> = digest_hex.chars().collect();
        for chunk in chars.chunks(self.branch_length).take(self.branches) {
            path.push(chunk.iter().collect::<String>());
        }
        path.push(digest_hex);
        path
    }

    /// Streams `reader` to disk, computing its digest, and stores it at
    /// its content-addressed path. If a payload with the same digest is
    /// already stored, the newly streamed bytes are discarded after
    /// hashing and `deduplicated` is `true`.
    #[instrument(skip(self, reader))]
    pub fn persist(&self, mut reader: impl Read) -> Result<PersistedBinary, BinaryError> {
        let tmp_path = self.root.join("tmp").join(format!(
            "{}.partial",
            uuid::Uuid::new_v4()
        ));
        let mut tmp_file = File::create(&tmp_path)?;
        let mut hasher = self.digest_algo.hasher();
        let mut size: u64 = 0;
        let mut buf = [0u8; 64 * 1024];

        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            tmp_file.write_all(&buf[..n])?;
            size += n as u64;
        }
        tmp_file.sync_all()?;
        drop(tmp_file);

        let digest = hasher.finalize();
        let digest_hex = to_hex(&digest);
        let dest = self.pairtree_path(&digest_hex);

        if dest.exists() {
            fs::remove_file(&tmp_path)?;
            debug!(digest = %digest_hex, "binary already present, deduplicated");
            return Ok(PersistedBinary {
                digest_algo: self.digest_algo,
                digest_hex,
                size,
                deduplicated: true,
            });
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&tmp_path, &dest)?;
        debug!(digest = %digest_hex, size, "binary persisted");

        Ok(PersistedBinary {
            digest_algo: self.digest_algo,
            digest_hex,
            size,
            deduplicated: false,
        })
    }

    /// Opens the stored payload for `digest_hex` for reading.
    pub fn open_read(&self, digest_hex: &str) -> Result<File, BinaryError> {
        let path = self.pairtree_path(digest_hex);
        File::open(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                BinaryError::NotFound(digest_hex.to_string())
            } else {
                BinaryError::Io(e)
            }
        })
    }

    /// Deletes the stored payload for `digest_hex`. Not reference
    /// counted: callers must ensure no other resource still refers to
    /// this digest before calling.
    #[instrument(skip(self))]
    pub fn delete(&self, digest_hex: &str) -> Result<(), BinaryError> {
        let path = self.pairtree_path(digest_hex);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(BinaryError::NotFound(digest_hex.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Re-reads the stored payload and recomputes its digest, comparing
    /// against `digest_hex`. Used for periodic fixity checks.
    #[instrument(skip(self))]
    pub fn fixity_check(&self, digest_hex: &str) -> Result<(), BinaryError> {
        let mut file = self.open_read(digest_hex)?;
        let mut hasher = self.digest_algo.hasher();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        let computed = to_hex(&hasher.finalize());
        if computed != digest_hex {
            warn!(expected = %digest_hex, computed = %computed, "fixity check failed");
            return Err(BinaryError::FixityMismatch {
                expected: digest_hex.to_string(),
                computed,
            });
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
