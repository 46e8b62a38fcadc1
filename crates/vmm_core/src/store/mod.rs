//! Per-job artifact store.
//!
//! Stages exchange data through a keyed store instead of passing buffers
//! around. Each job gets its own scratch directory, so keys from one job are
//! never visible to another, and the directory is removed when the store is
//! dropped (on success and on failure alike).
//!
//! # Example
//!
//! ```no_run
//! use vmm_core::models::JobId;
//! use vmm_core::store::{ArtifactKey, ArtifactStore};
//!
//! let mut store = ArtifactStore::create(".temp", JobId::new()).unwrap();
//! store.put(&ArtifactKey::video_source(), b"...").unwrap();
//! let bytes = store.get(&ArtifactKey::video_source()).unwrap();
//! ```

mod key;

pub use key::ArtifactKey;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::JobId;

/// Errors from artifact store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Key was never written (or was removed).
    #[error("Artifact '{0}' not found")]
    NotFound(ArtifactKey),

    /// Scratch storage failed.
    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed scratch storage scoped to a single job.
pub struct ArtifactStore {
    root: PathBuf,
    /// Keys that have been written, with their on-disk location.
    entries: BTreeMap<ArtifactKey, PathBuf>,
}

impl ArtifactStore {
    /// Create an empty store for `job_id` under `temp_root`.
    pub fn create(temp_root: impl AsRef<Path>, job_id: JobId) -> StoreResult<Self> {
        let root = temp_root.as_ref().join(job_id.to_string());
        fs::create_dir_all(&root)
            .map_err(|e| StoreError::io(format!("creating {}", root.display()), e))?;
        // Absolute, so concat lists resolve no matter where they live
        let root = fs::canonicalize(&root)
            .map_err(|e| StoreError::io(format!("resolving {}", root.display()), e))?;

        tracing::debug!("Created artifact store at {}", root.display());

        Ok(Self {
            root,
            entries: BTreeMap::new(),
        })
    }

    /// Scratch directory backing this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store `bytes` under `key`, overwriting any previous value.
    pub fn put(&mut self, key: &ArtifactKey, bytes: &[u8]) -> StoreResult<()> {
        let path = self.reserve(key);
        fs::write(&path, bytes).map_err(|e| StoreError::io(format!("writing '{}'", key), e))?;
        self.entries.insert(key.clone(), path);
        Ok(())
    }

    /// Read the bytes stored under `key`.
    pub fn get(&self, key: &ArtifactKey) -> StoreResult<Vec<u8>> {
        let path = self.path(key)?;
        fs::read(path).map_err(|e| StoreError::io(format!("reading '{}'", key), e))
    }

    /// Evict `key`. Removing an absent key is a no-op.
    pub fn remove(&mut self, key: &ArtifactKey) -> StoreResult<()> {
        if let Some(path) = self.entries.remove(key) {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io(format!("removing '{}'", key), e)),
            }
        }
        Ok(())
    }

    /// On-disk path of a written key.
    pub fn path(&self, key: &ArtifactKey) -> StoreResult<&Path> {
        self.entries
            .get(key)
            .map(PathBuf::as_path)
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    /// Whether `key` has been written.
    pub fn contains(&self, key: &ArtifactKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Path an external writer (the engine) should produce `key` at.
    ///
    /// The key is not readable until [`commit`](Self::commit) succeeds.
    pub fn reserve(&self, key: &ArtifactKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// Register a file produced at the reserved path for `key`.
    pub fn commit(&mut self, key: &ArtifactKey) -> StoreResult<()> {
        let path = self.reserve(key);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {
                self.entries.insert(key.clone(), path);
                Ok(())
            }
            Ok(_) => Err(StoreError::NotFound(key.clone())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.clone()))
            }
            Err(e) => Err(StoreError::io(format!("inspecting '{}'", key), e)),
        }
    }

    /// Copy the bytes of `from` into `to` without reading them into memory.
    pub fn copy(&mut self, from: &ArtifactKey, to: &ArtifactKey) -> StoreResult<()> {
        let source = self.path(from)?.to_path_buf();
        let target = self.reserve(to);
        fs::copy(&source, &target)
            .map_err(|e| StoreError::io(format!("copying '{}' to '{}'", from, to), e))?;
        self.entries.insert(to.clone(), target);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Drop for ArtifactStore {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.root) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    "Failed to remove artifact store {}: {}",
                    self.root.display(),
                    e
                );
            }
        }
    }
}
