//! store::lock
//!
//! Exclusive per-repository lock for file-backed stores.
//!
//! # Architecture
//!
//! Two miner processes pointed at the same store must not sync the same
//! repository at once: both would compute a watermark from the same record
//! and interleave their writes. The lock is scoped to one repository, so
//! different repositories still sync in parallel.
//!
//! # Storage
//!
//! - `<root>/locks/<owner>/<name>.lock` - Lock file with OS-level exclusive lock
//!
//! # Invariants
//!
//! - Lock must be held for the whole repository sync
//! - Lock is automatically released on drop (RAII pattern)
//! - Lock acquisition is non-blocking (fails fast if locked)
//!
//! # Example
//!
//! ```ignore
//! use gfi_miner::store::lock::RepoLock;
//!
//! let lock = RepoLock::acquire(store_root, &"octocat/hello-world".parse()?)?;
//! // ... sync the repository ...
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::core::types::RepoId;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("repository is locked by another gfi-miner process")]
    AlreadyLocked,

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// An exclusive lock on one repository of a store.
///
/// The lock is released when this guard is dropped, even if the sync
/// holding it panics or is cancelled.
#[derive(Debug)]
pub struct RepoLock {
    /// Path to the lock file.
    path: PathBuf,
    /// The open file handle with the lock held.
    file: Option<File>,
}

impl RepoLock {
    /// Path of the lock file for `repo` under `root`.
    pub fn lock_path(root: &Path, repo: &RepoId) -> PathBuf {
        root.join("locks")
            .join(repo.owner())
            .join(format!("{}.lock", repo.name()))
    }

    /// Attempt to acquire the lock for `repo`.
    ///
    /// Uses OS-level file locking via `fs2`, which works across processes.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another process holds the lock
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(root: &Path, repo: &RepoId) -> Result<Self, LockError> {
        let path = Self::lock_path(root, repo);

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                LockError::CreateFailed(format!("cannot create {}: {}", dir.display(), e))
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path,
                file: Some(file),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(LockError::AlreadyLocked),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Check if the lock is currently held.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock before the guard goes out of scope.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        // Errors are ignored on drop
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}
