//! store::traits
//!
//! Document store trait definition.
//!
//! # Design
//!
//! The `DocumentStore` trait exposes typed collections keyed by natural
//! keys. Every write is replace-or-insert, so re-running a sync over the
//! same window leaves the store unchanged.
//!
//! | Collection       | Natural key                |
//! |------------------|----------------------------|
//! | repositories     | `(owner, name)`            |
//! | stars            | `(owner, name, user)`      |
//! | commits          | `(owner, name, sha)`       |
//! | issues           | `(owner, name, number)`    |
//! | resolved issues  | `(owner, name, number)`    |
//!
//! Implementations must be thread-safe (`Send + Sync`): repositories sync
//! concurrently against one shared store.
//!
//! # Example
//!
//! ```ignore
//! use gfi_miner::store::{DocumentStore, IssueFilter, StoreError};
//!
//! fn open_pulls(store: &dyn DocumentStore, repo: &RepoId) -> Result<usize, StoreError> {
//!     Ok(store.issues(repo, &IssueFilter::pulls())?.len())
//! }
//! ```

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

use super::lock::LockError;
use crate::core::types::{Commit, Issue, RepoId, RepoRecord, ResolvedIssue, Star, TypeError};

/// Errors from document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to read or write a document on disk.
    #[error("store i/o error at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A stored document could not be decoded.
    #[error("corrupt document '{path}': {message}")]
    Corrupt { path: PathBuf, message: String },

    /// A document could not be encoded.
    #[error("failed to serialize document: {0}")]
    Serialize(String),

    /// The record violates a record-level invariant.
    #[error(transparent)]
    Invalid(#[from] TypeError),

    /// Another process holds the repository.
    #[error("repository {0} is locked by another process")]
    Locked(RepoId),

    /// Locking failed for a reason other than contention.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// The backend rejected the write.
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Selection over stored issues and pull requests.
///
/// All set fields must match. `closed_since` is inclusive; both bounds of
/// `merged_between` are exclusive.
///
/// # Example
///
/// ```
/// use gfi_miner::store::IssueFilter;
/// use chrono::{TimeZone, Utc};
///
/// let t = Utc.timestamp_opt(1_000, 0).unwrap();
/// let filter = IssueFilter::issues().closed_since(t);
/// assert_eq!(filter.is_pull, Some(false));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    /// `Some(true)` for pull requests only, `Some(false)` for issues only
    pub is_pull: Option<bool>,
    /// Keep documents closed at or after this instant
    pub closed_since: Option<DateTime<Utc>>,
    /// Keep documents merged strictly inside this interval
    pub merged_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl IssueFilter {
    /// Match everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Non-PR issues only.
    pub fn issues() -> Self {
        Self {
            is_pull: Some(false),
            ..Self::default()
        }
    }

    /// Pull requests only.
    pub fn pulls() -> Self {
        Self {
            is_pull: Some(true),
            ..Self::default()
        }
    }

    pub fn closed_since(mut self, since: DateTime<Utc>) -> Self {
        self.closed_since = Some(since);
        self
    }

    pub fn merged_between(mut self, after: DateTime<Utc>, before: DateTime<Utc>) -> Self {
        self.merged_between = Some((after, before));
        self
    }

    /// Check whether `issue` is selected.
    pub fn matches(&self, issue: &Issue) -> bool {
        if let Some(is_pull) = self.is_pull {
            if issue.is_pull != is_pull {
                return false;
            }
        }
        if let Some(since) = self.closed_since {
            if !issue.closed_at.is_some_and(|t| t >= since) {
                return false;
            }
        }
        if let Some((after, before)) = self.merged_between {
            if !issue.merged_at.is_some_and(|t| after < t && t < before) {
                return false;
            }
        }
        true
    }
}

/// Trait for document store backends.
///
/// Collection reads return documents in a stable order: stars by
/// `(starred_at, user)`, commits by `(authored_at, sha)`, issues and
/// resolved issues by number.
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Load the repository record, if the repository was seen before.
    fn find_repo(&self, repo: &RepoId) -> Result<Option<RepoRecord>, StoreError>;

    /// Insert or replace the repository record.
    fn upsert_repo(&self, record: &RepoRecord) -> Result<(), StoreError>;

    fn upsert_star(&self, repo: &RepoId, star: &Star) -> Result<(), StoreError>;

    fn stars(&self, repo: &RepoId) -> Result<Vec<Star>, StoreError>;

    fn upsert_commit(&self, repo: &RepoId, commit: &Commit) -> Result<(), StoreError>;

    fn commits(&self, repo: &RepoId) -> Result<Vec<Commit>, StoreError>;

    fn upsert_issue(&self, repo: &RepoId, issue: &Issue) -> Result<(), StoreError>;

    /// Stored issues and pull requests selected by `filter`.
    fn issues(&self, repo: &RepoId, filter: &IssueFilter) -> Result<Vec<Issue>, StoreError>;

    /// Insert or replace a resolution record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Invalid` if the record fails
    /// [`ResolvedIssue::validate`]; nothing is written in that case.
    fn upsert_resolved_issue(&self, record: &ResolvedIssue) -> Result<(), StoreError>;

    fn resolved_issues(&self, repo: &RepoId) -> Result<Vec<ResolvedIssue>, StoreError>;

    /// Take the repository for exclusive use by this process.
    ///
    /// Backends without cross-process state return a guard that holds
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Locked` if another process holds the repository.
    fn lock_repo(&self, repo: &RepoId) -> Result<RepoGuard, StoreError>;
}

/// Exclusive hold on one repository; released on drop.
#[derive(Debug, Default)]
pub struct RepoGuard {
    lock: Option<super::lock::RepoLock>,
}

impl RepoGuard {
    /// A guard that holds nothing.
    pub fn unlocked() -> Self {
        Self::default()
    }

    pub(crate) fn from_lock(lock: super::lock::RepoLock) -> Self {
        Self { lock: Some(lock) }
    }

    /// Whether an OS lock backs this guard.
    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }
}

/// Sort helpers shared by the backends.
pub(crate) fn sort_stars(stars: &mut [Star]) {
    stars.sort_by(|a, b| (a.starred_at, &a.user).cmp(&(b.starred_at, &b.user)));
}

pub(crate) fn sort_commits(commits: &mut [Commit]) {
    commits.sort_by(|a, b| (a.authored_at, &a.sha).cmp(&(b.authored_at, &b.sha)));
}
