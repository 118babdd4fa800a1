//! store::memory
//!
//! In-memory document store.
//!
//! Holds every collection in ordered maps behind one mutex. Used by tests
//! and by anyone embedding the engine without a persistent store. Write
//! faults can be injected to exercise per-record failure handling.
//!
//! # Example
//!
//! ```
//! use gfi_miner::store::{DocumentStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let repo = "octocat/hello-world".parse().unwrap();
//! assert!(store.find_repo(&repo).unwrap().is_none());
//! ```

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::traits::{sort_commits, sort_stars, DocumentStore, IssueFilter, RepoGuard, StoreError};
use crate::core::types::{Commit, Issue, RepoId, RepoRecord, ResolvedIssue, Star};

/// Injected write failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreFault {
    /// Reject the resolution record for this issue number.
    ResolvedIssue(u64),
    /// Reject every commit write.
    Commits,
    /// Reject every repository record write.
    Repos,
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    repos: BTreeMap<RepoId, RepoRecord>,
    stars: BTreeMap<(RepoId, String), Star>,
    commits: BTreeMap<(RepoId, String), Commit>,
    issues: BTreeMap<(RepoId, u64), Issue>,
    resolved: BTreeMap<(RepoId, u64), ResolvedIssue>,
    faults: HashSet<StoreFault>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make writes matching `fault` fail with `StoreError::Rejected`.
    pub fn inject(self, fault: StoreFault) -> Self {
        self.lock().faults.insert(fault);
        self
    }

    /// Remove all injected faults.
    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    // A poisoned mutex only means a test panicked mid-write; the maps are
    // still usable.
    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(inner: &MemoryInner, fault: StoreFault) -> Result<(), StoreError> {
        if inner.faults.contains(&fault) {
            return Err(StoreError::Rejected(format!("injected fault {:?}", fault)));
        }
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn find_repo(&self, repo: &RepoId) -> Result<Option<RepoRecord>, StoreError> {
        Ok(self.lock().repos.get(repo).cloned())
    }

    fn upsert_repo(&self, record: &RepoRecord) -> Result<(), StoreError> {
        let repo = RepoId::new(record.owner.clone(), record.name.clone())?;
        let mut inner = self.lock();
        Self::check(&inner, StoreFault::Repos)?;
        inner.repos.insert(repo, record.clone());
        Ok(())
    }

    fn upsert_star(&self, repo: &RepoId, star: &Star) -> Result<(), StoreError> {
        self.lock()
            .stars
            .insert((repo.clone(), star.user.clone()), star.clone());
        Ok(())
    }

    fn stars(&self, repo: &RepoId) -> Result<Vec<Star>, StoreError> {
        let mut stars: Vec<Star> = self
            .lock()
            .stars
            .iter()
            .filter(|((r, _), _)| r == repo)
            .map(|(_, s)| s.clone())
            .collect();
        sort_stars(&mut stars);
        Ok(stars)
    }

    fn upsert_commit(&self, repo: &RepoId, commit: &Commit) -> Result<(), StoreError> {
        let mut inner = self.lock();
        Self::check(&inner, StoreFault::Commits)?;
        inner
            .commits
            .insert((repo.clone(), commit.sha.clone()), commit.clone());
        Ok(())
    }

    fn commits(&self, repo: &RepoId) -> Result<Vec<Commit>, StoreError> {
        let mut commits: Vec<Commit> = self
            .lock()
            .commits
            .iter()
            .filter(|((r, _), _)| r == repo)
            .map(|(_, c)| c.clone())
            .collect();
        sort_commits(&mut commits);
        Ok(commits)
    }

    fn upsert_issue(&self, repo: &RepoId, issue: &Issue) -> Result<(), StoreError> {
        self.lock()
            .issues
            .insert((repo.clone(), issue.number), issue.clone());
        Ok(())
    }

    fn issues(&self, repo: &RepoId, filter: &IssueFilter) -> Result<Vec<Issue>, StoreError> {
        // Keys are (repo, number), so iteration is already number-ordered.
        Ok(self
            .lock()
            .issues
            .iter()
            .filter(|((r, _), issue)| r == repo && filter.matches(issue))
            .map(|(_, i)| i.clone())
            .collect())
    }

    fn upsert_resolved_issue(&self, record: &ResolvedIssue) -> Result<(), StoreError> {
        record.validate()?;
        let repo = record.repo_id()?;
        let mut inner = self.lock();
        Self::check(&inner, StoreFault::ResolvedIssue(record.number))?;
        inner.resolved.insert((repo, record.number), record.clone());
        Ok(())
    }

    fn resolved_issues(&self, repo: &RepoId) -> Result<Vec<ResolvedIssue>, StoreError> {
        Ok(self
            .lock()
            .resolved
            .iter()
            .filter(|((r, _), _)| r == repo)
            .map(|(_, rec)| rec.clone())
            .collect())
    }

    fn lock_repo(&self, _repo: &RepoId) -> Result<RepoGuard, StoreError> {
        Ok(RepoGuard::unlocked())
    }
}
