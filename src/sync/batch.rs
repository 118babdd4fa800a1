//! sync::batch
//!
//! Sync many repositories with a shared store and a rotating credential
//! pool.
//!
//! Repository `i` of the batch uses token `i % tokens.len()`. At most
//! `jobs` repositories are in flight; one failing repository is logged and
//! does not stop the others. A repository held by another process is
//! skipped with a warning.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use super::update::{update_repo, SyncError, SyncOptions, SyncReport};
use crate::core::types::RepoId;
use crate::forge::github::GitHubFetcher;
use crate::forge::RepoFetcher;
use crate::store::DocumentStore;

/// Credentials rotated across the repositories of a batch.
#[derive(Clone, Default)]
pub struct TokenPool {
    tokens: Vec<String>,
}

// Tokens stay out of Debug output.
impl std::fmt::Debug for TokenPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenPool([{} redacted])", self.tokens.len())
    }
}

impl TokenPool {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Token for the `index`-th repository; `None` for an empty pool.
    pub fn token_for(&self, index: usize) -> Option<&str> {
        if self.tokens.is_empty() {
            return None;
        }
        Some(&self.tokens[index % self.tokens.len()])
    }
}

/// Batch tunables.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Repositories in flight
    pub jobs: usize,
    pub sync: SyncOptions,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            sync: SyncOptions::default(),
        }
    }
}

/// What happened to one repository of a batch.
#[derive(Debug)]
pub enum RepoOutcome {
    Synced(SyncReport),
    /// Another process holds the repository.
    Skipped,
    Failed(SyncError),
}

/// Per-repository outcomes, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<(RepoId, RepoOutcome)>,
}

impl BatchReport {
    pub fn synced(&self) -> usize {
        self.count(|o| matches!(o, RepoOutcome::Synced(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RepoOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, RepoOutcome::Failed(_)))
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&RepoOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Build one GitHub fetcher per repository, rotating through `pool`.
pub fn github_fetchers(
    repos: &[RepoId],
    pool: &TokenPool,
    api_base: &str,
) -> Vec<Arc<dyn RepoFetcher>> {
    repos
        .iter()
        .enumerate()
        .map(|(i, repo)| {
            let token = pool.token_for(i).map(str::to_string);
            Arc::new(GitHubFetcher::with_api_base(token, repo.clone(), api_base))
                as Arc<dyn RepoFetcher>
        })
        .collect()
}

/// Sync every repository behind `fetchers` into `store`.
///
/// Each repository's watermark is the wall-clock time its own sync starts.
pub async fn run_batch(
    fetchers: Vec<Arc<dyn RepoFetcher>>,
    store: Arc<dyn DocumentStore>,
    options: &BatchOptions,
) -> BatchReport {
    info!(
        repos = fetchers.len(),
        jobs = options.jobs,
        store = store.name(),
        "starting batch"
    );

    let outcomes = stream::iter(fetchers)
        .map(|fetcher| {
            let store = Arc::clone(&store);
            let sync = options.sync.clone();
            async move {
                let repo = fetcher.repo().clone();
                let result = update_repo(fetcher.as_ref(), store.as_ref(), &sync, Utc::now()).await;
                let outcome = classify(&repo, result);
                (repo, outcome)
            }
        })
        .buffered(options.jobs.max(1))
        .collect::<Vec<_>>()
        .await;

    let report = BatchReport { outcomes };
    info!(
        synced = report.synced(),
        skipped = report.skipped(),
        failed = report.failed(),
        "batch complete"
    );
    report
}

fn classify(repo: &RepoId, result: Result<SyncReport, SyncError>) -> RepoOutcome {
    match result {
        Ok(report) => RepoOutcome::Synced(report),
        Err(e) if e.is_locked() => {
            warn!(repo = %repo, error = %e, "skipping repository");
            RepoOutcome::Skipped
        }
        Err(e) => {
            error!(repo = %repo, error = %e, "repository sync failed");
            RepoOutcome::Failed(e)
        }
    }
}
