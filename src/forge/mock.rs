//! forge::mock
//!
//! Mock fetcher implementation for deterministic testing.
//!
//! # Design
//!
//! The mock fetcher provides a deterministic implementation of the
//! `RepoFetcher` trait for use in tests. It serves commits, issues and stars
//! from memory, applies the same `since` windows as the real service, and
//! allows configuring failure scenarios. Every call is recorded so tests
//! can assert on what the engine fetched.
//!
//! Detail lookups for numbers that were never configured return an empty
//! detail rather than `NotFound`.
//!
//! # Example
//!
//! ```
//! use gfi_miner::forge::mock::MockFetcher;
//! use gfi_miner::forge::RepoFetcher;
//!
//! # tokio_test::block_on(async {
//! let fetcher = MockFetcher::new("octocat/hello-world".parse().unwrap())
//!     .with_rate_limit(42);
//!
//! assert_eq!(fetcher.get_rate_limit().await.unwrap(), 42);
//! assert_eq!(fetcher.operations().len(), 1);
//! # });
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::traits::{FetchError, RepoFetcher};
use crate::core::types::{Commit, Issue, IssueDetail, PullDetail, RepoId, RepoStats, Star};

/// Mock fetcher for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping. Clones share state,
/// so a test can keep a handle to push new data between syncs.
#[derive(Debug, Clone)]
pub struct MockFetcher {
    repo: RepoId,
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockFetcherInner>>,
}

/// Internal mutable state.
#[derive(Debug)]
struct MockFetcherInner {
    stats: RepoStats,
    rate_limit: u64,
    stars: Vec<Star>,
    commits: Vec<Commit>,
    issues: Vec<Issue>,
    pull_details: HashMap<u64, PullDetail>,
    issue_details: HashMap<u64, IssueDetail>,
    /// Operations that should fail (for testing error paths).
    fail_on: Vec<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    GetStats(FetchError),
    GetRateLimit(FetchError),
    GetStars(FetchError),
    GetCommits(FetchError),
    GetIssues(FetchError),
    /// Fail the detail fetch of one pull request.
    GetPullDetail(u64, FetchError),
    /// Fail the timeline fetch of one issue.
    GetIssueDetail(u64, FetchError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    GetStats,
    GetRateLimit,
    GetStars { since: DateTime<Utc> },
    GetCommits { since: DateTime<Utc> },
    GetIssues { since: DateTime<Utc> },
    GetPullDetail { number: u64 },
    GetIssueDetail { number: u64 },
}

impl MockFetcher {
    /// Create an empty mock for `repo`, created at the Unix epoch.
    pub fn new(repo: RepoId) -> Self {
        Self {
            repo,
            inner: Arc::new(Mutex::new(MockFetcherInner {
                stats: RepoStats {
                    language: None,
                    repo_created_at: DateTime::UNIX_EPOCH,
                },
                rate_limit: 5000,
                stars: Vec::new(),
                commits: Vec::new(),
                issues: Vec::new(),
                pull_details: HashMap::new(),
                issue_details: HashMap::new(),
                fail_on: Vec::new(),
                operations: Vec::new(),
            })),
        }
    }

    /// Set the repository attributes.
    pub fn with_stats(self, stats: RepoStats) -> Self {
        self.inner.lock().unwrap().stats = stats;
        self
    }

    /// Set the remaining request budget.
    pub fn with_rate_limit(self, remaining: u64) -> Self {
        self.inner.lock().unwrap().rate_limit = remaining;
        self
    }

    /// Add stars.
    pub fn with_stars(self, stars: Vec<Star>) -> Self {
        self.push_stars(stars);
        self
    }

    /// Add commits.
    pub fn with_commits(self, commits: Vec<Commit>) -> Self {
        self.push_commits(commits);
        self
    }

    /// Add issues and pull requests.
    pub fn with_issues(self, issues: Vec<Issue>) -> Self {
        self.push_issues(issues);
        self
    }

    /// Set the detail of one pull request.
    pub fn with_pull_detail(self, number: u64, detail: PullDetail) -> Self {
        self.inner
            .lock()
            .unwrap()
            .pull_details
            .insert(number, detail);
        self
    }

    /// Set the timeline of one issue.
    pub fn with_issue_detail(self, number: u64, detail: IssueDetail) -> Self {
        self.inner
            .lock()
            .unwrap()
            .issue_details
            .insert(number, detail);
        self
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use gfi_miner::forge::mock::{MockFetcher, FailOn};
    /// use gfi_miner::forge::FetchError;
    ///
    /// let fetcher = MockFetcher::new("a/b".parse().unwrap())
    ///     .fail_on(FailOn::GetCommits(FetchError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.inner.lock().unwrap().fail_on.push(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.inner.lock().unwrap().fail_on.clear();
    }

    /// Add stars after construction.
    pub fn push_stars(&self, stars: Vec<Star>) {
        self.inner.lock().unwrap().stars.extend(stars);
    }

    /// Add commits after construction.
    pub fn push_commits(&self, commits: Vec<Commit>) {
        self.inner.lock().unwrap().commits.extend(commits);
    }

    /// Add or replace issues after construction.
    pub fn push_issues(&self, issues: Vec<Issue>) {
        let mut inner = self.inner.lock().unwrap();
        for issue in issues {
            inner.issues.retain(|i| i.number != issue.number);
            inner.issues.push(issue);
        }
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.inner.lock().unwrap().operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        self.inner.lock().unwrap().operations.clear();
    }

    /// Number of pull request detail fetches recorded.
    pub fn pull_detail_calls(&self) -> usize {
        self.operations()
            .iter()
            .filter(|op| matches!(op, MockOperation::GetPullDetail { .. }))
            .count()
    }

    /// Record an operation.
    fn record(&self, op: MockOperation) {
        self.inner.lock().unwrap().operations.push(op);
    }

    /// Return the configured error for `op`, if any.
    fn check_fail(&self, op: &MockOperation) -> Result<(), FetchError> {
        let inner = self.inner.lock().unwrap();
        let hit = inner.fail_on.iter().find_map(|f| match (f, op) {
            (FailOn::GetStats(e), MockOperation::GetStats)
            | (FailOn::GetRateLimit(e), MockOperation::GetRateLimit)
            | (FailOn::GetStars(e), MockOperation::GetStars { .. })
            | (FailOn::GetCommits(e), MockOperation::GetCommits { .. })
            | (FailOn::GetIssues(e), MockOperation::GetIssues { .. }) => Some(e.clone()),
            (FailOn::GetPullDetail(n, e), MockOperation::GetPullDetail { number })
            | (FailOn::GetIssueDetail(n, e), MockOperation::GetIssueDetail { number })
                if n == number =>
            {
                Some(e.clone())
            }
            _ => None,
        });
        match hit {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Record `op` and fail if configured to.
    fn enter(&self, op: MockOperation) -> Result<(), FetchError> {
        self.record(op.clone());
        self.check_fail(&op)
    }
}

/// An issue counts as touched when it was opened, closed or merged since.
fn touched_since(issue: &Issue, since: DateTime<Utc>) -> bool {
    issue.created_at >= since
        || issue.closed_at.is_some_and(|t| t >= since)
        || issue.merged_at.is_some_and(|t| t >= since)
}

#[async_trait]
impl RepoFetcher for MockFetcher {
    fn repo(&self) -> &RepoId {
        &self.repo
    }

    async fn get_stats(&self) -> Result<RepoStats, FetchError> {
        self.enter(MockOperation::GetStats)?;
        Ok(self.inner.lock().unwrap().stats.clone())
    }

    async fn get_rate_limit(&self) -> Result<u64, FetchError> {
        self.enter(MockOperation::GetRateLimit)?;
        Ok(self.inner.lock().unwrap().rate_limit)
    }

    async fn get_stars(&self, since: DateTime<Utc>) -> Result<Vec<Star>, FetchError> {
        self.enter(MockOperation::GetStars { since })?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .stars
            .iter()
            .filter(|s| s.starred_at >= since)
            .cloned()
            .collect())
    }

    async fn get_commits(&self, since: DateTime<Utc>) -> Result<Vec<Commit>, FetchError> {
        self.enter(MockOperation::GetCommits { since })?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .commits
            .iter()
            .filter(|c| c.committed_at >= since)
            .cloned()
            .collect())
    }

    async fn get_issues(&self, since: DateTime<Utc>) -> Result<Vec<Issue>, FetchError> {
        self.enter(MockOperation::GetIssues { since })?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .issues
            .iter()
            .filter(|i| touched_since(i, since))
            .cloned()
            .collect())
    }

    async fn get_pull_detail(&self, number: u64) -> Result<PullDetail, FetchError> {
        self.enter(MockOperation::GetPullDetail { number })?;
        let inner = self.inner.lock().unwrap();
        Ok(inner.pull_details.get(&number).cloned().unwrap_or_default())
    }

    async fn get_issue_detail(&self, number: u64) -> Result<IssueDetail, FetchError> {
        self.enter(MockOperation::GetIssueDetail { number })?;
        let inner = self.inner.lock().unwrap();
        Ok(inner.issue_details.get(&number).cloned().unwrap_or_default())
    }
}
