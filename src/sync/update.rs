//! sync::update
//!
//! One incremental sync of one repository.
//!
//! # Steps
//!
//! 1. Lock the repository in the store and load (or create) its record
//! 2. Fetch repository stats; derive the `since` window from the watermark
//! 3. Fetch and persist stars, commits, issues and pull requests
//! 4. Recompute the monthly series over everything stored for the repository
//! 5. Resolve issues closed since the window start, fetch their timelines,
//!    persist each resolution (failures logged and skipped)
//! 6. Persist the record with the new watermark
//!
//! # Invariants
//!
//! - The watermark is captured before any fetch and written last
//! - Any fetch failure or raw document write failure aborts the run before
//!   the watermark write, so the next run repeats the same window
//! - Dropping the future (cancellation) has the same effect
//! - All writes are upserts by natural key; a repeated run over the same
//!   window leaves the store unchanged

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use super::monthly::count_by_month;
use super::state::SyncState;
use crate::core::config::DEFAULT_DETAIL_CONCURRENCY;
use crate::core::types::{Issue, IssueEvent, RepoId, RepoRecord, Resolution, ResolvedIssue};
use crate::forge::{FetchError, RepoFetcher};
use crate::resolve::{covering_window, locate_resolved_issues};
use crate::store::{DocumentStore, IssueFilter, StoreError};

/// Errors that abort a repository sync.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("store failed: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Whether the repository was skipped because another process holds it.
    pub fn is_locked(&self) -> bool {
        matches!(self, SyncError::Store(StoreError::Locked(_)))
    }
}

/// Tunables for a repository sync.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Concurrent pull request detail fetches
    pub detail_concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            detail_concurrency: DEFAULT_DETAIL_CONCURRENCY,
        }
    }
}

/// Outcome of a successful repository sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub repo: RepoId,
    /// State before this run
    pub previous: SyncState,
    /// Start of the fetched window
    pub since: DateTime<Utc>,
    /// Watermark written by this run
    pub watermark: DateTime<Utc>,
    pub stars: usize,
    pub commits: usize,
    pub issues: usize,
    pub pulls: usize,
    /// Resolution records written
    pub resolved: usize,
    /// Resolution records that failed to persist
    pub failed_writes: usize,
    /// Distinct logins seen as commit authors, reporters, resolvers or
    /// timeline participants
    pub users: BTreeSet<String>,
}

/// Run one incremental sync of `fetcher`'s repository.
///
/// `now` becomes the new watermark on success.
///
/// # Errors
///
/// - [`SyncError::Fetch`] on any fetch failure
/// - [`SyncError::Store`] if the repository is locked, or on any read or
///   raw document write failure
///
/// A failure to persist an individual resolution record is not an error;
/// it is logged and counted in [`SyncReport::failed_writes`].
#[instrument(skip_all, fields(repo = %fetcher.repo()))]
pub async fn update_repo(
    fetcher: &dyn RepoFetcher,
    store: &dyn DocumentStore,
    options: &SyncOptions,
    now: DateTime<Utc>,
) -> Result<SyncReport, SyncError> {
    let repo = fetcher.repo().clone();
    let _guard = store.lock_repo(&repo)?;

    let mut record = store
        .find_repo(&repo)?
        .unwrap_or_else(|| RepoRecord::new(&repo, now));
    let previous = SyncState::of(&record);

    let stats = fetcher.get_stats().await?;
    record.apply_stats(&stats);
    let since = previous.since(stats.repo_created_at);
    let watermark = now;

    info!(state = %previous, since = %since, "starting sync");
    log_rate_limit(fetcher).await?;

    let mut users = BTreeSet::from([repo.owner().to_string()]);

    let stars = fetcher.get_stars(since).await?;
    for star in &stars {
        store.upsert_star(&repo, star)?;
    }
    info!(count = stars.len(), "stored stars");

    let commits = fetcher.get_commits(since).await?;
    for commit in &commits {
        store.upsert_commit(&repo, commit)?;
        users.extend(commit.author.clone());
    }
    info!(count = commits.len(), "stored commits");

    let issues = fetcher.get_issues(since).await?;
    let pull_count = issues.iter().filter(|i| i.is_pull).count();
    for issue in &issues {
        store.upsert_issue(&repo, issue)?;
        users.insert(issue.user.clone());
    }
    info!(
        issues = issues.len() - pull_count,
        pulls = pull_count,
        "stored issues and pull requests"
    );
    log_rate_limit(fetcher).await?;

    update_monthly(store, &repo, &mut record)?;

    let all_commits = store.commits(&repo)?;
    let closed = store.issues(&repo, &IssueFilter::issues().closed_since(since))?;
    let pulls = match covering_window(&closed) {
        Some(window) => store.issues(&repo, &window)?,
        None => Vec::new(),
    };
    debug!(
        closed = closed.len(),
        candidate_pulls = pulls.len(),
        "resolving closed issues"
    );

    let resolutions = locate_resolved_issues(
        fetcher,
        &closed,
        &all_commits,
        &pulls,
        options.detail_concurrency,
    )
    .await?;

    let closed_by_number: HashMap<u64, &Issue> = closed.iter().map(|i| (i.number, i)).collect();
    let mut resolved = 0;
    let mut failed_writes = 0;
    for resolution in resolutions {
        let Some(issue) = closed_by_number.get(&resolution.number) else {
            continue;
        };
        let events = fetcher.get_issue_detail(resolution.number).await?.events;
        let resolved_issue = build_record(&repo, issue, resolution, events);
        if let Some(resolved_issue) = resolved_issue {
            users.extend(resolved_issue.resolver.clone());
            for event in &resolved_issue.events {
                users.extend(event.participants().map(str::to_string));
            }

            match store.upsert_resolved_issue(&resolved_issue) {
                Ok(()) => resolved += 1,
                Err(e) => {
                    let serialized = serde_json::to_string(&resolved_issue)
                        .unwrap_or_else(|_| format!("{:?}", resolved_issue));
                    error!(
                        issue = resolved_issue.number,
                        error = %e,
                        record = %serialized,
                        "failed to store resolution"
                    );
                    failed_writes += 1;
                }
            }
        }
    }

    record.updated_at = Some(watermark);
    store.upsert_repo(&record)?;

    info!(
        resolved,
        failed_writes,
        users = users.len(),
        "sync complete"
    );

    Ok(SyncReport {
        repo,
        previous,
        since,
        watermark,
        stars: stars.len(),
        commits: commits.len(),
        issues: issues.len() - pull_count,
        pulls: pull_count,
        resolved,
        failed_writes,
        users,
    })
}

/// Recompute the four monthly series from every stored document.
fn update_monthly(
    store: &dyn DocumentStore,
    repo: &RepoId,
    record: &mut RepoRecord,
) -> Result<(), StoreError> {
    let stars = store.stars(repo)?;
    let commits = store.commits(repo)?;
    let (pulls, issues): (Vec<Issue>, Vec<Issue>) = store
        .issues(repo, &IssueFilter::all())?
        .into_iter()
        .partition(|i| i.is_pull);

    record.monthly_stars = count_by_month(stars.iter().map(|s| s.starred_at));
    record.monthly_commits = count_by_month(commits.iter().map(|c| c.committed_at));
    record.monthly_issues = count_by_month(issues.iter().map(|i| i.created_at));
    record.monthly_pulls = count_by_month(pulls.iter().map(|p| p.created_at));
    Ok(())
}

/// Combine a resolution with its issue; `None` if the issue is not closed.
fn build_record(
    repo: &RepoId,
    issue: &Issue,
    resolution: Resolution,
    events: Vec<IssueEvent>,
) -> Option<ResolvedIssue> {
    Some(ResolvedIssue {
        owner: repo.owner().to_string(),
        name: repo.name().to_string(),
        number: resolution.number,
        created_at: issue.created_at,
        resolved_at: issue.closed_at?,
        resolver: resolution.resolver,
        resolved_in: resolution.resolved_in,
        resolver_commit_num: resolution.resolver_commit_num,
        confidence: resolution.confidence,
        events,
    })
}

async fn log_rate_limit(fetcher: &dyn RepoFetcher) -> Result<(), FetchError> {
    let remaining = fetcher.get_rate_limit().await?;
    info!(rate_remaining = remaining, "rate limit");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Confidence, IssueState, ResolvedIn};
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn issue(closed_at: Option<i64>) -> Issue {
        Issue {
            number: 3,
            user: "reporter".into(),
            state: IssueState::Closed,
            created_at: ts(10),
            closed_at: closed_at.map(ts),
            is_pull: false,
            merged_at: None,
            title: "bug".into(),
            body: None,
            labels: vec![],
        }
    }

    fn resolution() -> Resolution {
        Resolution {
            number: 3,
            resolver: Some("alice".into()),
            resolved_in: ResolvedIn::Commit("abc".into()),
            resolver_commit_num: 4,
            confidence: Confidence::High,
        }
    }

    #[test]
    fn record_takes_times_from_issue() {
        let repo: RepoId = "o/r".parse().unwrap();
        let record = build_record(&repo, &issue(Some(99)), resolution(), vec![]).unwrap();
        assert_eq!(record.owner, "o");
        assert_eq!(record.name, "r");
        assert_eq!(record.created_at, ts(10));
        assert_eq!(record.resolved_at, ts(99));
        assert_eq!(record.resolver_commit_num, 4);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn open_issue_builds_no_record() {
        let repo: RepoId = "o/r".parse().unwrap();
        assert!(build_record(&repo, &issue(None), resolution(), vec![]).is_none());
    }

    #[test]
    fn locked_error_detected() {
        let err = SyncError::from(StoreError::Locked("o/r".parse().unwrap()));
        assert!(err.is_locked());
        assert!(!SyncError::from(FetchError::RateLimited).is_locked());
    }
}
