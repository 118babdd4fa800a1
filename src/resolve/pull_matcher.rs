//! resolve::pull_matcher
//!
//! Resolution candidates from merged pull requests.
//!
//! # Matching
//!
//! For an issue closed at `T`, the candidate pull requests are those merged
//! strictly inside `(T - 60s, T + 60s)`. A candidate resolves the issue when
//! its title, body or any comment closes the issue number. The resolver is
//! the pull request author; the prior-commit count covers the author's
//! commits authored before the merge, excluding the pull request's own
//! commits.
//!
//! When several pull requests qualify for one issue, they are inspected in
//! `(merged_at, number)` order and the last match wins.
//!
//! # Fetching
//!
//! Details are fetched once per distinct pull request, at most
//! `concurrency` at a time. Any fetch failure aborts the whole match.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use super::author_index::CommitAuthorIndex;
use super::keywords::closing_references;
use crate::core::types::{Confidence, Issue, PullDetail, ResolvedIn, Resolution};
use crate::forge::{FetchError, RepoFetcher};
use crate::store::IssueFilter;

/// Half-width of the merge window around an issue's closure.
pub const PULL_WINDOW_SECS: i64 = 60;

/// Filter selecting pull requests merged within the window around
/// `closed_at`.
pub fn pull_window(closed_at: DateTime<Utc>) -> IssueFilter {
    let half = Duration::seconds(PULL_WINDOW_SECS);
    IssueFilter::pulls().merged_between(closed_at - half, closed_at + half)
}

/// Filter covering the windows of every issue in `closed_issues`, or
/// `None` if none of them is closed.
pub fn covering_window(closed_issues: &[Issue]) -> Option<IssueFilter> {
    let times = closed_issues.iter().filter_map(|i| i.closed_at);
    let (first, last) = times.fold(None, |acc: Option<(DateTime<Utc>, DateTime<Utc>)>, t| {
        Some(match acc {
            Some((lo, hi)) => (lo.min(t), hi.max(t)),
            None => (t, t),
        })
    })?;
    let half = Duration::seconds(PULL_WINDOW_SECS);
    Some(IssueFilter::pulls().merged_between(first - half, last + half))
}

/// Candidates for `closed_issues` from the merged pull requests in `pulls`.
///
/// Returns candidates in ascending issue order, at most one per issue.
pub async fn match_pulls(
    fetcher: &dyn RepoFetcher,
    closed_issues: &[Issue],
    pulls: &[Issue],
    index: &CommitAuthorIndex<'_>,
    concurrency: usize,
) -> Result<Vec<Resolution>, FetchError> {
    let mut issues: Vec<&Issue> = closed_issues.iter().collect();
    issues.sort_by_key(|i| i.number);

    // Qualifying pull requests per issue, in (merged_at, number) order.
    let mut qualifying: Vec<(&Issue, Vec<&Issue>)> = Vec::new();
    for issue in issues {
        let Some(closed_at) = issue.closed_at else {
            continue;
        };
        let window = pull_window(closed_at);
        let mut prs: Vec<&Issue> = pulls.iter().filter(|pr| window.matches(pr)).collect();
        if prs.is_empty() {
            continue;
        }
        prs.sort_by_key(|pr| (pr.merged_at, pr.number));
        qualifying.push((issue, prs));
    }

    let mut wanted: Vec<u64> = qualifying
        .iter()
        .flat_map(|(_, prs)| prs.iter().map(|pr| pr.number))
        .collect();
    wanted.sort_unstable();
    wanted.dedup();
    if wanted.is_empty() {
        return Ok(Vec::new());
    }

    debug!(
        repo = %fetcher.repo(),
        pulls = wanted.len(),
        "fetching pull request details"
    );
    let details = fetch_details(fetcher, wanted, concurrency).await?;

    // Issue numbers each pull request's text closes.
    let mut closes_cache: HashMap<u64, Vec<u64>> = HashMap::new();

    let mut candidates = Vec::new();
    for (issue, prs) in qualifying {
        let mut chosen = None;
        for pr in prs {
            let detail = details.get(&pr.number);
            let closes = closes_cache
                .entry(pr.number)
                .or_insert_with(|| closing_references(&pull_text(pr, detail)));
            if closes.contains(&issue.number) {
                chosen = Some(candidate(issue.number, pr, detail, index));
            }
        }
        candidates.extend(chosen);
    }
    Ok(candidates)
}

/// Fetch details of `numbers` with bounded concurrency.
async fn fetch_details(
    fetcher: &dyn RepoFetcher,
    numbers: Vec<u64>,
    concurrency: usize,
) -> Result<HashMap<u64, PullDetail>, FetchError> {
    stream::iter(numbers)
        .map(|number| async move {
            let detail = fetcher.get_pull_detail(number).await?;
            Ok::<_, FetchError>((number, detail))
        })
        .buffer_unordered(concurrency.max(1))
        .try_collect()
        .await
}

/// Title, body and comments joined by newlines.
fn pull_text(pr: &Issue, detail: Option<&PullDetail>) -> String {
    let mut parts: Vec<&str> = vec![pr.title.as_str()];
    parts.extend(pr.body.as_deref());
    if let Some(detail) = detail {
        parts.extend(detail.comments.iter().map(String::as_str));
    }
    parts.join("\n")
}

fn candidate(
    number: u64,
    pr: &Issue,
    detail: Option<&PullDetail>,
    index: &CommitAuthorIndex<'_>,
) -> Resolution {
    let own: HashSet<&str> = detail
        .map(|d| d.commits.iter().map(String::as_str).collect())
        .unwrap_or_default();
    let resolver_commit_num = match pr.merged_at {
        Some(merged_at) => index.count_before_excluding(&pr.user, merged_at, &own),
        None => 0,
    };
    Resolution {
        number,
        resolver: Some(pr.user.clone()),
        resolved_in: ResolvedIn::PullRequest(pr.number),
        resolver_commit_num,
        confidence: Confidence::High,
    }
}
