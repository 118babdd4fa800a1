//! resolve
//!
//! Infers which artifact resolved each newly closed issue, and who authored
//! it.
//!
//! # Pipeline
//!
//! 1. [`author_index`]: index every known commit by author
//! 2. [`commit_matcher`]: seed candidates from closing keywords in commit
//!    messages (last chronological claim wins)
//! 3. [`pull_matcher`]: overwrite with candidates from merged pull requests
//!    whose merge falls within a minute of the closure
//! 4. [`registry`]: collapse to one resolution per issue, ascending by number
//!
//! Issues with no evidence produce no resolution. That is not an error.

pub mod author_index;
pub mod commit_matcher;
pub mod keywords;
pub mod pull_matcher;
pub mod registry;

use tracing::debug;

use crate::core::types::{Commit, Issue, Resolution};
use crate::forge::{FetchError, RepoFetcher};
use author_index::CommitAuthorIndex;
use registry::ResolutionRegistry;

pub use pull_matcher::{covering_window, pull_window, PULL_WINDOW_SECS};

/// Locate resolutions for `closed_issues`.
///
/// `commits` should contain every known commit of the repository, since
/// prior-commit counts are computed from it. `pulls` are candidate pull
/// requests; those outside an issue's merge window are ignored.
///
/// # Errors
///
/// Returns the first pull request detail fetch failure.
pub async fn locate_resolved_issues(
    fetcher: &dyn RepoFetcher,
    closed_issues: &[Issue],
    commits: &[Commit],
    pulls: &[Issue],
    detail_concurrency: usize,
) -> Result<Vec<Resolution>, FetchError> {
    let index = CommitAuthorIndex::new(commits);
    let mut registry = ResolutionRegistry::new();

    registry.record_all(commit_matcher::match_commits(
        closed_issues,
        commits,
        &index,
    ));
    let from_commits = registry.len();

    let from_pulls = pull_matcher::match_pulls(
        fetcher,
        closed_issues,
        pulls,
        &index,
        detail_concurrency,
    )
    .await?;
    let pull_count = from_pulls.len();
    registry.record_all(from_pulls);

    debug!(
        repo = %fetcher.repo(),
        closed = closed_issues.len(),
        authors = index.author_count(),
        from_commits,
        from_pulls = pull_count,
        resolved = registry.len(),
        "located resolutions"
    );

    Ok(registry.into_resolutions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Confidence, IssueState, PullDetail, ResolvedIn};
    use crate::forge::mock::MockFetcher;
    use chrono::{DateTime, TimeZone, Utc};

    const T: i64 = 2_000_000;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn closed_issue(number: u64, at: i64) -> Issue {
        Issue {
            number,
            user: "reporter".into(),
            state: IssueState::Closed,
            created_at: ts(0),
            closed_at: Some(ts(at)),
            is_pull: false,
            merged_at: None,
            title: "bug".into(),
            body: None,
            labels: vec![],
        }
    }

    fn commit(sha: &str, author: &str, at: i64, message: &str) -> Commit {
        Commit {
            sha: sha.into(),
            author: Some(author.into()),
            authored_at: ts(at),
            committer: None,
            committed_at: ts(at),
            message: message.into(),
        }
    }

    fn merged_pull(number: u64, author: &str, at: i64, body: &str) -> Issue {
        Issue {
            number,
            user: author.into(),
            state: IssueState::Closed,
            created_at: ts(0),
            closed_at: Some(ts(at)),
            is_pull: true,
            merged_at: Some(ts(at)),
            title: "change".into(),
            body: Some(body.into()),
            labels: vec![],
        }
    }

    #[tokio::test]
    async fn no_evidence_no_resolution() {
        let fetcher = MockFetcher::new("o/r".parse().unwrap());
        let commits = vec![commit("a", "alice", T - 10, "unrelated")];
        let found = locate_resolved_issues(&fetcher, &[closed_issue(1, T)], &commits, &[], 4)
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn pull_request_beats_commit() {
        let fetcher = MockFetcher::new("o/r".parse().unwrap()).with_pull_detail(
            20,
            PullDetail {
                comments: vec![],
                commits: vec!["fix".into()],
            },
        );
        let commits = vec![
            commit("prior", "bob", T - 1000, "setup"),
            commit("fix", "bob", T - 100, "fixes #1"),
        ];
        let pulls = vec![merged_pull(20, "bob", T, "Closes #1")];

        let found =
            locate_resolved_issues(&fetcher, &[closed_issue(1, T)], &commits, &pulls, 4)
                .await
                .unwrap();

        assert_eq!(
            found,
            vec![Resolution {
                number: 1,
                resolver: Some("bob".into()),
                resolved_in: ResolvedIn::PullRequest(20),
                resolver_commit_num: 1,
                confidence: Confidence::High,
            }]
        );
    }

    #[tokio::test]
    async fn mixed_sources_sorted_by_issue() {
        let fetcher = MockFetcher::new("o/r".parse().unwrap());
        let commits = vec![commit("c", "alice", T - 5, "fixes #9")];
        let pulls = vec![merged_pull(30, "bob", T, "fixes #4")];

        let found = locate_resolved_issues(
            &fetcher,
            &[closed_issue(9, T), closed_issue(4, T)],
            &commits,
            &pulls,
            4,
        )
        .await
        .unwrap();

        let summary: Vec<_> = found
            .iter()
            .map(|r| (r.number, r.resolved_in.to_string()))
            .collect();
        assert_eq!(summary, vec![(4, "#30".to_string()), (9, "c".to_string())]);
    }
}
