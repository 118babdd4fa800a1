//! Integration tests for incremental repository sync.
//!
//! These drive `update_repo` and `run_batch` end to end against
//! `MockFetcher`, with the in-memory store for most scenarios and the file
//! store where locking or persistence matters.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use gfi_miner::core::types::{
    Commit, Confidence, EventKind, Issue, IssueDetail, IssueEvent, IssueState, MonthCount,
    PullDetail, RepoId, RepoStats, ResolvedIn, Star,
};
use gfi_miner::forge::mock::{FailOn, MockFetcher, MockOperation};
use gfi_miner::forge::{FetchError, RepoFetcher};
use gfi_miner::store::{DocumentStore, FileStore, IssueFilter, MemoryStore, StoreError, StoreFault};
use gfi_miner::sync::{
    run_batch, update_repo, BatchOptions, RepoOutcome, SyncError, SyncOptions, SyncState,
};

// =============================================================================
// Fixtures
// =============================================================================

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn repo() -> RepoId {
    "octocat/hello-world".parse().unwrap()
}

fn commit(sha: &str, author: Option<&str>, at: i64, message: &str) -> Commit {
    Commit {
        sha: sha.to_string(),
        author: author.map(str::to_string),
        authored_at: ts(at),
        committer: author.map(str::to_string),
        committed_at: ts(at),
        message: message.to_string(),
    }
}

fn issue(number: u64, user: &str, created: i64, closed: Option<i64>) -> Issue {
    Issue {
        number,
        user: user.to_string(),
        state: if closed.is_some() {
            IssueState::Closed
        } else {
            IssueState::Open
        },
        created_at: ts(created),
        closed_at: closed.map(ts),
        is_pull: false,
        merged_at: None,
        title: format!("issue {}", number),
        body: None,
        labels: vec!["good first issue".to_string()],
    }
}

fn pull(number: u64, user: &str, created: i64, merged: i64, body: &str) -> Issue {
    Issue {
        number,
        user: user.to_string(),
        state: IssueState::Closed,
        created_at: ts(created),
        closed_at: Some(ts(merged)),
        is_pull: true,
        merged_at: Some(ts(merged)),
        title: format!("pull {}", number),
        body: Some(body.to_string()),
        labels: vec![],
    }
}

async fn sync(
    fetcher: &MockFetcher,
    store: &dyn DocumentStore,
    now: i64,
) -> Result<gfi_miner::sync::SyncReport, SyncError> {
    update_repo(fetcher, store, &SyncOptions::default(), ts(now)).await
}

// =============================================================================
// Resolution through sync
// =============================================================================

mod resolution {
    use super::*;

    #[tokio::test]
    async fn commit_resolution_recorded() {
        let fetcher = MockFetcher::new(repo())
            .with_commits(vec![
                commit("c1", Some("alice"), 100, "initial import"),
                commit("c2", Some("alice"), 200, "Fix #1: handle empty input"),
            ])
            .with_issues(vec![issue(1, "reporter", 50, Some(300))]);
        let store = MemoryStore::new();

        let report = sync(&fetcher, &store, 1000).await.unwrap();
        assert_eq!(report.resolved, 1);
        assert_eq!(report.failed_writes, 0);

        let records = store.resolved_issues(&repo()).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.number, 1);
        assert_eq!(record.owner, "octocat");
        assert_eq!(record.name, "hello-world");
        assert_eq!(record.resolver.as_deref(), Some("alice"));
        assert_eq!(record.resolved_in, ResolvedIn::Commit("c2".to_string()));
        assert_eq!(record.resolver_commit_num, 1);
        assert_eq!(record.created_at, ts(50));
        assert_eq!(record.resolved_at, ts(300));
        assert_eq!(record.confidence, Confidence::High);
    }

    #[tokio::test]
    async fn no_evidence_no_record() {
        let fetcher = MockFetcher::new(repo())
            .with_commits(vec![commit("c1", Some("alice"), 100, "refactor")])
            .with_issues(vec![issue(1, "reporter", 50, Some(300))]);
        let store = MemoryStore::new();

        let report = sync(&fetcher, &store, 1000).await.unwrap();
        assert_eq!(report.resolved, 0);
        assert!(store.resolved_issues(&repo()).unwrap().is_empty());
        assert_eq!(fetcher.pull_detail_calls(), 0);
    }

    #[tokio::test]
    async fn pull_request_beats_commit() {
        let fetcher = MockFetcher::new(repo())
            .with_commits(vec![
                commit("c0", Some("bob"), 100, "setup"),
                commit("c1", Some("bob"), 150, "work on parser"),
                commit("c2", Some("carol"), 200, "fixes #1"),
            ])
            .with_issues(vec![
                issue(1, "reporter", 50, Some(1000)),
                pull(2, "bob", 500, 990, "Closes #1"),
            ])
            .with_pull_detail(
                2,
                PullDetail {
                    comments: vec![],
                    commits: vec!["c1".to_string()],
                },
            );
        let store = MemoryStore::new();

        sync(&fetcher, &store, 2000).await.unwrap();

        let records = store.resolved_issues(&repo()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].resolver.as_deref(), Some("bob"));
        assert_eq!(records[0].resolved_in, ResolvedIn::PullRequest(2));
        // c0 only: c1 belongs to the pull request itself
        assert_eq!(records[0].resolver_commit_num, 1);
    }

    #[tokio::test]
    async fn closing_keyword_in_pull_comment() {
        let fetcher = MockFetcher::new(repo())
            .with_issues(vec![
                issue(4, "reporter", 50, Some(1000)),
                pull(9, "dana", 500, 1010, "Refactor the lexer"),
            ])
            .with_pull_detail(
                9,
                PullDetail {
                    comments: vec!["This also resolves #4".to_string()],
                    commits: vec![],
                },
            );
        let store = MemoryStore::new();

        sync(&fetcher, &store, 2000).await.unwrap();

        let records = store.resolved_issues(&repo()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].resolved_in, ResolvedIn::PullRequest(9));
        assert_eq!(records[0].resolver_commit_num, 0);
    }

    #[tokio::test]
    async fn merge_window_bounds() {
        let fetcher = MockFetcher::new(repo()).with_issues(vec![
            issue(1, "reporter", 50, Some(1000)),
            pull(10, "erin", 500, 941, "fixes #1"),
            issue(3, "reporter", 50, Some(5000)),
            pull(11, "frank", 500, 4939, "fixes #3"),
        ]);
        let store = MemoryStore::new();

        sync(&fetcher, &store, 9000).await.unwrap();

        let records = store.resolved_issues(&repo()).unwrap();
        let numbers: Vec<u64> = records.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1]);
        assert_eq!(records[0].resolved_in, ResolvedIn::PullRequest(10));
    }

    #[tokio::test]
    async fn later_merge_wins_tie() {
        let fetcher = MockFetcher::new(repo()).with_issues(vec![
            issue(1, "reporter", 50, Some(1000)),
            pull(20, "early", 500, 990, "closes #1"),
            pull(21, "late", 500, 1005, "closes #1"),
        ]);
        let store = MemoryStore::new();

        sync(&fetcher, &store, 2000).await.unwrap();

        let records = store.resolved_issues(&repo()).unwrap();
        assert_eq!(records[0].resolver.as_deref(), Some("late"));
        assert_eq!(records[0].resolved_in, ResolvedIn::PullRequest(21));
    }

    #[tokio::test]
    async fn anonymous_commit_gives_low_confidence() {
        let fetcher = MockFetcher::new(repo())
            .with_commits(vec![commit("c9", None, 200, "close #7")])
            .with_issues(vec![issue(7, "reporter", 50, Some(300))]);
        let store = MemoryStore::new();

        sync(&fetcher, &store, 1000).await.unwrap();

        let records = store.resolved_issues(&repo()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].resolver, None);
        assert_eq!(records[0].confidence, Confidence::Low);
        assert_eq!(records[0].resolver_commit_num, 0);
    }

    #[tokio::test]
    async fn census_includes_owner_without_activity() {
        let fetcher = MockFetcher::new(repo());
        let store = MemoryStore::new();

        let report = sync(&fetcher, &store, 1000).await.unwrap();
        assert!(report.users.contains("octocat"));
        assert_eq!(report.users.len(), 1);
    }

    #[tokio::test]
    async fn commit_authored_after_closure_still_credited() {
        // Author clocks can run ahead of the server's closure time.
        let fetcher = MockFetcher::new(repo())
            .with_commits(vec![commit("late", Some("alice"), 305, "fixes #1")])
            .with_issues(vec![issue(1, "reporter", 50, Some(300))]);
        let store = MemoryStore::new();

        sync(&fetcher, &store, 1000).await.unwrap();

        let records = store.resolved_issues(&repo()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].resolver.as_deref(), Some("alice"));
        assert_eq!(records[0].resolved_in, ResolvedIn::Commit("late".to_string()));
    }

    #[tokio::test]
    async fn timeline_attached_to_record() {
        let events = vec![
            IssueEvent {
                time: Some(ts(60)),
                actor: Some("maintainer".to_string()),
                kind: EventKind::Labeled {
                    label: "good first issue".to_string(),
                },
            },
            IssueEvent {
                time: Some(ts(70)),
                actor: Some("dave".to_string()),
                kind: EventKind::Commented {
                    comment: Some("I'd like to take this".to_string()),
                    commenter: Some("dave".to_string()),
                },
            },
        ];
        let fetcher = MockFetcher::new(repo())
            .with_commits(vec![commit("c1", Some("alice"), 200, "fixes #1")])
            .with_issues(vec![issue(1, "reporter", 50, Some(300))])
            .with_issue_detail(
                1,
                IssueDetail {
                    events: events.clone(),
                },
            );
        let store = MemoryStore::new();

        let report = sync(&fetcher, &store, 1000).await.unwrap();

        let records = store.resolved_issues(&repo()).unwrap();
        assert_eq!(records[0].events, events);
        assert!(fetcher
            .operations()
            .contains(&MockOperation::GetIssueDetail { number: 1 }));

        let users: Vec<&str> = report.users.iter().map(String::as_str).collect();
        assert_eq!(
            users,
            vec!["alice", "dave", "maintainer", "octocat", "reporter"]
        );
    }
}

// =============================================================================
// Watermark and incremental behavior
// =============================================================================

mod watermark {
    use super::*;

    #[tokio::test]
    async fn first_then_incremental() {
        let fetcher = MockFetcher::new(repo()).with_stats(RepoStats {
            language: Some("Rust".to_string()),
            repo_created_at: ts(10),
        });
        let store = MemoryStore::new();

        let first = sync(&fetcher, &store, 1000).await.unwrap();
        assert_eq!(first.previous, SyncState::NeverSynced);
        assert_eq!(first.since, ts(10));
        assert_eq!(first.watermark, ts(1000));

        let record = store.find_repo(&repo()).unwrap().unwrap();
        assert_eq!(record.updated_at, Some(ts(1000)));
        assert_eq!(record.language.as_deref(), Some("Rust"));
        assert_eq!(record.repo_created_at, Some(ts(10)));

        fetcher.clear_operations();
        let second = sync(&fetcher, &store, 2000).await.unwrap();
        assert_eq!(second.previous, SyncState::Synced { since: ts(1000) });
        assert_eq!(second.since, ts(1000));
        assert!(fetcher
            .operations()
            .contains(&MockOperation::GetCommits { since: ts(1000) }));

        let record = store.find_repo(&repo()).unwrap().unwrap();
        assert_eq!(record.updated_at, Some(ts(2000)));
        assert_eq!(record.created_at, ts(1000));
    }

    #[tokio::test]
    async fn prior_count_uses_stored_history() {
        let fetcher = MockFetcher::new(repo()).with_commits(vec![
            commit("c1", Some("alice"), 100, "one"),
            commit("c2", Some("alice"), 200, "two"),
        ]);
        let store = MemoryStore::new();
        sync(&fetcher, &store, 1000).await.unwrap();

        fetcher.push_commits(vec![commit("c3", Some("alice"), 1100, "closes #5")]);
        fetcher.push_issues(vec![issue(5, "reporter", 1050, Some(1200))]);
        let report = sync(&fetcher, &store, 2000).await.unwrap();

        assert_eq!(report.commits, 1);
        let records = store.resolved_issues(&repo()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].resolver_commit_num, 2);
    }

    #[tokio::test]
    async fn fetch_failure_keeps_watermark() {
        let fetcher = MockFetcher::new(repo())
            .with_commits(vec![commit("c1", Some("alice"), 100, "fixes #1")])
            .with_issues(vec![issue(1, "reporter", 50, Some(300))])
            .fail_on(FailOn::GetIssues(FetchError::RateLimited));
        let store = MemoryStore::new();

        let err = sync(&fetcher, &store, 1000).await.unwrap_err();
        assert!(matches!(err, SyncError::Fetch(FetchError::RateLimited)));
        assert!(store.find_repo(&repo()).unwrap().is_none());
        assert!(store.resolved_issues(&repo()).unwrap().is_empty());

        fetcher.clear_fail_on();
        fetcher.clear_operations();
        let report = sync(&fetcher, &store, 1500).await.unwrap();
        assert_eq!(report.previous, SyncState::NeverSynced);
        assert!(fetcher.operations().contains(&MockOperation::GetCommits {
            since: DateTime::UNIX_EPOCH
        }));
        assert_eq!(report.resolved, 1);
    }

    #[tokio::test]
    async fn pull_detail_failure_aborts() {
        let fetcher = MockFetcher::new(repo())
            .with_issues(vec![
                issue(1, "reporter", 50, Some(1000)),
                pull(2, "bob", 500, 990, "Closes #1"),
            ])
            .fail_on(FailOn::GetPullDetail(
                2,
                FetchError::ApiError {
                    status: 502,
                    message: "bad gateway".to_string(),
                },
            ));
        let store = MemoryStore::new();

        assert!(sync(&fetcher, &store, 2000).await.is_err());
        assert!(store.find_repo(&repo()).unwrap().is_none());
    }

    #[tokio::test]
    async fn raw_write_failure_keeps_watermark() {
        let fetcher =
            MockFetcher::new(repo()).with_commits(vec![commit("c1", Some("a"), 100, "x")]);
        let store = MemoryStore::new().inject(StoreFault::Commits);

        let err = sync(&fetcher, &store, 1000).await.unwrap_err();
        assert!(matches!(err, SyncError::Store(_)));
        assert!(store.find_repo(&repo()).unwrap().is_none());
    }

    #[tokio::test]
    async fn repeated_window_is_idempotent() {
        let fetcher = MockFetcher::new(repo())
            .with_stars(vec![Star {
                user: "fan".to_string(),
                starred_at: ts(120),
            }])
            .with_commits(vec![
                commit("c1", Some("alice"), 100, "initial"),
                commit("c2", Some("alice"), 200, "fixes #1"),
            ])
            .with_issues(vec![
                issue(1, "reporter", 50, Some(300)),
                issue(2, "reporter", 60, None),
            ]);
        let store = MemoryStore::new();
        sync(&fetcher, &store, 1000).await.unwrap();

        let snapshot = (
            store.find_repo(&repo()).unwrap(),
            store.stars(&repo()).unwrap(),
            store.commits(&repo()).unwrap(),
            store.issues(&repo(), &IssueFilter::all()).unwrap(),
            store.resolved_issues(&repo()).unwrap(),
        );

        // Rewind the watermark so the same window is fetched again
        let mut record = store.find_repo(&repo()).unwrap().unwrap();
        record.updated_at = None;
        store.upsert_repo(&record).unwrap();
        sync(&fetcher, &store, 1000).await.unwrap();

        let again = (
            store.find_repo(&repo()).unwrap(),
            store.stars(&repo()).unwrap(),
            store.commits(&repo()).unwrap(),
            store.issues(&repo(), &IssueFilter::all()).unwrap(),
            store.resolved_issues(&repo()).unwrap(),
        );
        assert_eq!(snapshot, again);
    }
}

// =============================================================================
// Failure isolation, monthly series, locking
// =============================================================================

mod isolation {
    use super::*;

    #[tokio::test]
    async fn resolution_write_failure_is_skipped() {
        let fetcher = MockFetcher::new(repo())
            .with_commits(vec![
                commit("c1", Some("alice"), 100, "fixes #1"),
                commit("c2", Some("bob"), 110, "fixes #2"),
            ])
            .with_issues(vec![
                issue(1, "reporter", 50, Some(300)),
                issue(2, "reporter", 50, Some(300)),
            ]);
        let store = MemoryStore::new().inject(StoreFault::ResolvedIssue(1));

        let report = sync(&fetcher, &store, 1000).await.unwrap();
        assert_eq!(report.resolved, 1);
        assert_eq!(report.failed_writes, 1);

        let records = store.resolved_issues(&repo()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].number, 2);

        let record = store.find_repo(&repo()).unwrap().unwrap();
        assert_eq!(record.updated_at, Some(ts(1000)));
    }

    #[tokio::test]
    async fn monthly_series_recomputed() {
        let at = |m: u32, d: u32| Utc.with_ymd_and_hms(2021, m, d, 8, 0, 0).unwrap();
        let month = |m: u32| Utc.with_ymd_and_hms(2021, m, 1, 0, 0, 0).unwrap();

        let fetcher = MockFetcher::new(repo()).with_stars(vec![
            Star {
                user: "a".to_string(),
                starred_at: at(1, 5),
            },
            Star {
                user: "b".to_string(),
                starred_at: at(1, 20),
            },
            Star {
                user: "c".to_string(),
                starred_at: at(3, 2),
            },
        ]);
        let store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap();

        update_repo(&fetcher, &store, &SyncOptions::default(), now)
            .await
            .unwrap();

        let record = store.find_repo(&repo()).unwrap().unwrap();
        assert_eq!(
            record.monthly_stars,
            vec![
                MonthCount {
                    month: month(1),
                    count: 2
                },
                MonthCount {
                    month: month(3),
                    count: 1
                },
            ]
        );
        assert!(record.monthly_commits.is_empty());
    }

    #[tokio::test]
    async fn locked_repository_is_refused() {
        let temp = TempDir::new().unwrap();
        let holder = FileStore::new(temp.path());
        let _guard = holder.lock_repo(&repo()).unwrap();

        let store = FileStore::new(temp.path());
        let fetcher = MockFetcher::new(repo());
        let err = sync(&fetcher, &store, 1000).await.unwrap_err();

        assert!(err.is_locked());
        assert!(matches!(err, SyncError::Store(StoreError::Locked(_))));
        assert!(fetcher.operations().is_empty());
    }

    #[tokio::test]
    async fn file_store_persists_across_instances() {
        let temp = TempDir::new().unwrap();
        let fetcher = MockFetcher::new(repo())
            .with_commits(vec![commit("c1", Some("alice"), 200, "fixes #1")])
            .with_issues(vec![issue(1, "reporter", 50, Some(300))]);

        sync(&fetcher, &FileStore::new(temp.path()), 1000)
            .await
            .unwrap();

        let reopened = FileStore::new(temp.path());
        let record = reopened.find_repo(&repo()).unwrap().unwrap();
        assert_eq!(SyncState::of(&record), SyncState::Synced { since: ts(1000) });
        assert_eq!(reopened.resolved_issues(&repo()).unwrap().len(), 1);
    }
}

mod batch {
    use super::*;

    #[tokio::test]
    async fn failures_do_not_stop_batch() {
        let ok: RepoId = "a/ok".parse().unwrap();
        let bad: RepoId = "b/bad".parse().unwrap();
        let fetchers: Vec<Arc<dyn RepoFetcher>> = vec![
            Arc::new(
                MockFetcher::new(bad.clone())
                    .fail_on(FailOn::GetStats(FetchError::NotFound("gone".into()))),
            ),
            Arc::new(MockFetcher::new(ok.clone())),
        ];
        let store = Arc::new(MemoryStore::new());

        let report = run_batch(fetchers, store.clone(), &BatchOptions::default()).await;

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[0].0, bad);
        assert!(matches!(report.outcomes[0].1, RepoOutcome::Failed(_)));
        assert_eq!(report.outcomes[1].0, ok);
        assert!(matches!(report.outcomes[1].1, RepoOutcome::Synced(_)));
        assert!(!report.is_success());
        assert!(store.find_repo(&ok).unwrap().is_some());
        assert!(store.find_repo(&bad).unwrap().is_none());
    }

    #[tokio::test]
    async fn locked_repository_skipped() {
        let temp = TempDir::new().unwrap();
        let locked: RepoId = "a/locked".parse().unwrap();
        let free: RepoId = "b/free".parse().unwrap();

        let holder = FileStore::new(temp.path());
        let _guard = holder.lock_repo(&locked).unwrap();

        let fetchers: Vec<Arc<dyn RepoFetcher>> = vec![
            Arc::new(MockFetcher::new(locked)),
            Arc::new(MockFetcher::new(free)),
        ];
        let options = BatchOptions {
            jobs: 2,
            ..Default::default()
        };
        let report = run_batch(fetchers, Arc::new(FileStore::new(temp.path())), &options).await;

        assert_eq!(report.skipped(), 1);
        assert_eq!(report.synced(), 1);
        assert!(report.is_success());
    }
}
