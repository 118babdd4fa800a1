//! forge::github
//!
//! GitHub fetcher implementation using the REST API.
//!
//! # Design
//!
//! This module implements the `RepoFetcher` trait for GitHub. Every list
//! endpoint is paginated with `per_page=100&page=N` until a short page is
//! returned. Responses are deserialized into private wire types and then
//! converted into the crate's domain types, so the rest of the crate never
//! sees GitHub's JSON shapes.
//!
//! # Authentication
//!
//! A personal access token is optional. Without one GitHub applies the much
//! lower anonymous rate limit.
//!
//! # Rate Limiting
//!
//! GitHub has rate limits. This implementation:
//! - Returns `FetchError::RateLimited` on 429, or 403 with an exhausted budget
//! - Does not retry (the caller abandons the repository and re-runs later)
//!
//! # Example
//!
//! ```ignore
//! use gfi_miner::forge::github::GitHubFetcher;
//! use gfi_miner::forge::RepoFetcher;
//!
//! let repo = "octocat/hello-world".parse()?;
//! let fetcher = GitHubFetcher::new(Some("ghp_xxx".to_string()), repo);
//! println!("{} requests left", fetcher.get_rate_limit().await?);
//! ```

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::traits::{FetchError, RepoFetcher};
use crate::core::config::DEFAULT_API_BASE;
use crate::core::types::{
    Commit, EventKind, Issue, IssueDetail, IssueEvent, IssueState, PullDetail, RepoId, RepoStats,
    Star,
};

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "gfi-miner";

/// Default media type for REST requests.
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Media type that adds `starred_at` to stargazer listings.
const STAR_MEDIA_TYPE: &str = "application/vnd.github.star+json";

/// GitHub's maximum page size.
const PER_PAGE: usize = 100;

/// Login GitHub shows for deleted accounts.
const GHOST_LOGIN: &str = "ghost";

/// GitHub fetcher bound to one repository.
pub struct GitHubFetcher {
    /// HTTP client for making requests
    client: Client,
    /// Personal access token, if any
    token: Option<String>,
    /// Repository being read
    repo: RepoId,
    /// API base URL (configurable for GitHub Enterprise and tests)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubFetcher")
            .field("has_token", &self.token.is_some())
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubFetcher {
    /// Create a fetcher against `api.github.com`.
    pub fn new(token: Option<String>, repo: RepoId) -> Self {
        Self::with_api_base(token, repo, DEFAULT_API_BASE)
    }

    /// Create a fetcher with a custom API base URL.
    ///
    /// Use this for GitHub Enterprise installations
    /// (e.g. `https://github.example.com/api/v3`) or a mock server.
    pub fn with_api_base(token: Option<String>, repo: RepoId, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token,
            repo,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Check if this fetcher sends credentials.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Build common headers for API requests.
    fn headers(&self, accept: &'static str) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| FetchError::AuthFailed("token is not a valid header value".into()))?;
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, path: &str) -> String {
        if path.is_empty() {
            format!(
                "{}/repos/{}/{}",
                self.api_base,
                self.repo.owner(),
                self.repo.name()
            )
        } else {
            format!(
                "{}/repos/{}/{}/{}",
                self.api_base,
                self.repo.owner(),
                self.repo.name(),
                path
            )
        }
    }

    /// GET a single JSON document.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        accept: &'static str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let response = self
            .client
            .get(url)
            .headers(self.headers(accept)?)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::NetworkError(e.to_string()))?;

        self.handle_response(response).await
    }

    /// GET every page of a list endpoint.
    async fn get_paginated<T: DeserializeOwned>(
        &self,
        url: &str,
        accept: &'static str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, FetchError> {
        let mut all = Vec::new();
        let mut page: u32 = 1;

        loop {
            let mut params = query.to_vec();
            params.push(("per_page", PER_PAGE.to_string()));
            params.push(("page", page.to_string()));

            let items: Vec<T> = self.get_json(url, accept, &params).await?;
            let page_count = items.len();
            all.extend(items);

            if page_count < PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(all)
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, FetchError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| FetchError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            Err(self.error_from_response(response, status).await)
        }
    }

    /// Map an error response from the API.
    async fn error_from_response(&self, response: Response, status: StatusCode) -> FetchError {
        // An exhausted budget is reported as 403 with a zero remaining header.
        let budget_exhausted = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim() == "0")
            .unwrap_or(false);

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED if self.token.is_none() => FetchError::AuthRequired,
            StatusCode::UNAUTHORIZED => FetchError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN if budget_exhausted => FetchError::RateLimited,
            StatusCode::FORBIDDEN => FetchError::AuthFailed(format!("Permission denied: {}", message)),
            StatusCode::NOT_FOUND => FetchError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited,
            _ if status.is_server_error() => FetchError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {}", message),
            },
            _ => FetchError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// Format a timestamp the way GitHub's `since` parameters expect.
fn since_param(since: DateTime<Utc>) -> String {
    since.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl RepoFetcher for GitHubFetcher {
    fn repo(&self) -> &RepoId {
        &self.repo
    }

    async fn get_stats(&self) -> Result<RepoStats, FetchError> {
        let repo: GitHubRepository = self
            .get_json(&self.repo_url(""), JSON_MEDIA_TYPE, &[])
            .await?;
        Ok(repo.into())
    }

    async fn get_rate_limit(&self) -> Result<u64, FetchError> {
        let url = format!("{}/rate_limit", self.api_base);
        let limit: GitHubRateLimit = self.get_json(&url, JSON_MEDIA_TYPE, &[]).await?;
        Ok(limit.resources.core.remaining)
    }

    async fn get_stars(&self, since: DateTime<Utc>) -> Result<Vec<Star>, FetchError> {
        let stargazers: Vec<GitHubStargazer> = self
            .get_paginated(&self.repo_url("stargazers"), STAR_MEDIA_TYPE, &[])
            .await?;

        Ok(stargazers
            .into_iter()
            .filter_map(GitHubStargazer::into_star)
            .filter(|star| star.starred_at >= since)
            .collect())
    }

    async fn get_commits(&self, since: DateTime<Utc>) -> Result<Vec<Commit>, FetchError> {
        let commits: Vec<GitHubCommit> = self
            .get_paginated(
                &self.repo_url("commits"),
                JSON_MEDIA_TYPE,
                &[("since", since_param(since))],
            )
            .await?;
        Ok(commits.into_iter().map(Commit::from).collect())
    }

    async fn get_issues(&self, since: DateTime<Utc>) -> Result<Vec<Issue>, FetchError> {
        let issues: Vec<GitHubIssue> = self
            .get_paginated(
                &self.repo_url("issues"),
                JSON_MEDIA_TYPE,
                &[
                    ("state", "all".to_string()),
                    ("since", since_param(since)),
                ],
            )
            .await?;
        Ok(issues.into_iter().map(Issue::from).collect())
    }

    async fn get_pull_detail(&self, number: u64) -> Result<PullDetail, FetchError> {
        let comments: Vec<GitHubComment> = self
            .get_paginated(
                &self.repo_url(&format!("issues/{}/comments", number)),
                JSON_MEDIA_TYPE,
                &[],
            )
            .await?;
        let commits: Vec<GitHubPullCommit> = self
            .get_paginated(
                &self.repo_url(&format!("pulls/{}/commits", number)),
                JSON_MEDIA_TYPE,
                &[],
            )
            .await?;

        Ok(PullDetail {
            comments: comments.into_iter().filter_map(|c| c.body).collect(),
            commits: commits.into_iter().map(|c| c.sha).collect(),
        })
    }

    async fn get_issue_detail(&self, number: u64) -> Result<IssueDetail, FetchError> {
        let timeline: Vec<GitHubTimelineEvent> = self
            .get_paginated(
                &self.repo_url(&format!("issues/{}/timeline", number)),
                JSON_MEDIA_TYPE,
                &[],
            )
            .await?;

        Ok(IssueDetail {
            events: timeline
                .into_iter()
                .filter_map(GitHubTimelineEvent::into_event)
                .collect(),
        })
    }
}

// --------------------------------------------------------------------------
// API Response Types
// --------------------------------------------------------------------------

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

/// Minimal user object.
#[derive(Deserialize)]
struct GitHubUser {
    login: String,
}

/// Repository response (subset).
#[derive(Deserialize)]
struct GitHubRepository {
    language: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<GitHubRepository> for RepoStats {
    fn from(repo: GitHubRepository) -> Self {
        RepoStats {
            language: repo.language,
            repo_created_at: repo.created_at,
        }
    }
}

/// `/rate_limit` response (subset).
#[derive(Deserialize)]
struct GitHubRateLimit {
    resources: GitHubRateResources,
}

#[derive(Deserialize)]
struct GitHubRateResources {
    core: GitHubRate,
}

#[derive(Deserialize)]
struct GitHubRate {
    remaining: u64,
}

/// Stargazer with the star media type.
#[derive(Deserialize)]
struct GitHubStargazer {
    starred_at: DateTime<Utc>,
    user: Option<GitHubUser>,
}

impl GitHubStargazer {
    /// Stars by deleted accounts carry no user and are dropped.
    fn into_star(self) -> Option<Star> {
        Some(Star {
            user: self.user?.login,
            starred_at: self.starred_at,
        })
    }
}

/// Commit list item.
#[derive(Deserialize)]
struct GitHubCommit {
    sha: String,
    commit: GitHubCommitBody,
    /// Linked account of the author (absent for unlinked emails)
    author: Option<GitHubUser>,
    committer: Option<GitHubUser>,
}

#[derive(Deserialize)]
struct GitHubCommitBody {
    author: GitHubSignature,
    committer: GitHubSignature,
    message: String,
}

#[derive(Deserialize)]
struct GitHubSignature {
    date: DateTime<Utc>,
}

impl From<GitHubCommit> for Commit {
    fn from(gh: GitHubCommit) -> Self {
        Commit {
            sha: gh.sha,
            author: gh.author.map(|u| u.login),
            authored_at: gh.commit.author.date,
            committer: gh.committer.map(|u| u.login),
            committed_at: gh.commit.committer.date,
            message: gh.commit.message,
        }
    }
}

/// Issue list item; pull requests carry a `pull_request` object.
#[derive(Deserialize)]
struct GitHubIssue {
    number: u64,
    user: Option<GitHubUser>,
    state: IssueState,
    created_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    pull_request: Option<GitHubPullRef>,
    title: String,
    body: Option<String>,
    #[serde(default)]
    labels: Vec<GitHubLabel>,
}

#[derive(Deserialize)]
struct GitHubPullRef {
    merged_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct GitHubLabel {
    name: String,
}

impl From<GitHubIssue> for Issue {
    fn from(gh: GitHubIssue) -> Self {
        let is_pull = gh.pull_request.is_some();
        Issue {
            number: gh.number,
            user: gh
                .user
                .map(|u| u.login)
                .unwrap_or_else(|| GHOST_LOGIN.to_string()),
            state: gh.state,
            created_at: gh.created_at,
            closed_at: gh.closed_at,
            is_pull,
            merged_at: gh.pull_request.and_then(|p| p.merged_at),
            title: gh.title,
            body: gh.body,
            labels: gh.labels.into_iter().map(|l| l.name).collect(),
        }
    }
}

/// Issue comment (subset).
#[derive(Deserialize)]
struct GitHubComment {
    body: Option<String>,
}

/// Pull request commit (subset).
#[derive(Deserialize)]
struct GitHubPullCommit {
    sha: String,
}

/// Timeline event. Fields are a union over event kinds; each kind uses
/// only some of them.
#[derive(Deserialize)]
struct GitHubTimelineEvent {
    event: Option<String>,
    created_at: Option<DateTime<Utc>>,
    actor: Option<GitHubUser>,
    /// Comment author (commented events)
    user: Option<GitHubUser>,
    body: Option<String>,
    label: Option<GitHubLabel>,
    assignee: Option<GitHubUser>,
    commit_id: Option<String>,
    source: Option<GitHubEventSource>,
}

#[derive(Deserialize)]
struct GitHubEventSource {
    issue: Option<GitHubSourceIssue>,
}

#[derive(Deserialize)]
struct GitHubSourceIssue {
    number: u64,
}

impl GitHubTimelineEvent {
    /// Convert to a domain event. Entries without an event name are dropped.
    fn into_event(self) -> Option<IssueEvent> {
        let name = self.event?;
        let kind = match name.as_str() {
            "commented" => EventKind::Commented {
                comment: self.body,
                commenter: self.user.as_ref().map(|u| u.login.clone()),
            },
            "labeled" | "unlabeled" => {
                let label = self.label.map(|l| l.name).unwrap_or_default();
                if name == "labeled" {
                    EventKind::Labeled { label }
                } else {
                    EventKind::Unlabeled { label }
                }
            }
            "assigned" => EventKind::Assigned {
                assignee: self.assignee.map(|u| u.login),
            },
            "unassigned" => EventKind::Unassigned {
                assignee: self.assignee.map(|u| u.login),
            },
            "referenced" => EventKind::Referenced {
                commit: self.commit_id,
            },
            "cross-referenced" => EventKind::CrossReferenced {
                source: self.source.and_then(|s| s.issue).map(|i| i.number),
            },
            _ => EventKind::Other {
                event: name.clone(),
            },
        };

        Some(IssueEvent {
            time: self.created_at,
            actor: self.actor.or(self.user).map(|u| u.login),
            kind,
        })
    }
}
