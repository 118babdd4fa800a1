//! core::types
//!
//! Strong types for the mined repository data.
//!
//! # Types
//!
//! - [`RepoId`] - Validated `owner/name` repository identifier
//! - [`Commit`], [`Issue`], [`Star`] - Raw documents observed on the forge
//! - [`IssueEvent`] / [`EventKind`] - Issue timeline events with per-kind payloads
//! - [`ResolvedIn`] - The artifact that resolved an issue
//! - [`ResolvedIssue`] - The persisted resolution record
//! - [`RepoRecord`] / [`MonthCount`] - Repository statistics and sync watermark
//!
//! # Validation
//!
//! `RepoId` enforces validity at construction time, and `ResolvedIssue`
//! exposes [`ResolvedIssue::validate`] which stores call before accepting
//! a record.
//!
//! # Examples
//!
//! ```
//! use gfi_miner::core::types::{RepoId, ResolvedIn};
//!
//! let repo: RepoId = "rust-lang/rust".parse().unwrap();
//! assert_eq!(repo.owner(), "rust-lang");
//! assert_eq!(repo.name(), "rust");
//!
//! assert!("no-slash".parse::<RepoId>().is_err());
//! assert_eq!(ResolvedIn::PullRequest(7).to_string(), "#7");
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid repository id: {0}")]
    InvalidRepoId(String),

    #[error("invalid resolution record: {0}")]
    InvalidRecord(String),
}

/// A validated `owner/name` repository identifier.
///
/// Both halves must be non-empty and free of whitespace, and the name may
/// not contain a further `/`.
///
/// # Example
///
/// ```
/// use gfi_miner::core::types::RepoId;
///
/// let id = RepoId::new("octocat", "hello-world").unwrap();
/// assert_eq!(id.to_string(), "octocat/hello-world");
///
/// assert!(RepoId::new("", "repo").is_err());
/// assert!("owner/name/extra".parse::<RepoId>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoId {
    owner: String,
    name: String,
}

impl RepoId {
    /// Create a validated repository id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRepoId` if either half is empty or malformed.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, TypeError> {
        let owner = owner.into();
        let name = name.into();
        Self::validate_part(&owner, "owner")?;
        Self::validate_part(&name, "name")?;
        Ok(Self { owner, name })
    }

    fn validate_part(part: &str, what: &str) -> Result<(), TypeError> {
        if part.is_empty() {
            return Err(TypeError::InvalidRepoId(format!("{what} cannot be empty")));
        }
        if part.contains('/') {
            return Err(TypeError::InvalidRepoId(format!(
                "{what} cannot contain '/'"
            )));
        }
        if part == "." || part == ".." {
            return Err(TypeError::InvalidRepoId(format!("{what} cannot be '{part}'")));
        }
        if part.chars().any(|c| c.is_whitespace() || c.is_ascii_control()) {
            return Err(TypeError::InvalidRepoId(format!(
                "{what} cannot contain whitespace"
            )));
        }
        Ok(())
    }

    /// Repository owner (user or organization).
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for RepoId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, name)) => Self::new(owner, name),
            None => Err(TypeError::InvalidRepoId(format!(
                "expected 'owner/name', got '{s}'"
            ))),
        }
    }
}

impl TryFrom<String> for RepoId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RepoId> for String {
    fn from(id: RepoId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A commit observed on the default branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    /// Forge login of the author; `None` when the email is not linked to an account
    pub author: Option<String>,
    pub authored_at: DateTime<Utc>,
    /// Forge login of the committer, `None` if unlinked
    pub committer: Option<String>,
    pub committed_at: DateTime<Utc>,
    pub message: String,
}

/// Lifecycle state of an issue or pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueState::Open => write!(f, "open"),
            IssueState::Closed => write!(f, "closed"),
        }
    }
}

/// An issue or pull request. Pull requests have `is_pull` set and may carry
/// a `merged_at` time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    /// Login of the reporter (issue) or submitter (pull request)
    pub user: String,
    pub state: IssueState,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub is_pull: bool,
    pub merged_at: Option<DateTime<Utc>>,
    pub title: String,
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// A star given to the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Star {
    pub user: String,
    pub starred_at: DateTime<Utc>,
}

/// Repository-level attributes reported by the forge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoStats {
    /// Main language, as reported by the forge
    pub language: Option<String>,
    pub repo_created_at: DateTime<Utc>,
}

/// Full text and constituent commits of a pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullDetail {
    /// Comment bodies, in creation order
    pub comments: Vec<String>,
    /// SHAs of the commits that make up the pull request
    pub commits: Vec<String>,
}

/// Timeline of an issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDetail {
    pub events: Vec<IssueEvent>,
}

/// One issue timeline event.
///
/// Fields common to every event live on the struct; the kind-specific
/// payload is flattened next to them under the `type` discriminant.
///
/// ```
/// use gfi_miner::core::types::{EventKind, IssueEvent};
///
/// let event = IssueEvent {
///     time: None,
///     actor: Some("alice".into()),
///     kind: EventKind::Labeled { label: "good first issue".into() },
/// };
/// let json = serde_json::to_value(&event).unwrap();
/// assert_eq!(json["type"], "labeled");
/// assert_eq!(json["label"], "good first issue");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueEvent {
    pub time: Option<DateTime<Utc>>,
    pub actor: Option<String>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl IssueEvent {
    /// Logins mentioned by this event beyond the actor.
    pub fn participants(&self) -> impl Iterator<Item = &str> {
        let extra = match &self.kind {
            EventKind::Commented { commenter, .. } => commenter.as_deref(),
            EventKind::Assigned { assignee } | EventKind::Unassigned { assignee } => {
                assignee.as_deref()
            }
            _ => None,
        };
        self.actor.as_deref().into_iter().chain(extra)
    }
}

/// Kind-specific payload of an [`IssueEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EventKind {
    Commented {
        comment: Option<String>,
        commenter: Option<String>,
    },
    Labeled {
        label: String,
    },
    Unlabeled {
        label: String,
    },
    Assigned {
        assignee: Option<String>,
    },
    Unassigned {
        assignee: Option<String>,
    },
    /// Referenced from a commit
    Referenced {
        commit: Option<String>,
    },
    /// Referenced from another issue or pull request
    CrossReferenced {
        source: Option<u64>,
    },
    /// Any other timeline event, keeping the forge's event name
    Other {
        event: String,
    },
}

/// The artifact through which an issue was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedIn {
    /// A commit SHA whose message closes the issue
    Commit(String),
    /// A pull request number whose text closes the issue
    PullRequest(u64),
}

impl fmt::Display for ResolvedIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedIn::Commit(sha) => write!(f, "{}", sha.get(..12).unwrap_or(sha)),
            ResolvedIn::PullRequest(number) => write!(f, "#{number}"),
        }
    }
}

/// How much the resolver attribution can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// The resolver login is known
    #[default]
    High,
    /// Placeholder from a commit with no linked author
    Low,
}

/// A resolution candidate produced by one of the matchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub number: u64,
    pub resolver: Option<String>,
    pub resolved_in: ResolvedIn,
    /// Resolver's commits authored strictly before the resolution evidence
    pub resolver_commit_num: u64,
    pub confidence: Confidence,
}

/// Persisted resolution record, unique per `(owner, name, number)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIssue {
    pub owner: String,
    pub name: String,
    pub number: u64,
    pub created_at: DateTime<Utc>,
    pub resolved_at: DateTime<Utc>,
    pub resolver: Option<String>,
    pub resolved_in: ResolvedIn,
    pub resolver_commit_num: u64,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub events: Vec<IssueEvent>,
}

impl ResolvedIssue {
    /// Check record-level invariants before persisting.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRecord` if the record is resolved before it
    /// was created, or claims high confidence without a resolver.
    pub fn validate(&self) -> Result<(), TypeError> {
        if self.resolved_at < self.created_at {
            return Err(TypeError::InvalidRecord(format!(
                "issue #{} resolved at {} before it was created at {}",
                self.number, self.resolved_at, self.created_at
            )));
        }
        if self.confidence == Confidence::High && self.resolver.is_none() {
            return Err(TypeError::InvalidRecord(format!(
                "issue #{} has high confidence but no resolver",
                self.number
            )));
        }
        Ok(())
    }

    /// The repository this record belongs to.
    pub fn repo_id(&self) -> Result<RepoId, TypeError> {
        RepoId::new(self.owner.clone(), self.name.clone())
    }
}

/// Count of events in one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthCount {
    /// First instant of the month (UTC)
    pub month: DateTime<Utc>,
    pub count: u64,
}

/// Repository statistics and sync watermark, unique per `(owner, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRecord {
    pub owner: String,
    pub name: String,
    /// When this repository was first seen by the miner
    pub created_at: DateTime<Utc>,
    /// Watermark of the last successful sync; `None` before the first one
    pub updated_at: Option<DateTime<Utc>>,
    pub language: Option<String>,
    pub repo_created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub monthly_stars: Vec<MonthCount>,
    #[serde(default)]
    pub monthly_commits: Vec<MonthCount>,
    #[serde(default)]
    pub monthly_issues: Vec<MonthCount>,
    #[serde(default)]
    pub monthly_pulls: Vec<MonthCount>,
}

impl RepoRecord {
    /// A record for a repository seen for the first time.
    pub fn new(repo: &RepoId, now: DateTime<Utc>) -> Self {
        Self {
            owner: repo.owner().to_string(),
            name: repo.name().to_string(),
            created_at: now,
            updated_at: None,
            language: None,
            repo_created_at: None,
            monthly_stars: Vec::new(),
            monthly_commits: Vec::new(),
            monthly_issues: Vec::new(),
            monthly_pulls: Vec::new(),
        }
    }

    /// Overwrite forge-reported attributes.
    pub fn apply_stats(&mut self, stats: &RepoStats) {
        self.language = stats.language.clone();
        self.repo_created_at = Some(stats.repo_created_at);
    }
}
