//! store::file_store
//!
//! File-based document storage.
//!
//! # Layout
//!
//! One pretty-printed JSON file per document under a root directory:
//!
//! ```text
//! <root>/repos/<owner>/<name>.json
//! <root>/stars/<owner>/<name>/<key>.json
//! <root>/commits/<owner>/<name>/<key>.json
//! <root>/issues/<owner>/<name>/<number>.json
//! <root>/resolved/<owner>/<name>/<number>.json
//! <root>/locks/<owner>/<name>.lock
//! ```
//!
//! Star and commit keys are the hex SHA-256 of the natural key (login or
//! commit SHA), so file names never depend on what the forge allows in a
//! login.
//!
//! # Guarantees
//!
//! - All writes are atomic (write to temp file, then rename)
//! - Re-writing a document with the same natural key replaces it
//! - Leftover temp files from an interrupted write are ignored on read
//!
//! # Example
//!
//! ```no_run
//! use gfi_miner::store::{DocumentStore, FileStore};
//!
//! let store = FileStore::new("/var/lib/gfi-miner");
//! let repo = "octocat/hello-world".parse().unwrap();
//! for record in store.resolved_issues(&repo).unwrap() {
//!     println!("#{} resolved by {:?}", record.number, record.resolver);
//! }
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::lock::{LockError, RepoLock};
use super::traits::{sort_commits, sort_stars, DocumentStore, IssueFilter, RepoGuard, StoreError};
use crate::core::types::{Commit, Issue, RepoId, RepoRecord, ResolvedIssue, Star};

const REPOS: &str = "repos";
const STARS: &str = "stars";
const COMMITS: &str = "commits";
const ISSUES: &str = "issues";
const RESOLVED: &str = "resolved";

/// File-based document store rooted at one directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`. Directories are created lazily on
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn repo_path(&self, repo: &RepoId) -> PathBuf {
        self.root
            .join(REPOS)
            .join(repo.owner())
            .join(format!("{}.json", repo.name()))
    }

    fn collection_dir(&self, collection: &str, repo: &RepoId) -> PathBuf {
        self.root
            .join(collection)
            .join(repo.owner())
            .join(repo.name())
    }

    fn hashed_path(&self, collection: &str, repo: &RepoId, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.collection_dir(collection, repo)
            .join(format!("{}.json", hex::encode(digest)))
    }

    fn numbered_path(&self, collection: &str, repo: &RepoId, number: u64) -> PathBuf {
        self.collection_dir(collection, repo)
            .join(format!("{}.json", number))
    }

    /// Serialize `doc` and write it atomically to `path`.
    fn write_doc<T: Serialize>(&self, path: &Path, doc: &T) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        let content =
            serde_json::to_vec_pretty(doc).map_err(|e| StoreError::Serialize(e.to_string()))?;

        let temp_path = path.with_extension("json.tmp");
        {
            let mut file = File::create(&temp_path).map_err(io_err(&temp_path))?;
            file.write_all(&content).map_err(io_err(&temp_path))?;
            file.sync_all().map_err(io_err(&temp_path))?;
        }

        fs::rename(&temp_path, path).map_err(io_err(path))?;
        Ok(())
    }

    /// Read one document, `None` if the file does not exist.
    fn read_doc<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, StoreError> {
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    /// Read every document in a collection directory.
    fn read_all<T: DeserializeOwned>(&self, dir: &Path) -> Result<Vec<T>, StoreError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: dir.to_path_buf(),
                    source,
                })
            }
        };

        let mut docs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(doc) = self.read_doc(&path)? {
                docs.push(doc);
            }
        }
        Ok(docs)
    }
}

/// Map an I/O failure at `path` into a store error.
fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError {
    let path = path.to_path_buf();
    move |source| StoreError::Io { path, source }
}

impl DocumentStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn find_repo(&self, repo: &RepoId) -> Result<Option<RepoRecord>, StoreError> {
        self.read_doc(&self.repo_path(repo))
    }

    fn upsert_repo(&self, record: &RepoRecord) -> Result<(), StoreError> {
        let repo = RepoId::new(record.owner.clone(), record.name.clone())?;
        self.write_doc(&self.repo_path(&repo), record)
    }

    fn upsert_star(&self, repo: &RepoId, star: &Star) -> Result<(), StoreError> {
        self.write_doc(&self.hashed_path(STARS, repo, &star.user), star)
    }

    fn stars(&self, repo: &RepoId) -> Result<Vec<Star>, StoreError> {
        let mut stars: Vec<Star> = self.read_all(&self.collection_dir(STARS, repo))?;
        sort_stars(&mut stars);
        Ok(stars)
    }

    fn upsert_commit(&self, repo: &RepoId, commit: &Commit) -> Result<(), StoreError> {
        self.write_doc(&self.hashed_path(COMMITS, repo, &commit.sha), commit)
    }

    fn commits(&self, repo: &RepoId) -> Result<Vec<Commit>, StoreError> {
        let mut commits: Vec<Commit> = self.read_all(&self.collection_dir(COMMITS, repo))?;
        sort_commits(&mut commits);
        Ok(commits)
    }

    fn upsert_issue(&self, repo: &RepoId, issue: &Issue) -> Result<(), StoreError> {
        self.write_doc(&self.numbered_path(ISSUES, repo, issue.number), issue)
    }

    fn issues(&self, repo: &RepoId, filter: &IssueFilter) -> Result<Vec<Issue>, StoreError> {
        let mut issues: Vec<Issue> = self
            .read_all::<Issue>(&self.collection_dir(ISSUES, repo))?
            .into_iter()
            .filter(|issue| filter.matches(issue))
            .collect();
        issues.sort_by_key(|i| i.number);
        Ok(issues)
    }

    fn upsert_resolved_issue(&self, record: &ResolvedIssue) -> Result<(), StoreError> {
        record.validate()?;
        let repo = record.repo_id()?;
        self.write_doc(&self.numbered_path(RESOLVED, &repo, record.number), record)
    }

    fn resolved_issues(&self, repo: &RepoId) -> Result<Vec<ResolvedIssue>, StoreError> {
        let mut records: Vec<ResolvedIssue> =
            self.read_all(&self.collection_dir(RESOLVED, repo))?;
        records.sort_by_key(|r| r.number);
        Ok(records)
    }

    fn lock_repo(&self, repo: &RepoId) -> Result<RepoGuard, StoreError> {
        match RepoLock::acquire(&self.root, repo) {
            Ok(lock) => Ok(RepoGuard::from_lock(lock)),
            Err(LockError::AlreadyLocked) => Err(StoreError::Locked(repo.clone())),
            Err(e) => Err(e.into()),
        }
    }
}
