//! store
//!
//! Persistent document collections for mined data.
//!
//! # Architecture
//!
//! The sync orchestrator reads and writes exclusively through the
//! [`DocumentStore`] trait; backends are interchangeable.
//!
//! - [`FileStore`]: JSON documents on disk with per-repository locks
//! - [`MemoryStore`]: in-process maps with injectable write faults
//!
//! Records are keyed by natural key and every write replaces in place, so
//! syncing the same window twice leaves the store unchanged.

mod file_store;
pub mod lock;
mod memory;
mod traits;

pub use file_store::FileStore;
pub use memory::{MemoryStore, StoreFault};
pub use traits::{DocumentStore, IssueFilter, RepoGuard, StoreError};
