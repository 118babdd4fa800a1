//! core
//!
//! Domain types and configuration for the miner.
//!
//! # Modules
//!
//! - [`types`] - Strong types: RepoId, Issue, Commit, ResolvedIssue, etc.
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Identifiers are validated on construction
//! - Schemas are strict and self-describing
//! - Stored documents round-trip through serde unchanged

pub mod config;
pub mod types;
