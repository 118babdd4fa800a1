//! gfi-miner - Mines GitHub repositories for resolved issues
//!
//! For every issue closed in a repository, gfi-miner works out who resolved
//! it and where: a pull request whose text claims to close the issue, or a
//! commit whose message does. Each resolution is stored together with the
//! resolver's prior commit count and the issue's timeline, forming a dataset
//! of newcomer-friendly issues and the people who fixed them.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to sync)
//! - [`sync`] - Incremental per-repository sync and the batch driver
//! - [`resolve`] - Resolution engine: commit and pull request matchers
//! - [`forge`] - Repository fetcher abstraction (GitHub, mock)
//! - [`store`] - Document store abstraction (file-backed, in-memory)
//! - [`core`] - Domain types and configuration
//!
//! # Correctness Invariants
//!
//! 1. A resolution is recorded only with closing evidence
//! 2. A repository's watermark advances only after a complete run
//! 3. All writes are idempotent upserts by natural key

pub mod cli;
pub mod core;
pub mod forge;
pub mod resolve;
pub mod store;
pub mod sync;
