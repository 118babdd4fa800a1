//! cli::commands::update
//!
//! Mine repositories into the document store.
//!
//! # Design
//!
//! - Repositories come from the command line, or the configured project list
//! - Each run gets a fresh id attached to every log line
//! - Ctrl-C drops the in-flight repositories; their watermarks are not
//!   written, so the next run repeats their windows
//!
//! # Example
//!
//! ```bash
//! # Sync every configured project
//! gfi-miner update
//!
//! # Sync one repository with debug logging
//! gfi-miner --debug update octocat/hello-world
//! ```

use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use tracing::{info_span, warn, Instrument};
use uuid::Uuid;

use super::load_config;
use crate::cli::Context;
use crate::core::types::RepoId;
use crate::store::{DocumentStore, FileStore};
use crate::sync::{
    github_fetchers, run_batch, BatchOptions, BatchReport, RepoOutcome, SyncOptions, TokenPool,
};

/// Run the update command.
///
/// This is a synchronous wrapper that uses tokio to run the async implementation.
pub fn update(ctx: &Context, repos: &[String], jobs: Option<usize>) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(update_async(ctx, repos, jobs))
}

async fn update_async(ctx: &Context, repos: &[String], jobs: Option<usize>) -> Result<()> {
    let config = load_config(ctx)?;

    let repos: Vec<RepoId> = if repos.is_empty() {
        config.projects()
    } else {
        repos
            .iter()
            .map(|r| {
                r.parse::<RepoId>()
                    .with_context(|| format!("Invalid repository '{}'", r))
            })
            .collect::<Result<_>>()?
    };
    if repos.is_empty() {
        bail!("No repositories given and none configured. Run 'gfi-miner config add <owner/name>'.");
    }

    let jobs = jobs.unwrap_or_else(|| config.jobs());
    if jobs == 0 {
        bail!("--jobs must be at least 1");
    }

    let pool = TokenPool::new(config.tokens());
    if pool.is_empty() {
        warn!("no GitHub tokens configured; requests are unauthenticated and heavily rate limited");
    }

    let store_path = config
        .store_path()
        .context("Failed to locate store directory")?;
    let store: Arc<dyn DocumentStore> = Arc::new(FileStore::new(store_path));
    let fetchers = github_fetchers(&repos, &pool, config.api_base());
    let options = BatchOptions {
        jobs,
        sync: SyncOptions {
            detail_concurrency: config.detail_concurrency(),
        },
    };

    let run_id = Uuid::new_v4();
    let span = info_span!("run", id = %run_id);

    let report = tokio::select! {
        report = run_batch(fetchers, store, &options).instrument(span) => report,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            bail!("Interrupted; unfinished repositories keep their previous watermark");
        }
    };

    if !ctx.quiet {
        print_report(&report);
    }

    if !report.is_success() {
        bail!(
            "{} of {} repositories failed",
            report.failed(),
            report.outcomes.len()
        );
    }
    Ok(())
}

fn print_report(report: &BatchReport) {
    for (repo, outcome) in &report.outcomes {
        match outcome {
            RepoOutcome::Synced(r) => println!(
                "{}: {} resolved ({} stars, {} commits, {} issues, {} pulls, {} users)",
                repo,
                r.resolved,
                r.stars,
                r.commits,
                r.issues,
                r.pulls,
                r.users.len()
            ),
            RepoOutcome::Skipped => println!("{}: skipped (locked)", repo),
            RepoOutcome::Failed(e) => println!("{}: failed: {}", repo, e),
        }
    }
}
