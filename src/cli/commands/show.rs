//! show command - Print stored resolution records

use anyhow::{Context as _, Result};

use super::load_config;
use crate::cli::Context;
use crate::core::types::{Confidence, RepoId};
use crate::store::{DocumentStore, FileStore};
use crate::sync::SyncState;

/// Print the resolution records stored for `repo`.
pub fn show(ctx: &Context, repo: &str, json: bool) -> Result<()> {
    let repo = repo
        .parse::<RepoId>()
        .with_context(|| format!("Invalid repository '{}'", repo))?;
    let config = load_config(ctx)?;
    let store = FileStore::new(
        config
            .store_path()
            .context("Failed to locate store directory")?,
    );

    let records = store
        .resolved_issues(&repo)
        .with_context(|| format!("Failed to read resolutions for {}", repo))?;

    if json {
        for record in &records {
            println!("{}", serde_json::to_string(record)?);
        }
        return Ok(());
    }

    let state = store
        .find_repo(&repo)
        .with_context(|| format!("Failed to read {}", repo))?
        .map(|r| SyncState::of(&r));
    match state {
        Some(state) => println!("{} ({}, {} resolved)", repo, state, records.len()),
        None => println!("{} (not mined yet)", repo),
    }

    for record in &records {
        let marker = match record.confidence {
            Confidence::High => "",
            Confidence::Low => " (low confidence)",
        };
        println!(
            "  #{:<6} {:<20} {:<14} prior commits: {}{}",
            record.number,
            record.resolver.as_deref().unwrap_or("-"),
            record.resolved_in.to_string(),
            record.resolver_commit_num,
            marker
        );
    }
    Ok(())
}
