//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads configuration and validates command-specific arguments
//! 2. Calls into [`crate::sync`] or [`crate::store`]
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! `update` is async because it involves network I/O. Its handler builds a
//! tokio runtime and blocks on the async implementation, so dispatch stays
//! synchronous.

mod completion;
mod config_cmd;
mod show;
mod update;

// Re-export command functions for testing and direct invocation
pub use completion::completion;
pub use config_cmd::{add as config_add, path as config_path};
pub use show::show;
pub use update::update;

use crate::cli::args::{Command, ConfigAction};
use crate::cli::Context;
use crate::core::config::Config;
use anyhow::{Context as _, Result};

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Update { repos, jobs } => update::update(ctx, &repos, jobs),
        Command::Show { repo, json } => show::show(ctx, &repo, json),
        Command::Config { action } => match action {
            ConfigAction::Path => config_cmd::path(ctx),
            ConfigAction::Add { repo } => config_cmd::add(ctx, &repo),
        },
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Load configuration honoring `--config`.
fn load_config(ctx: &Context) -> Result<Config> {
    let result = Config::load(ctx.config_path.as_deref()).context("Failed to load config")?;
    match &result.loaded_from {
        Some(path) => tracing::debug!(path = %path.display(), "loaded config"),
        None => tracing::debug!("no config file found, using defaults"),
    }
    Ok(result.config)
}
