//! config command - Locate the config file or add projects to it

use crate::cli::Context;
use crate::core::config::Config;
use crate::core::types::RepoId;
use anyhow::{Context as _, Result};
use std::path::PathBuf;

/// The file `config add` would edit: `--config`, the loaded file, or the
/// canonical location.
fn target_path(ctx: &Context) -> Result<PathBuf> {
    if let Some(path) = &ctx.config_path {
        return Ok(path.clone());
    }
    let result = Config::load(None).context("Failed to load config")?;
    match result.loaded_from {
        Some(path) => Ok(path),
        None => Config::default_config_path().context("Failed to locate config directory"),
    }
}

/// Print the config file path.
pub fn path(ctx: &Context) -> Result<()> {
    println!("{}", target_path(ctx)?.display());
    Ok(())
}

/// Add `repo` to the project list, creating the file if needed.
pub fn add(ctx: &Context, repo: &str) -> Result<()> {
    let repo = repo
        .parse::<RepoId>()
        .with_context(|| format!("Invalid repository '{}'", repo))?;
    let path = target_path(ctx)?;

    let mut file = if path.exists() {
        Config::read_config(&path).context("Failed to read config")?
    } else {
        Default::default()
    };

    let name = repo.to_string();
    if file.projects.contains(&name) {
        if !ctx.quiet {
            println!("{} is already configured", name);
        }
        return Ok(());
    }

    file.projects.push(name.clone());
    file.validate().context("Invalid config")?;
    Config::write_atomic(&path, &file).context("Failed to write config")?;

    if !ctx.quiet {
        println!("Added {} to {}", name, path.display());
    }
    Ok(())
}
