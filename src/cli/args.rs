//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Read configuration from this file
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Warnings and errors only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// gfi-miner - Mines GitHub repositories for resolved issues
#[derive(Parser, Debug)]
#[command(name = "gfi-miner")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of the default locations
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub debug: bool,

    /// Warnings and errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Default log filter for these flags, used when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "gfi_miner=debug"
        } else if self.quiet {
            "warn"
        } else {
            "gfi_miner=info"
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sync repositories and record resolved issues
    #[command(
        name = "update",
        long_about = "Sync repositories and record resolved issues.\n\n\
            Fetches stars, commits, issues and pull requests changed since each \
            repository's last successful sync, refreshes its monthly series, and \
            records who resolved every newly closed issue. Repositories default \
            to the configured project list.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Sync every configured project
    gfi-miner update

    # Sync two repositories, both at once
    gfi-miner update rust-lang/rust tokio-rs/tokio --jobs 2

EXIT STATUS:
    Non-zero if any repository failed. Repositories locked by another
    process are skipped and do not count as failures."
    )]
    Update {
        /// Repositories as owner/name (defaults to the configured projects)
        #[arg(value_name = "REPO")]
        repos: Vec<String>,

        /// Repositories synced concurrently
        #[arg(short, long, value_name = "N")]
        jobs: Option<usize>,
    },

    /// Print stored resolution records for a repository
    #[command(
        name = "show",
        after_help = "\
WORKFLOW EXAMPLES:
    # Human-readable summary
    gfi-miner show octocat/hello-world

    # Full records, one JSON document per line
    gfi-miner show octocat/hello-world --json"
    )]
    Show {
        /// Repository as owner/name
        repo: String,

        /// Print records as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Inspect or edit the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    gfi-miner completion bash >> ~/.bashrc

    # Zsh
    gfi-miner completion zsh > ~/.zfunc/_gfi-miner"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the config file in use, or where one would be written
    Path,
    /// Add a repository to the project list
    Add {
        /// Repository as owner/name
        repo: String,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
