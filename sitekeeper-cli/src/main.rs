//! Sitekeeper: multi-tenant static site manager.
//!
//! # Usage
//!
//! ```text
//! sitekeeper theme list [--json]
//! sitekeeper theme fetch <name> <url>
//! sitekeeper site create <id> --theme <name> [--theme-url <url>] [--build]
//! sitekeeper site show <id> [--json]
//! sitekeeper site list [--json]
//! sitekeeper site build <id>
//! sitekeeper site render <id>
//! sitekeeper site bundle <id> --output <file>
//! ```
//!
//! Global `--sites-root` / `--themes-root` override `~/.sitekeeper/settings.yaml`.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{site::SiteCommand, theme::ThemeCommand};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "sitekeeper",
    version,
    about = "Create, build and bundle static sites from shared themes",
    long_about = None,
)]
struct Cli {
    /// Directory holding one subdirectory per site.
    #[arg(long, global = true, value_name = "DIR")]
    sites_root: Option<PathBuf>,

    /// Directory holding one subdirectory per theme.
    #[arg(long, global = true, value_name = "DIR")]
    themes_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect and fetch themes.
    Theme {
        #[command(subcommand)]
        command: ThemeCommand,
    },

    /// Create, inspect, build and bundle sites.
    Site {
        #[command(subcommand)]
        command: SiteCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut settings = sitekeeper_core::Settings::load()
        .context("failed to load ~/.sitekeeper/settings.yaml")?;
    if let Some(root) = cli.sites_root {
        settings.sites_root = root;
    }
    if let Some(root) = cli.themes_root {
        settings.themes_root = root;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    runtime.block_on(async move {
        let ctx = commands::Context::open(&settings);
        match cli.command {
            Commands::Theme { command } => commands::theme::run(command, &ctx).await,
            Commands::Site { command } => commands::site::run(command, &ctx).await,
        }
    })
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
