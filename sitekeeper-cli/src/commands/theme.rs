//! `sitekeeper theme list` and `sitekeeper theme fetch <name> <url>`

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use sitekeeper_core::ThemeName;

use super::Context;

#[derive(Subcommand, Debug)]
pub enum ThemeCommand {
    /// List themes present under the theme root.
    List(ListArgs),

    /// Fetch a theme from a remote repository into the theme root.
    Fetch(FetchArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Theme name (directory name under the theme root).
    pub name: ThemeName,

    /// Repository URL passed to the fetch tool.
    pub url: String,
}

#[derive(Serialize, Tabled)]
struct ThemeRow {
    #[tabled(rename = "theme")]
    name: String,
    #[tabled(rename = "path")]
    path: String,
}

pub async fn run(cmd: ThemeCommand, ctx: &Context) -> Result<()> {
    match cmd {
        ThemeCommand::List(args) => list(args, ctx),
        ThemeCommand::Fetch(args) => fetch(args, ctx).await,
    }
}

fn list(args: ListArgs, ctx: &Context) -> Result<()> {
    let themes = ctx.store.themes();
    let rows: Vec<ThemeRow> = themes
        .list()
        .with_context(|| format!("failed to list themes in {}", themes.root().display()))?
        .into_iter()
        .map(|theme| ThemeRow {
            name: theme.name.to_string(),
            path: theme.path.display().to_string(),
        })
        .collect();

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).context("failed to serialize theme JSON")?
        );
        return Ok(());
    }
    if rows.is_empty() {
        println!("No themes found in {}.", themes.root().display());
        return Ok(());
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

async fn fetch(args: FetchArgs, ctx: &Context) -> Result<()> {
    let theme = ctx
        .store
        .themes()
        .fetch(&args.name, &args.url, &ctx.cancel)
        .await
        .with_context(|| format!("failed to fetch theme '{}'", args.name))?;
    println!(
        "{} theme {} ready at {}",
        "✓".green(),
        theme.name.to_string().bold(),
        theme.path.display()
    );
    Ok(())
}
