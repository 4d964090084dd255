//! `sitekeeper site ...` subcommands.

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use sitekeeper_core::{Lookup, NewSite, SiteConfig, SiteId, SiteMetadata, ThemeName};
use sitekeeper_store::{BuildReport, Site};

use super::Context;

#[derive(Subcommand, Debug)]
pub enum SiteCommand {
    /// Create a site, fetching its theme first if needed.
    Create(CreateArgs),

    /// Show one site's configuration.
    Show(ShowArgs),

    /// List all sites under the site root.
    List(ListArgs),

    /// Run the build engine for a site.
    Build(IdArgs),

    /// Make sure a site has rendered pages and list them.
    Render(IdArgs),

    /// Write a deterministic tar.zst of a site's published output.
    Bundle(BundleArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Site ID (directory name under the site root).
    pub id: SiteId,

    /// Theme to build the site with.
    #[arg(long)]
    pub theme: ThemeName,

    /// Where to fetch the theme from if it is not present locally.
    #[arg(long, value_name = "URL")]
    pub theme_url: Option<String>,

    #[arg(long, value_name = "URL", default_value = "http://localhost")]
    pub base_url: String,

    #[arg(long, default_value = "en-us")]
    pub language_code: String,

    /// Site title. Defaults to the site ID.
    #[arg(long)]
    pub title: Option<String>,

    /// Build the site right after creating it.
    #[arg(long)]
    pub build: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub id: SiteId,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct IdArgs {
    pub id: SiteId,
}

#[derive(Args, Debug)]
pub struct BundleArgs {
    pub id: SiteId,

    /// Destination file for the archive.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: PathBuf,
}

pub async fn run(cmd: SiteCommand, ctx: &Context) -> Result<()> {
    match cmd {
        SiteCommand::Create(args) => create(args, ctx).await,
        SiteCommand::Show(args) => show(args, ctx).await,
        SiteCommand::List(args) => list(args, ctx).await,
        SiteCommand::Build(args) => build(args, ctx).await,
        SiteCommand::Render(args) => render(args, ctx).await,
        SiteCommand::Bundle(args) => bundle(args, ctx).await,
    }
}

// ---------------------------------------------------------------------------
// JSON / table shapes
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SiteJson {
    id: String,
    theme: String,
    root: String,
    base_url: String,
    language_code: String,
    title: String,
    themes_dir: String,
    content_dir: String,
    layout_dir: String,
    publish_dir: String,
}

impl From<&SiteConfig> for SiteJson {
    fn from(config: &SiteConfig) -> Self {
        Self {
            id: config.id.to_string(),
            theme: config.theme.to_string(),
            root: config.root.display().to_string(),
            base_url: config.metadata.base_url.clone(),
            language_code: config.metadata.language_code.clone(),
            title: config.metadata.title.clone(),
            themes_dir: config.layout.themes_dir.display().to_string(),
            content_dir: config.layout.content_dir.display().to_string(),
            layout_dir: config.layout.layout_dir.display().to_string(),
            publish_dir: config.layout.publish_dir.display().to_string(),
        }
    }
}

#[derive(Serialize)]
struct SiteListJson {
    id: String,
    status: &'static str,
    theme: Option<String>,
    detail: Option<String>,
}

#[derive(Tabled)]
struct SiteTableRow {
    #[tabled(rename = "site")]
    id: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "theme")]
    theme: String,
    #[tabled(rename = "detail")]
    detail: String,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn create(args: CreateArgs, ctx: &Context) -> Result<()> {
    let title = args.title.unwrap_or_else(|| args.id.to_string());
    let request = NewSite {
        id: args.id.clone(),
        theme: args.theme,
        theme_url: args.theme_url,
        metadata: SiteMetadata {
            base_url: args.base_url,
            language_code: args.language_code,
            title,
        },
    };

    let site = ctx
        .store
        .create(request, &ctx.cancel)
        .await
        .with_context(|| format!("failed to create site '{}'", args.id))?;
    println!(
        "{} created site {} at {}",
        "✓".green(),
        site.id().to_string().bold(),
        site.root().display()
    );

    if args.build {
        let report = ctx
            .store
            .build(site.id(), &ctx.cancel)
            .await
            .with_context(|| format!("site '{}' was created but its build failed", args.id))?;
        print_build(&report);
    }
    Ok(())
}

async fn show(args: ShowArgs, ctx: &Context) -> Result<()> {
    let site = require(ctx, &args.id).await?;
    let config = site.config();
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&SiteJson::from(config))
                .context("failed to serialize site JSON")?
        );
        return Ok(());
    }

    println!("{}", config.id.to_string().bold());
    println!("  theme:         {}", config.theme);
    println!("  root:          {}", config.root.display());
    println!("  base URL:      {}", config.metadata.base_url);
    println!("  language code: {}", config.metadata.language_code);
    println!("  title:         {}", config.metadata.title);
    println!("  publish dir:   {}", config.layout.publish_dir.display());
    Ok(())
}

async fn list(args: ListArgs, ctx: &Context) -> Result<()> {
    let ids = ctx.store.list().with_context(|| {
        format!("failed to list sites in {}", ctx.store.root().display())
    })?;

    let mut entries = Vec::with_capacity(ids.len());
    for id in ids {
        let entry = match ctx.store.find(&id).await {
            Lookup::Found(site) => SiteListJson {
                id: id.to_string(),
                status: "ok",
                theme: Some(site.config().theme.to_string()),
                detail: None,
            },
            Lookup::NotFound => continue,
            Lookup::Corrupt(detail) => SiteListJson {
                id: id.to_string(),
                status: "corrupt",
                theme: None,
                detail: Some(detail),
            },
            Lookup::Unreadable(detail) => SiteListJson {
                id: id.to_string(),
                status: "unreadable",
                theme: None,
                detail: Some(detail),
            },
        };
        entries.push(entry);
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).context("failed to serialize site JSON")?
        );
        return Ok(());
    }
    if entries.is_empty() {
        println!("No sites found in {}.", ctx.store.root().display());
        return Ok(());
    }

    let rows: Vec<SiteTableRow> = entries
        .into_iter()
        .map(|entry| SiteTableRow {
            id: entry.id,
            status: status_label(entry.status),
            theme: entry.theme.unwrap_or_default(),
            detail: entry.detail.unwrap_or_default(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

async fn build(args: IdArgs, ctx: &Context) -> Result<()> {
    let report = ctx
        .store
        .build(&args.id, &ctx.cancel)
        .await
        .with_context(|| format!("failed to build site '{}'", args.id))?;
    print_build(&report);
    Ok(())
}

async fn render(args: IdArgs, ctx: &Context) -> Result<()> {
    let report = ctx
        .store
        .render(&args.id, &ctx.cancel)
        .await
        .with_context(|| format!("failed to render site '{}'", args.id))?;
    if let Some(build) = &report.build {
        print_build(build);
    }
    println!(
        "{} site {} has {} published pages",
        "✓".green(),
        args.id.to_string().bold(),
        report.pages.len()
    );
    for page in &report.pages {
        println!("  {}", page.display());
    }
    Ok(())
}

async fn bundle(args: BundleArgs, ctx: &Context) -> Result<()> {
    let site = require(ctx, &args.id).await?;
    let output = args.output.clone();
    let bundle = tokio::task::spawn_blocking(move || {
        let bundle = site.generate_bundle()?;
        bundle.write_to(&output)?;
        Ok::<_, sitekeeper_store::StoreError>(bundle)
    })
    .await
    .context("bundle task panicked")?
    .with_context(|| format!("failed to bundle site '{}'", args.id))?;

    println!(
        "{} wrote {} ({} files, {} bytes, sha256 {})",
        "✓".green(),
        args.output.display(),
        bundle.file_count,
        bundle.bytes.len(),
        bundle.sha256
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn require(ctx: &Context, id: &SiteId) -> Result<Site> {
    match ctx.store.find(id).await {
        Lookup::Found(site) => Ok(site),
        Lookup::NotFound => bail!("site '{id}' not found in {}", ctx.store.root().display()),
        Lookup::Corrupt(detail) => bail!("site '{id}' is corrupt: {detail}"),
        Lookup::Unreadable(detail) => bail!("site '{id}' is unreadable: {detail}"),
    }
}

fn print_build(report: &BuildReport) {
    let elapsed = report.finished_at - report.started_at;
    println!(
        "{} built site {} in {} ms",
        "✓".green(),
        report.site.to_string().bold(),
        elapsed.num_milliseconds()
    );
    tracing::debug!(
        site = %report.site,
        started_at = %report.started_at.to_rfc3339(),
        "build finished"
    );
}

fn status_label(status: &str) -> String {
    match status {
        "ok" => "OK".green().to_string(),
        other => other.to_uppercase().red().to_string(),
    }
}
