//! `lineage code`: code structure pipeline.

use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use lineage_core::LineageConfig;
use lineage_graph::graph_counts;
use lineage_graph::sync::code_sync::DEFAULT_MULTIPLIER;
use lineage_graph::sync::{sync_code, CodeSyncOptions};

use crate::output;

#[derive(Args)]
pub struct CodeArgs {
    /// Root of the source tree (defaults to the current directory)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Project tag; scopes cleanup and prefixes declaration ids
    #[arg(long)]
    pub project: Option<String>,

    /// Base URL or `{path}`/`{line}` template for source links
    #[arg(long)]
    pub base_url: Option<String>,
}

pub async fn execute(args: CodeArgs, mut config: LineageConfig, dry_run: bool) -> Result<()> {
    if let Some(source) = args.source {
        config.code.source_dir = Some(source);
    }
    if let Some(project) = args.project {
        config.code.project = project;
    }
    if let Some(base_url) = args.base_url {
        config.code.base_url = base_url;
    }

    let root = match config.code.source_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().map_err(|e| anyhow!("No source directory: {}", e))?,
    };

    println!(
        "{} {} {}",
        "Syncing code structure of".bold(),
        config.code.project.cyan(),
        format!("({})", root.display()).dimmed()
    );

    let session = super::open_session(&config, dry_run, DEFAULT_MULTIPLIER).await?;
    let options = CodeSyncOptions::from(&config.code);
    let summary = sync_code(session.as_ref(), &root, &options)
        .await
        .context("Code structure sync failed")?;

    output::print_run_summary("Files", &summary);
    if dry_run {
        output::print_counts(&graph_counts(session.as_ref()).await?);
    }

    Ok(())
}
