//! CLI command definitions and handlers.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use lineage_core::LineageConfig;
use lineage_graph::{connect, GraphStore, MemoryGraph, Neo4jConnector, RetryPolicy};

pub mod code;
pub mod schema;
pub mod status;

/// Lineage - schema and code structure graphs in Neo4j
#[derive(Parser)]
#[command(name = "lineage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to ./lineage.toml, then the user config)
    #[arg(short, long, global = true, env = "LINEAGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Use an in-memory graph instead of connecting to Neo4j
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Infer collection schemas and references from a mongoexport dump
    Schema(schema::SchemaArgs),

    /// Extract classes, functions and methods from a source tree
    Code(code::CodeArgs),

    /// Show node and relationship counts
    Status,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = LineageConfig::load(self.config.as_deref()).context("Failed to load configuration")?;

        match self.command {
            Commands::Schema(args) => schema::execute(args, config, self.dry_run).await,
            Commands::Code(args) => code::execute(args, config, self.dry_run).await,
            Commands::Status => status::execute(config, self.dry_run).await,
        }
    }
}

/// Open the graph session for one run.
///
/// The session lives as long as the returned box; dropping it closes the
/// connection pool.
pub async fn open_session(config: &LineageConfig, dry_run: bool, default_multiplier: f64) -> Result<Box<dyn GraphStore>> {
    if dry_run {
        tracing::info!("Dry run: using an in-memory graph");
        return Ok(Box::new(MemoryGraph::new()));
    }

    let connector = Neo4jConnector::new(config.graph.clone());
    let policy = RetryPolicy::from_config(&config.retry, default_multiplier);
    let client = connect(&connector, &policy)
        .await
        .context("Could not reach the graph store")?;
    Ok(Box::new(client))
}
