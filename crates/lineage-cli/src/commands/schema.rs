//! `lineage schema`: document schema pipeline.

use anyhow::{anyhow, Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;

use lineage_core::docstore::DumpStore;
use lineage_core::inference::ReferenceNaming;
use lineage_core::LineageConfig;
use lineage_graph::graph_counts;
use lineage_graph::sync::document_sync::DEFAULT_MULTIPLIER;
use lineage_graph::sync::{sync_documents, DocumentSyncOptions};

use crate::output;

#[derive(Args)]
pub struct SchemaArgs {
    /// Directory with one mongoexport file per collection
    #[arg(long)]
    pub dump_dir: Option<PathBuf>,

    /// Database name (defaults to the dump directory name)
    #[arg(long)]
    pub database: Option<String>,

    /// Records sampled per collection
    #[arg(long)]
    pub sample_size: Option<usize>,

    /// How `<X>Id` field names are matched against collection names
    #[arg(long, value_enum)]
    pub naming: Option<Naming>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Naming {
    /// Only `<Collection>Id`
    Exact,
    /// Also the singular lower-camel form, e.g. `userId` for `Users`
    Conventional,
}

impl From<Naming> for ReferenceNaming {
    fn from(naming: Naming) -> Self {
        match naming {
            Naming::Exact => ReferenceNaming::Exact,
            Naming::Conventional => ReferenceNaming::Conventional,
        }
    }
}

pub async fn execute(args: SchemaArgs, mut config: LineageConfig, dry_run: bool) -> Result<()> {
    if let Some(dir) = args.dump_dir {
        config.documents.dump_dir = Some(dir);
    }
    if let Some(database) = args.database {
        config.documents.database = Some(database);
    }
    if let Some(n) = args.sample_size {
        config.documents.sample_size = n;
    }
    if let Some(naming) = args.naming {
        config.documents.reference_naming = naming.into();
    }

    let dump_dir = config
        .documents
        .dump_dir
        .clone()
        .ok_or_else(|| anyhow!("No dump directory given. Use --dump-dir or set MONGO_DUMP_DIR."))?;
    let store = DumpStore::open(&dump_dir, config.documents.database.clone())
        .with_context(|| format!("Failed to open dump directory {}", dump_dir.display()))?;

    println!("{}", "Syncing document schema...".bold());

    let session = super::open_session(&config, dry_run, DEFAULT_MULTIPLIER).await?;
    let options = DocumentSyncOptions::from(&config.documents);
    let summary = sync_documents(session.as_ref(), &store, &options)
        .await
        .context("Document schema sync failed")?;

    output::print_run_summary("Collections", &summary);
    if dry_run {
        output::print_counts(&graph_counts(session.as_ref()).await?);
    }

    Ok(())
}
