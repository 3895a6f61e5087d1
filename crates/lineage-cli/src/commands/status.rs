//! `lineage status`: what is in the graph right now.

use anyhow::Result;
use colored::Colorize;

use lineage_core::LineageConfig;
use lineage_graph::graph_counts;

use crate::output;

/// Backoff for the read-only count query; no pipeline runs behind it.
const STATUS_MULTIPLIER: f64 = 1.5;

pub async fn execute(config: LineageConfig, dry_run: bool) -> Result<()> {
    println!("{} {}", "Graph".bold(), config.graph.uri.dimmed());

    let session = super::open_session(&config, dry_run, STATUS_MULTIPLIER).await?;
    let counts = graph_counts(session.as_ref()).await?;
    output::print_counts(&counts);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_on_empty_dry_run_graph() {
        execute(LineageConfig::default(), true).await.unwrap();
    }
}
