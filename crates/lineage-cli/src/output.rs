//! Terminal output formatting.

use colored::Colorize;
use lineage_graph::{GraphCounts, RunSummary};

/// Print the outcome of a pipeline run. `unit` names what was processed.
pub fn print_run_summary(unit: &str, summary: &RunSummary) {
    let report = &summary.report;

    println!("\n{}", "Sync complete:".green().bold());
    println!("  {:<20} {}", format!("{} processed:", unit), summary.processed.to_string().cyan());
    if !summary.failed.is_empty() {
        println!("  {:<20} {}", format!("{} failed:", unit), summary.failed.len().to_string().red());
    }
    println!("  {:<20} {}", "Nodes removed:", report.nodes_deleted);
    println!("  {:<20} {}", "Nodes merged:", report.nodes_merged);
    println!("  {:<20} {}", "Edges merged:", report.edges_merged);

    if report.skipped > 0 {
        println!(
            "  {:<20} {} {}",
            "Facts skipped:",
            report.skipped.to_string().yellow(),
            format!("({} missing endpoints)", report.missing_endpoints).dimmed()
        );
    }

    for (name, reason) in &summary.failed {
        println!("  {} {} {}", "✗".red(), name, truncate(reason, 80).dimmed());
    }
}

/// Print node and relationship counts.
pub fn print_counts(counts: &GraphCounts) {
    println!("{}", "─".repeat(40));
    println!("  Nodes:         {}", counts.nodes.to_string().cyan());
    for (label, count) in counts.by_label.iter().filter(|(_, c)| *c > 0) {
        println!("    {:<13} {}", label.dimmed(), count);
    }
    println!("  Relationships: {}", counts.relationships.to_string().cyan());
    for (rel_type, count) in counts.by_rel_type.iter().filter(|(_, c)| *c > 0) {
        println!("    {:<13} {}", rel_type.dimmed(), count);
    }
    println!("{}", "─".repeat(40));
}

/// Truncate to at most `max_len` characters, marking the cut with `...`.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
