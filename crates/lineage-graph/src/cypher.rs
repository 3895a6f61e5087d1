//! Cypher rendering of statement templates.
//!
//! Labels and relationship types are interpolated (Cypher cannot bind them
//! as parameters); they are validated identifiers by construction. All other
//! values stay as `$`-parameters.

use lineage_core::MergePolicy;

use crate::statement::Template;

/// Column carrying the count for templates that return one.
pub const COUNT_COLUMN: &str = "count";

pub fn render(template: &Template) -> String {
    match template {
        Template::Ping => "RETURN 1".to_string(),
        Template::UniqueId { label } => format!(
            "CREATE CONSTRAINT IF NOT EXISTS FOR (n:{}) REQUIRE n.id IS UNIQUE",
            label
        ),
        Template::DeleteLabels => format!(
            "MATCH (n) WHERE any(l IN labels(n) WHERE l IN $labels)
             DETACH DELETE n
             RETURN count(n) AS {}",
            COUNT_COLUMN
        ),
        Template::DeleteProject => format!(
            "MATCH (n) WHERE n.project = $project
             DETACH DELETE n
             RETURN count(n) AS {}",
            COUNT_COLUMN
        ),
        Template::MergeNode { label, policy } => format!(
            "MERGE (n:{} {{id: $id}})
             {} n += $props
             RETURN count(n) AS {}",
            label,
            set_clause(*policy),
            COUNT_COLUMN
        ),
        Template::MergeEdge {
            rel_type,
            from_label,
            to_label,
            policy,
        } => format!(
            "MATCH (a:{} {{id: $from}})
             MATCH (b:{} {{id: $to}})
             MERGE (a)-[r:{}]->(b)
             {} r += $props
             RETURN count(r) AS {}",
            from_label,
            to_label,
            rel_type,
            set_clause(*policy),
            COUNT_COLUMN
        ),
        Template::CountNodes { label } => match label {
            Some(label) => format!("MATCH (n:{}) RETURN count(n) AS {}", label, COUNT_COLUMN),
            None => format!("MATCH (n) RETURN count(n) AS {}", COUNT_COLUMN),
        },
        Template::CountEdges { rel_type } => match rel_type {
            Some(rel_type) => format!(
                "MATCH ()-[r:{}]->() RETURN count(r) AS {}",
                rel_type, COUNT_COLUMN
            ),
            None => format!("MATCH ()-[r]->() RETURN count(r) AS {}", COUNT_COLUMN),
        },
    }
}

fn set_clause(policy: MergePolicy) -> &'static str {
    match policy {
        MergePolicy::CreateOnly => "ON CREATE SET",
        MergePolicy::OverwriteOnMatch => "SET",
    }
}
