//! Read-only graph queries used by `lineage status`.

use serde::Serialize;

use lineage_core::fact::{labels, rel_types};

use crate::error::GraphResult;
use crate::statement::Statement;
use crate::store::GraphStore;

const KNOWN_LABELS: &[&str] = &[
    labels::DATABASE,
    labels::COLLECTION,
    labels::ROOT,
    labels::CLASS,
    labels::FUNCTION,
    labels::METHOD,
];

const KNOWN_REL_TYPES: &[&str] = &[rel_types::CONTAINS, rel_types::REFERENCES, rel_types::DECLARES];

/// Node and relationship totals, with a breakdown over the labels and
/// relationship types the pipelines write.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphCounts {
    pub nodes: i64,
    pub relationships: i64,
    pub by_label: Vec<(String, i64)>,
    pub by_rel_type: Vec<(String, i64)>,
}

/// Count what is currently in the graph.
pub async fn graph_counts<S: GraphStore + ?Sized>(store: &S) -> GraphResult<GraphCounts> {
    let nodes = store.run(&Statement::count_nodes(None)?).await?.count();
    let relationships = store.run(&Statement::count_edges(None)?).await?.count();

    let mut by_label = Vec::with_capacity(KNOWN_LABELS.len());
    for label in KNOWN_LABELS {
        let count = store.run(&Statement::count_nodes(Some(*label))?).await?.count();
        by_label.push((label.to_string(), count));
    }

    let mut by_rel_type = Vec::with_capacity(KNOWN_REL_TYPES.len());
    for rel_type in KNOWN_REL_TYPES {
        let count = store.run(&Statement::count_edges(Some(*rel_type))?).await?.count();
        by_rel_type.push((rel_type.to_string(), count));
    }

    Ok(GraphCounts {
        nodes,
        relationships,
        by_label,
        by_rel_type,
    })
}
