//! Document schema synchronization.
//!
//! Creates nodes and relationships describing one document database:
//! - (:Database)-[:CONTAINS]->(:Collection)
//! - (:Collection)-[:REFERENCES {field, cardinality}]->(:Collection)

use tracing::{info, warn};

use lineage_core::config::DocumentsConfig;
use lineage_core::docstore::DocumentStore;
use lineage_core::fact::{labels, rel_types};
use lineage_core::inference::{infer_relationships, infer_schema, DocumentFacts, ReferenceNaming};
use lineage_core::{Fact, MergePolicy};

use super::{RunSummary, SyncEngine, SyncError, SyncPlan};
use crate::statement::Scope;
use crate::store::GraphStore;

/// Backoff multiplier used when none is configured.
pub const DEFAULT_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone)]
pub struct DocumentSyncOptions {
    pub system: String,
    pub sample_size: usize,
    pub reference_naming: ReferenceNaming,
}

impl From<&DocumentsConfig> for DocumentSyncOptions {
    fn from(config: &DocumentsConfig) -> Self {
        Self {
            system: config.system.clone(),
            sample_size: config.sample_size,
            reference_naming: config.reference_naming,
        }
    }
}

/// Database and collection nodes are owned by this pipeline and always
/// reflect the latest sample.
pub fn plan() -> SyncPlan {
    SyncPlan::new(Scope::Labels(vec![
        labels::DATABASE.to_string(),
        labels::COLLECTION.to_string(),
    ]))
    .label(labels::DATABASE, MergePolicy::OverwriteOnMatch)
    .label(labels::COLLECTION, MergePolicy::OverwriteOnMatch)
    .edge(rel_types::CONTAINS, MergePolicy::CreateOnly)
    .edge(rel_types::REFERENCES, MergePolicy::OverwriteOnMatch)
}

/// Sample every collection of `docs` and converge the graph to match.
pub async fn sync_documents(
    graph: &dyn GraphStore,
    docs: &dyn DocumentStore,
    options: &DocumentSyncOptions,
) -> Result<RunSummary, SyncError> {
    let collections = docs.list_collections()?;
    info!(
        database = docs.database(),
        collections = collections.len(),
        sample_size = options.sample_size,
        "Starting document schema sync"
    );

    let mut engine = SyncEngine::new(graph, plan());
    engine.prepare().await?;

    let facts = DocumentFacts::new(options.system.as_str(), docs.database());
    let mut summary = RunSummary::default();
    engine.apply(vec![facts.database_node().into()]).await?;

    for collection in &collections {
        let schema = infer_schema(docs, collection, options.sample_size);
        match &schema.read_error {
            Some(reason) => summary.fail(collection.as_str(), reason),
            None => summary.processed += 1,
        }
        info!(
            collection = %collection,
            fields = schema.fields.len(),
            sampled = schema.sampled,
            partial = schema.is_partial(),
            "Collection schema inferred"
        );

        engine
            .apply(vec![
                facts.collection_node(collection, &schema).into(),
                facts.contains_edge(collection).into(),
            ])
            .await?;
    }

    let relationships = infer_relationships(docs, &collections, options.sample_size, options.reference_naming);
    for (collection, reason) in &relationships.failures {
        summary.fail(collection.as_str(), reason);
    }
    info!(references = relationships.candidates.len(), "Relationships inferred");

    let edges: Vec<Fact> = relationships
        .candidates
        .iter()
        .map(|candidate| facts.reference_edge(candidate).into())
        .collect();
    engine.apply(edges).await?;

    summary.report = engine.finish();
    for (collection, reason) in &summary.failed {
        warn!(collection = %collection, reason = %reason, "Collection sampling failed");
    }
    info!(
        processed = summary.processed,
        failed = summary.failed.len(),
        nodes = summary.report.nodes_merged,
        edges = summary.report.edges_merged,
        skipped = summary.report.skipped,
        "Document schema sync complete"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGraph;
    use lineage_core::docstore::MemoryStore;
    use lineage_core::{PropertyValue, Record, Value};

    fn record(fields: &[(&str, Value)]) -> Record {
        fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn store() -> MemoryStore {
        MemoryStore::new("shop")
            .with_collection(
                "Users",
                vec![record(&[("_id", Value::reference("u1")), ("name", Value::string("Ada"))])],
            )
            .with_collection(
                "Orders",
                vec![record(&[("_id", Value::reference("o1")), ("userId", Value::reference("u1"))])],
            )
    }

    #[tokio::test]
    async fn test_collection_node_properties() {
        let graph = MemoryGraph::new();
        let options = DocumentSyncOptions::from(&DocumentsConfig::default());

        let summary = sync_documents(&graph, &store(), &options).await.unwrap();
        assert_eq!(summary.processed, 2);
        assert!(summary.failed.is_empty());

        let users = graph.node("Collection", "mongo:shop.Users").unwrap();
        assert_eq!(users["name"], PropertyValue::from("Users"));
        assert_eq!(users["database"], PropertyValue::from("shop"));
        assert_eq!(users["sampled"], PropertyValue::Integer(1));
        assert_eq!(users["partial"], PropertyValue::Boolean(false));
        assert_eq!(
            users["schema"],
            PropertyValue::from(r#"{"_id":["objectId"],"name":["string"]}"#)
        );

        assert!(graph.node("Database", "mongo:shop").is_some());
        assert_eq!(graph.edges("CONTAINS").len(), 2);
    }

    #[tokio::test]
    async fn test_exact_naming_finds_no_alias() {
        let graph = MemoryGraph::new();
        let options = DocumentSyncOptions {
            reference_naming: ReferenceNaming::Exact,
            ..DocumentSyncOptions::from(&DocumentsConfig::default())
        };

        sync_documents(&graph, &store(), &options).await.unwrap();
        assert!(graph.edges("REFERENCES").is_empty());
    }
}
