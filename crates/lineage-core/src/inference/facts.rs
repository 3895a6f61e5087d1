//! Turns inferred schemas and references into graph facts.
//!
//! - (:Database)-[:CONTAINS]->(:Collection)
//! - (:Collection)-[:REFERENCES {field, cardinality}]->(:Collection)

use crate::fact::{labels, rel_types, EdgeFact, NodeFact, NodeRef};

use super::relationships::ForeignKeyCandidate;
use super::schema::InferredSchema;

/// Fact builder scoped to one database of one source system.
#[derive(Debug, Clone)]
pub struct DocumentFacts {
    system: String,
    database: String,
}

impl DocumentFacts {
    pub fn new(system: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            database: database.into(),
        }
    }

    /// `<system>:<database>`
    pub fn database_id(&self) -> String {
        format!("{}:{}", self.system, self.database)
    }

    /// `<system>:<database>.<collection>`
    pub fn collection_id(&self, collection: &str) -> String {
        format!("{}:{}.{}", self.system, self.database, collection)
    }

    pub fn database_ref(&self) -> NodeRef {
        NodeRef::new(labels::DATABASE, self.database_id())
    }

    pub fn collection_ref(&self, collection: &str) -> NodeRef {
        NodeRef::new(labels::COLLECTION, self.collection_id(collection))
    }

    pub fn database_node(&self) -> NodeFact {
        NodeFact::new(labels::DATABASE, self.database_id())
            .with("name", self.database.as_str())
            .with("system", self.system.as_str())
    }

    pub fn collection_node(&self, collection: &str, schema: &InferredSchema) -> NodeFact {
        NodeFact::new(labels::COLLECTION, self.collection_id(collection))
            .with("name", collection)
            .with("database", self.database.as_str())
            .with("schema", schema.to_json())
            .with("fields", schema.fields.len())
            .with("sampled", schema.sampled)
            .with("partial", schema.is_partial())
    }

    pub fn contains_edge(&self, collection: &str) -> EdgeFact {
        EdgeFact::new(
            rel_types::CONTAINS,
            self.database_ref(),
            self.collection_ref(collection),
        )
    }

    pub fn reference_edge(&self, candidate: &ForeignKeyCandidate) -> EdgeFact {
        EdgeFact::new(
            rel_types::REFERENCES,
            self.collection_ref(&candidate.source_collection),
            self.collection_ref(&candidate.target_collection),
        )
        .with("field", candidate.field.as_str())
        .with("cardinality", candidate.cardinality.as_str())
    }
}
