//! Sampling-based schema and relationship inference for document stores.

pub mod facts;
pub mod relationships;
pub mod schema;

pub use facts::DocumentFacts;
pub use relationships::{
    infer_relationships, Cardinality, ForeignKeyCandidate, ReferenceNaming, RelationshipReport,
};
pub use schema::{infer_schema, InferredSchema};
