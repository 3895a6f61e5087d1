//! Lineage Core Library
//!
//! Value model, fact model, schema and relationship inference over sampled
//! documents, and declaration extraction from source trees.

pub mod code;
pub mod config;
pub mod docstore;
pub mod error;
pub mod fact;
pub mod inference;
pub mod value;

pub use config::LineageConfig;
pub use error::{CoreError, CoreResult};
pub use fact::{EdgeFact, Fact, MergePolicy, NodeFact, NodeRef, Properties, PropertyValue};
pub use value::{Record, Scalar, TypeTag, Value};
