//! Node and edge facts: the intermediate representation shared by every
//! extractor and consumed by the graph synchronizer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Node labels produced by the extractors.
pub mod labels {
    pub const ROOT: &str = "Root";
    pub const DATABASE: &str = "Database";
    pub const COLLECTION: &str = "Collection";
    pub const CLASS: &str = "Class";
    pub const FUNCTION: &str = "Function";
    pub const METHOD: &str = "Method";
}

/// Relationship types produced by the extractors.
pub mod rel_types {
    pub const CONTAINS: &str = "CONTAINS";
    pub const DECLARES: &str = "DECLARES";
    pub const REFERENCES: &str = "REFERENCES";
}

/// Display color stored on each node for graph visualisation.
pub fn color_for(label: &str) -> Option<&'static str> {
    match label {
        labels::ROOT => Some("orange"),
        labels::DATABASE => Some("#4287f5"),
        labels::COLLECTION => Some("#8A2BE2"),
        labels::CLASS => Some("#4287f5"),
        labels::FUNCTION | labels::METHOD => Some("#42f54e"),
        _ => None,
    }
}

/// A property value that can be stored on a node or relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    StringList(Vec<String>),
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<usize> for PropertyValue {
    fn from(n: usize) -> Self {
        Self::Integer(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<u32> for PropertyValue {
    fn from(n: u32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(v: Vec<String>) -> Self {
        Self::StringList(v)
    }
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

pub type Properties = BTreeMap<String, PropertyValue>;

/// How properties are written when a MERGE matches an existing entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Properties are set only when the entity is created.
    #[default]
    CreateOnly,
    /// Properties are overwritten with the latest values on every match.
    OverwriteOnMatch,
}

/// Check that a label or relationship type is a plain identifier.
///
/// Labels cannot be bound as query parameters, so only identifiers are
/// allowed to reach a query template.
pub fn validate_identifier(name: &str) -> CoreResult<()> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Label + identity key of a node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub label: String,
    pub id: String,
}

impl NodeRef {
    pub fn new(label: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            id: id.into(),
        }
    }
}

/// A node to be merged into the graph, keyed by `(label, id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeFact {
    pub label: String,
    pub id: String,
    pub properties: Properties,
}

impl NodeFact {
    /// Create a node fact, pre-populating the label's display color.
    pub fn new(label: impl Into<String>, id: impl Into<String>) -> Self {
        let label = label.into();
        let mut properties = Properties::new();
        if let Some(color) = color_for(&label) {
            properties.insert("color".to_string(), color.into());
        }
        Self {
            label,
            id: id.into(),
            properties,
        }
    }

    /// Builder-style property setter.
    pub fn with(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn node_ref(&self) -> NodeRef {
        NodeRef::new(self.label.clone(), self.id.clone())
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}

/// A relationship to be merged, keyed by `(rel_type, from.id, to.id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeFact {
    pub rel_type: String,
    pub from: NodeRef,
    pub to: NodeRef,
    pub properties: Properties,
}

impl EdgeFact {
    pub fn new(rel_type: impl Into<String>, from: NodeRef, to: NodeRef) -> Self {
        Self {
            rel_type: rel_type.into(),
            from,
            to,
            properties: Properties::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Identity of this edge under MERGE semantics.
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.rel_type, &self.from.id, &self.to.id)
    }
}

/// Either kind of fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fact {
    Node(NodeFact),
    Edge(EdgeFact),
}

impl From<NodeFact> for Fact {
    fn from(node: NodeFact) -> Self {
        Fact::Node(node)
    }
}

impl From<EdgeFact> for Fact {
    fn from(edge: EdgeFact) -> Self {
        Fact::Edge(edge)
    }
}
