//! Parameterized statements: the only way components talk to a graph store.
//!
//! A [`Statement`] pairs a [`Template`] (the operation, with any labels or
//! relationship types it needs) with named parameters holding the data.
//! Labels and types are validated identifiers; every value travels as a
//! parameter. Rendering to a concrete query language happens in the store.

use std::collections::BTreeMap;

use lineage_core::fact::validate_identifier;
use lineage_core::{EdgeFact, MergePolicy, NodeFact, Properties};

use crate::error::GraphResult;

/// The part of the graph a run may delete and rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every node carrying one of these labels.
    Labels(Vec<String>),
    /// Every node whose `project` property equals this tag.
    Project(String),
}

/// Operations a graph store must support.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Template {
    /// Trivial round trip used as a liveness probe.
    Ping,
    /// Uniqueness of `id` among nodes of `label`; a no-op when present.
    UniqueId { label: String },
    /// Detach-delete nodes with any label in `$labels`.
    DeleteLabels,
    /// Detach-delete nodes whose `project` equals `$project`.
    DeleteProject,
    /// Create-or-match `(:label {id: $id})`, writing `$props` per `policy`.
    MergeNode { label: String, policy: MergePolicy },
    /// Create-or-match `(from {id: $from})-[:rel_type]->(to {id: $to})`.
    /// Matches nothing when either endpoint is absent.
    MergeEdge {
        rel_type: String,
        from_label: String,
        to_label: String,
        policy: MergePolicy,
    },
    CountNodes { label: Option<String> },
    CountEdges { rel_type: Option<String> },
}

impl Template {
    /// Whether the statement reports a count (`Outcome::count`).
    pub fn returns_count(&self) -> bool {
        !matches!(self, Template::Ping | Template::UniqueId { .. })
    }
}

/// A named parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    String(String),
    StringList(Vec<String>),
    Properties(Properties),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    template: Template,
    params: BTreeMap<&'static str, Param>,
}

impl Statement {
    fn new(template: Template) -> Self {
        Self {
            template,
            params: BTreeMap::new(),
        }
    }

    fn param(mut self, name: &'static str, value: Param) -> Self {
        self.params.insert(name, value);
        self
    }

    pub fn ping() -> Self {
        Self::new(Template::Ping)
    }

    pub fn unique_id(label: &str) -> GraphResult<Self> {
        validate_identifier(label)?;
        Ok(Self::new(Template::UniqueId {
            label: label.to_string(),
        }))
    }

    pub fn delete_scope(scope: &Scope) -> Self {
        match scope {
            Scope::Labels(labels) => Self::new(Template::DeleteLabels)
                .param("labels", Param::StringList(labels.clone())),
            Scope::Project(project) => Self::new(Template::DeleteProject)
                .param("project", Param::String(project.clone())),
        }
    }

    pub fn merge_node(node: &NodeFact, policy: MergePolicy) -> GraphResult<Self> {
        validate_identifier(&node.label)?;
        Ok(Self::new(Template::MergeNode {
            label: node.label.clone(),
            policy,
        })
        .param("id", Param::String(node.id.clone()))
        .param("props", Param::Properties(node.properties.clone())))
    }

    pub fn merge_edge(edge: &EdgeFact, policy: MergePolicy) -> GraphResult<Self> {
        validate_identifier(&edge.rel_type)?;
        validate_identifier(&edge.from.label)?;
        validate_identifier(&edge.to.label)?;
        Ok(Self::new(Template::MergeEdge {
            rel_type: edge.rel_type.clone(),
            from_label: edge.from.label.clone(),
            to_label: edge.to.label.clone(),
            policy,
        })
        .param("from", Param::String(edge.from.id.clone()))
        .param("to", Param::String(edge.to.id.clone()))
        .param("props", Param::Properties(edge.properties.clone())))
    }

    pub fn count_nodes(label: Option<&str>) -> GraphResult<Self> {
        if let Some(label) = label {
            validate_identifier(label)?;
        }
        Ok(Self::new(Template::CountNodes {
            label: label.map(str::to_string),
        }))
    }

    pub fn count_edges(rel_type: Option<&str>) -> GraphResult<Self> {
        if let Some(rel_type) = rel_type {
            validate_identifier(rel_type)?;
        }
        Ok(Self::new(Template::CountEdges {
            rel_type: rel_type.map(str::to_string),
        }))
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn params(&self) -> impl Iterator<Item = (&'static str, &Param)> {
        self.params.iter().map(|(k, v)| (*k, v))
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.params.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.params.get(name) {
            Some(Param::String(s)) => Some(s),
            _ => None,
        }
    }
}
