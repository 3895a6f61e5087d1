//! In-process graph store.
//!
//! Interprets [`Template`]s with the same MERGE and DETACH DELETE semantics
//! as the Neo4j renderings. Backs `--dry-run` and the pipeline tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use lineage_core::fact::NodeRef;
use lineage_core::{MergePolicy, Properties, PropertyValue};

use crate::error::{GraphError, GraphResult};
use crate::statement::{Param, Statement, Template};
use crate::store::{GraphStore, Outcome};

type EdgeKey = (String, NodeRef, NodeRef);

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<NodeRef, Properties>,
    edges: BTreeMap<EdgeKey, Properties>,
    constraints: BTreeSet<String>,
    executed: Vec<Template>,
    rejected_ids: BTreeSet<String>,
    fail_after: Option<usize>,
}

/// A labeled property graph held in memory.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    state: Mutex<State>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a test thread panicked mid-statement.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every merge of a node or edge touching `id` fail.
    pub fn reject_id(&self, id: &str) {
        self.lock().rejected_ids.insert(id.to_string());
    }

    /// Drop the "connection" after `n` more statements.
    pub fn disconnect_after(&self, n: usize) {
        self.lock().fail_after = Some(n);
    }

    pub fn node_count(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.lock().edges.len()
    }

    pub fn node(&self, label: &str, id: &str) -> Option<Properties> {
        self.lock().nodes.get(&NodeRef::new(label, id)).cloned()
    }

    pub fn nodes_with_label(&self, label: &str) -> Vec<String> {
        self.lock()
            .nodes
            .keys()
            .filter(|n| n.label == label)
            .map(|n| n.id.clone())
            .collect()
    }

    /// Edges of a type as `(from id, to id, properties)`.
    pub fn edges(&self, rel_type: &str) -> Vec<(String, String, Properties)> {
        self.lock()
            .edges
            .iter()
            .filter(|((t, _, _), _)| t == rel_type)
            .map(|((_, from, to), props)| (from.id.clone(), to.id.clone(), props.clone()))
            .collect()
    }

    pub fn has_constraint(&self, label: &str) -> bool {
        self.lock().constraints.contains(label)
    }

    /// Templates executed so far, in order.
    pub fn executed(&self) -> Vec<Template> {
        self.lock().executed.clone()
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn run(&self, statement: &Statement) -> GraphResult<Outcome> {
        let mut state = self.lock();

        if let Some(remaining) = state.fail_after {
            if remaining == 0 {
                return Err(GraphError::Connection("connection reset by peer".to_string()));
            }
            state.fail_after = Some(remaining - 1);
        }
        state.executed.push(statement.template().clone());

        match statement.template() {
            Template::Ping => Ok(Outcome::done()),
            Template::UniqueId { label } => {
                state.constraints.insert(label.clone());
                Ok(Outcome::done())
            }
            Template::DeleteLabels => {
                let labels = string_list(statement, "labels")?;
                Ok(Outcome::counted(state.detach_delete(|node, _| labels.contains(&node.label))))
            }
            Template::DeleteProject => {
                let project = required_str(statement, "project")?;
                Ok(Outcome::counted(state.detach_delete(|_, props| {
                    props.get("project") == Some(&PropertyValue::String(project.to_string()))
                })))
            }
            Template::MergeNode { label, policy } => {
                let id = required_str(statement, "id")?;
                state.check_rejected(id)?;
                let props = properties(statement)?;
                let key = NodeRef::new(label.clone(), id);

                if let Some(existing) = state.nodes.get_mut(&key) {
                    if *policy == MergePolicy::OverwriteOnMatch {
                        existing.extend(props);
                    }
                } else {
                    state.nodes.insert(key, props);
                }
                Ok(Outcome::counted(1))
            }
            Template::MergeEdge {
                rel_type,
                from_label,
                to_label,
                policy,
            } => {
                let from = NodeRef::new(from_label.clone(), required_str(statement, "from")?);
                let to = NodeRef::new(to_label.clone(), required_str(statement, "to")?);
                state.check_rejected(&from.id)?;
                state.check_rejected(&to.id)?;
                if !state.nodes.contains_key(&from) || !state.nodes.contains_key(&to) {
                    return Ok(Outcome::counted(0));
                }

                let props = properties(statement)?;
                let key = (rel_type.clone(), from, to);
                match state.edges.get_mut(&key) {
                    Some(existing) => {
                        if *policy == MergePolicy::OverwriteOnMatch {
                            existing.extend(props);
                        }
                    }
                    None => {
                        state.edges.insert(key, props);
                    }
                }
                Ok(Outcome::counted(1))
            }
            Template::CountNodes { label } => {
                let count = state
                    .nodes
                    .keys()
                    .filter(|n| label.as_ref().map_or(true, |l| &n.label == l))
                    .count();
                Ok(Outcome::counted(count as i64))
            }
            Template::CountEdges { rel_type } => {
                let count = state
                    .edges
                    .keys()
                    .filter(|(t, _, _)| rel_type.as_ref().map_or(true, |r| t == r))
                    .count();
                Ok(Outcome::counted(count as i64))
            }
        }
    }
}

impl State {
    fn detach_delete(&mut self, matches: impl Fn(&NodeRef, &Properties) -> bool) -> i64 {
        let doomed: BTreeSet<NodeRef> = self
            .nodes
            .iter()
            .filter(|(node, props)| matches(node, props))
            .map(|(node, _)| node.clone())
            .collect();

        self.edges
            .retain(|(_, from, to), _| !doomed.contains(from) && !doomed.contains(to));
        self.nodes.retain(|node, _| !doomed.contains(node));
        doomed.len() as i64
    }

    fn check_rejected(&self, id: &str) -> GraphResult<()> {
        if self.rejected_ids.contains(id) {
            return Err(GraphError::Query(format!("write rejected for {}", id)));
        }
        Ok(())
    }
}

fn required_str<'a>(statement: &'a Statement, name: &str) -> GraphResult<&'a str> {
    statement
        .get_str(name)
        .ok_or_else(|| GraphError::Query(format!("missing parameter ${}", name)))
}

fn string_list<'a>(statement: &'a Statement, name: &str) -> GraphResult<&'a [String]> {
    match statement.get(name) {
        Some(Param::StringList(list)) => Ok(list),
        _ => Err(GraphError::Query(format!("missing parameter ${}", name))),
    }
}

fn properties(statement: &Statement) -> GraphResult<Properties> {
    match statement.get("props") {
        Some(Param::Properties(props)) => Ok(props.clone()),
        None => Ok(Properties::new()),
        Some(_) => Err(GraphError::Query("$props must be a map".to_string())),
    }
}
