//! Cleanup-then-resync synchronization.
//!
//! Every producer converges the graph the same way:
//!
//! 1. declare `id` uniqueness for the labels it owns,
//! 2. detach-delete everything in its scope,
//! 3. merge node facts,
//! 4. merge edge facts, skipping edges whose endpoints are missing.
//!
//! A fact that fails to apply is logged and skipped. The run only fails when
//! the session is lost, which is detected by re-probing the store after a
//! failed fact.

pub mod code_sync;
pub mod document_sync;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use thiserror::Error;
use tracing::{debug, error, info};

use lineage_core::{CoreError, EdgeFact, Fact, MergePolicy, NodeFact};

use crate::error::GraphError;
use crate::schema::declare_constraints;
use crate::statement::{Scope, Statement};
use crate::store::GraphStore;

pub use code_sync::{sync_code, CodeSyncOptions};
pub use document_sync::{sync_documents, DocumentSyncOptions};

/// The phases that must succeed before any fact is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Constraints,
    Cleanup,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncPhase::Constraints => write!(f, "constraint"),
            SyncPhase::Cleanup => write!(f, "cleanup"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Graph sync {phase} phase failed: {source}")]
    Phase {
        phase: SyncPhase,
        #[source]
        source: GraphError,
    },

    #[error("Graph session lost after {applied} applied and {skipped} skipped facts: {source}")]
    PartialSync {
        applied: usize,
        skipped: usize,
        #[source]
        source: GraphError,
    },

    #[error(transparent)]
    Source(#[from] CoreError),
}

/// What a producer owns and how its facts are merged.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub scope: Scope,
    node_policies: BTreeMap<String, MergePolicy>,
    edge_policies: BTreeMap<String, MergePolicy>,
}

impl SyncPlan {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            node_policies: BTreeMap::new(),
            edge_policies: BTreeMap::new(),
        }
    }

    /// Own `label`; its constraint is declared up front.
    pub fn label(mut self, label: &str, policy: MergePolicy) -> Self {
        self.node_policies.insert(label.to_string(), policy);
        self
    }

    pub fn edge(mut self, rel_type: &str, policy: MergePolicy) -> Self {
        self.edge_policies.insert(rel_type.to_string(), policy);
        self
    }

    pub fn labels(&self) -> Vec<&str> {
        self.node_policies.keys().map(String::as_str).collect()
    }

    /// Policy for `label`; labels not in the plan are create-only.
    pub fn node_policy(&self, label: &str) -> MergePolicy {
        self.node_policies.get(label).copied().unwrap_or_default()
    }

    pub fn edge_policy(&self, rel_type: &str) -> MergePolicy {
        self.edge_policies.get(rel_type).copied().unwrap_or_default()
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub constraints: usize,
    pub nodes_deleted: usize,
    pub nodes_merged: usize,
    pub edges_merged: usize,
    /// Facts not applied, missing endpoints included.
    pub skipped: usize,
    pub missing_endpoints: usize,
}

impl SyncReport {
    pub fn applied(&self) -> usize {
        self.nodes_merged + self.edges_merged
    }

    pub fn merge(&mut self, other: &SyncReport) {
        self.constraints += other.constraints;
        self.nodes_deleted += other.nodes_deleted;
        self.nodes_merged += other.nodes_merged;
        self.edges_merged += other.edges_merged;
        self.skipped += other.skipped;
        self.missing_endpoints += other.missing_endpoints;
    }
}

/// Outcome of a producer pipeline.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Units (collections, files) processed without error.
    pub processed: usize,
    /// Units that failed, with the reason. Their partial facts may still
    /// have been applied.
    pub failed: Vec<(String, String)>,
    pub report: SyncReport,
}

impl RunSummary {
    fn fail(&mut self, unit: impl Into<String>, reason: impl ToString) {
        let unit = unit.into();
        if !self.failed.iter().any(|(u, _)| *u == unit) {
            self.failed.push((unit, reason.to_string()));
        }
    }
}

/// Applies facts to one graph session under a [`SyncPlan`].
pub struct SyncEngine<'a> {
    store: &'a dyn GraphStore,
    plan: SyncPlan,
    constrained: BTreeSet<String>,
    report: SyncReport,
}

impl<'a> SyncEngine<'a> {
    pub fn new(store: &'a dyn GraphStore, plan: SyncPlan) -> Self {
        Self {
            store,
            plan,
            constrained: BTreeSet::new(),
            report: SyncReport::default(),
        }
    }

    /// Constraint phase, then cleanup phase.
    pub async fn prepare(&mut self) -> Result<(), SyncError> {
        let labels = self.plan.labels();
        let declared = declare_constraints(self.store, &labels)
            .await
            .map_err(|source| SyncError::Phase {
                phase: SyncPhase::Constraints,
                source,
            })?;
        self.constrained.extend(labels.iter().map(|l| l.to_string()));
        self.report.constraints += declared;

        let deleted = self
            .store
            .run(&Statement::delete_scope(&self.plan.scope))
            .await
            .map_err(|source| SyncError::Phase {
                phase: SyncPhase::Cleanup,
                source,
            })?
            .count();
        self.report.nodes_deleted += usize::try_from(deleted).unwrap_or(0);

        info!(scope = ?self.plan.scope, deleted, "Cleared previous run");
        Ok(())
    }

    /// Apply one batch: every node fact first, then every edge fact.
    pub async fn apply(&mut self, facts: Vec<Fact>) -> Result<(), SyncError> {
        let (nodes, edges): (Vec<_>, Vec<_>) = facts.into_iter().partition(|f| matches!(f, Fact::Node(_)));

        for fact in nodes {
            if let Fact::Node(node) = fact {
                self.apply_node(&node).await?;
            }
        }
        for fact in edges {
            if let Fact::Edge(edge) = fact {
                self.apply_edge(&edge).await?;
            }
        }
        Ok(())
    }

    pub fn finish(self) -> SyncReport {
        self.report
    }

    async fn apply_node(&mut self, node: &NodeFact) -> Result<(), SyncError> {
        if !self.constrained.contains(&node.label) {
            match Statement::unique_id(&node.label) {
                Ok(statement) => match self.store.run(&statement).await {
                    Ok(_) => {
                        debug!(label = %node.label, "Declared constraint for new label");
                        self.constrained.insert(node.label.clone());
                        self.report.constraints += 1;
                    }
                    Err(e) => return self.skip(&node.label, &node.id, e).await,
                },
                Err(e) => return self.skip_unsent(&node.label, &node.id, e),
            }
        }

        let policy = self.plan.node_policy(&node.label);
        let statement = match Statement::merge_node(node, policy) {
            Ok(statement) => statement,
            Err(e) => return self.skip_unsent(&node.label, &node.id, e),
        };
        match self.store.run(&statement).await {
            Ok(_) => {
                debug!(label = %node.label, id = %node.id, "Merged node");
                self.report.nodes_merged += 1;
                Ok(())
            }
            Err(e) => self.skip(&node.label, &node.id, e).await,
        }
    }

    async fn apply_edge(&mut self, edge: &EdgeFact) -> Result<(), SyncError> {
        let policy = self.plan.edge_policy(&edge.rel_type);
        let key = format!("{} -> {}", edge.from.id, edge.to.id);
        let statement = match Statement::merge_edge(edge, policy) {
            Ok(statement) => statement,
            Err(e) => return self.skip_unsent(&edge.rel_type, &key, e),
        };

        match self.store.run(&statement).await {
            Ok(outcome) if outcome.count() == 0 => {
                let missing = GraphError::MissingEndpoint {
                    rel_type: edge.rel_type.clone(),
                    from: edge.from.id.clone(),
                    to: edge.to.id.clone(),
                };
                error!(error = %missing, "Skipping edge");
                self.report.missing_endpoints += 1;
                self.report.skipped += 1;
                Ok(())
            }
            Ok(_) => {
                debug!(rel_type = %edge.rel_type, edge = %key, "Merged edge");
                self.report.edges_merged += 1;
                Ok(())
            }
            Err(e) => self.skip(&edge.rel_type, &key, e).await,
        }
    }

    /// Log a failed fact, then make sure the session is still usable.
    async fn skip(&mut self, kind: &str, key: &str, e: GraphError) -> Result<(), SyncError> {
        error!(kind, key, error = %e, "Failed to apply fact, skipping");
        self.report.skipped += 1;

        if let Err(probe) = self.store.ping().await {
            error!(error = %probe, "Graph session lost");
            return Err(SyncError::PartialSync {
                applied: self.report.applied(),
                skipped: self.report.skipped,
                source: e,
            });
        }
        Ok(())
    }

    /// A fact rejected before reaching the store.
    fn skip_unsent(&mut self, kind: &str, key: &str, e: impl Into<GraphError>) -> Result<(), SyncError> {
        let e = e.into();
        error!(kind, key, error = %e, "Invalid fact, skipping");
        self.report.skipped += 1;
        Ok(())
    }
}

/// Run all four phases over one fact sequence.
pub async fn sync(store: &dyn GraphStore, plan: SyncPlan, facts: Vec<Fact>) -> Result<SyncReport, SyncError> {
    let mut engine = SyncEngine::new(store, plan);
    engine.prepare().await?;
    engine.apply(facts).await?;
    Ok(engine.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGraph;
    use crate::statement::Template;
    use lineage_core::fact::NodeRef;

    fn plan() -> SyncPlan {
        SyncPlan::new(Scope::Labels(vec!["Collection".to_string()]))
            .label("Collection", MergePolicy::OverwriteOnMatch)
            .edge("REFERENCES", MergePolicy::OverwriteOnMatch)
    }

    fn collection(name: &str) -> NodeFact {
        NodeFact::new("Collection", name).with("name", name)
    }

    #[tokio::test]
    async fn test_phase_ordering() {
        let graph = MemoryGraph::new();
        let facts = vec![
            EdgeFact::new("REFERENCES", NodeRef::new("Collection", "a"), NodeRef::new("Collection", "b")).into(),
            collection("a").into(),
            collection("b").into(),
        ];

        let report = sync(&graph, plan(), facts).await.unwrap();
        assert_eq!(report.nodes_merged, 2);
        assert_eq!(report.edges_merged, 1);

        let executed = graph.executed();
        assert!(matches!(executed[0], Template::UniqueId { .. }));
        assert_eq!(executed[1], Template::DeleteLabels);
        assert!(matches!(executed[2], Template::MergeNode { .. }));
        assert!(matches!(executed[3], Template::MergeNode { .. }));
        assert!(matches!(executed[4], Template::MergeEdge { .. }));
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_skipped() {
        let graph = MemoryGraph::new();
        let facts = vec![
            collection("a").into(),
            EdgeFact::new("REFERENCES", NodeRef::new("Collection", "a"), NodeRef::new("Collection", "ghost")).into(),
        ];

        let report = sync(&graph, plan(), facts).await.unwrap();
        assert_eq!(report.missing_endpoints, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_fact_does_not_abort() {
        let graph = MemoryGraph::new();
        graph.reject_id("b");
        let facts = vec![collection("a").into(), collection("b").into(), collection("c").into()];

        let report = sync(&graph, plan(), facts).await.unwrap();
        assert_eq!(report.nodes_merged, 2);
        assert_eq!(report.skipped, 1);
        assert!(graph.node("Collection", "c").is_some());
    }

    #[tokio::test]
    async fn test_lost_session_is_partial_sync() {
        let graph = MemoryGraph::new();
        let mut engine = SyncEngine::new(&graph, plan());
        engine.prepare().await.unwrap();

        graph.disconnect_after(1);
        let facts = vec![collection("a").into(), collection("b").into(), collection("c").into()];
        match engine.apply(facts).await {
            Err(SyncError::PartialSync { applied, skipped, .. }) => {
                assert_eq!(applied, 1);
                assert_eq!(skipped, 1);
            }
            other => panic!("expected PartialSync, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unplanned_label_gets_constraint() {
        let graph = MemoryGraph::new();
        let report = sync(&graph, plan(), vec![NodeFact::new("Field", "a.x").into()])
            .await
            .unwrap();
        assert!(graph.has_constraint("Field"));
        assert_eq!(report.constraints, 2);
    }

    #[tokio::test]
    async fn test_cleanup_failure_is_phase_error() {
        let graph = MemoryGraph::new();
        graph.disconnect_after(1);
        match sync(&graph, plan(), Vec::new()).await {
            Err(SyncError::Phase { phase, .. }) => assert_eq!(phase, SyncPhase::Cleanup),
            other => panic!("expected cleanup failure, got {:?}", other),
        }
    }
}
