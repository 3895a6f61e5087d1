//! Code structure synchronization.
//!
//! Creates nodes and relationships describing one project's declarations:
//! - (:Root)-[:DECLARES]->(:Class)-[:DECLARES]->(:Method)
//! - (:Root)-[:DECLARES]->(:Function)

use std::path::Path;

use tracing::{error, info};

use lineage_core::code::extract::{CodeFacts, SourceLinks};
use lineage_core::code::walk::{discover_sources, load_unit};
use lineage_core::config::CodeConfig;
use lineage_core::fact::{labels, rel_types};
use lineage_core::{Fact, MergePolicy};

use super::{RunSummary, SyncEngine, SyncError, SyncPlan};
use crate::statement::Scope;
use crate::store::GraphStore;

/// Backoff multiplier used when none is configured.
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct CodeSyncOptions {
    pub project: String,
    pub base_url: String,
}

impl From<&CodeConfig> for CodeSyncOptions {
    fn from(config: &CodeConfig) -> Self {
        Self {
            project: config.project.clone(),
            base_url: config.base_url.clone(),
        }
    }
}

/// Everything tagged with `project` belongs to this run. The first
/// declaration of a colliding key wins.
pub fn plan(project: &str) -> SyncPlan {
    SyncPlan::new(Scope::Project(project.to_string()))
        .label(labels::ROOT, MergePolicy::CreateOnly)
        .label(labels::CLASS, MergePolicy::CreateOnly)
        .label(labels::FUNCTION, MergePolicy::CreateOnly)
        .label(labels::METHOD, MergePolicy::CreateOnly)
        .edge(rel_types::DECLARES, MergePolicy::CreateOnly)
}

/// Walk `root`, extract declarations and converge the project's graph.
pub async fn sync_code(
    graph: &dyn GraphStore,
    root: &Path,
    options: &CodeSyncOptions,
) -> Result<RunSummary, SyncError> {
    let files = discover_sources(root)?;
    info!(
        root = %root.display(),
        project = %options.project,
        files = files.len(),
        "Starting code structure sync"
    );

    let mut engine = SyncEngine::new(graph, plan(&options.project));
    engine.prepare().await?;

    let extractor = CodeFacts::new(options.project.as_str(), SourceLinks::new(options.base_url.as_str()));
    let mut summary = RunSummary::default();
    let mut facts: Vec<Fact> = vec![extractor.root_node().into()];

    for path in &files {
        match load_unit(root, path) {
            Ok(unit) => {
                info!(file = %unit.path, declarations = unit.declarations.len(), "Parsed source file");
                facts.extend(extractor.extract(&unit));
                summary.processed += 1;
            }
            Err(e) => {
                error!(file = %path.display(), error = %e, "Failed to parse source file, skipping");
                summary.fail(path.display().to_string(), e);
            }
        }
    }

    // One batch, so methods resolve against classes declared in other files.
    engine.apply(facts).await?;

    summary.report = engine.finish();
    info!(
        processed = summary.processed,
        failed = summary.failed.len(),
        nodes = summary.report.nodes_merged,
        edges = summary.report.edges_merged,
        skipped = summary.report.skipped,
        "Code structure sync complete"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGraph;
    use lineage_core::PropertyValue;

    fn options() -> CodeSyncOptions {
        CodeSyncOptions {
            project: "shop".to_string(),
            base_url: "https://git.example.com/shop/blob/main".to_string(),
        }
    }

    #[tokio::test]
    async fn test_python_project() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("models.py"),
            "class User:\n    def save(self):\n        pass\n\ndef helper():\n    return 1\n",
        )
        .unwrap();

        let graph = MemoryGraph::new();
        let summary = sync_code(&graph, dir.path(), &options()).await.unwrap();
        assert_eq!(summary.processed, 1);

        assert!(graph.node("Root", "shop").is_some());
        assert!(graph.node("Function", "shop:helper").is_some());
        let method = graph.node("Method", "shop:User.save").unwrap();
        assert_eq!(method["classId"], PropertyValue::from("shop:User"));
        assert_eq!(
            method["url"],
            PropertyValue::from("https://git.example.com/shop/blob/main/models.py#2")
        );
        assert_eq!(graph.edges("DECLARES").len(), 3);
    }

    #[tokio::test]
    async fn test_go_methods_across_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a_handlers.go"),
            "package shop\n\nfunc (s *Store) Get(id string) string {\n\treturn id\n}\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b_store.go"),
            "package shop\n\ntype Store struct {\n\tname string\n}\n",
        )
        .unwrap();

        let graph = MemoryGraph::new();
        let summary = sync_code(&graph, dir.path(), &options()).await.unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.report.missing_endpoints, 0);

        let edges = graph.edges("DECLARES");
        assert!(edges
            .iter()
            .any(|(from, to, _)| from == "shop:Store" && to == "shop:Store.Get"));
    }

    #[tokio::test]
    async fn test_bad_file_does_not_stop_siblings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.py"), "class (:\n").unwrap();
        std::fs::write(dir.path().join("ok.py"), "def ok():\n    pass\n").unwrap();

        let graph = MemoryGraph::new();
        let summary = sync_code(&graph, dir.path(), &options()).await.unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed.len(), 1);
        assert!(graph.node("Function", "shop:ok").is_some());
    }

    #[tokio::test]
    async fn test_missing_source_dir() {
        let graph = MemoryGraph::new();
        let result = sync_code(&graph, Path::new("/definitely/not/here"), &options()).await;
        assert!(matches!(result, Err(SyncError::Source(_))));
        assert!(graph.executed().is_empty());
    }
}
