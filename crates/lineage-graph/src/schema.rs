//! Graph schema initialization (uniqueness constraints).

use tracing::{debug, info};

use crate::error::GraphResult;
use crate::statement::Statement;
use crate::store::GraphStore;

/// Declare `id` uniqueness for every label.
///
/// Safe to run multiple times: the constraint statement is a no-op when the
/// constraint already exists. Returns the number of labels declared.
pub async fn declare_constraints<S, L>(store: &S, labels: &[L]) -> GraphResult<usize>
where
    S: GraphStore + ?Sized,
    L: AsRef<str> + Sync,
{
    info!("Declaring uniqueness constraints for {} labels", labels.len());

    for label in labels {
        let label = label.as_ref();
        store.run(&Statement::unique_id(label)?).await?;
        debug!(label, "Constraint declared");
    }

    Ok(labels.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGraph;

    #[tokio::test]
    async fn test_declare_constraints_is_repeatable() {
        let graph = MemoryGraph::new();
        assert_eq!(declare_constraints(&graph, &["Class", "Method"]).await.unwrap(), 2);
        assert_eq!(declare_constraints(&graph, &["Class"]).await.unwrap(), 1);
        assert!(graph.has_constraint("Class"));
        assert!(graph.has_constraint("Method"));
    }

    #[tokio::test]
    async fn test_rejects_invalid_label() {
        let graph = MemoryGraph::new();
        assert!(declare_constraints(&graph, &["Not A Label"]).await.is_err());
    }
}
