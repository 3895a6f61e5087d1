//! The graph store capability.

use async_trait::async_trait;

use crate::error::GraphResult;
use crate::statement::Statement;

/// Result of running a statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Entities matched, merged or deleted, for templates that report one.
    pub count: Option<i64>,
}

impl Outcome {
    pub fn done() -> Self {
        Self { count: None }
    }

    pub fn counted(count: i64) -> Self {
        Self { count: Some(count) }
    }

    pub fn count(&self) -> i64 {
        self.count.unwrap_or(0)
    }
}

/// A session against a labeled property-graph store.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Execute one statement as a synchronous round trip.
    async fn run(&self, statement: &Statement) -> GraphResult<Outcome>;

    /// Liveness probe.
    async fn ping(&self) -> GraphResult<()> {
        self.run(&Statement::ping()).await.map(|_| ())
    }
}
