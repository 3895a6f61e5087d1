//! # Lineage Graph
//!
//! Neo4j synchronization for Lineage.
//!
//! Provides connection bootstrap with retry, a parameterized statement layer,
//! the cleanup-then-resync engine and the document/code pipelines built on it.

pub mod bootstrap;
pub mod client;
pub mod cypher;
pub mod error;
pub mod memory;
pub mod queries;
pub mod schema;
pub mod statement;
pub mod store;
pub mod sync;

pub use bootstrap::{connect, Connector, Neo4jConnector, RetryPolicy};
pub use client::GraphClient;
pub use error::{GraphError, GraphResult};
pub use memory::MemoryGraph;
pub use queries::{graph_counts, GraphCounts};
pub use statement::{Scope, Statement, Template};
pub use store::{GraphStore, Outcome};
pub use sync::{sync, RunSummary, SyncEngine, SyncError, SyncPhase, SyncPlan, SyncReport};
