//! Graph store error types.

use lineage_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Graph store connection error: {0}")]
    Connection(String),

    #[error("Graph query failed: {0}")]
    Query(String),

    #[error("Failed to connect to {endpoint} after {attempts} attempts: {last_error}")]
    ConnectionExhausted {
        endpoint: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Missing endpoint for {rel_type} edge {from} -> {to}")]
    MissingEndpoint {
        rel_type: String,
        from: String,
        to: String,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type GraphResult<T> = Result<T, GraphError>;
