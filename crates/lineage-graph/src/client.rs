//! Neo4j connection client.

use std::collections::HashMap;

use async_trait::async_trait;
use neo4rs::{BoltType, ConfigBuilder, Graph, Query};
use serde::de::DeserializeOwned;

use lineage_core::config::GraphConfig;
use lineage_core::{Properties, PropertyValue};

use crate::cypher::{self, COUNT_COLUMN};
use crate::error::{GraphError, GraphResult};
use crate::statement::{Param, Statement};
use crate::store::{GraphStore, Outcome};

/// Client for Neo4j graph operations.
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Create the connection pool.
    ///
    /// Note: neo4rs uses a lazy deadpool, so `Graph::connect` does not open a
    /// bolt connection yet. Callers probe liveness through the bootstrapper.
    pub async fn open(config: &GraphConfig) -> GraphResult<Self> {
        let neo4j_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .db(config.database.as_str())
            .max_connections(4) // sequential runs never need more
            .fetch_size(200)
            .build()
            .map_err(|e| GraphError::Connection(format!("invalid Neo4j config: {}", e)))?;

        let graph = Graph::connect(neo4j_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        Ok(Self { graph })
    }

    /// Execute a Cypher query that returns no results.
    pub async fn execute(&self, query: Query) -> GraphResult<()> {
        self.graph
            .run(query)
            .await
            .map_err(|e| GraphError::Query(e.to_string()))
    }

    /// Execute a Cypher query and return results as rows.
    pub async fn query(&self, query: Query) -> GraphResult<Vec<neo4rs::Row>> {
        let mut result = self
            .graph
            .execute(query)
            .await
            .map_err(|e| GraphError::Query(e.to_string()))?;

        let mut rows = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| GraphError::Query(e.to_string()))?
        {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a Cypher query and return a single scalar value.
    pub async fn query_scalar<T: DeserializeOwned>(&self, query: Query, field: &str) -> GraphResult<Option<T>> {
        let rows = self.query(query).await?;
        match rows.into_iter().next() {
            Some(row) => {
                let val: T = row.get(field).map_err(|e| {
                    GraphError::Query(format!("Failed to get field '{}': {:?}", field, e))
                })?;
                Ok(Some(val))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl GraphStore for GraphClient {
    async fn run(&self, statement: &Statement) -> GraphResult<Outcome> {
        let query = to_query(statement);
        if statement.template().returns_count() {
            let count = self
                .query_scalar::<i64>(query, COUNT_COLUMN)
                .await?
                .unwrap_or(0);
            Ok(Outcome::counted(count))
        } else {
            self.execute(query).await?;
            Ok(Outcome::done())
        }
    }
}

/// Render a statement to a parameterized Cypher query.
pub fn to_query(statement: &Statement) -> Query {
    statement
        .params()
        .fold(Query::new(cypher::render(statement.template())), |query, (name, param)| {
            match param {
                Param::String(s) => query.param(name, s.as_str()),
                Param::StringList(list) => query.param(name, list.clone()),
                Param::Properties(props) => query.param(name, to_bolt_map(props)),
            }
        })
}

fn to_bolt_map(props: &Properties) -> HashMap<String, BoltType> {
    props
        .iter()
        .map(|(key, value)| (key.clone(), to_bolt(value)))
        .collect()
}

fn to_bolt(value: &PropertyValue) -> BoltType {
    match value {
        PropertyValue::String(s) => s.clone().into(),
        PropertyValue::Integer(i) => (*i).into(),
        PropertyValue::Float(f) => (*f).into(),
        PropertyValue::Boolean(b) => (*b).into(),
        PropertyValue::StringList(list) => list.clone().into(),
    }
}
