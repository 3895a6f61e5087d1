//! Connection bootstrap with retry and exponential backoff.
//!
//! neo4rs builds its pool lazily, so opening a client proves nothing. Every
//! attempt therefore opens a session and sends a `RETURN 1` probe; only a
//! session whose probe succeeded is handed to the caller.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use lineage_core::config::{GraphConfig, RetryConfig};

use crate::client::GraphClient;
use crate::error::{GraphError, GraphResult};
use crate::store::GraphStore;

/// Longest sleep between two attempts.
pub const MAX_DELAY: Duration = Duration::from_secs(300);

/// How long and how often to keep trying.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, at least one.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    /// A multiplier below 1 or not finite is replaced by 1 (constant delay).
    pub fn new(max_retries: u32, initial_delay: Duration, multiplier: f64) -> Self {
        let multiplier = if multiplier.is_finite() { multiplier.max(1.0) } else { 1.0 };
        Self {
            max_retries: max_retries.max(1),
            initial_delay,
            multiplier,
        }
    }

    /// Build from config, using `default_multiplier` when none is configured.
    pub fn from_config(config: &RetryConfig, default_multiplier: f64) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.initial_delay_ms),
            config.multiplier.unwrap_or(default_multiplier),
        )
    }

    /// Sleep durations between consecutive attempts (`max_retries - 1` of them),
    /// each capped at [`MAX_DELAY`].
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        let mut next = self.initial_delay.min(MAX_DELAY);
        (1..self.max_retries).map(move |_| {
            let current = next;
            next = Duration::try_from_secs_f64(next.as_secs_f64() * self.multiplier.max(1.0))
                .map_or(MAX_DELAY, |d| d.min(MAX_DELAY));
            current
        })
    }
}

/// Something that can open a graph session.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: GraphStore;

    /// Human-readable endpoint for logs and errors.
    fn endpoint(&self) -> &str;

    async fn open(&self) -> GraphResult<Self::Session>;
}

/// Opens [`GraphClient`] sessions against a Neo4j server.
#[derive(Debug, Clone)]
pub struct Neo4jConnector {
    config: GraphConfig,
}

impl Neo4jConnector {
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for Neo4jConnector {
    type Session = GraphClient;

    fn endpoint(&self) -> &str {
        &self.config.uri
    }

    async fn open(&self) -> GraphResult<GraphClient> {
        GraphClient::open(&self.config).await
    }
}

/// Open a session whose liveness probe succeeds, retrying per `policy`.
///
/// Logs one warning per failed attempt and one info line on success.
/// Fails with [`GraphError::ConnectionExhausted`] after the last attempt.
pub async fn connect<C: Connector>(connector: &C, policy: &RetryPolicy) -> GraphResult<C::Session> {
    let mut delays = policy.delays();
    let mut attempt = 0;

    loop {
        attempt += 1;
        let result = match connector.open().await {
            Ok(session) => session.ping().await.map(|_| session),
            Err(e) => Err(e),
        };

        let error = match result {
            Ok(session) => {
                info!(endpoint = connector.endpoint(), attempt, "Connected to graph store");
                return Ok(session);
            }
            Err(e) => e,
        };

        match delays.next() {
            Some(delay) => {
                warn!(
                    endpoint = connector.endpoint(),
                    attempt,
                    max_retries = policy.max_retries,
                    error = %error,
                    "Graph store not ready, retrying in {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            None => {
                warn!(
                    endpoint = connector.endpoint(),
                    attempt,
                    error = %error,
                    "Graph store not ready, giving up"
                );
                return Err(GraphError::ConnectionExhausted {
                    endpoint: connector.endpoint().to_string(),
                    attempts: attempt,
                    last_error: error.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGraph;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    /// Fails the first `failures` opens, then hands out healthy stores.
    struct FlakyConnector {
        failures: u32,
        attempts: AtomicU32,
    }

    impl FlakyConnector {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                attempts: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Connector for FlakyConnector {
        type Session = MemoryGraph;

        fn endpoint(&self) -> &str {
            "memory://flaky"
        }

        async fn open(&self) -> GraphResult<MemoryGraph> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let graph = MemoryGraph::new();
            if n <= self.failures {
                // Pool opens fine, the probe is what fails.
                graph.disconnect_after(0);
            }
            Ok(graph)
        }
    }

    #[test]
    fn test_backoff_sequence() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100), 2.0);
        let delays: Vec<_> = policy.delays().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400)
            ]
        );

        let single = RetryPolicy::new(0, Duration::from_millis(100), 2.0);
        assert_eq!(single.max_retries, 1);
        assert_eq!(single.delays().count(), 0);
    }

    #[test]
    fn test_unbounded_multiplier_is_tamed() {
        let infinite = RetryPolicy::new(3, Duration::from_millis(100), f64::INFINITY);
        assert_eq!(infinite.multiplier, 1.0);
        assert_eq!(
            infinite.delays().collect::<Vec<_>>(),
            vec![Duration::from_millis(100); 2]
        );

        let nan = RetryPolicy::new(2, Duration::from_millis(50), f64::NAN);
        assert_eq!(nan.multiplier, 1.0);

        // Fields are public, so delays() must not panic on a hand-built policy.
        let raw = RetryPolicy {
            max_retries: 4,
            initial_delay: Duration::from_secs(1),
            multiplier: f64::INFINITY,
        };
        assert_eq!(
            raw.delays().collect::<Vec<_>>(),
            vec![Duration::from_secs(1), MAX_DELAY, MAX_DELAY]
        );

        let huge = RetryPolicy::new(3, Duration::from_secs(10), 1e300);
        assert_eq!(huge.delays().last(), Some(MAX_DELAY));
    }

    #[test]
    fn test_from_config_uses_pipeline_default() {
        let config = RetryConfig {
            max_retries: 3,
            initial_delay_ms: 10,
            multiplier: None,
        };
        assert_eq!(RetryPolicy::from_config(&config, 1.5).multiplier, 1.5);

        let config = RetryConfig {
            multiplier: Some(3.0),
            ..config
        };
        assert_eq!(RetryPolicy::from_config(&config, 1.5).multiplier, 3.0);
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let connector = FlakyConnector::new(2);
        let policy = RetryPolicy::new(5, Duration::from_millis(10), 2.0);

        let started = Instant::now();
        let session = connect(&connector, &policy).await.unwrap();

        assert_eq!(connector.attempts.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert!(session.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_exhaustion() {
        let connector = FlakyConnector::new(u32::MAX);
        let policy = RetryPolicy::new(3, Duration::from_millis(1), 1.5);

        match connect(&connector, &policy).await {
            Err(GraphError::ConnectionExhausted { attempts, endpoint, .. }) => {
                assert_eq!(attempts, 3);
                assert_eq!(endpoint, "memory://flaky");
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("connect should fail"),
        }
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 3);
    }
}
