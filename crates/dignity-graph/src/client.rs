//! Neo4j connection management and shared graph client.

use std::future::Future;
use std::time::Duration;

use neo4rs::{ConfigBuilder, Graph, Query};

use dignity_core::config::Neo4jSettings;
use dignity_core::CoreError;

/// Errors from graph operations.
///
/// `NotFound`, `Conflict`, `Unavailable` and `InvalidInput` form the error
/// taxonomy callers branch on; they pass through the support layer unchanged.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Graph store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The store rejected the statement itself (syntax, type or parameter
    /// errors). Resending it cannot succeed.
    #[error("Query rejected: {0}")]
    Query(String),
}

impl GraphError {
    pub fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        GraphError::NotFound {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    /// Only `Unavailable` is worth retrying unchanged; `Conflict` requires a re-read first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GraphError::Unavailable(_))
    }
}

impl From<neo4rs::Error> for GraphError {
    fn from(e: neo4rs::Error) -> Self {
        from_driver_message(e.to_string())
    }
}

/// Classify a driver error by the Neo4j status code in its message.
fn from_driver_message(msg: String) -> GraphError {
    if msg.contains("ConstraintValidationFailed") {
        GraphError::Conflict(msg)
    } else if msg.contains("Neo.ClientError.Statement") || msg.contains("Neo.ClientError.Request") {
        GraphError::Query(msg)
    } else {
        GraphError::Unavailable(msg)
    }
}

impl From<CoreError> for GraphError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidInput(msg) | CoreError::Config(msg) => GraphError::InvalidInput(msg),
            CoreError::Serialization(e) => GraphError::Serialization(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        GraphError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub fetch_size: usize,
    pub query_timeout: Duration,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Neo4jSettings::default().into()
    }
}

impl From<Neo4jSettings> for GraphConfig {
    fn from(s: Neo4jSettings) -> Self {
        Self {
            uri: s.uri,
            user: s.user,
            password: s.password,
            max_connections: s.max_connections,
            fetch_size: s.fetch_size,
            query_timeout: Duration::from_millis(s.query_timeout_ms),
        }
    }
}

/// Thread-safe Neo4j graph client with connection pooling.
///
/// Clone is cheap (inner Arc). Every call is bounded by the configured query
/// timeout; a timeout or driver failure is reported as `Unavailable`.
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
    query_timeout: Duration,
}

impl GraphClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::InvalidInput(e.to_string()))?;

        let graph = tokio::time::timeout(config.query_timeout, Graph::connect(neo_config))
            .await
            .map_err(|_| GraphError::Unavailable(format!("connect to {} timed out", config.uri)))?
            .map_err(|e| GraphError::Unavailable(e.to_string()))?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self {
            graph,
            query_timeout: config.query_timeout,
        })
    }

    /// Execute a write-only query (CREATE, MERGE, SET).
    pub async fn run(&self, query: Query) -> Result<()> {
        self.bounded(self.graph.run(query)).await
    }

    /// Execute a query and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<neo4rs::Row>> {
        self.bounded(async {
            let mut stream = self.graph.execute(query).await?;
            let mut rows = Vec::new();
            while let Some(row) = stream.next().await? {
                rows.push(row);
            }
            Ok(rows)
        })
        .await
    }

    /// Execute a query and return the first row, if any.
    pub async fn query_one(&self, query: Query) -> Result<Option<neo4rs::Row>> {
        self.bounded(async {
            let mut stream = self.graph.execute(query).await?;
            stream.next().await
        })
        .await
    }

    /// Run several write queries atomically.
    pub async fn run_in_txn(&self, queries: Vec<Query>) -> Result<()> {
        self.bounded(async {
            let mut txn = self.graph.start_txn().await?;
            for q in queries {
                txn.run(q).await?;
            }
            txn.commit().await
        })
        .await
    }

    /// Bound a driver future by the query timeout.
    async fn bounded<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, neo4rs::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(GraphError::Unavailable(format!(
                "query exceeded {}ms timeout",
                self.query_timeout.as_millis()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_settings() {
        let settings = Neo4jSettings {
            query_timeout_ms: 250,
            ..Default::default()
        };
        let config = GraphConfig::from(settings);
        assert_eq!(config.query_timeout, Duration::from_millis(250));
        assert_eq!(config.uri, "bolt://localhost:7687");
    }

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(GraphError::Unavailable("timeout".into()).is_retryable());
        assert!(!GraphError::Conflict("stale".into()).is_retryable());
        assert!(!GraphError::not_found("Recipient", "x").is_retryable());
    }

    #[test]
    fn test_statement_errors_are_not_retryable() {
        let syntax = from_driver_message(
            "Neo.ClientError.Statement.SyntaxError: Invalid input 'RETRUN'".to_string(),
        );
        assert!(matches!(syntax, GraphError::Query(_)));
        assert!(!syntax.is_retryable());

        let type_error =
            from_driver_message("Neo.ClientError.Statement.TypeError: expected Integer".to_string());
        assert!(matches!(type_error, GraphError::Query(_)));

        let constraint = from_driver_message(
            "Neo.ClientError.Schema.ConstraintValidationFailed: already exists".to_string(),
        );
        assert!(matches!(constraint, GraphError::Conflict(_)));

        let dropped = from_driver_message("connection reset by peer".to_string());
        assert!(dropped.is_retryable());
    }

    #[test]
    fn test_core_invalid_input_maps_through() {
        let err: GraphError = CoreError::InvalidInput("no indicators".into()).into();
        assert!(matches!(err, GraphError::InvalidInput(m) if m == "no indicators"));
    }
}
