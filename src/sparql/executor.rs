//! Query execution with per-attempt timeout and linear backoff

use super::client::SparqlEndpoint;
use super::{classify, sanitize, validate, QueryResult, SparqlError, SparqlResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Delay between failed attempts
#[async_trait]
pub trait Backoff: Send + Sync {
    /// Wait after the failed attempt number `attempt` (counted from 1)
    async fn wait(&self, attempt: u32);
}

/// Sleeps `step × attempt` on the tokio clock
#[derive(Debug, Clone, Copy)]
pub struct LinearBackoff {
    step: Duration,
}

impl LinearBackoff {
    pub fn new(step: Duration) -> Self {
        Self { step }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        self.step * attempt
    }
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[async_trait]
impl Backoff for LinearBackoff {
    async fn wait(&self, attempt: u32) {
        tokio::time::sleep(self.delay(attempt)).await;
    }
}

/// Executor configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorConfig {
    /// Per-attempt timeout used when the caller gives none
    pub default_timeout_secs: u64,
    /// Total number of attempts for retryable failures
    pub max_retries: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: 30,
            max_retries: 3,
        }
    }
}

/// Runs queries against a [`SparqlEndpoint`]
///
/// Every query is sanitized first. Store-reported failures and timeouts are
/// retried up to `max_retries` attempts in total; transport and decoding
/// failures end the call at once.
pub struct QueryExecutor {
    endpoint: Arc<dyn SparqlEndpoint>,
    config: ExecutorConfig,
    backoff: Arc<dyn Backoff>,
}

impl QueryExecutor {
    pub fn new(
        endpoint: Arc<dyn SparqlEndpoint>,
        config: ExecutorConfig,
        backoff: Arc<dyn Backoff>,
    ) -> Self {
        info!(
            "Query executor for {} (timeout {}s, {} attempts)",
            endpoint.query_url(),
            config.default_timeout_secs,
            config.max_retries
        );
        Self {
            endpoint,
            config,
            backoff,
        }
    }

    pub fn with_defaults(endpoint: Arc<dyn SparqlEndpoint>) -> Self {
        Self::new(
            endpoint,
            ExecutorConfig::default(),
            Arc::new(LinearBackoff::default()),
        )
    }

    pub fn endpoint(&self) -> &Arc<dyn SparqlEndpoint> {
        &self.endpoint
    }

    pub fn endpoint_url(&self) -> &str {
        self.endpoint.query_url()
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Timeout applied when `timeout` is `None`
    pub fn effective_timeout(&self, timeout: Option<u64>) -> u64 {
        timeout.unwrap_or(self.config.default_timeout_secs)
    }

    /// Execute a query, optionally validating it first.
    ///
    /// A validation failure returns without contacting the store. The elapsed
    /// time covers every attempt and backoff.
    pub async fn execute(&self, query: &str, timeout: Option<u64>, validate_first: bool) -> QueryResult {
        let started = Instant::now();
        let query = sanitize(query);
        let query_type = classify(&query);

        if validate_first {
            let validation = validate(&query);
            if let Some(err) = validation.error {
                debug!("Query rejected before execution: {}", err);
                return QueryResult::failed(err, elapsed_secs(started), query_type);
            }
        }

        let timeout = Duration::from_secs(self.effective_timeout(timeout));
        let attempts = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.endpoint.query(&query, timeout).await {
                Ok(data) => {
                    let result = QueryResult::ok(data, elapsed_secs(started), query_type);
                    debug!(
                        "{} query returned {} bindings in {:.3}s (attempt {})",
                        query_type,
                        result.bindings_count.unwrap_or_default(),
                        result.execution_time,
                        attempt
                    );
                    return result;
                }
                Err(err) if err.is_retryable() => {
                    warn!("Attempt {}/{} failed: {}", attempt, attempts, err);
                    last_error = Some(err);
                    if attempt < attempts {
                        self.backoff.wait(attempt).await;
                    }
                }
                Err(err) => {
                    error!("Query failed without retry: {}", err);
                    return QueryResult::failed(err.into(), elapsed_secs(started), query_type);
                }
            }
        }

        let err = last_error
            .map(SparqlError::from)
            .unwrap_or_else(|| SparqlError::Internal("no attempt was made".to_string()));
        error!("Query failed after {} attempts: {}", attempts, err);
        QueryResult::failed(err, elapsed_secs(started), query_type)
    }

    /// Send an update in a single attempt.
    pub async fn update(&self, update: &str, timeout: Option<u64>) -> SparqlResult<()> {
        let update = sanitize(update);
        let timeout = Duration::from_secs(self.effective_timeout(timeout));
        self.endpoint.update(&update, timeout).await.map_err(|err| {
            error!("Update failed: {}", err);
            SparqlError::from(err)
        })
    }
}

fn elapsed_secs(started: Instant) -> f64 {
    started.elapsed().as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql::{MockEndpoint, SparqlJson, StoreError};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBackoff {
        waits: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Backoff for RecordingBackoff {
        async fn wait(&self, attempt: u32) {
            let delay = LinearBackoff::default().delay(attempt);
            self.waits.lock().unwrap().push(delay);
        }
    }

    fn executor(endpoint: Arc<MockEndpoint>, backoff: Arc<dyn Backoff>) -> QueryExecutor {
        QueryExecutor::new(endpoint, ExecutorConfig::default(), backoff)
    }

    fn endpoint_error() -> StoreError {
        StoreError::Endpoint { status: 500, body: "boom".to_string() }
    }

    #[tokio::test]
    async fn test_invalid_query_never_reaches_store() {
        let endpoint = Arc::new(MockEndpoint::new());
        let executor = executor(endpoint.clone(), Arc::new(RecordingBackoff::default()));

        let result = executor.execute("SELECT ?s WHERE { ?s ?p ?o", None, true).await;
        assert!(!result.success);
        assert_eq!(result.error_message().as_deref(), Some("Unbalanced braces in query"));
        assert_eq!(endpoint.calls(), 0);
    }

    #[tokio::test]
    async fn test_validation_can_be_skipped() {
        let endpoint = Arc::new(MockEndpoint::new());
        let executor = executor(endpoint.clone(), Arc::new(RecordingBackoff::default()));

        let result = executor.execute("SELECT ?s WHERE { ?s ?p ?o", None, false).await;
        assert!(result.success);
        assert_eq!(endpoint.calls(), 1);
    }

    #[tokio::test]
    async fn test_query_is_sanitized_and_counted() {
        let mut binding = crate::sparql::Binding::new();
        binding.insert("s".to_string(), crate::sparql::RdfTermJson::uri("http://example.org/a"));
        let endpoint = Arc::new(MockEndpoint::new().then(Ok(SparqlJson::select(
            vec!["s".to_string()],
            vec![binding.clone(), binding],
        ))));
        let executor = executor(endpoint.clone(), Arc::new(RecordingBackoff::default()));

        let result = executor
            .execute("# all subjects\nSELECT ?s\n  WHERE { ?s ?p ?o }\0", Some(7), true)
            .await;
        assert!(result.success);
        assert_eq!(result.bindings_count, Some(2));
        assert_eq!(endpoint.queries(), vec!["SELECT ?s WHERE { ?s ?p ?o }".to_string()]);
        assert_eq!(endpoint.timeouts(), vec![Duration::from_secs(7)]);
    }

    #[tokio::test]
    async fn test_ask_has_zero_bindings() {
        let endpoint = Arc::new(MockEndpoint::new().then(Ok(SparqlJson::ask(true))));
        let executor = executor(endpoint, Arc::new(RecordingBackoff::default()));

        let result = executor.execute("ASK { ?s ?p ?o }", None, true).await;
        assert_eq!(result.bindings_count, Some(0));
        assert_eq!(executor.effective_timeout(None), 30);
    }

    #[tokio::test]
    async fn test_retry_schedule_is_linear() {
        let endpoint = Arc::new(MockEndpoint::new().otherwise(Err(endpoint_error())));
        let backoff = Arc::new(RecordingBackoff::default());
        let executor = executor(endpoint.clone(), backoff.clone());

        let result = executor.execute("SELECT ?s WHERE { ?s ?p ?o }", None, true).await;
        assert!(!result.success);
        assert_eq!(result.error.as_ref().unwrap().code(), "EXECUTION_ERROR");
        assert_eq!(endpoint.calls(), 3);
        assert_eq!(
            *backoff.waits.lock().unwrap(),
            vec![Duration::from_millis(500), Duration::from_millis(1000)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_accumulates_in_execution_time() {
        let endpoint = Arc::new(
            MockEndpoint::new()
                .then(Err(endpoint_error()))
                .then(Err(StoreError::Malformed("Lexical error".to_string())))
                .then(Ok(SparqlJson::ask(true))),
        );
        let executor = executor(endpoint.clone(), Arc::new(LinearBackoff::default()));

        let result = executor.execute("ASK { ?s ?p ?o }", None, true).await;
        assert!(result.success);
        assert_eq!(endpoint.calls(), 3);
        assert!(result.execution_time >= 1.5, "{}", result.execution_time);
    }

    #[tokio::test]
    async fn test_last_error_is_reported() {
        let endpoint = Arc::new(
            MockEndpoint::new()
                .then(Err(endpoint_error()))
                .then(Err(endpoint_error()))
                .then(Err(StoreError::Timeout(30))),
        );
        let executor = executor(endpoint, Arc::new(RecordingBackoff::default()));

        let result = executor.execute("SELECT ?s WHERE { ?s ?p ?o }", None, true).await;
        assert_eq!(result.error.unwrap().code(), "TIMEOUT_ERROR");
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_retried() {
        let endpoint = Arc::new(
            MockEndpoint::new().otherwise(Err(StoreError::Transport("dns error".to_string()))),
        );
        let backoff = Arc::new(RecordingBackoff::default());
        let executor = executor(endpoint.clone(), backoff.clone());

        let result = executor.execute("SELECT ?s WHERE { ?s ?p ?o }", None, true).await;
        assert_eq!(result.error.unwrap().code(), "CONNECTION_ERROR");
        assert_eq!(endpoint.calls(), 1);
        assert!(backoff.waits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_single_attempt() {
        let endpoint = Arc::new(MockEndpoint::new().failing_updates(endpoint_error()));
        let executor = executor(endpoint.clone(), Arc::new(RecordingBackoff::default()));

        let err = executor.update("INSERT DATA { <a> <b> <c> }", Some(10)).await.unwrap_err();
        assert_eq!(err.code(), "EXECUTION_ERROR");
        assert_eq!(endpoint.updates().len(), 1);
    }
}
