//! Triple-store access over the SPARQL 1.1 protocol

use super::SparqlJson;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const SPARQL_QUERY: &str = "application/sparql-query";
const SPARQL_UPDATE: &str = "application/sparql-update";
const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Store access errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// HTTP 400: the store rejected the query text
    #[error("{0}")]
    Malformed(String),

    /// Any other non-success status
    #[error("Endpoint returned HTTP {status}: {body}")]
    Endpoint { status: u16, body: String },

    /// No complete response within the attempt timeout (seconds)
    #[error("no response within {0}s")]
    Timeout(u64),

    /// Connection refused, DNS failure and other transport errors
    #[error("{0}")]
    Transport(String),

    /// Response body is not a SPARQL JSON results document
    #[error("Undecodable store response: {0}")]
    Decode(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Errors the store itself reported, plus attempt timeouts
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Malformed(_) | StoreError::Endpoint { .. } | StoreError::Timeout(_)
        )
    }

    fn from_status(status: StatusCode, body: String) -> Self {
        let body = body.trim().to_string();
        if status == StatusCode::BAD_REQUEST {
            StoreError::Malformed(body)
        } else {
            StoreError::Endpoint {
                status: status.as_u16(),
                body,
            }
        }
    }

    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            StoreError::Timeout(timeout.as_secs())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

/// A SPARQL query/update service
#[async_trait]
pub trait SparqlEndpoint: Send + Sync {
    /// URL reported in metadata and health checks
    fn query_url(&self) -> &str;

    async fn query(&self, query: &str, timeout: Duration) -> StoreResult<SparqlJson>;

    async fn update(&self, update: &str, timeout: Duration) -> StoreResult<()>;
}

/// [`SparqlEndpoint`] backed by a pooled reqwest client
#[derive(Debug, Clone)]
pub struct HttpSparqlEndpoint {
    client: Client,
    query_url: String,
    update_url: String,
}

impl HttpSparqlEndpoint {
    pub fn new(query_url: impl Into<String>, update_url: impl Into<String>) -> StoreResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, query_url, update_url))
    }

    pub fn with_client(
        client: Client,
        query_url: impl Into<String>,
        update_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            query_url: query_url.into(),
            update_url: update_url.into(),
        }
    }

    pub fn update_url(&self) -> &str {
        &self.update_url
    }
}

#[async_trait]
impl SparqlEndpoint for HttpSparqlEndpoint {
    fn query_url(&self) -> &str {
        &self.query_url
    }

    async fn query(&self, query: &str, timeout: Duration) -> StoreResult<SparqlJson> {
        debug!("POST {} ({} chars)", self.query_url, query.len());
        let resp = self
            .client
            .post(&self.query_url)
            .header(CONTENT_TYPE, SPARQL_QUERY)
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .timeout(timeout)
            .body(query.to_string())
            .send()
            .await
            .map_err(|e| StoreError::from_reqwest(e, timeout))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::from_status(status, body));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| StoreError::from_reqwest(e, timeout))?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn update(&self, update: &str, timeout: Duration) -> StoreResult<()> {
        debug!("POST {} ({} chars)", self.update_url, update.len());
        let resp = self
            .client
            .post(&self.update_url)
            .header(CONTENT_TYPE, SPARQL_UPDATE)
            .timeout(timeout)
            .body(update.to_string())
            .send()
            .await
            .map_err(|e| StoreError::from_reqwest(e, timeout))?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(StoreError::from_status(status, body))
        }
    }
}
