//! SPARQL query pipeline
//!
//! Everything between a raw query string and the triple-store:
//!
//! - [`classifier`]: detects the query form (SELECT, ASK, ...)
//! - [`validator`]: heuristic syntax checks, statistics and advisory suggestions
//! - [`sanitizer`]: null-byte, comment and whitespace normalisation
//! - [`template`]: the only place values are interpolated into SPARQL text
//! - [`client`]: the [`SparqlEndpoint`] seam and its HTTP implementation
//! - [`executor`]: timeout, retry and backoff around an endpoint
//! - [`mock`]: canned-response endpoint for tests
//! - [`results`]: SPARQL 1.1 JSON results and the executor's [`QueryResult`]
//!
//! Validation here is a fast pre-filter, not a grammar. A malformed but
//! brace-balanced query still reaches the store, which stays the authority.
//!
//! # Example
//!
//! ```rust
//! use ontogate::sparql::{classify, sanitize, validate, QueryType};
//!
//! let query = sanitize("PREFIX : <http://example.org/onto#>\nSELECT ?s WHERE { ?s ?p ?o } # all");
//! assert_eq!(classify(&query), QueryType::Select);
//! assert!(validate(&query).is_valid());
//! ```

pub mod classifier;
pub mod client;
pub mod executor;
pub mod mock;
pub mod results;
pub mod sanitizer;
pub mod template;
pub mod validator;

pub use classifier::classify;
pub use client::{HttpSparqlEndpoint, SparqlEndpoint, StoreError, StoreResult};
pub use executor::{Backoff, ExecutorConfig, LinearBackoff, QueryExecutor};
pub use mock::MockEndpoint;
pub use results::{Binding, QueryResult, RdfTermJson, SparqlJson};
pub use sanitizer::sanitize;
pub use template::{SparqlTemplate, TemplateError, TemplateResult};
pub use validator::{
    dangerous_patterns, statistics, validate, Complexity, DangerCategory, QueryStatistics,
    ValidationResult,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// SPARQL query form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryType {
    Select,
    Construct,
    Ask,
    Describe,
    Insert,
    Delete,
    Unknown,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Select => "SELECT",
            QueryType::Construct => "CONSTRUCT",
            QueryType::Ask => "ASK",
            QueryType::Describe => "DESCRIBE",
            QueryType::Insert => "INSERT",
            QueryType::Delete => "DELETE",
            QueryType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SPARQL errors
///
/// The first five variants are raised before any network call and are never
/// retried. The store-level variants come out of the executor once its retry
/// budget is spent (or immediately, for transport failures).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SparqlError {
    /// Empty or whitespace-only query
    #[error("Query cannot be empty")]
    EmptyQuery,

    /// Query exceeds the configured maximum length
    #[error("Query too long. Maximum length is {max} characters")]
    QueryTooLong { length: usize, max: usize },

    /// A query form other than SELECT where SELECT is required
    #[error("Only SELECT queries are allowed for custom queries (detected {0})")]
    InvalidQueryType(QueryType),

    /// Heuristic syntax failure, or a malformed query reported by the store
    #[error("{message}")]
    Syntax {
        message: String,
        suggestions: Vec<String>,
    },

    /// Modification keywords, system functions or excessive UNIONs
    #[error("Query contains potentially dangerous patterns: {}", DangerCategory::join(.0))]
    DangerousPattern(Vec<DangerCategory>),

    /// The store did not answer within the allotted time
    #[error("Query timeout: {0}")]
    Timeout(String),

    /// The store could not be reached, or the endpoint is unavailable
    #[error("Connection error: {0}")]
    Connection(String),

    /// The store ran the query but reported a failure
    #[error("SPARQL execution error: {0}")]
    Execution(String),

    /// Anything the pipeline did not anticipate
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type SparqlResult<T> = Result<T, SparqlError>;

impl SparqlError {
    /// Stable machine-readable code for the HTTP boundary
    pub fn code(&self) -> &'static str {
        match self {
            SparqlError::EmptyQuery => "EMPTY_QUERY",
            SparqlError::QueryTooLong { .. } => "QUERY_TOO_LONG",
            SparqlError::InvalidQueryType(_) => "INVALID_QUERY_TYPE",
            SparqlError::Syntax { .. } => "SYNTAX_ERROR",
            SparqlError::DangerousPattern(_) => "DANGEROUS_QUERY",
            SparqlError::Timeout(_) => "TIMEOUT_ERROR",
            SparqlError::Connection(_) => "CONNECTION_ERROR",
            SparqlError::Execution(_) => "EXECUTION_ERROR",
            SparqlError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for errors detected locally, before the store is contacted
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SparqlError::EmptyQuery
                | SparqlError::QueryTooLong { .. }
                | SparqlError::InvalidQueryType(_)
                | SparqlError::Syntax { .. }
                | SparqlError::DangerousPattern(_)
        )
    }

    /// Actionable suggestions for the caller
    pub fn suggestions(&self) -> Vec<String> {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        match self {
            SparqlError::EmptyQuery => owned(&["Provide a valid SPARQL SELECT query"]),
            SparqlError::QueryTooLong { max, .. } => {
                vec![format!("Shorten the query to at most {} characters", max)]
            }
            SparqlError::InvalidQueryType(_) => owned(&[
                "Use SELECT queries only for custom queries",
                "Example: SELECT ?s ?p ?o WHERE { ?s ?p ?o } LIMIT 10",
            ]),
            SparqlError::Syntax { suggestions, .. } if !suggestions.is_empty() => {
                suggestions.clone()
            }
            SparqlError::Syntax { .. } => owned(&[
                "Check SPARQL syntax for missing brackets or semicolons",
                "Verify PREFIX declarations are properly formatted",
                "Ensure WHERE clause is properly structured",
            ]),
            SparqlError::DangerousPattern(_) => owned(&[
                "Remove modification operations (INSERT, DELETE, DROP)",
                "Use only SELECT queries for data retrieval",
            ]),
            SparqlError::Timeout(_) => owned(&[
                "Add LIMIT clause to reduce result set size",
                "Optimize query with more specific FILTER conditions",
                "Consider breaking complex query into smaller parts",
            ]),
            SparqlError::Connection(_) | SparqlError::Execution(_) | SparqlError::Internal(_) => {
                Vec::new()
            }
        }
    }
}

impl From<StoreError> for SparqlError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Malformed(message) => SparqlError::Syntax {
                message: format!("Malformed query rejected by the store: {}", message),
                suggestions: Vec::new(),
            },
            StoreError::Endpoint { status, .. } if matches!(status, 404 | 502 | 503 | 504) => {
                SparqlError::Connection(err.to_string())
            }
            StoreError::Endpoint { .. } => SparqlError::Execution(err.to_string()),
            StoreError::Timeout(_) => SparqlError::Timeout(err.to_string()),
            StoreError::Transport(_) => SparqlError::Connection(err.to_string()),
            StoreError::Decode(_) => SparqlError::Execution(err.to_string()),
        }
    }
}
