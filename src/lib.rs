//! Ontogate
//!
//! A SPARQL gateway in front of an external Fuseki triple-store. Queries are
//! classified, validated and sanitized before they are sent, store failures
//! are retried with a linear backoff, and results come back as structured
//! JSON with actionable error suggestions.
//!
//! # Modules
//!
//! - [`sparql`]: classifier, validator, sanitizer, templates, executor
//! - [`custom`]: ad hoc SELECT queries behind a read-only policy
//! - [`nlq`]: French natural-language questions to SPARQL
//! - [`health`]: store connectivity, ontology integrity and host metrics
//! - [`ontology`]: concept search, classes and the subclass tree
//! - [`recommend`]: transport recommendations per user type
//! - [`resources`]: persons, stations, transport modes, travel plans and
//!   parking stations
//! - [`http`]: the axum API under `/api`
//! - [`config`]: gateway settings
//!
//! # Example
//!
//! ```rust,no_run
//! use ontogate::sparql::{HttpSparqlEndpoint, QueryExecutor};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoint = HttpSparqlEndpoint::new(
//!     "http://localhost:3030/smartcity/query",
//!     "http://localhost:3030/smartcity/update",
//! )?;
//! let executor = QueryExecutor::with_defaults(Arc::new(endpoint));
//!
//! let result = executor
//!     .execute("SELECT ?s WHERE { ?s ?p ?o } LIMIT 5", None, true)
//!     .await;
//! println!("{} bindings", result.bindings_count.unwrap_or(0));
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod custom;
pub mod health;
pub mod http;
pub mod nlq;
pub mod ontology;
pub mod recommend;
pub mod resources;
pub mod sparql;

// Re-export main types for convenience
pub use config::{ConfigError, ConfigResult, GatewayConfig};

pub use custom::{CustomQueryResult, CustomQueryService};

pub use health::{HealthMonitor, HealthStatus, OverallStatus, SysinfoMetrics};

pub use http::{AppState, HttpServer};

pub use nlq::{Intent, NlTransformer, Translation};

pub use ontology::{ClassInfo, Concept, Hierarchy, HierarchyNode, OntologyService};

pub use recommend::{
    CustomCriteria, CustomRecommendation, Recommendation, RecommendationService, TransportMode,
    UserType,
};

pub use resources::{ResourceError, ResourceResult, ResourceService};

pub use sparql::{
    HttpSparqlEndpoint, QueryExecutor, QueryResult, QueryType, SparqlEndpoint, SparqlError,
    SparqlResult,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
