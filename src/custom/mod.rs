//! Ad hoc SELECT queries
//!
//! [`CustomQueryService`] applies a fixed read-only policy before handing a
//! query to the [`QueryExecutor`]:
//!
//! 1. the query is not empty;
//! 2. it is at most `max_query_length` characters;
//! 3. it is a SELECT query;
//! 4. it passes the validator;
//! 5. it contains no dangerous patterns.
//!
//! The first failing step decides the error.

pub mod format;

pub use format::format_results;

use crate::sparql::{
    classify, dangerous_patterns, statistics, validate, QueryExecutor, QueryType, SparqlError,
};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};

/// Default maximum query length in characters
pub const DEFAULT_MAX_QUERY_LENGTH: usize = 10_000;

/// Query run by the custom query health check
pub const HEALTH_QUERY: &str = "SELECT ?s WHERE { ?s ?p ?o } LIMIT 1";

/// Outcome of a custom query or a validate-only request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomQueryResult {
    pub success: bool,
    pub data: Option<Value>,
    #[serde(skip)]
    pub error: Option<SparqlError>,
    pub execution_time: Option<f64>,
    pub query_type: QueryType,
    pub bindings_count: Option<usize>,
    pub metadata: Map<String, Value>,
}

impl CustomQueryResult {
    fn rejected(error: SparqlError, query_type: QueryType, metadata: Map<String, Value>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            execution_time: None,
            query_type,
            bindings_count: None,
            metadata,
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }
}

/// One catalogue entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryExample {
    pub description: &'static str,
    pub query: String,
}

/// The example catalogue with its context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryExamples {
    pub examples: IndexMap<&'static str, QueryExample>,
    pub namespace: String,
    pub endpoint: String,
}

pub struct CustomQueryService {
    executor: Arc<QueryExecutor>,
    max_query_length: usize,
    namespace: String,
}

impl CustomQueryService {
    pub fn new(
        executor: Arc<QueryExecutor>,
        max_query_length: usize,
        namespace: impl Into<String>,
    ) -> Self {
        info!(
            "Custom query service on {} (max {} chars)",
            executor.endpoint_url(),
            max_query_length
        );
        Self {
            executor,
            max_query_length,
            namespace: namespace.into(),
        }
    }

    pub fn endpoint_url(&self) -> &str {
        self.executor.endpoint_url()
    }

    /// Run the read-only policy, then execute.
    pub async fn execute_custom(
        &self,
        query: &str,
        timeout: Option<u64>,
        format_results: bool,
    ) -> CustomQueryResult {
        let started = Instant::now();
        if let Err(rejected) = self.check_policy(query) {
            warn!("Custom query rejected: {}", rejected.error_message().unwrap_or_default());
            return rejected;
        }

        let query = query.trim();
        let query_type = classify(query);
        let timeout_used = self.executor.effective_timeout(timeout);
        let result = self.executor.execute(query, Some(timeout_used), true).await;
        let execution_time = started.elapsed().as_secs_f64();

        let mut metadata = Map::new();
        metadata.insert("queryLength".into(), json!(query.chars().count()));
        metadata.insert("executionTime".into(), json!(execution_time));
        metadata.insert("bindingsCount".into(), json!(result.bindings_count));
        metadata.insert("queryType".into(), json!(query_type));
        metadata.insert("endpoint".into(), json!(self.endpoint_url()));
        metadata.insert("timeoutUsed".into(), json!(timeout_used));

        let data = match (result.data, result.error) {
            (Some(data), None) => data,
            (_, error) => {
                let error = error
                    .unwrap_or_else(|| SparqlError::Internal("query returned no data".to_string()));
                return CustomQueryResult {
                    execution_time: Some(execution_time),
                    ..CustomQueryResult::rejected(error, query_type, metadata)
                };
            }
        };

        let data = if format_results {
            format::format_results(&data, query)
        } else {
            match serde_json::to_value(&data) {
                Ok(value) => value,
                Err(err) => {
                    return CustomQueryResult::rejected(
                        SparqlError::Internal(err.to_string()),
                        query_type,
                        metadata,
                    )
                }
            }
        };

        info!(
            "Custom query returned {} bindings in {:.3}s",
            result.bindings_count.unwrap_or_default(),
            execution_time
        );
        CustomQueryResult {
            success: true,
            data: Some(data),
            error: None,
            execution_time: Some(execution_time),
            query_type,
            bindings_count: result.bindings_count,
            metadata,
        }
    }

    /// Run the policy without executing; report statistics and suggestions.
    pub fn validate_only(&self, query: &str) -> CustomQueryResult {
        if let Err(rejected) = self.check_policy(query) {
            return rejected;
        }

        let query = query.trim();
        let query_type = classify(query);
        let mut metadata = Map::new();
        metadata.insert("validationOnly".into(), Value::Bool(true));

        CustomQueryResult {
            success: true,
            data: Some(json!({
                "isValid": true,
                "queryType": query_type,
                "statistics": statistics(query),
                "suggestions": improvement_suggestions(query),
            })),
            error: None,
            execution_time: None,
            query_type,
            bindings_count: None,
            metadata,
        }
    }

    fn check_policy(&self, query: &str) -> Result<(), CustomQueryResult> {
        let query = query.trim();
        let reject = |error: SparqlError, tag: &str, query_type: QueryType, extra: Vec<(&str, Value)>| {
            let mut metadata = Map::new();
            metadata.insert("validationError".into(), json!(tag));
            for (key, value) in extra {
                metadata.insert(key.into(), value);
            }
            CustomQueryResult::rejected(error, query_type, metadata)
        };

        if query.is_empty() {
            return Err(reject(SparqlError::EmptyQuery, "empty_query", QueryType::Unknown, vec![]));
        }

        let length = query.chars().count();
        if length > self.max_query_length {
            return Err(reject(
                SparqlError::QueryTooLong { length, max: self.max_query_length },
                "query_too_long",
                QueryType::Unknown,
                vec![("queryLength", json!(length))],
            ));
        }

        let query_type = classify(query);
        if query_type != QueryType::Select {
            return Err(reject(
                SparqlError::InvalidQueryType(query_type),
                "invalid_query_type",
                query_type,
                vec![("detectedType", json!(query_type))],
            ));
        }

        let validation = validate(query);
        if let Some(error) = validation.error {
            return Err(reject(
                error,
                "syntax_error",
                query_type,
                vec![("suggestions", json!(validation.suggestions))],
            ));
        }

        let patterns = dangerous_patterns(query);
        if !patterns.is_empty() {
            return Err(reject(
                SparqlError::DangerousPattern(patterns.clone()),
                "dangerous_patterns",
                query_type,
                vec![("patterns", json!(patterns))],
            ));
        }

        Ok(())
    }

    /// The fixed example catalogue
    pub fn examples(&self) -> QueryExamples {
        let ns = &self.namespace;
        let mut examples = IndexMap::new();
        examples.insert(
            "basic_concepts",
            QueryExample {
                description: "Get all concepts in the ontology",
                query: format!(
                    "PREFIX : <{ns}>\nPREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>\n\n\
                     SELECT ?concept ?type\nWHERE {{\n    ?concept rdf:type ?type .\n}}\nLIMIT 20"
                ),
            },
        );
        examples.insert(
            "transport_modes",
            QueryExample {
                description: "Get all transport modes",
                query: format!(
                    "PREFIX : <{ns}>\nPREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>\n\n\
                     SELECT ?transport ?name\nWHERE {{\n    ?transport rdf:type :TransportMode .\n    \
                     OPTIONAL {{ ?transport :hasName ?name . }}\n}}"
                ),
            },
        );
        examples.insert(
            "persons_and_transport",
            QueryExample {
                description: "Find persons and their transport preferences",
                query: format!(
                    "PREFIX : <{ns}>\nPREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>\n\n\
                     SELECT ?person ?name ?transport\nWHERE {{\n    ?person rdf:type :Person .\n    \
                     ?person :hasName ?name .\n    ?person :usesTransport ?transport .\n}}"
                ),
            },
        );
        examples.insert(
            "class_hierarchy",
            QueryExample {
                description: "Explore class hierarchy relationships",
                query: format!(
                    "PREFIX : <{ns}>\nPREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>\n\n\
                     SELECT ?class ?parent ?label\nWHERE {{\n    ?class rdfs:subClassOf ?parent .\n    \
                     OPTIONAL {{ ?class rdfs:label ?label . }}\n}}"
                ),
            },
        );

        QueryExamples {
            examples,
            namespace: self.namespace.clone(),
            endpoint: self.endpoint_url().to_string(),
        }
    }
}

/// Optimisation hints for a query that already passed the policy
pub fn improvement_suggestions(query: &str) -> Vec<String> {
    let upper = query.to_uppercase();
    let mut suggestions = Vec::new();

    if !upper.contains("LIMIT") {
        suggestions.push("Consider adding a LIMIT clause to prevent large result sets".to_string());
        if upper.contains("ORDER BY") {
            suggestions.push("ORDER BY without LIMIT can be expensive for large datasets".to_string());
        }
    }
    if query.contains(':') && !upper.contains("PREFIX") {
        suggestions.push("Define PREFIX declarations for better readability".to_string());
    }
    if upper.contains("OPTIONAL") && !upper.contains("FILTER") {
        suggestions.push("Consider adding FILTER clauses to optimize OPTIONAL patterns".to_string());
    }

    suggestions
}
