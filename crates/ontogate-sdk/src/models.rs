//! Response models of the gateway API

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Successful `/api/sparql/query` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    /// Formatted (`variables`/`bindings`) or raw SPARQL JSON results
    pub data: Value,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl QueryResponse {
    /// Variable names of a formatted result
    pub fn variables(&self) -> Vec<String> {
        self.data
            .get("variables")
            .and_then(Value::as_array)
            .map(|vars| vars.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    /// Rows of a formatted result; each row maps a variable to a term object or null
    pub fn rows(&self) -> Vec<Map<String, Value>> {
        self.data
            .get("bindings")
            .and_then(Value::as_array)
            .map(|rows| rows.iter().filter_map(|r| r.as_object().cloned()).collect())
            .unwrap_or_default()
    }

    pub fn bindings_count(&self) -> u64 {
        self.metadata
            .get("bindingsCount")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }
}

/// Successful `/api/sparql/validate` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub valid: bool,
    pub data: Value,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ValidationResponse {
    pub fn suggestions(&self) -> Vec<String> {
        self.data
            .get("suggestions")
            .and_then(Value::as_array)
            .map(|s| s.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }
}

/// A person row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub uri: String,
    pub name: String,
    #[serde(rename = "type")]
    pub person_type: String,
}

/// `/api/ai/query` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskResponse {
    pub question: String,
    pub sparql_query: String,
    pub intent: String,
    pub results: Vec<Person>,
    pub execution_time: f64,
    pub bindings_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryExample {
    pub description: String,
    pub query: String,
}

/// `/api/sparql/examples` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamplesResponse {
    pub examples: IndexMap<String, QueryExample>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusekiReport {
    pub connected: bool,
    pub endpoint: String,
    pub response_time: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OntologyReport {
    pub valid: bool,
    pub total_triples: Option<u64>,
    pub class_count: Option<u64>,
    pub property_count: Option<u64>,
    pub individual_count: Option<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issues {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// `/api/health` response (returned for 200 and 503 alike)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// healthy, degraded or unhealthy
    pub status: String,
    pub timestamp: String,
    pub fuseki: FusekiReport,
    pub ontology: OntologyReport,
    pub system: Map<String, Value>,
    pub issues: Issues,
}
