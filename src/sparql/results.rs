//! SPARQL 1.1 JSON results and executor outcomes

use super::{QueryType, SparqlError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};

/// One solution: variable name to bound term. Unbound variables are absent.
pub type Binding = IndexMap<String, RdfTermJson>;

/// An RDF term in the SPARQL JSON results format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdfTermJson {
    /// `uri`, `literal`, `bnode` (or the legacy `typed-literal`)
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(rename = "xml:lang", default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl RdfTermJson {
    pub fn uri(value: impl Into<String>) -> Self {
        Self {
            kind: "uri".to_string(),
            value: value.into(),
            datatype: None,
            lang: None,
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            kind: "literal".to_string(),
            value: value.into(),
            datatype: None,
            lang: None,
        }
    }

    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            datatype: Some(datatype.into()),
            ..Self::literal(value)
        }
    }

    pub fn is_uri(&self) -> bool {
        self.kind == "uri"
    }

    /// Fragment after the last `#`, else the last path segment, else the whole value
    pub fn local_name(&self) -> &str {
        local_name(&self.value)
    }
}

pub fn local_name(iri: &str) -> &str {
    if let Some((_, fragment)) = iri.rsplit_once('#') {
        fragment
    } else if let Some((_, segment)) = iri.rsplit_once('/') {
        segment
    } else {
        iri
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsHead {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsBody {
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

/// A SELECT or ASK response document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparqlJson {
    #[serde(default)]
    pub head: ResultsHead,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<ResultsBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boolean: Option<bool>,
}

impl SparqlJson {
    pub fn select(vars: Vec<String>, bindings: Vec<Binding>) -> Self {
        Self {
            head: ResultsHead { vars },
            results: Some(ResultsBody { bindings }),
            boolean: None,
        }
    }

    pub fn ask(answer: bool) -> Self {
        Self {
            head: ResultsHead::default(),
            results: None,
            boolean: Some(answer),
        }
    }

    pub fn vars(&self) -> &[String] {
        &self.head.vars
    }

    /// Solutions, empty when the document carries none (e.g. ASK)
    pub fn bindings(&self) -> &[Binding] {
        self.results.as_ref().map(|r| r.bindings.as_slice()).unwrap_or_default()
    }

    pub fn bindings_count(&self) -> usize {
        self.bindings().len()
    }

    /// Value of `var` in the first solution
    pub fn first_value(&self, var: &str) -> Option<&str> {
        self.bindings()
            .first()
            .and_then(|b| b.get(var))
            .map(|term| term.value.as_str())
    }
}

/// Outcome of one executor call
///
/// Build it with [`QueryResult::ok`] or [`QueryResult::failed`]: a success
/// always carries data and no error, a failure always carries an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub success: bool,
    pub data: Option<SparqlJson>,
    #[serde(serialize_with = "serialize_error_message")]
    pub error: Option<SparqlError>,
    /// Wall time in seconds, backoff included
    pub execution_time: f64,
    pub bindings_count: Option<usize>,
    pub query_type: QueryType,
}

impl QueryResult {
    pub fn ok(data: SparqlJson, execution_time: f64, query_type: QueryType) -> Self {
        let bindings_count = data.bindings_count();
        Self {
            success: true,
            data: Some(data),
            error: None,
            execution_time,
            bindings_count: Some(bindings_count),
            query_type,
        }
    }

    pub fn failed(error: SparqlError, execution_time: f64, query_type: QueryType) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            execution_time,
            bindings_count: None,
            query_type,
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }
}

fn serialize_error_message<S: Serializer>(
    error: &Option<SparqlError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_select_document() {
        let doc: SparqlJson = serde_json::from_value(json!({
            "head": { "vars": ["person", "name"] },
            "results": { "bindings": [
                {
                    "person": { "type": "uri", "value": "http://example.org/onto#Alice" },
                    "name": { "type": "literal", "value": "Alice", "xml:lang": "fr" }
                },
                { "person": { "type": "uri", "value": "http://example.org/people/bob" } }
            ]}
        }))
        .unwrap();

        assert_eq!(doc.vars(), ["person".to_string(), "name".to_string()]);
        assert_eq!(doc.bindings_count(), 2);
        assert_eq!(doc.bindings()[0]["name"].lang.as_deref(), Some("fr"));
        assert_eq!(doc.bindings()[0]["person"].local_name(), "Alice");
        assert_eq!(doc.bindings()[1]["person"].local_name(), "bob");
        assert!(!doc.bindings()[1].contains_key("name"));
    }

    #[test]
    fn test_decode_ask_document() {
        let doc: SparqlJson =
            serde_json::from_value(json!({ "head": {}, "boolean": true })).unwrap();
        assert_eq!(doc.boolean, Some(true));
        assert_eq!(doc.bindings_count(), 0);
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name("http://example.org/onto#Bus"), "Bus");
        assert_eq!(local_name("http://example.org/stations/S1"), "S1");
        assert_eq!(local_name("urn:x"), "urn:x");
    }

    #[test]
    fn test_first_value() {
        let mut binding = Binding::new();
        binding.insert(
            "count".to_string(),
            RdfTermJson::typed("42", "http://www.w3.org/2001/XMLSchema#integer"),
        );
        let doc = SparqlJson::select(vec!["count".to_string()], vec![binding]);
        assert_eq!(doc.first_value("count"), Some("42"));
        assert_eq!(doc.first_value("missing"), None);
    }

    #[test]
    fn test_query_result_invariants() {
        let ok = QueryResult::ok(SparqlJson::ask(false), 0.2, QueryType::Ask);
        assert!(ok.success && ok.data.is_some() && ok.error.is_none());
        assert_eq!(ok.bindings_count, Some(0));

        let failed = QueryResult::failed(SparqlError::EmptyQuery, 0.0, QueryType::Unknown);
        assert!(!failed.success && failed.data.is_none());
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["error"], "Query cannot be empty");
        assert_eq!(json["executionTime"], 0.0);
    }
}
