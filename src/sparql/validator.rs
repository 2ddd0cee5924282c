//! Heuristic query validation and analysis

use super::{classify, QueryType, SparqlError};
use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::LazyLock;

/// SQL-style injection shapes that have no business in a SPARQL query
static INJECTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i);\s*DROP\s",
        r"(?i);\s*DELETE\s",
        r"(?i);\s*INSERT\s",
        r"(?i)UNION\s+SELECT.*--",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("static injection pattern"))
    .collect()
});

const MODIFICATION_KEYWORDS: [&str; 5] = ["INSERT", "DELETE", "DROP", "CLEAR", "LOAD"];
const SYSTEM_TOKENS: [&str; 3] = ["SYSTEM", "EXEC", "SHELL"];
const MAX_UNIONS: usize = 10;

/// Outcome of [`validate`]
///
/// Suggestions are advisory; only `error` decides validity.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub query_type: QueryType,
    pub suggestions: Vec<String>,
    pub error: Option<SparqlError>,
}

impl ValidationResult {
    fn valid(query_type: QueryType, suggestions: Vec<String>) -> Self {
        Self { query_type, suggestions, error: None }
    }

    fn invalid(query_type: QueryType, error: SparqlError, suggestions: &[&str]) -> Self {
        Self {
            query_type,
            suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
            error: Some(error),
        }
    }

    fn syntax(query_type: QueryType, message: &str, suggestions: &[&str]) -> Self {
        let error = SparqlError::Syntax {
            message: message.to_string(),
            suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
        };
        Self::invalid(query_type, error, suggestions)
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }
}

impl Serialize for ValidationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationResult", 4)?;
        state.serialize_field("isValid", &self.is_valid())?;
        state.serialize_field("errorMessage", &self.error_message())?;
        state.serialize_field("suggestions", &self.suggestions)?;
        state.serialize_field("queryType", &self.query_type)?;
        state.end()
    }
}

/// Validate a query with cheap textual heuristics.
pub fn validate(query: &str) -> ValidationResult {
    let query = query.trim();
    if query.is_empty() {
        return ValidationResult::invalid(
            QueryType::Unknown,
            SparqlError::EmptyQuery,
            &["Provide a valid SPARQL query"],
        );
    }

    let query_type = classify(query);
    if query_type == QueryType::Unknown {
        return ValidationResult::syntax(
            query_type,
            "Unknown query type. Query must start with SELECT, CONSTRUCT, ASK, DESCRIBE, INSERT, or DELETE",
            &[
                "Start your query with a valid SPARQL keyword",
                "Example: SELECT ?s ?p ?o WHERE { ?s ?p ?o }",
            ],
        );
    }

    if INJECTION_PATTERNS.iter().any(|p| p.is_match(query)) {
        return ValidationResult::syntax(
            query_type,
            "Query contains potentially unsafe patterns",
            &["Remove suspicious SQL-like commands", "Use proper SPARQL syntax"],
        );
    }

    if query.matches('{').count() != query.matches('}').count() {
        return ValidationResult::syntax(
            query_type,
            "Unbalanced braces in query",
            &["Check that all { have matching }", "Verify WHERE clause syntax"],
        );
    }

    let upper = query.to_uppercase();
    let mut suggestions = Vec::new();
    if query_type == QueryType::Select && !upper.contains("WHERE") {
        suggestions.push("Consider adding a WHERE clause for better query structure".to_string());
    }
    if query.contains(':') && !upper.contains("PREFIX") {
        suggestions.push("Define PREFIX declarations for namespace shortcuts".to_string());
    }

    ValidationResult::valid(query_type, suggestions)
}

/// Category reported by [`dangerous_patterns`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DangerCategory {
    ModificationOperations,
    SystemFunctions,
    ExcessiveUnions,
}

impl DangerCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DangerCategory::ModificationOperations => "modification_operations",
            DangerCategory::SystemFunctions => "system_functions",
            DangerCategory::ExcessiveUnions => "excessive_unions",
        }
    }

    pub fn join(categories: &[DangerCategory]) -> String {
        categories.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ")
    }
}

/// Scan for keywords a read-only query should not contain.
///
/// Matching is by substring on the upper-cased text, so a literal such as
/// `"DROP"` is flagged even though it does not change the query form.
pub fn dangerous_patterns(query: &str) -> Vec<DangerCategory> {
    let upper = query.to_uppercase();
    let mut found = Vec::new();

    if MODIFICATION_KEYWORDS.iter().any(|kw| upper.contains(kw)) {
        found.push(DangerCategory::ModificationOperations);
    }
    if SYSTEM_TOKENS.iter().any(|kw| upper.contains(kw)) {
        found.push(DangerCategory::SystemFunctions);
    }
    if upper.matches("UNION").count() > MAX_UNIONS {
        found.push(DangerCategory::ExcessiveUnions);
    }

    found
}

/// Rough cost class of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl Complexity {
    /// UNION weighs 2; OPTIONAL, FILTER and more than two group patterns weigh 1.
    pub fn estimate(query: &str) -> Self {
        let upper = query.to_uppercase();
        let mut score = 0;
        if upper.contains("UNION") {
            score += 2;
        }
        if upper.contains("OPTIONAL") {
            score += 1;
        }
        if upper.contains("FILTER") {
            score += 1;
        }
        if query.matches('{').count() > 2 {
            score += 1;
        }

        match score {
            0 => Complexity::Simple,
            1..=2 => Complexity::Moderate,
            _ => Complexity::Complex,
        }
    }
}

/// Shape statistics reported by validate-only requests
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStatistics {
    pub query_length: usize,
    pub line_count: usize,
    pub query_type: QueryType,
    pub is_valid: bool,
    pub has_prefixes: bool,
    pub has_filter: bool,
    pub has_optional: bool,
    pub has_union: bool,
    pub estimated_complexity: Complexity,
}

/// Analyse a query without executing it.
pub fn statistics(query: &str) -> QueryStatistics {
    let validation = validate(query);
    let upper = query.to_uppercase();
    QueryStatistics {
        query_length: query.chars().count(),
        line_count: query.split('\n').count(),
        query_type: validation.query_type,
        is_valid: validation.is_valid(),
        has_prefixes: upper.contains("PREFIX"),
        has_filter: upper.contains("FILTER"),
        has_optional: upper.contains("OPTIONAL"),
        has_union: upper.contains("UNION"),
        estimated_complexity: Complexity::estimate(query),
    }
}
