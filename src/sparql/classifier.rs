//! Query form detection

use super::QueryType;
use regex::Regex;
use std::sync::LazyLock;

/// Keyword patterns in tie-break order. The keyword may appear anywhere in the
/// text since PREFIX and BASE declarations precede it.
static QUERY_FORMS: LazyLock<Vec<(QueryType, Regex)>> = LazyLock::new(|| {
    [
        (QueryType::Select, r"(?i)SELECT\s"),
        (QueryType::Construct, r"(?i)CONSTRUCT\s"),
        (QueryType::Ask, r"(?i)ASK\s"),
        (QueryType::Describe, r"(?i)DESCRIBE\s"),
        (QueryType::Insert, r"(?i)INSERT\s"),
        (QueryType::Delete, r"(?i)DELETE\s"),
    ]
    .into_iter()
    .map(|(form, pattern)| (form, Regex::new(pattern).expect("static query form pattern")))
    .collect()
});

/// Classify a raw query string.
///
/// The first form (in the order SELECT, CONSTRUCT, ASK, DESCRIBE, INSERT,
/// DELETE) whose keyword occurs followed by whitespace wins.
pub fn classify(query: &str) -> QueryType {
    QUERY_FORMS
        .iter()
        .find(|(_, pattern)| pattern.is_match(query))
        .map(|(form, _)| *form)
        .unwrap_or(QueryType::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_after_prefix() {
        assert_eq!(
            classify("PREFIX : <x> SELECT ?s WHERE {?s ?p ?o}"),
            QueryType::Select
        );
    }

    #[test]
    fn test_classify_each_form() {
        assert_eq!(classify("CONSTRUCT { ?s ?p ?o } WHERE { ?s ?p ?o }"), QueryType::Construct);
        assert_eq!(classify("ASK { ?s ?p ?o }"), QueryType::Ask);
        assert_eq!(classify("describe <http://example.org/a>"), QueryType::Describe);
        assert_eq!(classify("INSERT DATA { <a> <b> <c> }"), QueryType::Insert);
        assert_eq!(classify("DELETE WHERE {?s ?p ?o}"), QueryType::Delete);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(classify("select ?s where { ?s ?p ?o }"), QueryType::Select);
        assert_eq!(classify("SeLeCt\t?s WHERE { ?s ?p ?o }"), QueryType::Select);
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(classify(""), QueryType::Unknown);
        assert_eq!(classify("MATCH (n) RETURN n"), QueryType::Unknown);
        // keyword must be followed by whitespace
        assert_eq!(classify("SELECT*{?s ?p ?o}"), QueryType::Unknown);
    }

    #[test]
    fn test_select_wins_over_later_forms() {
        // a DELETE keyword earlier in the text does not beat SELECT
        assert_eq!(
            classify("DELETE { ?s ?p ?o } WHERE { SELECT ?s WHERE { ?s ?p ?o } }"),
            QueryType::Select
        );
    }
}
