//! Reshaping of SELECT results for API consumers

use crate::sparql::{classify, RdfTermJson, SparqlJson};
use serde_json::{json, Map, Value};

/// Reshape a results document into `{variables, bindings, bindingsCount,
/// formatted, queryInfo}`.
///
/// Each declared variable appears in every row; unbound ones are `null`.
pub fn format_results(data: &SparqlJson, query: &str) -> Value {
    let Some(results) = data.results.as_ref() else {
        return json!({
            "variables": [],
            "bindings": [],
            "bindingsCount": 0,
            "formatted": true,
        });
    };

    let variables = data.vars();
    let bindings: Vec<Value> = results
        .bindings
        .iter()
        .map(|binding| {
            let row: Map<String, Value> = variables
                .iter()
                .map(|var| {
                    let value = binding.get(var).map(format_term).unwrap_or(Value::Null);
                    (var.clone(), value)
                })
                .collect();
            Value::Object(row)
        })
        .collect();

    let upper = query.to_uppercase();
    json!({
        "variables": variables,
        "bindingsCount": bindings.len(),
        "bindings": bindings,
        "formatted": true,
        "queryInfo": {
            "queryType": classify(query),
            "hasLimit": upper.contains("LIMIT"),
            "hasOrder": upper.contains("ORDER"),
        },
    })
}

fn format_term(term: &RdfTermJson) -> Value {
    let mut out = json!({
        "value": term.value,
        "type": term.kind,
        "datatype": term.datatype,
        "lang": term.lang,
    });
    if term.is_uri() {
        out["localName"] = Value::String(term.local_name().to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql::Binding;

    #[test]
    fn test_format_declared_variables() {
        let mut alice = Binding::new();
        alice.insert(
            "person".to_string(),
            RdfTermJson::uri("http://example.org/onto#Alice"),
        );
        alice.insert("name".to_string(), RdfTermJson::literal("Alice"));
        let mut anonymous = Binding::new();
        anonymous.insert(
            "person".to_string(),
            RdfTermJson::uri("http://example.org/people/p2"),
        );

        let data = SparqlJson::select(
            vec!["person".to_string(), "name".to_string()],
            vec![alice, anonymous],
        );
        let out = format_results(&data, "SELECT ?person ?name WHERE { ?person ?p ?name } LIMIT 5");

        assert_eq!(out["variables"], json!(["person", "name"]));
        assert_eq!(out["bindingsCount"], 2);
        assert_eq!(out["bindings"][0]["person"]["localName"], "Alice");
        assert_eq!(out["bindings"][0]["name"]["type"], "literal");
        assert!(out["bindings"][0]["name"].get("localName").is_none());
        assert_eq!(out["bindings"][1]["person"]["localName"], "p2");
        assert!(out["bindings"][1]["name"].is_null());
        assert_eq!(out["queryInfo"]["hasLimit"], true);
        assert_eq!(out["queryInfo"]["hasOrder"], false);
        assert_eq!(out["queryInfo"]["queryType"], "SELECT");
    }

    #[test]
    fn test_format_without_results() {
        let out = format_results(&SparqlJson::ask(true), "ASK { ?s ?p ?o }");
        assert_eq!(out["bindingsCount"], 0);
        assert_eq!(out["formatted"], true);
        assert!(out.get("queryInfo").is_none());
    }
}
