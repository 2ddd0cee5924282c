use axum::{
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use ontogate::sparql::{HttpSparqlEndpoint, QueryExecutor, SparqlEndpoint, StoreError};
use std::sync::Arc;
use std::time::Duration;

const RESULTS: &str = r#"{
  "head": { "vars": ["person", "name"] },
  "results": { "bindings": [
    { "person": { "type": "uri", "value": "http://example.org/city#Alice" },
      "name": { "type": "literal", "value": "Alice", "xml:lang": "fr" } }
  ] }
}"#;

async fn fake_query(headers: HeaderMap, body: String) -> impl IntoResponse {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if content_type != "application/sparql-query" {
        return (StatusCode::UNSUPPORTED_MEDIA_TYPE, content_type).into_response();
    }
    if body.contains("BROKEN") {
        return (StatusCode::BAD_REQUEST, "Lexical error at line 1\n").into_response();
    }
    if body.contains("CRASH") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    if body.contains("GARBAGE") {
        return (StatusCode::OK, "<html>not json</html>").into_response();
    }
    if body.contains("SLOW") {
        tokio::time::sleep(Duration::from_secs(3)).await;
    }
    if body.starts_with("ASK") {
        return (StatusCode::OK, r#"{"head": {}, "boolean": true}"#).into_response();
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/sparql-results+json")],
        RESULTS,
    )
        .into_response()
}

async fn fake_update(headers: HeaderMap, body: String) -> StatusCode {
    let is_update = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        == Some("application/sparql-update");
    if is_update && body.contains("INSERT DATA") {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::BAD_REQUEST
    }
}

/// Serve a fake Fuseki dataset on an ephemeral port
async fn spawn_fuseki() -> String {
    let app = Router::new()
        .route("/ds/query", post(fake_query))
        .route("/ds/update", post(fake_update));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/ds", addr)
}

fn endpoint(base: &str) -> HttpSparqlEndpoint {
    HttpSparqlEndpoint::new(format!("{}/query", base), format!("{}/update", base)).unwrap()
}

#[tokio::test]
async fn test_select_results_are_decoded() {
    let base = spawn_fuseki().await;
    let data = endpoint(&base)
        .query("SELECT ?person ?name WHERE { ?person ?p ?name }", Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(data.vars(), &["person".to_string(), "name".to_string()]);
    assert_eq!(data.bindings_count(), 1);
    let name = &data.bindings()[0]["name"];
    assert_eq!(name.value, "Alice");
    assert_eq!(name.lang.as_deref(), Some("fr"));
    assert_eq!(data.first_value("person"), Some("http://example.org/city#Alice"));
}

#[tokio::test]
async fn test_ask_result() {
    let base = spawn_fuseki().await;
    let data = endpoint(&base)
        .query("ASK { ?s ?p ?o }", Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(data.boolean, Some(true));
    assert_eq!(data.bindings_count(), 0);
}

#[tokio::test]
async fn test_status_errors() {
    let base = spawn_fuseki().await;
    let endpoint = endpoint(&base);

    let err = endpoint.query("SELECT BROKEN", Duration::from_secs(5)).await.unwrap_err();
    assert_eq!(err, StoreError::Malformed("Lexical error at line 1".to_string()));

    let err = endpoint.query("SELECT CRASH", Duration::from_secs(5)).await.unwrap_err();
    assert_eq!(err, StoreError::Endpoint { status: 500, body: "boom".to_string() });

    let err = endpoint.query("SELECT GARBAGE", Duration::from_secs(5)).await.unwrap_err();
    assert!(matches!(err, StoreError::Decode(_)));
}

#[tokio::test]
async fn test_attempt_timeout() {
    let base = spawn_fuseki().await;
    let err = endpoint(&base)
        .query("SELECT SLOW", Duration::from_secs(1))
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::Timeout(1));
}

#[tokio::test]
async fn test_closed_port_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = endpoint(&format!("http://{}/ds", addr))
        .query("SELECT ?s WHERE { ?s ?p ?o }", Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)), "{:?}", err);
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_update() {
    let base = spawn_fuseki().await;
    let endpoint = endpoint(&base);
    endpoint
        .update("INSERT DATA { <a> <b> <c> }", Duration::from_secs(5))
        .await
        .unwrap();
    let err = endpoint
        .update("CLEAR ALL", Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Malformed(_)));
}

#[tokio::test]
async fn test_executor_over_http() {
    let base = spawn_fuseki().await;
    let executor = QueryExecutor::with_defaults(Arc::new(endpoint(&base)));

    let result = executor
        .execute("SELECT ?person ?name\nWHERE { ?person ?p ?name } # all", None, true)
        .await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.bindings_count, Some(1));
    assert_eq!(executor.endpoint_url(), format!("{}/query", base));
}
