//! RemoteClient: HTTP client for a running gateway

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::client::GatewayClient;
use crate::error::{SdkError, SdkResult};
use crate::models::{AskResponse, ExamplesResponse, HealthReport, QueryResponse, ValidationResponse};

/// Network client for the `/api` routes of an Ontogate server.
pub struct RemoteClient {
    http_base_url: String,
    http_client: Client,
}

impl RemoteClient {
    /// Create a new RemoteClient for the given HTTP base URL.
    ///
    /// # Example
    /// ```no_run
    /// # use ontogate_sdk::RemoteClient;
    /// let client = RemoteClient::new("http://localhost:5000");
    /// ```
    pub fn new(http_base_url: &str) -> Self {
        Self {
            http_base_url: http_base_url.trim_end_matches('/').to_string(),
            http_client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.http_base_url, path)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> SdkResult<T> {
        let response = self.http_client.post(self.url(path)).json(&body).send().await?;
        read(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> SdkResult<T> {
        let response = self.http_client.get(self.url(path)).send().await?;
        read(response).await
    }
}

async fn read<T: DeserializeOwned>(response: Response) -> SdkResult<T> {
    let status = response.status().as_u16();
    let body: Value = response.json().await?;
    if (200..300).contains(&status) {
        Ok(serde_json::from_value(body)?)
    } else {
        Err(api_error(status, &body))
    }
}

/// Reads `{error: {message, code, suggestions}}` or a bare `{error: "..."}`.
pub fn api_error(status: u16, body: &Value) -> SdkError {
    let error = body.get("error");
    let message = error
        .and_then(|e| e.get("message").or(Some(e)))
        .and_then(Value::as_str)
        .unwrap_or("Unknown error")
        .to_string();
    let code = error
        .and_then(|e| e.get("code"))
        .and_then(Value::as_str)
        .unwrap_or("UNKNOWN_ERROR")
        .to_string();
    let suggestions = error
        .and_then(|e| e.get("suggestions"))
        .and_then(Value::as_array)
        .map(|s| s.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    SdkError::Api {
        status,
        code,
        message,
        suggestions,
    }
}

#[async_trait]
impl GatewayClient for RemoteClient {
    async fn query(&self, sparql: &str, timeout: Option<u64>) -> SdkResult<QueryResponse> {
        let mut body = json!({ "query": sparql, "format": true });
        if let Some(timeout) = timeout {
            body["timeout"] = json!(timeout);
        }
        self.post("/sparql/query", body).await
    }

    async fn validate(&self, sparql: &str) -> SdkResult<ValidationResponse> {
        self.post("/sparql/validate", json!({ "query": sparql })).await
    }

    async fn ask(&self, question: &str) -> SdkResult<AskResponse> {
        self.post("/ai/query", json!({ "question": question })).await
    }

    async fn examples(&self) -> SdkResult<ExamplesResponse> {
        self.get("/sparql/examples").await
    }

    async fn health(&self) -> SdkResult<HealthReport> {
        // 503 still carries a full report
        let response = self.http_client.get(self.url("/health")).send().await?;
        let status = response.status().as_u16();
        let body: Value = response.json().await?;
        if status == 200 || status == 503 {
            serde_json::from_value(body)
                .map_err(|e| SdkError::Protocol(format!("unexpected health report: {}", e)))
        } else {
            Err(api_error(status, &body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_error() {
        let body = json!({
            "success": false,
            "error": {
                "message": "Query cannot be empty",
                "code": "EMPTY_QUERY",
                "suggestions": ["Provide a valid SPARQL SELECT query"],
            },
            "metadata": {},
        });
        match api_error(400, &body) {
            SdkError::Api { status, code, message, suggestions } => {
                assert_eq!(status, 400);
                assert_eq!(code, "EMPTY_QUERY");
                assert_eq!(message, "Query cannot be empty");
                assert_eq!(suggestions.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bare_error() {
        let err = api_error(500, &json!({ "error": "boom" }));
        assert_eq!(err.to_string(), "UNKNOWN_ERROR: boom");
        assert!(err.suggestions().is_empty());
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let client = RemoteClient::new("http://localhost:5000/");
        assert_eq!(client.url("/health"), "http://localhost:5000/api/health");
    }
}
