//! JSON error responses

use crate::resources::ResourceError;
use crate::sparql::SparqlError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};

/// An error as the HTTP boundary reports it:
/// `{success: false, error: {message, code, suggestions}, metadata}`
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub suggestions: Vec<String>,
    pub metadata: Map<String, Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            suggestions: Vec::new(),
            metadata: Map::new(),
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_meta(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// 400 for errors detected before the store is contacted
pub fn status_for(err: &SparqlError) -> StatusCode {
    match err {
        _ if err.is_validation() => StatusCode::BAD_REQUEST,
        SparqlError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
        SparqlError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<SparqlError> for ApiError {
    fn from(err: SparqlError) -> Self {
        Self::new(status_for(&err), err.code(), err.to_string()).with_suggestions(err.suggestions())
    }
}

impl From<ResourceError> for ApiError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::Query(err) => err.into(),
            ResourceError::InvalidInput(message) => Self::bad_request("INVALID_INPUT", message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": {
                "message": self.message,
                "code": self.code,
                "suggestions": self.suggestions,
            },
            "metadata": self.metadata,
        });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql::QueryType;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&SparqlError::EmptyQuery), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&SparqlError::InvalidQueryType(QueryType::Delete)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&SparqlError::Timeout("5s".to_string())),
            StatusCode::REQUEST_TIMEOUT
        );
        assert_eq!(
            status_for(&SparqlError::Connection("refused".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&SparqlError::Execution("500".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&SparqlError::Internal("x".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_sparql_error_carries_suggestions() {
        let err: ApiError = SparqlError::EmptyQuery.into();
        assert_eq!(err.code, "EMPTY_QUERY");
        assert_eq!(err.message, "Query cannot be empty");
        assert_eq!(err.suggestions, vec!["Provide a valid SPARQL SELECT query".to_string()]);
    }

    #[test]
    fn test_invalid_input_is_bad_request() {
        let err: ApiError = ResourceError::InvalidInput("name is required".to_string()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "INVALID_INPUT");
    }
}
