//! Error types for the Ontogate SDK

use thiserror::Error;

/// Errors that can occur when using the Ontogate SDK
#[derive(Error, Debug)]
pub enum SdkError {
    /// The gateway answered with a structured error
    #[error("{code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        suggestions: Vec<String>,
    },

    /// Unexpected response shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SdkError {
    /// Suggestions attached to an API error
    pub fn suggestions(&self) -> &[String] {
        match self {
            SdkError::Api { suggestions, .. } => suggestions,
            _ => &[],
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
