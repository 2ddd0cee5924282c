//! GatewayClient trait

use async_trait::async_trait;
use crate::error::SdkResult;
use crate::models::{AskResponse, ExamplesResponse, HealthReport, QueryResponse, ValidationResponse};

/// Client interface for the Ontogate gateway.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Execute a custom SELECT query; `timeout` in seconds (1..=300)
    async fn query(&self, sparql: &str, timeout: Option<u64>) -> SdkResult<QueryResponse>;

    /// Check a query without executing it
    async fn validate(&self, sparql: &str) -> SdkResult<ValidationResponse>;

    /// Ask a natural-language question
    async fn ask(&self, question: &str) -> SdkResult<AskResponse>;

    /// Example query catalogue
    async fn examples(&self) -> SdkResult<ExamplesResponse>;

    /// Full health report
    async fn health(&self) -> SdkResult<HealthReport>;
}
