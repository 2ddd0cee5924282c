//! Gateway configuration

use crate::custom::DEFAULT_MAX_QUERY_LENGTH;
use crate::sparql::ExecutorConfig;
use thiserror::Error;

/// Namespace of the smart-city ontology loaded in the default dataset
pub const DEFAULT_NAMESPACE: &str =
    "http://www.semanticweb.org/monpc/ontologies/2025/9/untitled-ontology-4#";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{0} endpoint URL must not be empty")]
    EmptyEndpoint(&'static str),

    #[error("timeout must be at least one second")]
    ZeroTimeout,

    #[error("max retries must be at least one")]
    ZeroRetries,

    #[error("max query length must be at least one character")]
    ZeroQueryLength,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Server and triple-store settings
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// SPARQL query endpoint of the dataset
    pub query_endpoint: String,
    /// SPARQL update endpoint of the dataset
    pub update_endpoint: String,
    /// Default per-attempt timeout in seconds
    pub timeout_secs: u64,
    /// Attempts per query, including the first
    pub max_retries: u32,
    pub max_query_length: usize,
    /// Ontology namespace, ending in `#` or `/`
    pub namespace: String,
    /// Bind address
    pub host: String,
    /// Port
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            query_endpoint: "http://localhost:3030/smartcity/query".to_string(),
            update_endpoint: "http://localhost:3030/smartcity/update".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
            namespace: DEFAULT_NAMESPACE.to_string(),
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.query_endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyEndpoint("query"));
        }
        if self.update_endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyEndpoint("update"));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_retries == 0 {
            return Err(ConfigError::ZeroRetries);
        }
        if self.max_query_length == 0 {
            return Err(ConfigError::ZeroQueryLength);
        }
        Ok(())
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            default_timeout_secs: self.timeout_secs,
            max_retries: self.max_retries,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
