//! Store connectivity, ontology integrity and host health
//!
//! Nothing is cached: every check queries the store and samples the host.

pub mod metrics;

pub use metrics::{FixedMetrics, HostUsage, MetricsSource, SysinfoMetrics};

use crate::sparql::{QueryExecutor, SparqlError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

const CONNECTIVITY_QUERY: &str = "ASK { ?s ?p ?o }";
const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(5);
const SLOW_RESPONSE_SECS: f64 = 5.0;
const MIN_TRIPLES: u64 = 100;
const USAGE_LIMIT: f64 = 90.0;

const COUNT_TRIPLES: &str = "SELECT (COUNT(*) AS ?count) WHERE { ?s ?p ?o }";

const COUNT_CLASSES: &str = "PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX owl: <http://www.w3.org/2002/07/owl#>
SELECT (COUNT(DISTINCT ?class) AS ?count) WHERE { ?class rdf:type owl:Class }";

const COUNT_PROPERTIES: &str = "PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX owl: <http://www.w3.org/2002/07/owl#>
SELECT (COUNT(DISTINCT ?property) AS ?count) WHERE {
    { ?property rdf:type owl:ObjectProperty }
    UNION
    { ?property rdf:type owl:DatatypeProperty }
}";

const COUNT_INDIVIDUALS: &str = "PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX owl: <http://www.w3.org/2002/07/owl#>
SELECT (COUNT(DISTINCT ?individual) AS ?count) WHERE {
    ?individual rdf:type ?class .
    FILTER(?class != owl:Class)
    FILTER(?class != owl:ObjectProperty)
    FILTER(?class != owl:DatatypeProperty)
    FILTER(!STRSTARTS(STR(?class), \"http://www.w3.org/\"))
}";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub endpoint_url: String,
    pub response_time: Option<f64>,
    pub error: Option<String>,
    pub last_checked: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OntologyValidation {
    pub is_valid: bool,
    pub total_triples: Option<u64>,
    pub class_count: Option<u64>,
    pub property_count: Option<u64>,
    pub individual_count: Option<u64>,
    pub validation_time: f64,
    pub error_message: Option<String>,
}

impl OntologyValidation {
    /// Valid iff there is at least one triple and one class
    pub fn from_counts(
        total_triples: Option<u64>,
        class_count: Option<u64>,
        property_count: Option<u64>,
        individual_count: Option<u64>,
        validation_time: f64,
    ) -> Self {
        let error_message = match (total_triples, class_count) {
            (None, _) => Some("Triple count unavailable".to_string()),
            (Some(0), _) => Some("No triples loaded".to_string()),
            (_, None) => Some("Class count unavailable".to_string()),
            (_, Some(0)) => Some("No owl:Class declared".to_string()),
            _ => None,
        };
        Self {
            is_valid: error_message.is_none(),
            total_triples,
            class_count,
            property_count,
            individual_count,
            validation_time,
            error_message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetrics {
    #[serde(flatten)]
    pub usage: HostUsage,
    /// Seconds since the monitor was created
    pub uptime: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl OverallStatus {
    pub fn from_issues(errors: &[String], warnings: &[String]) -> Self {
        if !errors.is_empty() {
            OverallStatus::Unhealthy
        } else if !warnings.is_empty() {
            OverallStatus::Degraded
        } else {
            OverallStatus::Healthy
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub overall_status: OverallStatus,
    pub fuseki_connection: ConnectionStatus,
    pub ontology_validation: OntologyValidation,
    pub system_metrics: SystemMetrics,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

pub struct HealthMonitor {
    executor: Arc<QueryExecutor>,
    metrics: Arc<dyn MetricsSource>,
    started: Instant,
}

impl HealthMonitor {
    pub fn new(executor: Arc<QueryExecutor>, metrics: Arc<dyn MetricsSource>) -> Self {
        info!("Health monitor watching {}", executor.endpoint_url());
        Self {
            executor,
            metrics,
            started: Instant::now(),
        }
    }

    /// Check the store with a short ASK, bypassing retries.
    pub async fn check_connection(&self) -> ConnectionStatus {
        let endpoint = self.executor.endpoint();
        let started = Instant::now();
        let outcome = endpoint.query(CONNECTIVITY_QUERY, CONNECTIVITY_TIMEOUT).await;
        let endpoint_url = endpoint.query_url().to_string();

        match outcome {
            Ok(_) => {
                let response_time = started.elapsed().as_secs_f64();
                info!("Fuseki reachable, response time {:.3}s", response_time);
                ConnectionStatus {
                    is_connected: true,
                    endpoint_url,
                    response_time: Some(response_time),
                    error: None,
                    last_checked: Utc::now(),
                }
            }
            Err(err) => {
                let err = SparqlError::from(err);
                warn!("Fuseki connection failed: {}", err);
                ConnectionStatus {
                    is_connected: false,
                    endpoint_url,
                    response_time: None,
                    error: Some(err.to_string()),
                    last_checked: Utc::now(),
                }
            }
        }
    }

    /// Count triples, classes, properties and individuals.
    pub async fn validate_ontology(&self) -> OntologyValidation {
        let started = Instant::now();
        let (triples, classes, properties, individuals) = tokio::join!(
            self.count(COUNT_TRIPLES),
            self.count(COUNT_CLASSES),
            self.count(COUNT_PROPERTIES),
            self.count(COUNT_INDIVIDUALS),
        );
        let validation = OntologyValidation::from_counts(
            triples,
            classes,
            properties,
            individuals,
            started.elapsed().as_secs_f64(),
        );

        if validation.is_valid {
            info!(
                "Ontology valid - Triples: {:?}, Classes: {:?}, Properties: {:?}, Individuals: {:?}",
                triples, classes, properties, individuals
            );
        } else {
            warn!(
                "Ontology validation failed: {}",
                validation.error_message.as_deref().unwrap_or_default()
            );
        }
        validation
    }

    async fn count(&self, query: &str) -> Option<u64> {
        let result = self.executor.execute(query, None, false).await;
        result.data?.first_value("count")?.parse().ok()
    }

    pub async fn system_metrics(&self) -> SystemMetrics {
        SystemMetrics {
            usage: self.metrics.sample().await,
            uptime: self.started.elapsed().as_secs_f64(),
            timestamp: Utc::now(),
        }
    }

    pub async fn perform_health_check(&self) -> HealthStatus {
        let started = Instant::now();
        let (connection, ontology, system) = tokio::join!(
            self.check_connection(),
            self.validate_ontology(),
            self.system_metrics(),
        );

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        match (connection.is_connected, connection.response_time) {
            (false, _) => errors.push(format!(
                "Fuseki connection failed: {}",
                connection.error.as_deref().unwrap_or("unknown error")
            )),
            (true, Some(secs)) if secs > SLOW_RESPONSE_SECS => {
                warnings.push(format!("Fuseki response time is slow: {:.2}s", secs))
            }
            _ => {}
        }

        if !ontology.is_valid {
            errors.push(format!(
                "Ontology validation failed: {}",
                ontology.error_message.as_deref().unwrap_or("unknown error")
            ));
        } else if let Some(triples) = ontology.total_triples.filter(|t| *t < MIN_TRIPLES) {
            warnings.push(format!("Low number of triples in ontology: {}", triples));
        }

        for (label, value) in [
            ("CPU", system.usage.cpu_usage),
            ("memory", system.usage.memory_usage),
            ("disk", system.usage.disk_usage),
        ] {
            if value > USAGE_LIMIT {
                warnings.push(format!("High {} usage: {:.1}%", label, value));
            }
        }

        let overall_status = OverallStatus::from_issues(&errors, &warnings);
        info!(
            "Health check completed in {:.3}s - Status: {:?}",
            started.elapsed().as_secs_f64(),
            overall_status
        );

        HealthStatus {
            overall_status,
            fuseki_connection: connection,
            ontology_validation: ontology,
            system_metrics: system,
            errors,
            warnings,
            timestamp: Utc::now(),
        }
    }
}
