//! HTTP API under `/api`

pub mod error;
pub mod handler;
pub mod server;

pub use error::{status_for, ApiError};
pub use server::{router, HttpServer};

use crate::config::GatewayConfig;
use crate::custom::CustomQueryService;
use crate::health::{HealthMonitor, MetricsSource};
use crate::nlq::NlTransformer;
use crate::ontology::OntologyService;
use crate::recommend::RecommendationService;
use crate::resources::ResourceService;
use crate::sparql::{QueryExecutor, TemplateResult};
use std::sync::Arc;

/// Services shared by every request, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<QueryExecutor>,
    pub custom: Arc<CustomQueryService>,
    pub nl: Arc<NlTransformer>,
    pub health: Arc<HealthMonitor>,
    pub ontology: Arc<OntologyService>,
    pub recommend: Arc<RecommendationService>,
    pub resources: Arc<ResourceService>,
}

impl AppState {
    /// Wire all services around one executor.
    ///
    /// Fails only when the configured namespace is not a usable IRI.
    pub fn new(
        config: &GatewayConfig,
        executor: Arc<QueryExecutor>,
        metrics: Arc<dyn MetricsSource>,
    ) -> TemplateResult<Self> {
        let namespace = config.namespace.as_str();
        Ok(Self {
            custom: Arc::new(CustomQueryService::new(
                Arc::clone(&executor),
                config.max_query_length,
                namespace,
            )),
            nl: Arc::new(NlTransformer::new(namespace)?),
            health: Arc::new(HealthMonitor::new(Arc::clone(&executor), metrics)),
            ontology: Arc::new(OntologyService::new(Arc::clone(&executor), namespace)),
            recommend: Arc::new(RecommendationService::new(Arc::clone(&executor), namespace)),
            resources: Arc::new(ResourceService::new(Arc::clone(&executor), namespace)),
            executor,
        })
    }
}
