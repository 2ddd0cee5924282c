//! HTTP server for the gateway API

use super::handler::{
    ai_query_handler, create_parking_station_handler, create_person_handler,
    create_transport_mode_handler, create_travel_plan_handler, custom_recommendations_handler,
    delete_parking_station_handler, delete_person_handler, fuseki_health_handler, health_handler,
    list_persons_handler, ontology_classes_handler, ontology_health_handler,
    ontology_hierarchy_handler, parking_station_handler, parking_stations_handler,
    recommendations_handler, recommendations_health_handler, search_concepts_handler,
    search_health_handler, search_persons_handler, search_stations_handler,
    sparql_examples_handler, sparql_health_handler, sparql_query_handler,
    sparql_validate_handler, subclasses_handler, system_health_handler, transport_mode_handler,
    transport_modes_handler, transport_stations_handler, travel_plan_handler,
    travel_plans_handler, update_parking_station_handler,
};
use super::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

/// All routes, mounted under `/api`
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/sparql/query", post(sparql_query_handler))
        .route("/sparql/validate", post(sparql_validate_handler))
        .route("/sparql/examples", get(sparql_examples_handler))
        .route("/sparql/health", get(sparql_health_handler))
        .route("/health", get(health_handler))
        .route("/health/fuseki", get(fuseki_health_handler))
        .route("/health/ontology", get(ontology_health_handler))
        .route("/health/system", get(system_health_handler))
        .route("/ai/query", post(ai_query_handler))
        .route("/persons", get(list_persons_handler).post(create_person_handler))
        .route("/persons/:id", delete(delete_person_handler))
        .route("/search/persons", get(search_persons_handler))
        .route("/search/stations", get(search_stations_handler))
        .route("/search/concepts", get(search_concepts_handler))
        .route("/search/health", get(search_health_handler))
        .route("/ontology/classes", get(ontology_classes_handler))
        .route("/ontology/hierarchy", get(ontology_hierarchy_handler))
        .route("/ontology/classes/:class/subclasses", get(subclasses_handler))
        .route(
            "/transport-modes",
            get(transport_modes_handler).post(create_transport_mode_handler),
        )
        .route("/transport-modes/:localname", get(transport_mode_handler))
        .route(
            "/travel-plans",
            get(travel_plans_handler).post(create_travel_plan_handler),
        )
        .route("/travel-plans/:localname", get(travel_plan_handler))
        .route(
            "/parking-stations",
            get(parking_stations_handler).post(create_parking_station_handler),
        )
        .route(
            "/parking-stations/:localname",
            get(parking_station_handler)
                .put(update_parking_station_handler)
                .delete(delete_parking_station_handler),
        )
        .route("/recommendations/custom", post(custom_recommendations_handler))
        .route("/recommendations/health", get(recommendations_health_handler))
        .route("/recommendations/:user_type", get(recommendations_handler))
        .route("/transport/:transport_type/stations", get(transport_stations_handler));

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// HTTP server for the gateway API
pub struct HttpServer {
    state: AppState,
    address: String,
}

impl HttpServer {
    /// Create a new HTTP server bound to `address` (`host:port`)
    pub fn new(state: AppState, address: impl Into<String>) -> Self {
        Self {
            state,
            address: address.into(),
        }
    }

    /// Start the HTTP server
    pub async fn start(&self) -> std::io::Result<()> {
        let app = router(self.state.clone());
        let listener = tokio::net::TcpListener::bind(&self.address).await?;

        info!("Gateway API available at http://{}/api", listener.local_addr()?);

        axum::serve(listener, app).await
    }
}
