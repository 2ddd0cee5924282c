//! HTTP handlers for the gateway API

use super::error::ApiError;
use super::AppState;
use crate::custom::{CustomQueryResult, HEALTH_QUERY};
use crate::health::{OverallStatus, SystemMetrics};
use crate::recommend::{CustomCriteria, TransportMode, UserType};
use crate::resources::{
    NewParkingStation, NewPerson, NewTransportMode, NewTravelPlan, ParkingType, Person,
};
use crate::sparql::results::local_name;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

const MAX_TIMEOUT_SECS: i64 = 300;

/// Request for executing a custom SELECT query
#[derive(Deserialize)]
pub struct QueryRequest {
    pub query: Option<String>,
    /// Seconds, as a number or a numeric string
    pub timeout: Option<Value>,
    pub format: Option<bool>,
}

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub query: Option<String>,
}

#[derive(Deserialize)]
pub struct QuestionRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize)]
pub struct ParkingParams {
    #[serde(default)]
    pub q: String,
    #[serde(rename = "type")]
    pub station_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpacesRequest {
    pub available_spaces: Option<i64>,
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(JsonRejection::MissingJsonContentType(_)) => Err(ApiError::bad_request(
            "INVALID_CONTENT_TYPE",
            "Content-Type must be application/json",
        )),
        Err(rejection) => Err(ApiError::bad_request("INVALID_JSON", rejection.body_text())),
    }
}

fn missing_query() -> ApiError {
    ApiError::bad_request("MISSING_QUERY", "Request must contain 'query' field")
        .with_meta("example", json!({ "query": "SELECT ?s ?p ?o WHERE { ?s ?p ?o } LIMIT 10" }))
}

/// Accepts 1..=300 given as a JSON integer or a numeric string.
pub fn parse_timeout(value: &Value) -> Result<u64, ApiError> {
    let secs = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| ApiError::bad_request("INVALID_TIMEOUT_FORMAT", "Timeout must be a valid integer"))?;

    if !(1..=MAX_TIMEOUT_SECS).contains(&secs) {
        return Err(ApiError::bad_request(
            "INVALID_TIMEOUT",
            "Timeout must be between 1 and 300 seconds",
        ));
    }
    Ok(secs as u64)
}

fn custom_response(result: CustomQueryResult) -> Result<Json<Value>, ApiError> {
    match result.error {
        None => Ok(Json(json!({
            "success": true,
            "data": result.data,
            "metadata": result.metadata,
        }))),
        Some(err) => {
            warn!("Query execution failed: {}", err);
            Err(ApiError::from(err).with_metadata(result.metadata))
        }
    }
}

/// POST /api/sparql/query
pub async fn sparql_query_handler(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = json_body(payload)?;
    let query = request.query.ok_or_else(missing_query)?;
    let timeout = request.timeout.as_ref().map(parse_timeout).transpose()?;

    info!("Executing custom query (timeout {:?})", timeout);
    let result = state
        .custom
        .execute_custom(&query, timeout, request.format.unwrap_or(true))
        .await;
    custom_response(result)
}

/// POST /api/sparql/validate
pub async fn sparql_validate_handler(
    State(state): State<AppState>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = json_body(payload)?;
    let query = request.query.ok_or_else(missing_query)?;

    let result = state.custom.validate_only(&query);
    let response = match result.error {
        None => Json(json!({
            "valid": true,
            "data": result.data,
            "metadata": result.metadata,
        }))
        .into_response(),
        Some(err) => {
            let mut suggestions = err.suggestions();
            if suggestions.is_empty() {
                suggestions = vec![
                    "Check query syntax against SPARQL 1.1 specification".to_string(),
                    "Use /api/sparql/examples to see valid query patterns".to_string(),
                ];
            }
            let body = json!({
                "valid": false,
                "error": {
                    "message": err.to_string(),
                    "code": err.code(),
                    "suggestions": suggestions,
                },
                "metadata": result.metadata,
            });
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        }
    };
    Ok(response)
}

/// GET /api/sparql/examples
pub async fn sparql_examples_handler(State(state): State<AppState>) -> Json<Value> {
    let catalogue = state.custom.examples();
    Json(json!({
        "metadata": {
            "namespace": catalogue.namespace,
            "endpoint": catalogue.endpoint,
            "totalExamples": catalogue.examples.len(),
        },
        "examples": catalogue.examples,
    }))
}

/// GET /api/sparql/health
pub async fn sparql_health_handler(State(state): State<AppState>) -> Response {
    let endpoint = state.custom.endpoint_url().to_string();
    let result = state.custom.execute_custom(HEALTH_QUERY, Some(5), true).await;
    match result.error_message() {
        None => Json(json!({
            "status": "healthy",
            "service": "custom_query",
            "endpoint": endpoint,
            "testExecutionTime": result.execution_time,
            "capabilities": {
                "queryValidation": true,
                "timeoutSupport": true,
                "resultFormatting": true,
                "errorHandling": true,
            },
        }))
        .into_response(),
        Some(error) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "service": "custom_query",
                "endpoint": endpoint,
                "error": error,
            })),
        )
            .into_response(),
    }
}

fn created(uri: String) -> Response {
    (StatusCode::CREATED, Json(json!({ "ok": true, "uri": uri }))).into_response()
}

fn invalid_user_type(message: String) -> ApiError {
    ApiError::bad_request("INVALID_USER_TYPE", message).with_meta("validTypes", json!(UserType::ALL))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn system_json(metrics: &SystemMetrics) -> Value {
    let usage = &metrics.usage;
    json!({
        "cpuUsage": usage.cpu_usage,
        "memoryUsage": usage.memory_usage,
        "memoryTotal": round2(usage.memory_total_gb),
        "memoryAvailable": round2(usage.memory_available_gb),
        "diskUsage": usage.disk_usage,
        "diskTotal": round2(usage.disk_total_gb),
        "diskFree": round2(usage.disk_free_gb),
        "uptime": round2(metrics.uptime),
    })
}

/// GET /api/health
pub async fn health_handler(State(state): State<AppState>) -> Response {
    let health = state.health.perform_health_check().await;
    let fuseki = &health.fuseki_connection;
    let ontology = &health.ontology_validation;
    let body = json!({
        "status": health.overall_status,
        "timestamp": health.timestamp,
        "fuseki": {
            "connected": fuseki.is_connected,
            "endpoint": fuseki.endpoint_url,
            "responseTime": fuseki.response_time,
            "lastChecked": fuseki.last_checked,
            "error": fuseki.error,
        },
        "ontology": {
            "valid": ontology.is_valid,
            "totalTriples": ontology.total_triples,
            "classCount": ontology.class_count,
            "propertyCount": ontology.property_count,
            "individualCount": ontology.individual_count,
            "validationTime": ontology.validation_time,
            "error": ontology.error_message,
        },
        "system": system_json(&health.system_metrics),
        "issues": {
            "errors": health.errors,
            "warnings": health.warnings,
        },
    });

    let status = match health.overall_status {
        OverallStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        OverallStatus::Healthy | OverallStatus::Degraded => StatusCode::OK,
    };
    (status, Json(body)).into_response()
}

/// GET /api/health/fuseki
pub async fn fuseki_health_handler(State(state): State<AppState>) -> Response {
    let connection = state.health.check_connection().await;
    let status = if connection.is_connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = json!({
        "service": "fuseki",
        "connected": connection.is_connected,
        "endpoint": connection.endpoint_url,
        "responseTime": connection.response_time,
        "lastChecked": connection.last_checked,
        "error": connection.error,
        "timestamp": Utc::now(),
    });
    (status, Json(body)).into_response()
}

/// GET /api/health/ontology
pub async fn ontology_health_handler(State(state): State<AppState>) -> Response {
    let ontology = state.health.validate_ontology().await;
    let status = if ontology.is_valid {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = json!({
        "service": "ontology",
        "valid": ontology.is_valid,
        "totalTriples": ontology.total_triples,
        "classCount": ontology.class_count,
        "propertyCount": ontology.property_count,
        "individualCount": ontology.individual_count,
        "validationTime": ontology.validation_time,
        "error": ontology.error_message,
        "timestamp": Utc::now(),
    });
    (status, Json(body)).into_response()
}

/// GET /api/health/system
pub async fn system_health_handler(State(state): State<AppState>) -> Json<Value> {
    let metrics = state.health.system_metrics().await;
    let usage = &metrics.usage;
    let uptime = metrics.uptime as u64;
    Json(json!({
        "service": "system",
        "metrics": {
            "cpu": { "usage": usage.cpu_usage, "unit": "percent" },
            "memory": {
                "usage": usage.memory_usage,
                "total": round2(usage.memory_total_gb),
                "available": round2(usage.memory_available_gb),
                "unit": "GB",
            },
            "disk": {
                "usage": usage.disk_usage,
                "total": round2(usage.disk_total_gb),
                "free": round2(usage.disk_free_gb),
                "unit": "GB",
            },
            "uptime": {
                "seconds": round2(metrics.uptime),
                "formatted": format!("{}h {}m", uptime / 3600, (uptime % 3600) / 60),
            },
        },
        "timestamp": metrics.timestamp,
    }))
}

/// POST /api/ai/query
pub async fn ai_query_handler(
    State(state): State<AppState>,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = json_body(payload)?;
    let question = request.question.trim();
    if question.is_empty() {
        return Err(ApiError::bad_request("MISSING_QUESTION", "No question provided"));
    }

    let translation = state.nl.translate(question);
    info!("Question answered with {:?} template", translation.intent);
    let result = state.executor.execute(&translation.sparql, None, false).await;
    match (result.data, result.error) {
        (Some(data), None) => Ok(Json(json!({
            "question": question,
            "sparqlQuery": translation.sparql,
            "intent": translation.intent,
            "results": Person::from_results(&data),
            "executionTime": result.execution_time,
            "bindingsCount": result.bindings_count,
        }))),
        (_, Some(err)) => Err(err.into()),
        (None, None) => Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "query returned no data",
        )),
    }
}

/// GET /api/persons
pub async fn list_persons_handler(State(state): State<AppState>) -> Result<Json<Vec<Person>>, ApiError> {
    Ok(Json(state.resources.list_persons().await?))
}

/// POST /api/persons
pub async fn create_person_handler(
    State(state): State<AppState>,
    payload: Result<Json<NewPerson>, JsonRejection>,
) -> Result<Response, ApiError> {
    let person = json_body(payload)?;
    let uri = state.resources.create_person(&person).await?;
    Ok(created(uri))
}

/// DELETE /api/persons/:id
pub async fn delete_person_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let uri = state.resources.delete_person(&id).await?;
    Ok(Json(json!({ "ok": true, "uri": uri })))
}

/// GET /api/search/persons?q=
pub async fn search_persons_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Person>>, ApiError> {
    Ok(Json(state.resources.search_persons(&params.q).await?))
}

/// GET /api/search/stations?q=
pub async fn search_stations_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    let stations = state.resources.search_stations(&params.q).await?;
    Ok(Json(json!(stations)))
}

/// GET /api/transport-modes?q=
pub async fn transport_modes_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    let modes = state.resources.transport_modes(Some(params.q.as_str())).await?;
    Ok(Json(json!({ "total": modes.len(), "transportModes": modes })))
}

/// GET /api/transport-modes/:localname
pub async fn transport_mode_handler(
    State(state): State<AppState>,
    Path(localname): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.resources.transport_mode(&localname).await? {
        Some(mode) => Ok(Json(json!(mode))),
        None => Err(ApiError::not_found(format!("Transport mode {} not found", localname))),
    }
}

/// POST /api/transport-modes
pub async fn create_transport_mode_handler(
    State(state): State<AppState>,
    payload: Result<Json<NewTransportMode>, JsonRejection>,
) -> Result<Response, ApiError> {
    let mode = json_body(payload)?;
    Ok(created(state.resources.create_transport_mode(&mode).await?))
}

/// GET /api/travel-plans?q=
pub async fn travel_plans_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    let plans = state.resources.travel_plans(Some(params.q.as_str())).await?;
    Ok(Json(json!({ "plans": plans })))
}

/// GET /api/travel-plans/:localname
pub async fn travel_plan_handler(
    State(state): State<AppState>,
    Path(localname): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.resources.travel_plan(&localname).await? {
        Some(plan) => Ok(Json(json!(plan))),
        None => Err(ApiError::not_found(format!("Travel plan {} not found", localname))),
    }
}

/// POST /api/travel-plans
pub async fn create_travel_plan_handler(
    State(state): State<AppState>,
    payload: Result<Json<NewTravelPlan>, JsonRejection>,
) -> Result<Response, ApiError> {
    let plan = json_body(payload)?;
    Ok(created(state.resources.create_travel_plan(&plan).await?))
}

/// GET /api/parking-stations?q=&type=
pub async fn parking_stations_handler(
    State(state): State<AppState>,
    Query(params): Query<ParkingParams>,
) -> Result<Json<Value>, ApiError> {
    let station_type = params
        .station_type
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(str::parse::<ParkingType>)
        .transpose()?;
    let stations = state
        .resources
        .parking_stations(Some(params.q.as_str()), station_type)
        .await?;
    Ok(Json(json!({ "stations": stations })))
}

/// GET /api/parking-stations/:localname
pub async fn parking_station_handler(
    State(state): State<AppState>,
    Path(localname): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.resources.parking_station(&localname).await? {
        Some(station) => Ok(Json(json!(station))),
        None => Err(ApiError::not_found(format!("Parking station {} not found", localname))),
    }
}

/// POST /api/parking-stations
pub async fn create_parking_station_handler(
    State(state): State<AppState>,
    payload: Result<Json<NewParkingStation>, JsonRejection>,
) -> Result<Response, ApiError> {
    let station = json_body(payload)?;
    Ok(created(state.resources.create_parking_station(&station).await?))
}

/// PUT /api/parking-stations/:localname
pub async fn update_parking_station_handler(
    State(state): State<AppState>,
    Path(localname): Path<String>,
    payload: Result<Json<SpacesRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let spaces = json_body(payload)?
        .available_spaces
        .ok_or_else(|| ApiError::bad_request("INVALID_INPUT", "availableSpaces required"))?;
    let uri = state.resources.update_available_spaces(&localname, spaces).await?;
    Ok(Json(json!({ "ok": true, "uri": uri, "availableSpaces": spaces })))
}

/// DELETE /api/parking-stations/:localname
pub async fn delete_parking_station_handler(
    State(state): State<AppState>,
    Path(localname): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let uri = state.resources.delete_parking_station(&localname).await?;
    Ok(Json(json!({ "ok": true, "uri": uri, "message": "Parking station deleted" })))
}

/// GET /api/recommendations/:user_type
pub async fn recommendations_handler(
    State(state): State<AppState>,
    Path(user_type): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let parsed = user_type.parse::<UserType>().map_err(invalid_user_type)?;

    let recommendations = state.recommend.recommendations_for(parsed.as_str()).await;
    info!("Generated {} recommendations for {}", recommendations.len(), parsed);
    Ok(Json(json!({
        "userType": parsed,
        "total": recommendations.len(),
        "recommendations": recommendations,
    })))
}

/// POST /api/recommendations/custom
pub async fn custom_recommendations_handler(
    State(state): State<AppState>,
    payload: Result<Json<CustomCriteria>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let criteria = json_body(payload)?;
    let user_type = match criteria.user_type.as_deref() {
        Some(user_type) => user_type.parse::<UserType>().map_err(invalid_user_type)?,
        None => UserType::Citizen,
    };

    let recommendations = state.recommend.custom_recommendations(user_type, &criteria).await;
    Ok(Json(json!({
        "userType": user_type,
        "appliedPreferences": criteria.preferences,
        "appliedConstraints": criteria.constraints,
        "recommendations": recommendations,
        "total": recommendations.len(),
    })))
}

/// GET /api/recommendations/health
pub async fn recommendations_health_handler(State(state): State<AppState>) -> Json<Value> {
    let (recommendations, mapping) = tokio::join!(
        state.recommend.recommendations_for(UserType::Citizen.as_str()),
        state.recommend.station_mapping(),
    );
    Json(json!({
        "status": "healthy",
        "service": "transport_recommendation",
        "endpoint": state.executor.endpoint_url(),
        "testRecommendationsCount": recommendations.len(),
        "transportModesAvailable": mapping.len(),
    }))
}

/// GET /api/search/concepts?q=
pub async fn search_concepts_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    let keyword = params.q.trim();
    let concepts = state.ontology.search_concepts(keyword).await?;
    let query = if keyword.is_empty() { "all" } else { keyword };
    Ok(Json(json!({
        "concepts": concepts,
        "total": concepts.len(),
        "query": query,
    })))
}

/// GET /api/ontology/classes
pub async fn ontology_classes_handler(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let classes = state.ontology.classes().await?;
    Ok(Json(json!({ "classes": classes, "total": classes.len() })))
}

/// GET /api/ontology/hierarchy
pub async fn ontology_hierarchy_handler(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let hierarchy = state.ontology.hierarchy().await?;
    Ok(Json(json!({
        "hierarchy": hierarchy.roots,
        "metadata": {
            "totalClasses": hierarchy.total_classes,
            "rootClasses": hierarchy.root_classes(),
        },
    })))
}

/// GET /api/ontology/classes/:class/subclasses
pub async fn subclasses_handler(
    State(state): State<AppState>,
    Path(class): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let (class_uri, subclasses) = state.ontology.subclasses(&class).await?;
    let subclasses: Vec<Value> = subclasses
        .iter()
        .map(|uri| json!({ "uri": uri, "label": local_name(uri) }))
        .collect();
    Ok(Json(json!({
        "class": { "uri": class_uri, "label": local_name(&class_uri) },
        "total": subclasses.len(),
        "subclasses": subclasses,
    })))
}

/// GET /api/search/health
pub async fn search_health_handler(State(state): State<AppState>) -> Response {
    let endpoint = state.ontology.endpoint_url().to_string();
    match state.ontology.search_concepts("Person").await {
        Ok(concepts) => Json(json!({
            "status": "healthy",
            "service": "ontology_search",
            "endpoint": endpoint,
            "testQueryResults": concepts.len(),
        }))
        .into_response(),
        Err(err) => {
            warn!("Ontology search health check failed: {}", err);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": "ontology_search",
                    "endpoint": endpoint,
                    "error": err.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// GET /api/transport/:transport_type/stations
pub async fn transport_stations_handler(
    State(state): State<AppState>,
    Path(transport_type): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let mode = transport_type.parse::<TransportMode>().map_err(|message| {
        let valid: Vec<String> = TransportMode::ALL.iter().map(|m| m.as_str().to_lowercase()).collect();
        ApiError::bad_request("INVALID_TRANSPORT_TYPE", message).with_meta("validTypes", json!(valid))
    })?;

    let namespace = state.recommend.namespace();
    let stations: Vec<Value> = state
        .recommend
        .stations_for(mode)
        .await
        .into_iter()
        .map(|name| {
            json!({
                "uri": format!("{}{}", namespace, name),
                "name": name,
                "transportType": mode,
            })
        })
        .collect();

    Ok(Json(json!({
        "transportType": mode,
        "total": stations.len(),
        "stations": stations,
    })))
}
