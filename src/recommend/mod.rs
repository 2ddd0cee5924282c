//! Transport recommendations per user type
//!
//! Each user type prefers three transport modes with a base weight. The
//! weight is raised by how often persons of that type relate to the mode and
//! by the mode's speed and capacity, then clamped to `[0, 1]`.

use crate::sparql::results::local_name;
use crate::sparql::{QueryExecutor, SparqlJson, SparqlTemplate, TemplateResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Citizen,
    Tourist,
    Staff,
}

impl UserType {
    pub const ALL: [UserType; 3] = [UserType::Citizen, UserType::Tourist, UserType::Staff];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Citizen => "citizen",
            UserType::Tourist => "tourist",
            UserType::Staff => "staff",
        }
    }

    /// Ontology class of persons of this type
    pub fn class_name(&self) -> &'static str {
        match self {
            UserType::Citizen => "Citizen",
            UserType::Tourist => "Tourist",
            UserType::Staff => "Staff",
        }
    }

    /// Preferred modes with their base weights, in preference order
    fn preferences(&self) -> [(TransportMode, f64); 3] {
        use TransportMode::*;
        match self {
            UserType::Citizen => [(Bus, 0.8), (Metro, 0.9), (Bike, 0.7)],
            UserType::Tourist => [(Metro, 0.9), (Bus, 0.8), (Bike, 0.6)],
            UserType::Staff => [(Bike, 0.9), (Bus, 0.7), (Metro, 0.6)],
        }
    }

    fn reasoning(&self, mode: TransportMode) -> &'static str {
        use TransportMode::*;
        match (self, mode) {
            (UserType::Citizen, Bus) => "Buses provide reliable public transport for daily commuting with good coverage.",
            (UserType::Citizen, Metro) => "Metro offers fast and efficient transport for urban travel with high frequency.",
            (UserType::Citizen, Bike) => "Bikes provide eco-friendly transport for short to medium distances with health benefits.",
            (UserType::Tourist, Metro) => "Metro provides quick access to major tourist attractions with comprehensive network coverage.",
            (UserType::Tourist, Bus) => "Buses offer scenic routes and access to various tourist destinations throughout the city.",
            (UserType::Tourist, Bike) => "Bikes allow flexible exploration of tourist areas at your own pace.",
            (UserType::Staff, Bike) => "Bikes offer flexible and cost-effective transport for staff with parking convenience.",
            (UserType::Staff, Bus) => "Buses provide reliable transport for staff commuting with predictable schedules.",
            (UserType::Staff, Metro) => "Metro offers fast transport for staff working in central business districts.",
        }
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Invalid user type: {}", s))
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransportMode {
    Bike,
    Bus,
    Metro,
}

impl TransportMode {
    pub const ALL: [TransportMode; 3] = [TransportMode::Bike, TransportMode::Bus, TransportMode::Metro];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Bike => "Bike",
            TransportMode::Bus => "Bus",
            TransportMode::Metro => "Metro",
        }
    }

    fn fallback_stations(&self) -> Vec<String> {
        let name = self.as_str();
        vec![format!("{}Station1", name), format!("{}Station2", name)]
    }
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransportMode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Invalid transport type: {}", s))
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub transport_mode: TransportMode,
    pub stations: Vec<String>,
    pub relevance_score: f64,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, String>>,
}

/// Body of a custom recommendation request
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomCriteria {
    pub user_type: Option<String>,
    /// `speed`, `cost` or `environmental` mapped to `high`, `medium` or `low`
    #[serde(default)]
    pub preferences: IndexMap<String, String>,
    #[serde(default)]
    pub constraints: Constraints,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessibility: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRecommendation {
    pub transport_mode: TransportMode,
    pub stations: Vec<String>,
    pub relevance_score: f64,
    pub original_score: f64,
    pub reasoning: String,
    pub matched_preferences: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, String>>,
}

impl CustomRecommendation {
    /// Rescore `rec` against the caller's preferences and constraints
    pub fn personalise(rec: Recommendation, criteria: &CustomCriteria) -> Self {
        use TransportMode::*;
        let pref = |key: &str| criteria.preferences.get(key).map(String::as_str);
        let mode = rec.transport_mode;

        let mut bonus = 0.0;
        match (pref("speed"), mode) {
            (Some("high"), Metro) => bonus += 0.2,
            (Some("low"), Bike) => bonus += 0.1,
            _ => {}
        }
        match (pref("environmental"), mode) {
            (Some("high"), Bike) => bonus += 0.3,
            (Some("medium"), Metro) => bonus += 0.1,
            _ => {}
        }
        if pref("cost") == Some("low") && mode == Bike {
            bonus += 0.2;
        }
        if criteria.constraints.accessibility == Some(true) && matches!(mode, Bus | Metro) {
            bonus += 0.1;
        }

        let score = (rec.relevance_score + bonus).min(1.0);
        let mut reasoning = rec.reasoning;
        if score > rec.relevance_score {
            let keys: Vec<&str> = criteria.preferences.keys().map(String::as_str).collect();
            reasoning.push_str(&format!(
                " (Enhanced match for your preferences: {})",
                keys.join(", ")
            ));
        }
        let matched_preferences = criteria
            .preferences
            .iter()
            .filter(|(key, value)| preference_favours(key, value, mode))
            .map(|(key, _)| key.clone())
            .collect();

        Self {
            transport_mode: mode,
            stations: rec.stations,
            relevance_score: score,
            original_score: rec.relevance_score,
            reasoning,
            matched_preferences,
            properties: rec.properties,
        }
    }
}

/// Whether a `preference: value` pair points at `mode`
fn preference_favours(preference: &str, value: &str, mode: TransportMode) -> bool {
    use TransportMode::*;
    let favoured: &[TransportMode] = match (preference, value) {
        ("speed", "high") | ("environmental", "medium") => &[Metro],
        ("speed", "medium") | ("environmental", "low") => &[Bus],
        ("speed", "low") | ("environmental", "high") | ("cost", "low") => &[Bike],
        ("cost", "medium") => &[Bus, Metro],
        _ => &[],
    };
    favoured.contains(&mode)
}

const STATION_MAPPING: &str = "PREFIX : {{ns}}
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>

SELECT DISTINCT ?transportMode ?transportName ?station ?stationName ?stationType
WHERE {
    ?transport rdf:type ?transportMode .
    FILTER(?transportMode = :Bike || ?transportMode = :Bus || ?transportMode = :Metro)
    OPTIONAL { ?transport :hasName ?transportName . }
    ?stationInstance rdf:type ?stationType .
    FILTER(?stationType = :BikeStation || ?stationType = :BusStation || ?stationType = :MetroStation)
    OPTIONAL { ?stationInstance :hasName ?stationName . }
    BIND(
        IF(?transportMode = :Bike && ?stationType = :BikeStation, ?stationInstance,
        IF(?transportMode = :Bus && ?stationType = :BusStation, ?stationInstance,
        IF(?transportMode = :Metro && ?stationType = :MetroStation, ?stationInstance,
        ?UNDEF))) AS ?station
    )
    FILTER(BOUND(?station))
}
ORDER BY ?transportMode ?station";

const RELATIONSHIP_COUNT: &str = "PREFIX : {{ns}}
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>

SELECT (COUNT(*) AS ?relationshipCount)
WHERE {
    ?person rdf:type :{{user_class}} .
    ?transport rdf:type :{{mode}} .
    OPTIONAL { ?person :usesTransport ?transport . }
}";

const SPEED_CAPACITY: &str = "PREFIX : {{ns}}
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>

SELECT ?speed ?capacity
WHERE {
    ?transport rdf:type :{{mode}} .
    OPTIONAL { ?transport :hasSpeed ?speed . }
    OPTIONAL { ?transport :hasCapacity ?capacity . }
}
LIMIT 1";

const MODE_PROPERTIES: &str = "PREFIX : {{ns}}
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>

SELECT ?property ?value
WHERE {
    ?transport rdf:type :{{mode}} .
    ?transport ?property ?value .
    FILTER(?property != rdf:type)
}";

pub struct RecommendationService {
    executor: Arc<QueryExecutor>,
    namespace: String,
}

impl RecommendationService {
    pub fn new(executor: Arc<QueryExecutor>, namespace: impl Into<String>) -> Self {
        Self {
            executor,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Ranked recommendations; an unknown user type is treated as citizen.
    pub async fn recommendations_for(&self, user_type: &str) -> Vec<Recommendation> {
        let user_type = user_type.parse::<UserType>().unwrap_or_else(|_| {
            warn!("Unknown user type {:?}, using citizen", user_type);
            UserType::Citizen
        });
        info!("Generating recommendations for {}", user_type);

        let mapping = self.station_mapping().await;
        let mut recommendations = Vec::with_capacity(3);
        for (mode, base) in user_type.preferences() {
            let (relationship, property, properties) = tokio::join!(
                self.relationship_bonus(user_type, mode),
                self.property_bonus(mode),
                self.mode_properties(mode),
            );
            let score = relevance_score(base, relationship, property);
            debug!(
                "Relevance {}-{}: {:.3} (base {}, relationship {}, property {})",
                user_type, mode, score, base, relationship, property
            );

            recommendations.push(Recommendation {
                transport_mode: mode,
                stations: mapping.get(&mode).cloned().unwrap_or_default(),
                relevance_score: score,
                reasoning: format!("{}{}", qualifier(score), user_type.reasoning(mode)),
                properties: Some(properties).filter(|p| !p.is_empty()),
            });
        }

        recommendations.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        info!("Generated {} recommendations for {}", recommendations.len(), user_type);
        recommendations
    }

    /// Base recommendations for `user_type` rescored against `criteria`,
    /// best first
    pub async fn custom_recommendations(
        &self,
        user_type: UserType,
        criteria: &CustomCriteria,
    ) -> Vec<CustomRecommendation> {
        let mut custom: Vec<_> = self
            .recommendations_for(user_type.as_str())
            .await
            .into_iter()
            .map(|rec| CustomRecommendation::personalise(rec, criteria))
            .collect();
        custom.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        info!("Generated {} custom recommendations for {}", custom.len(), user_type);
        custom
    }

    /// Station names per mode, or the fixed fallback list when the store fails
    pub async fn station_mapping(&self) -> IndexMap<TransportMode, Vec<String>> {
        let Some(data) = self.select(self.template(STATION_MAPPING)).await else {
            warn!("Transport-station mapping unavailable, using fallback stations");
            return TransportMode::ALL
                .into_iter()
                .map(|mode| (mode, mode.fallback_stations()))
                .collect();
        };

        let mut mapping: IndexMap<TransportMode, Vec<String>> = IndexMap::new();
        for binding in data.bindings() {
            let Some(mode) = binding
                .get("transportMode")
                .and_then(|t| local_name(&t.value).parse::<TransportMode>().ok())
            else {
                continue;
            };
            let Some(name) = binding
                .get("stationName")
                .map(|t| t.value.clone())
                .or_else(|| binding.get("station").map(|t| t.local_name().to_string()))
            else {
                continue;
            };
            let stations = mapping.entry(mode).or_default();
            if !stations.contains(&name) {
                stations.push(name);
            }
        }
        info!("Retrieved transport-station mappings for {} modes", mapping.len());
        mapping
    }

    pub async fn stations_for(&self, mode: TransportMode) -> Vec<String> {
        self.station_mapping()
            .await
            .swap_remove(&mode)
            .unwrap_or_default()
    }

    async fn relationship_bonus(&self, user_type: UserType, mode: TransportMode) -> f64 {
        let template = self.template(RELATIONSHIP_COUNT).and_then(|t| {
            t.identifier("user_class", user_type.class_name())?
                .identifier("mode", mode.as_str())
        });
        self.select(template)
            .await
            .and_then(|data| data.first_value("relationshipCount")?.parse::<f64>().ok())
            .map(|count| (count * 0.05).min(0.2))
            .unwrap_or(0.0)
    }

    async fn property_bonus(&self, mode: TransportMode) -> f64 {
        let template = self
            .template(SPEED_CAPACITY)
            .and_then(|t| t.identifier("mode", mode.as_str()));
        let Some(data) = self.select(template).await else {
            return 0.0;
        };
        let number = |var: &str| data.first_value(var).and_then(|v| v.parse::<f64>().ok());

        let speed = number("speed").map(|s| (s / 100.0).min(0.1)).unwrap_or(0.0);
        let capacity = number("capacity").map(|c| (c / 1000.0).min(0.1)).unwrap_or(0.0);
        speed + capacity
    }

    async fn mode_properties(&self, mode: TransportMode) -> IndexMap<String, String> {
        let template = self
            .template(MODE_PROPERTIES)
            .and_then(|t| t.identifier("mode", mode.as_str()));
        let Some(data) = self.select(template).await else {
            return IndexMap::new();
        };
        data.bindings()
            .iter()
            .filter_map(|b| {
                let property = b.get("property")?;
                let value = b.get("value")?;
                Some((property.local_name().to_string(), value.value.clone()))
            })
            .collect()
    }

    fn template(&self, text: &'static str) -> TemplateResult<SparqlTemplate> {
        SparqlTemplate::new(text).iri("ns", &self.namespace)
    }

    async fn select(&self, template: TemplateResult<SparqlTemplate>) -> Option<SparqlJson> {
        let query = match template.and_then(|t| t.render()) {
            Ok(query) => query,
            Err(err) => {
                warn!("Recommendation query not built: {}", err);
                return None;
            }
        };
        let result = self.executor.execute(&query, None, false).await;
        if let Some(err) = &result.error {
            debug!("Recommendation query failed: {}", err);
        }
        result.data
    }
}

/// `base + relationship + property`, clamped to `[0, 1]`
pub fn relevance_score(base: f64, relationship_bonus: f64, property_bonus: f64) -> f64 {
    (base + relationship_bonus + property_bonus).clamp(0.0, 1.0)
}

fn qualifier(score: f64) -> &'static str {
    if score >= 0.8 {
        "Highly recommended: "
    } else if score >= 0.6 {
        "Recommended: "
    } else {
        "Consider: "
    }
}
