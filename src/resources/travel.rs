//! Travel plans: persons' trips between stations

use super::{value_opt, ResourceError, ResourceResult, ResourceService, TripleSet, RDF_TYPE};
use crate::sparql::SparqlJson;
use serde::{Deserialize, Serialize};
use tracing::info;

/// `{{term}}` filters on the owner's name and `{{local}}` on the plan's
/// local name; an empty string disables either filter.
const TRAVEL_PLANS: &str = "PREFIX sc: {{ns}}
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>

SELECT ?plan ?type ?person ?personName ?startStation ?startStationName ?endStation ?endStationName
       ?transportMode ?transportModeName ?startTime ?endTime ?daysOfWeek ?isActive
WHERE {
    ?plan a ?type .
    FILTER(?type = sc:SingleTripPlan || ?type = sc:DailyCommutePlan || ?type = sc:WeeklyPlan ||
           ?type = sc:SeasonalPlan || ?type = sc:TourPlan || ?type = sc:TravelPlan)
    OPTIONAL {
        ?person sc:hasTravelPlan ?plan .
        OPTIONAL { ?person sc:hasName ?personName . }
    }
    OPTIONAL {
        ?plan sc:hasStartStation ?startStation .
        OPTIONAL { ?startStation sc:hasName ?startStationName . }
    }
    OPTIONAL {
        ?plan sc:hasEndStation ?endStation .
        OPTIONAL { ?endStation sc:hasName ?endStationName . }
    }
    OPTIONAL {
        ?plan sc:usesTransportMode ?transportMode .
        OPTIONAL { ?transportMode sc:hasName ?transportModeName . }
    }
    OPTIONAL { ?plan sc:hasStartTime ?startTime . }
    OPTIONAL { ?plan sc:hasEndTime ?endTime . }
    OPTIONAL { ?plan sc:hasDaysOfWeek ?daysOfWeek . }
    OPTIONAL { ?plan sc:isActive ?isActive . }
    FILTER({{term}} = \"\" || regex(str(?personName), {{term}}, \"i\"))
    FILTER({{local}} = \"\" || strafter(str(?plan), \"#\") = {{local}} || strends(str(?plan), {{suffix}}))
}
ORDER BY ?plan";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelPlan {
    pub uri: String,
    #[serde(rename = "type")]
    pub plan_type: Option<String>,
    pub person: Option<String>,
    pub person_name: Option<String>,
    pub start_station: Option<String>,
    pub start_station_name: Option<String>,
    pub end_station: Option<String>,
    pub end_station_name: Option<String>,
    pub transport_mode: Option<String>,
    pub transport_mode_name: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub days_of_week: Option<String>,
    pub is_active: Option<String>,
}

impl TravelPlan {
    fn from_results(data: &SparqlJson) -> Vec<Self> {
        data.bindings()
            .iter()
            .filter_map(|b| {
                Some(Self {
                    uri: b.get("plan")?.value.clone(),
                    plan_type: value_opt(b, "type"),
                    person: value_opt(b, "person"),
                    person_name: value_opt(b, "personName"),
                    start_station: value_opt(b, "startStation"),
                    start_station_name: value_opt(b, "startStationName"),
                    end_station: value_opt(b, "endStation"),
                    end_station_name: value_opt(b, "endStationName"),
                    transport_mode: value_opt(b, "transportMode"),
                    transport_mode_name: value_opt(b, "transportModeName"),
                    start_time: value_opt(b, "startTime"),
                    end_time: value_opt(b, "endTime"),
                    days_of_week: value_opt(b, "daysOfWeek"),
                    is_active: value_opt(b, "isActive"),
                })
            })
            .collect()
    }
}

/// Body of a travel plan creation request. IRI-valued fields accept either
/// an absolute IRI or a local name in the ontology namespace.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTravelPlan {
    pub uri: Option<String>,
    pub localname: Option<String>,
    /// SingleTripPlan, DailyCommutePlan, WeeklyPlan, SeasonalPlan or TourPlan
    pub class: Option<String>,
    pub person: Option<String>,
    pub start_station: Option<String>,
    pub end_station: Option<String>,
    pub transport_mode: Option<String>,
    /// `xsd:time`, e.g. `08:00:00`
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub days_of_week: Option<String>,
    pub is_active: Option<bool>,
}

impl ResourceService {
    /// Every travel plan, optionally filtered by its owner's name
    pub async fn travel_plans(&self, person_filter: Option<&str>) -> ResourceResult<Vec<TravelPlan>> {
        let template = self
            .by_local_name(TRAVEL_PLANS, "")?
            .literal("term", person_filter.unwrap_or_default());
        let data = self.select(template).await?;
        Ok(TravelPlan::from_results(&data))
    }

    pub async fn travel_plan(&self, localname: &str) -> ResourceResult<Option<TravelPlan>> {
        let template = self.by_local_name(TRAVEL_PLANS, localname)?.literal("term", "");
        let data = self.select(template).await?;
        Ok(TravelPlan::from_results(&data).into_iter().next())
    }

    /// Insert a travel plan; returns its IRI.
    pub async fn create_travel_plan(&self, plan: &NewTravelPlan) -> ResourceResult<String> {
        let uri = self.subject_uri(plan.uri.as_deref(), plan.localname.as_deref())?;
        let class = plan
            .class
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                ResourceError::InvalidInput(
                    "class required (e.g., SingleTripPlan, DailyCommutePlan)".to_string(),
                )
            })?;

        let mut triples = TripleSet::default();
        triples.link(&uri, RDF_TYPE, &self.resolve(class))?;
        if let Some(person) = &plan.person {
            triples.link(&self.resolve(person), &self.term("hasTravelPlan"), &uri)?;
        }
        let links = [
            ("hasStartStation", &plan.start_station),
            ("hasEndStation", &plan.end_station),
            ("usesTransportMode", &plan.transport_mode),
        ];
        for (property, target) in links {
            if let Some(target) = target {
                triples.link(&uri, &self.term(property), &self.resolve(target))?;
            }
        }
        if let Some(time) = &plan.start_time {
            triples.typed(&uri, &self.term("hasStartTime"), time, "time")?;
        }
        if let Some(time) = &plan.end_time {
            triples.typed(&uri, &self.term("hasEndTime"), time, "time")?;
        }
        if let Some(days) = &plan.days_of_week {
            triples.text(&uri, &self.term("hasDaysOfWeek"), days)?;
        }
        if let Some(active) = plan.is_active {
            triples.typed(&uri, &self.term("isActive"), &active.to_string(), "boolean")?;
        }

        self.update(&triples.insert_data()).await?;
        info!("Created travel plan {}", uri);
        Ok(uri)
    }
}
