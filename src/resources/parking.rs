//! Parking stations and their live occupancy

use super::{value_opt, ResourceError, ResourceResult, ResourceService, TripleSet, RDF_TYPE};
use crate::sparql::{SparqlJson, SparqlTemplate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;

/// `{{term}}` filters on the name, `{{kind}}` on the class local name and
/// `{{local}}` on the station local name; an empty string disables a filter.
const PARKING_STATIONS: &str = "PREFIX sc: {{ns}}

SELECT ?station ?type ?name ?capacity ?availableSpaces ?pricePerHour ?address ?latitude ?longitude ?operatingHours
WHERE {
    ?station a ?type .
    FILTER(?type = sc:CarParkingStation || ?type = sc:BikeParkingStation || ?type = sc:EVChargingStation)
    OPTIONAL { ?station sc:hasName ?name . }
    OPTIONAL { ?station sc:hasCapacity ?capacity . }
    OPTIONAL { ?station sc:hasAvailableSpaces ?availableSpaces . }
    OPTIONAL { ?station sc:hasPricePerHour ?pricePerHour . }
    OPTIONAL { ?station sc:hasAddress ?address . }
    OPTIONAL { ?station sc:hasLatitude ?latitude . }
    OPTIONAL { ?station sc:hasLongitude ?longitude . }
    OPTIONAL { ?station sc:hasOperatingHours ?operatingHours . }
    FILTER({{term}} = \"\" || regex(str(?name), {{term}}, \"i\"))
    FILTER({{kind}} = \"\" || strafter(str(?type), \"#\") = {{kind}})
    FILTER({{local}} = \"\" || strafter(str(?station), \"#\") = {{local}} || strends(str(?station), {{suffix}}))
}
ORDER BY ?name";

const SET_AVAILABLE_SPACES: &str = "PREFIX sc: {{ns}}

DELETE { {{station}} sc:hasAvailableSpaces ?old . }
INSERT { {{station}} sc:hasAvailableSpaces {{spaces}}^^<http://www.w3.org/2001/XMLSchema#integer> . }
WHERE { OPTIONAL { {{station}} sc:hasAvailableSpaces ?old . } }";

const DELETE_STATION: &str = "DELETE WHERE { {{station}} ?p ?o . }";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParkingType {
    CarParkingStation,
    BikeParkingStation,
    #[serde(rename = "EVChargingStation")]
    EvChargingStation,
}

impl ParkingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParkingType::CarParkingStation => "CarParkingStation",
            ParkingType::BikeParkingStation => "BikeParkingStation",
            ParkingType::EvChargingStation => "EVChargingStation",
        }
    }
}

impl FromStr for ParkingType {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CarParkingStation" => Ok(ParkingType::CarParkingStation),
            "BikeParkingStation" => Ok(ParkingType::BikeParkingStation),
            "EVChargingStation" => Ok(ParkingType::EvChargingStation),
            other => Err(ResourceError::InvalidInput(format!(
                "unknown parking type '{}' (CarParkingStation, BikeParkingStation or EVChargingStation)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingStation {
    pub uri: String,
    #[serde(rename = "type")]
    pub station_type: Option<String>,
    pub name: Option<String>,
    pub capacity: Option<String>,
    pub available_spaces: Option<String>,
    pub price_per_hour: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub operating_hours: Option<String>,
}

impl ParkingStation {
    fn from_results(data: &SparqlJson) -> Vec<Self> {
        data.bindings()
            .iter()
            .filter_map(|b| {
                Some(Self {
                    uri: b.get("station")?.value.clone(),
                    station_type: value_opt(b, "type"),
                    name: value_opt(b, "name"),
                    capacity: value_opt(b, "capacity"),
                    available_spaces: value_opt(b, "availableSpaces"),
                    price_per_hour: value_opt(b, "pricePerHour"),
                    address: value_opt(b, "address"),
                    latitude: value_opt(b, "latitude"),
                    longitude: value_opt(b, "longitude"),
                    operating_hours: value_opt(b, "operatingHours"),
                })
            })
            .collect()
    }
}

/// Body of a parking station creation request
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewParkingStation {
    pub localname: String,
    #[serde(rename = "type")]
    pub station_type: ParkingType,
    pub name: Option<String>,
    pub capacity: Option<i64>,
    pub available_spaces: Option<i64>,
    pub price_per_hour: Option<f64>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// e.g. `24/7` or `08:00-20:00`
    pub operating_hours: Option<String>,
}

impl ResourceService {
    pub async fn parking_stations(
        &self,
        name_filter: Option<&str>,
        station_type: Option<ParkingType>,
    ) -> ResourceResult<Vec<ParkingStation>> {
        let template = self
            .by_local_name(PARKING_STATIONS, "")?
            .literal("term", name_filter.unwrap_or_default())
            .literal("kind", station_type.map(|t| t.as_str()).unwrap_or_default());
        let data = self.select(template).await?;
        Ok(ParkingStation::from_results(&data))
    }

    pub async fn parking_station(&self, localname: &str) -> ResourceResult<Option<ParkingStation>> {
        let template = self
            .by_local_name(PARKING_STATIONS, localname)?
            .literal("term", "")
            .literal("kind", "");
        let data = self.select(template).await?;
        Ok(ParkingStation::from_results(&data).into_iter().next())
    }

    /// Insert a parking station; returns its IRI.
    pub async fn create_parking_station(&self, station: &NewParkingStation) -> ResourceResult<String> {
        let uri = self.subject_uri(None, Some(&station.localname))?;

        let mut triples = TripleSet::default();
        triples.link(&uri, RDF_TYPE, &self.term(station.station_type.as_str()))?;
        let texts = [
            ("hasName", &station.name),
            ("hasAddress", &station.address),
            ("hasOperatingHours", &station.operating_hours),
        ];
        for (property, value) in texts {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                triples.text(&uri, &self.term(property), value)?;
            }
        }
        let counts = [
            ("hasCapacity", station.capacity),
            ("hasAvailableSpaces", station.available_spaces),
        ];
        for (property, value) in counts {
            if let Some(value) = value {
                triples.typed(&uri, &self.term(property), &value.to_string(), "integer")?;
            }
        }
        let measures = [
            ("hasPricePerHour", station.price_per_hour),
            ("hasLatitude", station.latitude),
            ("hasLongitude", station.longitude),
        ];
        for (property, value) in measures {
            if let Some(value) = value {
                triples.typed(&uri, &self.term(property), &value.to_string(), "float")?;
            }
        }

        self.update(&triples.insert_data()).await?;
        info!("Created parking station {}", uri);
        Ok(uri)
    }

    /// Replace the station's available space count; returns its IRI.
    pub async fn update_available_spaces(&self, localname: &str, spaces: i64) -> ResourceResult<String> {
        if spaces < 0 {
            return Err(ResourceError::InvalidInput(
                "availableSpaces must not be negative".to_string(),
            ));
        }
        let uri = self.subject_uri(None, Some(localname))?;
        let update = self
            .template(SET_AVAILABLE_SPACES)?
            .iri("station", &uri)?
            .literal("spaces", &spaces.to_string())
            .render()?;
        self.update(&update).await?;
        info!("Set available spaces of {} to {}", uri, spaces);
        Ok(uri)
    }

    /// Remove every triple whose subject is the station; returns its IRI.
    pub async fn delete_parking_station(&self, localname: &str) -> ResourceResult<String> {
        let uri = self.subject_uri(None, Some(localname))?;
        let update = SparqlTemplate::new(DELETE_STATION)
            .iri("station", &uri)?
            .render()?;
        self.update(&update).await?;
        info!("Deleted parking station {}", uri);
        Ok(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql::{
        Binding, ExecutorConfig, LinearBackoff, MockEndpoint, QueryExecutor, RdfTermJson,
    };
    use std::sync::Arc;
    use std::time::Duration;

    const NS: &str = "http://example.org/city#";

    fn service(endpoint: Arc<MockEndpoint>) -> ResourceService {
        let executor = QueryExecutor::new(
            endpoint,
            ExecutorConfig::default(),
            Arc::new(LinearBackoff::new(Duration::ZERO)),
        );
        ResourceService::new(Arc::new(executor), NS)
    }

    fn stations_doc() -> SparqlJson {
        let mut central = Binding::new();
        central.insert("station".to_string(), RdfTermJson::uri(format!("{}CentralParking", NS)));
        central.insert("type".to_string(), RdfTermJson::uri(format!("{}CarParkingStation", NS)));
        central.insert("name".to_string(), RdfTermJson::literal("Central"));
        central.insert(
            "availableSpaces".to_string(),
            RdfTermJson::typed("42", "http://www.w3.org/2001/XMLSchema#integer"),
        );
        SparqlJson::select(
            vec!["station".to_string(), "type".to_string(), "name".to_string()],
            vec![central],
        )
    }

    #[test]
    fn test_parking_type_names() {
        for name in ["CarParkingStation", "BikeParkingStation", "EVChargingStation"] {
            assert_eq!(name.parse::<ParkingType>().unwrap().as_str(), name);
        }
        assert!("Garage".parse::<ParkingType>().is_err());

        let body: NewParkingStation =
            serde_json::from_str(r#"{"localname": "ev1", "type": "EVChargingStation"}"#).unwrap();
        assert_eq!(body.station_type, ParkingType::EvChargingStation);
    }

    #[tokio::test]
    async fn test_list_with_filters() {
        let endpoint = Arc::new(MockEndpoint::new().then(Ok(stations_doc())));
        let svc = service(endpoint.clone());
        let stations = svc.parking_stations(None, None).await.unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].available_spaces.as_deref(), Some("42"));
        assert_eq!(stations[0].address, None);

        svc.parking_stations(Some("cent"), Some(ParkingType::BikeParkingStation))
            .await
            .unwrap();
        let query = &endpoint.queries()[1];
        assert!(query.contains("regex(str(?name), \"cent\", \"i\")"));
        assert!(query.contains("strafter(str(?type), \"#\") = \"BikeParkingStation\""));
    }

    #[tokio::test]
    async fn test_get_by_local_name() {
        let endpoint = Arc::new(
            MockEndpoint::new().respond_to("= \"CentralParking\"", Ok(stations_doc())),
        );
        let svc = service(endpoint);
        let station = svc.parking_station("CentralParking").await.unwrap().unwrap();
        assert_eq!(station.name.as_deref(), Some("Central"));
        assert_eq!(svc.parking_station("Elsewhere").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_parking_station() {
        let endpoint = Arc::new(MockEndpoint::new());
        let uri = service(endpoint.clone())
            .create_parking_station(&NewParkingStation {
                localname: "ev1".to_string(),
                station_type: ParkingType::EvChargingStation,
                name: Some("Gare \"Nord\"".to_string()),
                capacity: Some(20),
                available_spaces: None,
                price_per_hour: Some(1.5),
                address: None,
                latitude: Some(48.88),
                longitude: None,
                operating_hours: Some("24/7".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(uri, format!("{}ev1", NS));

        let update = &endpoint.updates()[0];
        let station = format!("<{}ev1>", NS);
        assert!(update.contains(&format!("{} <{}> <{}EVChargingStation> .", station, RDF_TYPE, NS)));
        assert!(update.contains(&format!("{} <{}hasName> \"Gare \\\"Nord\\\"\" .", station, NS)));
        assert!(update.contains("\"20\"^^<http://www.w3.org/2001/XMLSchema#integer>"));
        assert!(update.contains("\"1.5\"^^<http://www.w3.org/2001/XMLSchema#float>"));
        assert!(update.contains("\"48.88\"^^<http://www.w3.org/2001/XMLSchema#float>"));
        assert!(!update.contains("hasAvailableSpaces"));
        assert!(!update.contains("hasLongitude"));
    }

    #[tokio::test]
    async fn test_update_available_spaces() {
        let endpoint = Arc::new(MockEndpoint::new());
        let svc = service(endpoint.clone());
        svc.update_available_spaces("CentralParking", 7).await.unwrap();
        let update = &endpoint.updates()[0];
        let station = format!("<{}CentralParking>", NS);
        assert!(update.contains(&format!("DELETE {{ {} sc:hasAvailableSpaces ?old . }}", station)));
        assert!(update.contains("\"7\"^^<http://www.w3.org/2001/XMLSchema#integer>"));

        assert!(matches!(
            svc.update_available_spaces("CentralParking", -1).await,
            Err(ResourceError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.update_available_spaces("a> ?p ?o } ; DROP ALL ; <b", 1).await,
            Err(ResourceError::InvalidInput(_))
        ));
        assert_eq!(endpoint.updates().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_parking_station() {
        let endpoint = Arc::new(MockEndpoint::new());
        let uri = service(endpoint.clone())
            .delete_parking_station("CentralParking")
            .await
            .unwrap();
        assert_eq!(
            endpoint.updates()[0],
            format!("DELETE WHERE {{ <{}> ?p ?o . }}", uri)
        );
    }
}
