//! Fixed resource queries: persons, stations, transport modes, travel plans
//! and parking stations

pub mod parking;
pub mod travel;

pub use parking::{NewParkingStation, ParkingStation, ParkingType};
pub use travel::{NewTravelPlan, TravelPlan};

use crate::sparql::{
    Binding, QueryExecutor, SparqlError, SparqlJson, SparqlTemplate, TemplateError,
    TemplateResult,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

#[derive(Error, Debug)]
pub enum ResourceError {
    #[error(transparent)]
    Query(#[from] SparqlError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<TemplateError> for ResourceError {
    fn from(err: TemplateError) -> Self {
        ResourceError::InvalidInput(err.to_string())
    }
}

pub type ResourceResult<T> = Result<T, ResourceError>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Person {
    pub uri: String,
    pub name: String,
    #[serde(rename = "type")]
    pub person_type: String,
}

impl Person {
    /// Reads `?person ?name ?type`; returns `None` without a person IRI
    pub fn from_binding(binding: &Binding) -> Option<Self> {
        Some(Self {
            uri: binding.get("person")?.value.clone(),
            name: value_or(binding, "name", "Sans nom"),
            person_type: value_or(binding, "type", "Person"),
        })
    }

    pub fn from_results(data: &SparqlJson) -> Vec<Self> {
        data.bindings().iter().filter_map(Self::from_binding).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub uri: String,
    pub name: String,
    #[serde(rename = "type")]
    pub station_type: String,
    pub location: String,
    pub capacity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransportModeEntry {
    pub uri: String,
    #[serde(rename = "type")]
    pub mode_type: Option<String>,
    pub name: Option<String>,
    pub speed: Option<String>,
}

impl TransportModeEntry {
    fn from_results(data: &SparqlJson) -> Vec<Self> {
        data.bindings()
            .iter()
            .filter_map(|b| {
                Some(Self {
                    uri: b.get("mode")?.value.clone(),
                    mode_type: value_opt(b, "type"),
                    name: value_opt(b, "name"),
                    speed: value_opt(b, "speed"),
                })
            })
            .collect()
    }
}

/// Body of a person creation request
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPerson {
    /// Local name of the new IRI; derived from `name` when absent
    pub localname: Option<String>,
    pub name: String,
    /// Citizen, Staff, Tourist or another class local name
    pub person_type: Option<String>,
}

/// Body of a transport mode creation request
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewTransportMode {
    /// Absolute IRI of the new individual; takes precedence over `localname`
    pub uri: Option<String>,
    pub localname: Option<String>,
    /// Class IRI or local name; `owl:NamedIndividual` when absent
    pub class: Option<String>,
    pub name: Option<String>,
    pub speed: Option<Scalar>,
}

/// A JSON string or number stored as a plain literal
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(text) => f.write_str(text),
            Scalar::Number(number) => write!(f, "{}", number),
        }
    }
}

const TRIPLE: &str = "{{s}} {{p}} {{o}} .";
const TYPED_TRIPLE: &str = "{{s}} {{p}} {{o}}^^{{datatype}} .";

/// Ground triples of an `INSERT DATA` block. Every term goes through a
/// template binding.
#[derive(Debug, Default)]
pub(crate) struct TripleSet {
    lines: Vec<String>,
}

impl TripleSet {
    pub(crate) fn link(&mut self, s: &str, p: &str, o: &str) -> TemplateResult<()> {
        let line = SparqlTemplate::new(TRIPLE).iri("s", s)?.iri("p", p)?.iri("o", o)?.render()?;
        self.lines.push(line);
        Ok(())
    }

    pub(crate) fn text(&mut self, s: &str, p: &str, value: &str) -> TemplateResult<()> {
        let line = SparqlTemplate::new(TRIPLE)
            .iri("s", s)?
            .iri("p", p)?
            .literal("o", value)
            .render()?;
        self.lines.push(line);
        Ok(())
    }

    /// `value` typed with the XML Schema datatype `xsd_type` (e.g. `time`)
    pub(crate) fn typed(&mut self, s: &str, p: &str, value: &str, xsd_type: &str) -> TemplateResult<()> {
        let line = SparqlTemplate::new(TYPED_TRIPLE)
            .iri("s", s)?
            .iri("p", p)?
            .literal("o", value)
            .iri("datatype", &format!("{}{}", XSD, xsd_type))?
            .render()?;
        self.lines.push(line);
        Ok(())
    }

    pub(crate) fn insert_data(&self) -> String {
        format!("INSERT DATA {{\n{}\n}}", self.lines.join("\n"))
    }
}

pub(crate) fn value_or(binding: &Binding, var: &str, default: &str) -> String {
    binding
        .get(var)
        .map(|t| t.value.clone())
        .unwrap_or_else(|| default.to_string())
}

pub(crate) fn value_opt(binding: &Binding, var: &str) -> Option<String> {
    binding.get(var).map(|t| t.value.clone())
}

const LIST_PERSONS: &str = "PREFIX : {{ns}}
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>

SELECT ?person ?name ?type
WHERE {
    ?person rdf:type :Person .
    OPTIONAL { ?person :hasName ?name . }
    OPTIONAL {
        ?person rdf:type ?type .
        FILTER(?type != :Person)
    }
}";

const SEARCH_PERSONS: &str = "PREFIX : {{ns}}
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>

SELECT ?person ?name ?type
WHERE {
    ?person rdf:type :Person .
    ?person :hasName ?name .
    FILTER regex(?name, {{term}}, \"i\")
    OPTIONAL {
        ?person rdf:type ?type .
        FILTER(?type != :Person)
    }
}";

const SEARCH_STATIONS: &str = "PREFIX : {{ns}}
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>

SELECT ?station ?name ?type ?location ?capacity
WHERE {
    ?station rdf:type :Station .
    ?station :hasName ?name .
    FILTER regex(?name, {{term}}, \"i\")
    OPTIONAL { ?station rdf:type ?type . FILTER(?type != :Station) }
    OPTIONAL { ?station :hasLocation ?location . }
    OPTIONAL { ?station :hasCapacity ?capacity . }
}";

const TRANSPORT_MODES: &str = "PREFIX sc: {{ns}}
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>

SELECT ?mode ?type ?name ?speed
WHERE {
    ?mode a ?type .
    FILTER(?type = sc:Bike || ?type = sc:Bus || ?type = sc:Metro)
    OPTIONAL { ?mode sc:hasName ?name . }
    OPTIONAL { ?mode sc:hasSpeed ?speed . }
}
ORDER BY ?mode";

const TRANSPORT_MODES_MATCHING: &str = "PREFIX sc: {{ns}}
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>

SELECT ?mode ?type ?name ?speed
WHERE {
    ?mode a ?type .
    FILTER(?type = sc:Bike || ?type = sc:Bus || ?type = sc:Metro)
    OPTIONAL { ?mode sc:hasName ?name . }
    OPTIONAL { ?mode sc:hasSpeed ?speed . }
    FILTER regex(str(?name), {{term}}, \"i\")
}
ORDER BY ?mode";

const TRANSPORT_MODE_BY_LOCAL_NAME: &str = "PREFIX sc: {{ns}}

SELECT ?mode ?type ?name ?speed
WHERE {
    ?mode a ?type .
    FILTER(?type = sc:Bike || ?type = sc:Bus || ?type = sc:Metro)
    OPTIONAL { ?mode sc:hasName ?name . }
    OPTIONAL { ?mode sc:hasSpeed ?speed . }
    FILTER(strafter(str(?mode), \"#\") = {{local}} || strends(str(?mode), {{suffix}}))
}
LIMIT 1";

const INDIVIDUAL_BY_LOCAL_NAME: &str = "PREFIX sc: {{ns}}

SELECT ?mode ?type ?name ?speed
WHERE {
    ?mode a ?type .
    FILTER(!strstarts(str(?type), \"http://www.w3.org/2000/01/rdf-schema\"))
    FILTER(!strstarts(str(?type), \"http://www.w3.org/1999/02/22-rdf-syntax-ns\"))
    FILTER(!strstarts(str(?type), \"http://www.w3.org/2002/07/owl\"))
    OPTIONAL { ?mode sc:hasName ?name . }
    OPTIONAL { ?mode sc:hasSpeed ?speed . }
    FILTER(strafter(str(?mode), \"#\") = {{local}} || strends(str(?mode), {{suffix}}))
}
LIMIT 1";

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

const NAMED_INDIVIDUAL: &str = "http://www.w3.org/2002/07/owl#NamedIndividual";

const INSERT_PERSON: &str = "PREFIX : {{ns}}
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>

INSERT DATA {
    :{{id}} rdf:type :Person .
    :{{id}} :hasName {{name}} .
}";

const INSERT_TYPED_PERSON: &str = "PREFIX : {{ns}}
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>

INSERT DATA {
    :{{id}} rdf:type :Person .
    :{{id}} rdf:type :{{person_type}} .
    :{{id}} :hasName {{name}} .
}";

const DELETE_PERSON: &str = "PREFIX : {{ns}}

DELETE WHERE {
    :{{id}} ?p ?o .
}";

pub struct ResourceService {
    executor: Arc<QueryExecutor>,
    namespace: String,
}

impl ResourceService {
    pub fn new(executor: Arc<QueryExecutor>, namespace: impl Into<String>) -> Self {
        Self {
            executor,
            namespace: namespace.into(),
        }
    }

    pub async fn list_persons(&self) -> ResourceResult<Vec<Person>> {
        let data = self.select(self.template(LIST_PERSONS)?).await?;
        Ok(Person::from_results(&data))
    }

    pub async fn search_persons(&self, term: &str) -> ResourceResult<Vec<Person>> {
        let template = self.template(SEARCH_PERSONS)?.literal("term", term);
        let data = self.select(template).await?;
        Ok(Person::from_results(&data))
    }

    pub async fn search_stations(&self, term: &str) -> ResourceResult<Vec<Station>> {
        let template = self.template(SEARCH_STATIONS)?.literal("term", term);
        let data = self.select(template).await?;
        Ok(data
            .bindings()
            .iter()
            .filter_map(|b| {
                Some(Station {
                    uri: b.get("station")?.value.clone(),
                    name: value_or(b, "name", "Sans nom"),
                    station_type: value_or(b, "type", "Station"),
                    location: value_or(b, "location", ""),
                    capacity: value_or(b, "capacity", ""),
                })
            })
            .collect())
    }

    /// Bike, Bus and Metro individuals, optionally filtered by name
    pub async fn transport_modes(&self, name_filter: Option<&str>) -> ResourceResult<Vec<TransportModeEntry>> {
        let template = match name_filter.filter(|f| !f.is_empty()) {
            Some(term) => self.template(TRANSPORT_MODES_MATCHING)?.literal("term", term),
            None => self.template(TRANSPORT_MODES)?,
        };
        let data = self.select(template).await?;
        Ok(TransportModeEntry::from_results(&data))
    }

    /// Bike, Bus or Metro individual with this local name, else any
    /// non-system individual with it
    pub async fn transport_mode(&self, localname: &str) -> ResourceResult<Option<TransportModeEntry>> {
        for text in [TRANSPORT_MODE_BY_LOCAL_NAME, INDIVIDUAL_BY_LOCAL_NAME] {
            let template = self.by_local_name(text, localname)?;
            let data = self.select(template).await?;
            if let Some(mode) = TransportModeEntry::from_results(&data).into_iter().next() {
                return Ok(Some(mode));
            }
        }
        Ok(None)
    }

    /// Insert a transport mode individual; returns its IRI.
    pub async fn create_transport_mode(&self, mode: &NewTransportMode) -> ResourceResult<String> {
        let uri = self.subject_uri(mode.uri.as_deref(), mode.localname.as_deref())?;
        let class = match mode.class.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(class) => self.resolve(class),
            None => NAMED_INDIVIDUAL.to_string(),
        };

        let mut triples = TripleSet::default();
        triples.link(&uri, RDF_TYPE, &class)?;
        if let Some(name) = &mode.name {
            triples.text(&uri, &self.term("hasName"), name)?;
        }
        if let Some(speed) = &mode.speed {
            triples.text(&uri, &self.term("hasSpeed"), &speed.to_string())?;
        }

        self.update(&triples.insert_data()).await?;
        info!("Created transport mode {}", uri);
        Ok(uri)
    }

    /// Insert a person; returns its IRI.
    pub async fn create_person(&self, person: &NewPerson) -> ResourceResult<String> {
        let name = person.name.trim();
        if name.is_empty() {
            return Err(ResourceError::InvalidInput("name is required".to_string()));
        }
        let id = match person.localname.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            Some(localname) => localname.to_string(),
            None => derive_local_name(name),
        };

        let template = match person.person_type.as_deref() {
            Some(person_type) => self
                .template(INSERT_TYPED_PERSON)?
                .identifier("person_type", person_type)?,
            None => self.template(INSERT_PERSON)?,
        };
        let update = template.identifier("id", &id)?.literal("name", name).render()?;

        self.executor.update(&update, None).await?;
        let uri = format!("{}{}", self.namespace, id);
        info!("Created person {}", uri);
        Ok(uri)
    }

    /// Remove every triple whose subject is the person; returns its IRI.
    pub async fn delete_person(&self, id: &str) -> ResourceResult<String> {
        let update = self.template(DELETE_PERSON)?.identifier("id", id)?.render()?;
        self.executor.update(&update, None).await?;
        let uri = format!("{}{}", self.namespace, id);
        info!("Deleted person {}", uri);
        Ok(uri)
    }

    fn template(&self, text: &'static str) -> ResourceResult<SparqlTemplate> {
        Ok(SparqlTemplate::new(text).iri("ns", &self.namespace)?)
    }

    /// `text` with `{{local}}` and `{{suffix}}` bound for a local-name match
    fn by_local_name(&self, text: &'static str, localname: &str) -> ResourceResult<SparqlTemplate> {
        Ok(self
            .template(text)?
            .literal("local", localname)
            .literal("suffix", &format!("/{}", localname)))
    }

    /// Absolute IRIs pass through; anything else is a local name in the namespace
    fn resolve(&self, value: &str) -> String {
        if value.contains("://") {
            value.to_string()
        } else {
            format!("{}{}", self.namespace, value)
        }
    }

    /// Ontology property or class IRI
    fn term(&self, local: &str) -> String {
        format!("{}{}", self.namespace, local)
    }

    /// IRI of a new individual from an explicit `uri` or a `localname`
    fn subject_uri(&self, uri: Option<&str>, localname: Option<&str>) -> ResourceResult<String> {
        fn non_empty(v: Option<&str>) -> Option<&str> {
            v.map(str::trim).filter(|v| !v.is_empty())
        }
        match (non_empty(uri), non_empty(localname)) {
            (Some(uri), _) => Ok(uri.to_string()),
            (None, Some(localname)) => Ok(self.term(localname)),
            (None, None) => Err(ResourceError::InvalidInput("uri or localname required".to_string())),
        }
    }

    async fn update(&self, update: &str) -> ResourceResult<()> {
        Ok(self.executor.update(update, None).await?)
    }

    async fn select(&self, template: SparqlTemplate) -> ResourceResult<SparqlJson> {
        let query = template.render()?;
        let result = self.executor.execute(&query, None, false).await;
        match (result.data, result.error) {
            (Some(data), None) => Ok(data),
            (_, error) => Err(error
                .unwrap_or_else(|| SparqlError::Internal("query returned no data".to_string()))
                .into()),
        }
    }
}

/// Letters, digits and underscores of `name`, prefixed when it starts with a digit
fn derive_local_name(name: &str) -> String {
    let id: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    match id.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("_{}", id),
        _ => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql::{ExecutorConfig, LinearBackoff, MockEndpoint, RdfTermJson, StoreError};
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

    fn persons_doc() -> SparqlJson {
        let mut alice = Binding::new();
        alice.insert("person".to_string(), RdfTermJson::uri(format!("{}Alice", NS)));
        alice.insert("name".to_string(), RdfTermJson::literal("Alice"));
        alice.insert("type".to_string(), RdfTermJson::uri(format!("{}Citizen", NS)));
        let mut anonymous = Binding::new();
        anonymous.insert("person".to_string(), RdfTermJson::uri(format!("{}p2", NS)));
        SparqlJson::select(
            vec!["person".to_string(), "name".to_string(), "type".to_string()],
            vec![alice, anonymous],
        )
    }

    #[tokio::test]
    async fn test_list_persons_defaults() {
        let endpoint = Arc::new(MockEndpoint::new().then(Ok(persons_doc())));
        let persons = service(endpoint).list_persons().await.unwrap();
        assert_eq!(persons.len(), 2);
        assert_eq!(persons[0].person_type, format!("{}Citizen", NS));
        assert_eq!(persons[1].name, "Sans nom");
        assert_eq!(persons[1].person_type, "Person");
    }

    #[tokio::test]
    async fn test_search_term_is_a_literal() {
        let endpoint = Arc::new(MockEndpoint::new());
        service(endpoint.clone()).search_persons("al\") } #").await.unwrap();
        let query = &endpoint.queries()[0];
        assert!(query.contains("FILTER regex(?name, \"al\\\") } \\u0023\", \"i\")"), "{}", query);
        assert!(query.starts_with(&format!("PREFIX : <{}>", NS)));
    }

    #[tokio::test]
    async fn test_transport_mode_filter() {
        let endpoint = Arc::new(MockEndpoint::new());
        let svc = service(endpoint.clone());
        svc.transport_modes(None).await.unwrap();
        svc.transport_modes(Some("")).await.unwrap();
        svc.transport_modes(Some("velo")).await.unwrap();

        let queries = endpoint.queries();
        assert!(!queries[0].contains("regex"));
        assert!(!queries[1].contains("regex"));
        assert!(queries[2].contains("FILTER regex(str(?name), \"velo\", \"i\")"));
    }

    #[tokio::test]
    async fn test_transport_mode_lookup_falls_back_to_any_individual() {
        let mut tram = Binding::new();
        tram.insert("mode".to_string(), RdfTermJson::uri(format!("{}Tram", NS)));
        tram.insert("type".to_string(), RdfTermJson::uri(format!("{}LightRail", NS)));
        let doc = SparqlJson::select(vec!["mode".to_string(), "type".to_string()], vec![tram]);
        let endpoint = Arc::new(MockEndpoint::new().respond_to("!strstarts", Ok(doc)));
        let svc = service(endpoint.clone());

        let mode = svc.transport_mode("Tram").await.unwrap().unwrap();
        assert_eq!(mode.mode_type, Some(format!("{}LightRail", NS)));
        let queries = endpoint.queries();
        assert_eq!(queries.len(), 2);
        assert!(queries[0].contains("?type = sc:Bike"));
        assert!(queries[0].contains("strafter(str(?mode), \"#\") = \"Tram\" || strends(str(?mode), \"/Tram\")"));
    }

    #[tokio::test]
    async fn test_create_transport_mode() {
        let endpoint = Arc::new(MockEndpoint::new());
        let svc = service(endpoint.clone());
        let uri = svc
            .create_transport_mode(&NewTransportMode {
                uri: Some("http://other.org/fleet#bus42".to_string()),
                localname: Some("ignored".to_string()),
                class: None,
                name: Some("Ligne 42".to_string()),
                speed: Some(Scalar::Text("35".to_string())),
            })
            .await
            .unwrap();
        assert_eq!(uri, "http://other.org/fleet#bus42");
        let update = &endpoint.updates()[0];
        assert!(update.contains(&format!("<{}> <{}> <{}> .", uri, RDF_TYPE, NAMED_INDIVIDUAL)));
        assert!(update.contains(&format!("<{}> <{}hasName> \"Ligne 42\" .", uri, NS)));
        assert!(update.contains(&format!("<{}> <{}hasSpeed> \"35\" .", uri, NS)));

        let body: NewTransportMode =
            serde_json::from_str(r#"{"localname": "m1", "class": "Bus", "speed": 50.5}"#).unwrap();
        assert_eq!(body.speed.as_ref().map(|s| s.to_string()), Some("50.5".to_string()));
        svc.create_transport_mode(&body).await.unwrap();
        assert!(endpoint.updates()[1].contains(&format!("<{}m1> <{}> <{}Bus> .", NS, RDF_TYPE, NS)));
    }

    #[tokio::test]
    async fn test_create_person() {
        let endpoint = Arc::new(MockEndpoint::new());
        let uri = service(endpoint.clone())
            .create_person(&NewPerson {
                localname: None,
                name: "Jean Dupont".to_string(),
                person_type: Some("Tourist".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(uri, format!("{}JeanDupont", NS));

        let update = &endpoint.updates()[0];
        assert!(update.contains(":JeanDupont rdf:type :Tourist ."));
        assert!(update.contains(":JeanDupont :hasName \"Jean Dupont\" ."));
    }

    #[tokio::test]
    async fn test_name_spacing_reaches_the_store() {
        let endpoint = Arc::new(MockEndpoint::new());
        let svc = service(endpoint.clone());
        svc.create_person(&NewPerson {
            localname: Some("jd".to_string()),
            name: "Jean  Dupont".to_string(),
            person_type: None,
        })
        .await
        .unwrap();
        let update = &endpoint.updates()[0];
        assert!(update.contains(":jd :hasName \"Jean \\u0020Dupont\" ."), "{}", update);

        svc.search_persons("de  la").await.unwrap();
        let query = &endpoint.queries()[0];
        assert!(query.contains("regex(?name, \"de \\u0020la\", \"i\")"), "{}", query);
    }

    #[tokio::test]
    async fn test_create_person_rejects_bad_type() {
        let endpoint = Arc::new(MockEndpoint::new());
        let err = service(endpoint.clone())
            .create_person(&NewPerson {
                localname: Some("bob".to_string()),
                name: "Bob".to_string(),
                person_type: Some("Tourist . :x :y :z".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::InvalidInput(_)));
        assert!(endpoint.updates().is_empty());
    }

    #[tokio::test]
    async fn test_delete_person() {
        let endpoint = Arc::new(MockEndpoint::new());
        let svc = service(endpoint.clone());
        assert_eq!(svc.delete_person("Alice").await.unwrap(), format!("{}Alice", NS));
        assert!(endpoint.updates()[0].contains("DELETE WHERE { :Alice ?p ?o . }"));

        assert!(matches!(
            svc.delete_person("x> ?p ?o } ; DROP ALL").await,
            Err(ResourceError::InvalidInput(_))
        ));
        assert_eq!(endpoint.updates().len(), 1);
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let endpoint = Arc::new(
            MockEndpoint::new().otherwise(Err(StoreError::Transport("refused".to_string()))),
        );
        let err = service(endpoint).search_stations("gare").await.unwrap_err();
        match err {
            ResourceError::Query(err) => assert_eq!(err.code(), "CONNECTION_ERROR"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_derive_local_name() {
        assert_eq!(derive_local_name("Jean-Luc Picard"), "JeanLucPicard");
        assert_eq!(derive_local_name("42 Wallaby"), "_42Wallaby");
        assert_eq!(derive_local_name("Été"), "t");
    }
}
