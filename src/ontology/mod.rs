//! Ontology exploration
//!
//! Keyword concept search, the class list with direct subclasses, and the
//! subclass tree rooted at classes whose parent lies outside the ontology
//! namespace.

use crate::resources::{value_opt, ResourceResult};
use crate::sparql::results::local_name;
use crate::sparql::{QueryExecutor, SparqlError, SparqlJson, SparqlTemplate};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

const SEARCH_CONCEPTS: &str = "PREFIX : {{ns}}
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>

SELECT DISTINCT ?concept ?label ?type
WHERE {
    ?concept rdf:type ?type .
    OPTIONAL { ?concept rdfs:label ?label . }
    OPTIONAL { ?concept :hasName ?label . }
    FILTER(
        regex(str(?concept), {{keyword}}, \"i\") ||
        regex(str(?label), {{keyword}}, \"i\")
    )
}
ORDER BY ?concept
LIMIT 50";

const ALL_CONCEPTS: &str = "PREFIX : {{ns}}
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>

SELECT DISTINCT ?concept ?label ?type
WHERE {
    ?concept rdf:type ?type .
    OPTIONAL { ?concept rdfs:label ?label . }
    OPTIONAL { ?concept :hasName ?label . }
    FILTER(!strstarts(str(?concept), \"http://www.w3.org/2000/01/rdf-schema\"))
    FILTER(!strstarts(str(?concept), \"http://www.w3.org/1999/02/22-rdf-syntax-ns\"))
    FILTER(!strstarts(str(?concept), \"http://www.w3.org/2002/07/owl\"))
}
ORDER BY ?concept
LIMIT 100";

const CLASSES: &str = "PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>

SELECT DISTINCT ?class ?label ?parent
WHERE {
    ?class rdf:type rdfs:Class .
    OPTIONAL { ?class rdfs:label ?label . }
    OPTIONAL { ?class rdfs:subClassOf ?parent . }
    FILTER(!strstarts(str(?class), \"http://www.w3.org/2000/01/rdf-schema\"))
    FILTER(!strstarts(str(?class), \"http://www.w3.org/1999/02/22-rdf-syntax-ns\"))
    FILTER(!strstarts(str(?class), \"http://www.w3.org/2002/07/owl\"))
}
ORDER BY ?class";

const SUBCLASS_LINKS: &str = "PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>

SELECT DISTINCT ?class ?subclass
WHERE {
    ?subclass rdfs:subClassOf ?class .
}";

const HIERARCHY: &str = "PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>

SELECT DISTINCT ?class ?label ?parent ?parentLabel
WHERE {
    ?class rdf:type rdfs:Class .
    OPTIONAL { ?class rdfs:label ?label . }
    OPTIONAL {
        ?class rdfs:subClassOf ?parent .
        ?parent rdf:type rdfs:Class .
        OPTIONAL { ?parent rdfs:label ?parentLabel . }
    }
    FILTER(!strstarts(str(?class), \"http://www.w3.org/2000/01/rdf-schema\"))
    FILTER(!strstarts(str(?class), \"http://www.w3.org/1999/02/22-rdf-syntax-ns\"))
    FILTER(!strstarts(str(?class), \"http://www.w3.org/2002/07/owl\"))
}
ORDER BY ?parent ?class";

const SUBCLASSES: &str = "PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>

SELECT DISTINCT ?subclass
WHERE {
    ?subclass rdfs:subClassOf {{class}} .
}";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Concept {
    pub uri: String,
    pub label: String,
    #[serde(rename = "type")]
    pub concept_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInfo {
    pub uri: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_class: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subclasses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyNode {
    pub uri: String,
    pub label: String,
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    fn size(&self) -> usize {
        1 + self.children.iter().map(HierarchyNode::size).sum::<usize>()
    }
}

/// Subclass forest
#[derive(Debug, Clone, PartialEq)]
pub struct Hierarchy {
    pub roots: Vec<HierarchyNode>,
    pub total_classes: usize,
}

impl Hierarchy {
    pub fn root_classes(&self) -> usize {
        self.roots.len()
    }
}

pub struct OntologyService {
    executor: Arc<QueryExecutor>,
    namespace: String,
}

impl OntologyService {
    pub fn new(executor: Arc<QueryExecutor>, namespace: impl Into<String>) -> Self {
        Self {
            executor,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn endpoint_url(&self) -> &str {
        self.executor.endpoint_url()
    }

    /// Case-insensitive partial match on IRI or label; a blank keyword lists
    /// every non-system concept.
    pub async fn search_concepts(&self, keyword: &str) -> ResourceResult<Vec<Concept>> {
        let keyword = keyword.trim();
        let template = if keyword.is_empty() {
            SparqlTemplate::new(ALL_CONCEPTS).iri("ns", &self.namespace)?
        } else {
            SparqlTemplate::new(SEARCH_CONCEPTS)
                .iri("ns", &self.namespace)?
                .literal("keyword", keyword)
        };
        let data = self.select(template).await?;

        let concepts: Vec<Concept> = data
            .bindings()
            .iter()
            .filter_map(|b| {
                let uri = b.get("concept")?.value.clone();
                Some(Concept {
                    label: value_opt(b, "label").unwrap_or_else(|| local_name(&uri).to_string()),
                    concept_type: value_opt(b, "type").unwrap_or_else(|| "Unknown".to_string()),
                    uri,
                })
            })
            .collect();
        info!("Found {} concepts matching {:?}", concepts.len(), keyword);
        Ok(concepts)
    }

    /// Every non-system class with its label, parent and direct subclasses
    pub async fn classes(&self) -> ResourceResult<Vec<ClassInfo>> {
        let data = self.select(SparqlTemplate::new(CLASSES)).await?;
        let links = self.select(SparqlTemplate::new(SUBCLASS_LINKS)).await?;

        let mut subclasses: IndexMap<String, Vec<String>> = IndexMap::new();
        for b in links.bindings() {
            if let (Some(class), Some(sub)) = (value_opt(b, "class"), value_opt(b, "subclass")) {
                subclasses.entry(class).or_default().push(sub);
            }
        }

        let mut classes: IndexMap<String, ClassInfo> = IndexMap::new();
        for b in data.bindings() {
            let Some(uri) = value_opt(b, "class") else {
                continue;
            };
            classes.entry(uri.clone()).or_insert_with(|| ClassInfo {
                label: value_opt(b, "label").unwrap_or_else(|| local_name(&uri).to_string()),
                parent_class: value_opt(b, "parent"),
                subclasses: subclasses.get(&uri).cloned().unwrap_or_default(),
                uri,
            });
        }
        info!("Retrieved {} ontology classes", classes.len());
        Ok(classes.into_values().collect())
    }

    /// Direct subclasses of `class`, given as a local name or an absolute IRI.
    /// Returns the resolved class IRI alongside.
    pub async fn subclasses(&self, class: &str) -> ResourceResult<(String, Vec<String>)> {
        let class_uri = if class.starts_with("http") {
            class.to_string()
        } else {
            format!("{}{}", self.namespace, class)
        };
        let template = SparqlTemplate::new(SUBCLASSES).iri("class", &class_uri)?;
        let data = self.select(template).await?;
        let subclasses = data
            .bindings()
            .iter()
            .filter_map(|b| value_opt(b, "subclass"))
            .collect();
        Ok((class_uri, subclasses))
    }

    pub async fn hierarchy(&self) -> ResourceResult<Hierarchy> {
        let data = self.select(SparqlTemplate::new(HIERARCHY)).await?;
        let hierarchy = build_hierarchy(&data, &self.namespace);
        info!(
            "Built class hierarchy with {} nodes and {} root classes",
            hierarchy.total_classes,
            hierarchy.root_classes()
        );
        Ok(hierarchy)
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

struct Entry {
    label: String,
    parent: Option<String>,
}

/// Arrange `?class ?label ?parent ?parentLabel` rows into a forest.
///
/// Parents inside `namespace` get a node even without a row of their own. A
/// class whose parent chain loops back to itself becomes a root.
pub fn build_hierarchy(data: &SparqlJson, namespace: &str) -> Hierarchy {
    let mut nodes: IndexMap<String, Entry> = IndexMap::new();
    for b in data.bindings() {
        let Some(class) = value_opt(b, "class") else {
            continue;
        };
        let parent = value_opt(b, "parent");
        let label = value_opt(b, "label").unwrap_or_else(|| local_name(&class).to_string());
        nodes
            .entry(class)
            .or_insert(Entry { label, parent: None })
            .parent = parent.clone();

        if let Some(parent) = parent.filter(|p| p.starts_with(namespace)) {
            if !nodes.contains_key(&parent) {
                let label =
                    value_opt(b, "parentLabel").unwrap_or_else(|| local_name(&parent).to_string());
                nodes.insert(parent, Entry { label, parent: None });
            }
        }
    }

    let keys: Vec<String> = nodes.keys().cloned().collect();
    for key in &keys {
        let mut current = nodes.get(key).and_then(|e| e.parent.clone());
        let mut steps = 0;
        while let Some(parent) = current {
            if parent == *key {
                debug!("Subclass cycle through {}, treating it as a root", key);
                if let Some(entry) = nodes.get_mut(key) {
                    entry.parent = None;
                }
                break;
            }
            steps += 1;
            if steps > keys.len() {
                break;
            }
            current = nodes.get(&parent).and_then(|e| e.parent.clone());
        }
    }

    let mut children: IndexMap<&str, Vec<&str>> = IndexMap::new();
    let mut roots = Vec::new();
    for (uri, entry) in &nodes {
        match entry.parent.as_deref().filter(|p| nodes.contains_key(*p)) {
            Some(parent) => children.entry(parent).or_default().push(uri),
            None => roots.push(uri.as_str()),
        }
    }

    fn grow(uri: &str, nodes: &IndexMap<String, Entry>, children: &IndexMap<&str, Vec<&str>>) -> HierarchyNode {
        HierarchyNode {
            uri: uri.to_string(),
            label: nodes.get(uri).map(|e| e.label.clone()).unwrap_or_default(),
            children: children
                .get(uri)
                .map(|kids| kids.iter().map(|kid| grow(kid, nodes, children)).collect())
                .unwrap_or_default(),
        }
    }

    let roots: Vec<HierarchyNode> = roots.iter().map(|uri| grow(uri, &nodes, &children)).collect();
    debug_assert_eq!(roots.iter().map(HierarchyNode::size).sum::<usize>(), nodes.len());
    Hierarchy {
        roots,
        total_classes: nodes.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql::{Binding, ExecutorConfig, LinearBackoff, MockEndpoint, RdfTermJson, StoreError};
    use std::time::Duration;

    const NS: &str = "http://example.org/city#";

    fn service(endpoint: Arc<MockEndpoint>) -> OntologyService {
        let executor = QueryExecutor::new(
            endpoint,
            ExecutorConfig::default(),
            Arc::new(LinearBackoff::new(Duration::ZERO)),
        );
        OntologyService::new(Arc::new(executor), NS)
    }

    fn row(pairs: &[(&str, &str)]) -> Binding {
        pairs
            .iter()
            .map(|(var, value)| (var.to_string(), RdfTermJson::uri(*value)))
            .collect()
    }

    fn doc(vars: &[&str], rows: Vec<Binding>) -> SparqlJson {
        SparqlJson::select(vars.iter().map(|v| v.to_string()).collect(), rows)
    }

    fn class_rows() -> SparqlJson {
        let ns = |local: &str| format!("{}{}", NS, local);
        doc(
            &["class", "label", "parent", "parentLabel"],
            vec![
                row(&[("class", &ns("Person"))]),
                row(&[("class", &ns("Citizen")), ("parent", &ns("Person"))]),
                row(&[("class", &ns("Tourist")), ("parent", &ns("Person"))]),
                row(&[("class", &ns("Bike")), ("parent", &ns("TransportMode"))]),
                row(&[("class", &ns("Agent")), ("parent", "http://xmlns.com/foaf/0.1/Agent")]),
            ],
        )
    }

    #[test]
    fn test_build_hierarchy() {
        let hierarchy = build_hierarchy(&class_rows(), NS);
        assert_eq!(hierarchy.total_classes, 6);
        let roots: Vec<&str> = hierarchy.roots.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(roots, vec!["Person", "TransportMode", "Agent"]);

        let person = &hierarchy.roots[0];
        let kids: Vec<&str> = person.children.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(kids, vec!["Citizen", "Tourist"]);
        assert_eq!(hierarchy.roots[1].children[0].label, "Bike");
    }

    #[test]
    fn test_hierarchy_breaks_cycles() {
        let ns = |local: &str| format!("{}{}", NS, local);
        let data = doc(
            &["class", "parent"],
            vec![
                row(&[("class", &ns("A")), ("parent", &ns("B"))]),
                row(&[("class", &ns("B")), ("parent", &ns("A"))]),
                row(&[("class", &ns("C")), ("parent", &ns("C"))]),
                row(&[("class", &ns("D")), ("parent", &ns("A"))]),
            ],
        );
        let hierarchy = build_hierarchy(&data, NS);
        assert_eq!(hierarchy.total_classes, 4);
        let reachable: usize = hierarchy.roots.iter().map(HierarchyNode::size).sum();
        assert_eq!(reachable, 4);
        assert!(hierarchy.roots.iter().any(|n| n.label == "C" && n.children.is_empty()));
    }

    #[tokio::test]
    async fn test_search_concepts() {
        let endpoint = Arc::new(MockEndpoint::new().then(Ok(doc(
            &["concept", "label", "type"],
            vec![row(&[("concept", &format!("{}Metro1", NS)), ("type", &format!("{}Metro", NS))])],
        ))));
        let svc = service(endpoint.clone());
        let concepts = svc.search_concepts("  metro\" ) } # ").await.unwrap();
        assert_eq!(concepts.len(), 1);
        assert_eq!(concepts[0].label, "Metro1");
        assert_eq!(concepts[0].concept_type, format!("{}Metro", NS));

        let query = &endpoint.queries()[0];
        assert!(query.contains("regex(str(?concept), \"metro\\\" ) } \\u0023\", \"i\")"), "{}", query);
        assert!(query.contains("LIMIT 50"));

        svc.search_concepts("  ").await.unwrap();
        let query = &endpoint.queries()[1];
        assert!(!query.contains("regex"));
        assert!(query.contains("LIMIT 100"));
    }

    #[tokio::test]
    async fn test_classes_carry_subclasses() {
        let person = format!("{}Person", NS);
        let citizen = format!("{}Citizen", NS);
        let endpoint = Arc::new(
            MockEndpoint::new()
                .respond_to(
                    "?class rdf:type rdfs:Class",
                    Ok(doc(
                        &["class", "label", "parent"],
                        vec![
                            row(&[("class", &person)]),
                            row(&[("class", &citizen), ("parent", &person)]),
                            row(&[("class", &citizen), ("parent", "http://example.org/other#Human")]),
                        ],
                    )),
                )
                .respond_to(
                    "?subclass rdfs:subClassOf ?class",
                    Ok(doc(&["class", "subclass"], vec![row(&[("class", &person), ("subclass", &citizen)])])),
                ),
        );
        let classes = service(endpoint).classes().await.unwrap();
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0].subclasses, vec![citizen.clone()]);
        assert_eq!(classes[1].parent_class.as_deref(), Some(person.as_str()));
        assert!(classes[1].subclasses.is_empty());
    }

    #[tokio::test]
    async fn test_subclasses_resolve_local_names() {
        let endpoint = Arc::new(MockEndpoint::new());
        let svc = service(endpoint.clone());
        let (uri, subclasses) = svc.subclasses("Person").await.unwrap();
        assert_eq!(uri, format!("{}Person", NS));
        assert!(subclasses.is_empty());
        assert!(endpoint.queries()[0].contains(&format!("rdfs:subClassOf <{}Person> .", NS)));

        let (uri, _) = svc.subclasses("http://xmlns.com/foaf/0.1/Agent").await.unwrap();
        assert_eq!(uri, "http://xmlns.com/foaf/0.1/Agent");

        assert!(svc.subclasses("Person> } DROP ALL {").await.is_err());
        assert_eq!(endpoint.queries().len(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let endpoint = Arc::new(
            MockEndpoint::new().otherwise(Err(StoreError::Transport("refused".to_string()))),
        );
        assert!(service(endpoint).hierarchy().await.is_err());
    }
}
