//! Natural Language Querying (NLQ)
//!
//! Rule-based French question to SPARQL translation. Questions are matched
//! against ordered intent rules; the first rule set with a matching pattern
//! decides the intent and a fixed template produces the query.

pub mod extract;

pub use extract::{extract_name, extract_person_type};

use crate::sparql::{SparqlTemplate, TemplateResult};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    AllPersons,
    SearchByName,
    ByPersonType,
}

/// Intent rules in evaluation order
static INTENT_RULES: LazyLock<Vec<(Intent, Vec<Regex>)>> = LazyLock::new(|| {
    let compile = |patterns: &[&str]| {
        patterns
            .iter()
            .map(|p| Regex::new(p).expect("static intent pattern"))
            .collect::<Vec<_>>()
    };
    vec![
        (
            Intent::AllPersons,
            compile(&[
                r".*(tous|tout|liste|affiche).*(personne|gens|utilisateur)",
                r".*(montre|donne).*(personne|gens)",
                r"^qui.*$",
            ]),
        ),
        (
            Intent::SearchByName,
            compile(&[
                r".*(trouve|cherche|recherche).*",
                r".*(qui est|qui s'appelle).*",
                r".*(donne|montre).*(information|détail).*",
            ]),
        ),
        (
            Intent::ByPersonType,
            compile(&[
                r".*(citoyen|citoyens|habitant)",
                r".*(staff|employé|employés)",
                r".*(touriste|touristes|visiteur)",
            ]),
        ),
    ]
});

const ALL_PERSONS: &str = "PREFIX : {{ns}}
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>

SELECT ?person ?name ?type WHERE {
    ?person rdf:type :Person .
    OPTIONAL { ?person :hasName ?name . }
    OPTIONAL {
        ?person rdf:type ?type .
        FILTER(?type != :Person)
    }
}";

const SEARCH_BY_NAME: &str = "PREFIX : {{ns}}
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>

SELECT ?person ?name ?type WHERE {
    ?person rdf:type :Person .
    ?person :hasName ?name .
    FILTER regex(?name, {{name}}, \"i\")
    OPTIONAL {
        ?person rdf:type ?type .
        FILTER(?type != :Person)
    }
}";

const BY_PERSON_TYPE: &str = "PREFIX : {{ns}}
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>

SELECT ?person ?name ?type WHERE {
    ?person rdf:type :Person .
    ?person :hasName ?name .
    ?person rdf:type :{{person_type}} .
    OPTIONAL {
        ?person rdf:type ?other_type .
        FILTER(?other_type != :Person && ?other_type != :{{person_type}})
    }
}";

/// A question turned into SPARQL
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Translation {
    /// Intent of the template actually used
    pub intent: Intent,
    /// Extracted name or person type
    pub token: Option<String>,
    pub sparql: String,
}

pub struct NlTransformer {
    namespace: String,
    all_persons: String,
}

impl NlTransformer {
    pub fn new(namespace: impl Into<String>) -> TemplateResult<Self> {
        let namespace = namespace.into();
        let all_persons = SparqlTemplate::new(ALL_PERSONS).iri("ns", &namespace)?.render()?;
        Ok(Self {
            namespace,
            all_persons,
        })
    }

    /// First matching intent on the lower-cased question, else all persons
    pub fn classify(&self, question: &str) -> Intent {
        let lower = question.to_lowercase();
        INTENT_RULES
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| p.is_match(&lower)))
            .map(|(intent, _)| *intent)
            .unwrap_or(Intent::AllPersons)
    }

    /// SPARQL for `question`; always a complete SELECT query
    pub fn generate(&self, question: &str) -> String {
        self.translate(question).sparql
    }

    pub fn translate(&self, question: &str) -> Translation {
        let intent = self.classify(question);
        let token = match intent {
            Intent::AllPersons => None,
            Intent::SearchByName => extract_name(question),
            Intent::ByPersonType => extract_person_type(question).map(str::to_string),
        };
        debug!("Question classified as {:?} (token {:?})", intent, token);

        let Some(token) = token else {
            return self.fallback();
        };
        match self.render(intent, &token) {
            Ok(sparql) => Translation {
                intent,
                token: Some(token),
                sparql,
            },
            Err(err) => {
                warn!("Falling back to all persons: {}", err);
                self.fallback()
            }
        }
    }

    fn render(&self, intent: Intent, token: &str) -> TemplateResult<String> {
        match intent {
            Intent::SearchByName => SparqlTemplate::new(SEARCH_BY_NAME)
                .iri("ns", &self.namespace)?
                .literal("name", token)
                .render(),
            Intent::ByPersonType => SparqlTemplate::new(BY_PERSON_TYPE)
                .iri("ns", &self.namespace)?
                .identifier("person_type", token)?
                .render(),
            Intent::AllPersons => Ok(self.all_persons.clone()),
        }
    }

    fn fallback(&self) -> Translation {
        Translation {
            intent: Intent::AllPersons,
            token: None,
            sparql: self.all_persons.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql::{classify, validate, QueryType};

    const NS: &str = "http://www.semanticweb.org/monpc/ontologies/2025/9/untitled-ontology-4#";

    fn transformer() -> NlTransformer {
        NlTransformer::new(NS).unwrap()
    }

    #[test]
    fn test_all_persons_is_deterministic() {
        let t = transformer();
        let first = t.generate("Qui sont toutes les personnes ?");
        assert_eq!(first, t.generate("Qui sont toutes les personnes ?"));
        assert_eq!(first, t.all_persons);
        assert!(first.starts_with(&format!("PREFIX : <{}>", NS)));
    }

    #[test]
    fn test_intent_order() {
        let t = transformer();
        assert_eq!(t.classify("Liste les personnes"), Intent::AllPersons);
        // the broad qui rule wins over the name rules
        assert_eq!(t.classify("qui est Bob ?"), Intent::AllPersons);
        assert_eq!(t.classify("Trouve Alice"), Intent::SearchByName);
        assert_eq!(t.classify("Montre-moi les citoyens"), Intent::ByPersonType);
        assert_eq!(t.classify("bonjour"), Intent::AllPersons);
    }

    #[test]
    fn test_search_by_name() {
        let translation = transformer().translate("trouve Alice");
        assert_eq!(translation.intent, Intent::SearchByName);
        assert_eq!(translation.token.as_deref(), Some("Alice"));
        assert!(translation.sparql.contains("FILTER regex(?name, \"Alice\", \"i\")"));
    }

    #[test]
    fn test_name_is_escaped() {
        let sparql = transformer().generate("cherche x\" ) } DROP ALL");
        assert!(sparql.contains("regex(?name, \"X\\\" ) } drop all\", \"i\")"));
    }

    #[test]
    fn test_by_person_type() {
        let translation = transformer().translate("Montre-moi les citoyens");
        assert_eq!(translation.intent, Intent::ByPersonType);
        assert_eq!(translation.token.as_deref(), Some("Citizen"));
        assert!(translation.sparql.contains("?person rdf:type :Citizen ."));
        assert!(translation.sparql.contains("?other_type != :Citizen"));
    }

    #[test]
    fn test_capitalised_verb_becomes_the_name() {
        let t = transformer();
        let translation = t.translate("Trouve Zzyzx");
        assert_eq!(translation.intent, Intent::SearchByName);
        assert_eq!(translation.token.as_deref(), Some("Trouve"));
        assert!(translation.sparql.contains("FILTER regex(?name, \"Trouve\", \"i\")"));
        assert_ne!(translation.sparql, t.all_persons);
    }

    #[test]
    fn test_empty_name_falls_back() {
        let t = transformer();
        let translation = t.translate("je recherche");
        assert_eq!(translation.intent, Intent::AllPersons);
        assert_eq!(translation.token, None);
        assert_eq!(translation.sparql, t.all_persons);
    }

    #[test]
    fn test_always_a_select() {
        let t = transformer();
        for question in [
            "Qui sont toutes les personnes ?",
            "Trouve Alice",
            "Montre-moi les citoyens",
            "Liste le staff",
            "je recherche",
            "",
        ] {
            let sparql = t.generate(question);
            assert_eq!(classify(&sparql), QueryType::Select, "{}", question);
            assert!(validate(&sparql).is_valid(), "{}", question);
        }
    }

    #[test]
    fn test_invalid_namespace() {
        assert!(NlTransformer::new("not an iri").is_err());
    }
}
