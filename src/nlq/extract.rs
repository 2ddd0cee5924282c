//! Token extraction from French questions

use regex::Regex;
use std::sync::LazyLock;

/// Interrogatives are never taken as a name
const STOPWORDS: [&str; 5] = ["qui", "quel", "quelle", "quels", "quelles"];

const EXAMPLE_NAMES: [&str; 7] = ["alice", "bob", "charlie", "david", "eve", "frank", "grace"];

const PERSON_TYPES: [(&str, &str); 9] = [
    ("citoyen", "Citizen"),
    ("citoyens", "Citizen"),
    ("habitant", "Citizen"),
    ("staff", "Staff"),
    ("employé", "Staff"),
    ("employés", "Staff"),
    ("touriste", "Tourist"),
    ("touristes", "Tourist"),
    ("visiteur", "Tourist"),
];

static NAME_AFTER_PHRASE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"qui est (.+?)(?:\?|$|\.)",
        r"qui s'appelle (.+?)(?:\?|$|\.)",
        r"trouve (.+?)(?:\?|$|\.)",
        r"cherche (.+?)(?:\?|$|\.)",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("static name pattern"))
    .collect()
});

/// Extract a person name, or `None`.
///
/// Tried in order: the first title-cased word longer than two characters
/// that is not an interrogative, the first example name contained in the
/// question, then the text following "qui est", "qui s'appelle", "trouve"
/// or "cherche".
pub fn extract_name(question: &str) -> Option<String> {
    let title_word = question
        .split_whitespace()
        .map(trim_punctuation)
        .find(|word| {
            word.chars().count() > 2
                && is_title_case(word)
                && !STOPWORDS.contains(&word.to_lowercase().as_str())
        });
    if let Some(word) = title_word {
        return Some(word.to_string());
    }

    let lower = question.to_lowercase();
    if let Some(name) = EXAMPLE_NAMES.iter().find(|name| lower.contains(*name)) {
        return Some(capitalize(name));
    }

    NAME_AFTER_PHRASE
        .iter()
        .find_map(|pattern| pattern.captures(&lower))
        .and_then(|caps| caps.get(1))
        .map(|m| trim_punctuation(m.as_str().trim()))
        .filter(|name| !name.is_empty())
        .map(capitalize)
}

/// Map a French person-type keyword to its ontology class.
pub fn extract_person_type(question: &str) -> Option<&'static str> {
    let lower = question.to_lowercase();
    PERSON_TYPES
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, class)| *class)
}

fn trim_punctuation(word: &str) -> &str {
    word.trim_matches(|c: char| !c.is_alphanumeric())
}

/// Every alphabetic run starts upper-case and continues lower-case
fn is_title_case(word: &str) -> bool {
    let mut saw_letter = false;
    let mut at_run_start = true;
    for c in word.chars() {
        if c.is_alphabetic() {
            let ok = if at_run_start { c.is_uppercase() } else { !c.is_uppercase() };
            if !ok {
                return false;
            }
            saw_letter = true;
            at_run_start = false;
        } else {
            at_run_start = true;
        }
    }
    saw_letter
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
