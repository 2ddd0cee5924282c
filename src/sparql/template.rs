//! Value interpolation into SPARQL text
//!
//! A [`SparqlTemplate`] holds query text with `{{key}}` placeholders. Each
//! value is bound with the kind it must be emitted as: a quoted literal, an
//! identifier checked against `[A-Za-z_][A-Za-z0-9_]*`, an integer or an IRI.
//! Substituted text is never rescanned for placeholders.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static identifier pattern"));

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("No value bound for placeholder {{{{{0}}}}}")]
    Unbound(String),

    #[error("Value for {key} is not a valid identifier: {value:?}")]
    InvalidIdentifier { key: String, value: String },

    #[error("Value for {key} is not a valid IRI: {value:?}")]
    InvalidIri { key: String, value: String },

    #[error("Unterminated placeholder at byte {0}")]
    Unterminated(usize),
}

pub type TemplateResult<T> = Result<T, TemplateError>;

/// Query text with typed placeholder bindings
#[derive(Debug, Clone)]
pub struct SparqlTemplate {
    text: &'static str,
    values: HashMap<&'static str, String>,
}

impl SparqlTemplate {
    pub fn new(text: &'static str) -> Self {
        Self {
            text,
            values: HashMap::new(),
        }
    }

    /// Bind a string literal. Quotes and control characters are escaped.
    pub fn literal(mut self, key: &'static str, value: &str) -> Self {
        self.values.insert(key, escape_literal(value));
        self
    }

    /// Bind an integer literal.
    pub fn integer(mut self, key: &'static str, value: i64) -> Self {
        self.values.insert(key, value.to_string());
        self
    }

    /// Bind a bare identifier, such as a local name after a `:` prefix.
    pub fn identifier(mut self, key: &'static str, value: &str) -> TemplateResult<Self> {
        if !is_identifier(value) {
            return Err(TemplateError::InvalidIdentifier {
                key: key.to_string(),
                value: value.to_string(),
            });
        }
        self.values.insert(key, value.to_string());
        Ok(self)
    }

    /// Bind an IRI, emitted between angle brackets.
    pub fn iri(mut self, key: &'static str, value: &str) -> TemplateResult<Self> {
        let forbidden = |c: char| c.is_whitespace() || "<>\"{}|^`\\".contains(c);
        if value.is_empty() || value.chars().any(forbidden) {
            return Err(TemplateError::InvalidIri {
                key: key.to_string(),
                value: value.to_string(),
            });
        }
        self.values.insert(key, format!("<{}>", value));
        Ok(self)
    }

    /// Substitute every placeholder. Fails if any placeholder has no binding.
    pub fn render(&self) -> TemplateResult<String> {
        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or(TemplateError::Unterminated(offset + start))?;
            let key = after[..end].trim();
            let value = self
                .values
                .get(key)
                .ok_or_else(|| TemplateError::Unbound(key.to_string()))?;
            out.push_str(value);

            let consumed = start + 2 + end + 2;
            rest = &rest[consumed..];
            offset += consumed;
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// True if `value` matches `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(value: &str) -> bool {
    IDENTIFIER.is_match(value)
}

/// Quote `value` as a SPARQL string literal.
///
/// `#` is written as `\u0023` and every whitespace character the sanitizer
/// would fold (a space after whitespace, or any non-space whitespace) as a
/// `\u` escape, so sanitizing a rendered literal leaves it unchanged.
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    let mut after_whitespace = false;
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '#' => out.push_str("\\u0023"),
            '\0' => continue,
            ' ' if !after_whitespace => out.push(' '),
            c if c.is_whitespace() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
        after_whitespace = c.is_whitespace();
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_literal() {
        let query = SparqlTemplate::new("SELECT ?p WHERE { ?p :hasName {{name}} }")
            .literal("name", "Alice")
            .render()
            .unwrap();
        assert_eq!(query, "SELECT ?p WHERE { ?p :hasName \"Alice\" }");
    }

    #[test]
    fn test_literal_cannot_break_out() {
        let query = SparqlTemplate::new("SELECT ?p WHERE { ?p :hasName {{name}} }")
            .literal("name", "x\" } ; DROP ALL #")
            .render()
            .unwrap();
        assert_eq!(
            query,
            "SELECT ?p WHERE { ?p :hasName \"x\\\" } ; DROP ALL \\u0023\" }"
        );
    }

    #[test]
    fn test_literal_survives_sanitizer() {
        let query = SparqlTemplate::new("SELECT ?p WHERE { ?p :hasName {{name}} }")
            .literal("name", "Room #5")
            .render()
            .unwrap();
        assert_eq!(crate::sparql::sanitize(&query), query);
    }

    #[test]
    fn test_whitespace_runs_survive_sanitizer() {
        let literal = escape_literal("Jean  Dupont\u{a0}x \u{2003} y");
        assert_eq!(literal, "\"Jean \\u0020Dupont\\u00A0x \\u2003\\u0020y\"");

        let query = SparqlTemplate::new("INSERT DATA { :jd :hasName {{name}} . }")
            .literal("name", "Jean  Dupont")
            .render()
            .unwrap();
        assert_eq!(crate::sparql::sanitize(&query), query);
    }

    #[test]
    fn test_identifier_grammar() {
        assert!(is_identifier("Citizen"));
        assert!(is_identifier("_person_12"));
        assert!(!is_identifier("12abc"));
        assert!(!is_identifier("Citizen }"));
        assert!(!is_identifier(""));

        let err = SparqlTemplate::new("?p a :{{t}}")
            .identifier("t", "Citizen . ?x ?y ?z")
            .unwrap_err();
        assert!(matches!(err, TemplateError::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_iri_binding() {
        let query = SparqlTemplate::new("PREFIX : {{ns}} ASK { ?s ?p ?o }")
            .iri("ns", "http://example.org/onto#")
            .unwrap()
            .render()
            .unwrap();
        assert_eq!(query, "PREFIX : <http://example.org/onto#> ASK { ?s ?p ?o }");

        assert!(SparqlTemplate::new("{{ns}}").iri("ns", "http://x> <y").is_err());
    }

    #[test]
    fn test_unbound_placeholder() {
        let err = SparqlTemplate::new("SELECT ?s WHERE { ?s :age {{age}} }")
            .render()
            .unwrap_err();
        assert_eq!(err, TemplateError::Unbound("age".to_string()));
        assert_eq!(err.to_string(), "No value bound for placeholder {{age}}");
    }

    #[test]
    fn test_substituted_text_is_not_rescanned() {
        let query = SparqlTemplate::new("{{a}} {{b}}")
            .literal("a", "{{b}}")
            .integer("b", 42)
            .render()
            .unwrap();
        assert_eq!(query, "\"{{b}}\" 42");
    }

    #[test]
    fn test_unterminated_placeholder() {
        let err = SparqlTemplate::new("SELECT {{name").render().unwrap_err();
        assert_eq!(err, TemplateError::Unterminated(7));
    }
}
