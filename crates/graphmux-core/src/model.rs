//! RDF data model
//!
//! Graph names, terms, triples and triple patterns. Everything here is a
//! plain value type: cheap to clone, totally ordered, and hashable so it
//! can key maps and sets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GraphError;

/// Absolute IRI naming a graph.
///
/// Names compare by exact string equality; no normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GraphName(String);

impl GraphName {
    /// Validate and wrap an IRI.
    ///
    /// Rejects empty strings, IRIs without a scheme and IRIs containing
    /// whitespace or angle brackets.
    pub fn new(iri: impl Into<String>) -> Result<Self, GraphError> {
        let iri = iri.into();
        if iri.is_empty() {
            return Err(GraphError::invalid_name(iri, "name is empty"));
        }
        if iri
            .chars()
            .any(|c| c.is_whitespace() || c == '<' || c == '>')
        {
            return Err(GraphError::invalid_name(
                iri,
                "name contains whitespace or angle brackets",
            ));
        }

        let Some((scheme, rest)) = iri.split_once(':') else {
            return Err(GraphError::invalid_name(iri, "relative IRI, missing scheme"));
        };
        if !is_scheme(scheme) {
            return Err(GraphError::invalid_name(iri, "invalid IRI scheme"));
        }
        if rest.is_empty() {
            return Err(GraphError::invalid_name(iri, "nothing after the scheme"));
        }

        Ok(Self(iri))
    }

    /// The IRI as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// RFC 3986 scheme: ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )
fn is_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

impl fmt::Display for GraphName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GraphName {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for GraphName {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GraphName> for String {
    fn from(name: GraphName) -> Self {
        name.0
    }
}

impl AsRef<str> for GraphName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Literal value with an optional datatype or language tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    /// Lexical form
    pub lexical: String,
    /// Datatype IRI (absent for plain and language-tagged literals)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    /// Language tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// An RDF term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Term {
    /// IRI reference
    Iri(String),
    /// Blank node label, without the `_:` prefix
    BlankNode(String),
    /// Literal value
    Literal(Literal),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    pub fn blank(label: impl Into<String>) -> Self {
        Term::BlankNode(label.into())
    }

    /// Plain literal.
    pub fn literal(lexical: impl Into<String>) -> Self {
        Term::Literal(Literal {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        })
    }

    /// Literal with a datatype IRI.
    pub fn typed_literal(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal(Literal {
            lexical: lexical.into(),
            datatype: Some(datatype.into()),
            language: None,
        })
    }

    /// Literal with a language tag.
    pub fn lang_literal(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal(Literal {
            lexical: lexical.into(),
            datatype: None,
            language: Some(language.into()),
        })
    }

    /// Parse the compact form used in config files and on the command line.
    ///
    /// `_:b0` is a blank node, `"text"` (optionally followed by `@lang` or
    /// `^^datatype`) is a literal, and anything else is taken as an IRI.
    /// Surrounding `<` `>` on IRIs are stripped.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if let Some(label) = input.strip_prefix("_:") {
            return Term::blank(label);
        }
        if let Some(body) = input.strip_prefix('"') {
            if let Some(end) = body.rfind('"') {
                let lexical = &body[..end];
                let suffix = &body[end + 1..];
                if let Some(lang) = suffix.strip_prefix('@') {
                    return Term::lang_literal(lexical, lang);
                }
                if let Some(datatype) = suffix.strip_prefix("^^") {
                    return Term::typed_literal(lexical, strip_angles(datatype));
                }
                return Term::literal(lexical);
            }
        }
        Term::iri(strip_angles(input))
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }
}

fn strip_angles(s: &str) -> &str {
    s.strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(s)
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::BlankNode(label) => write!(f, "_:{}", label),
            Term::Literal(lit) => {
                write!(f, "\"{}\"", lit.lexical.replace('"', "\\\""))?;
                if let Some(lang) = &lit.language {
                    write!(f, "@{}", lang)
                } else if let Some(datatype) = &lit.datatype {
                    write!(f, "^^<{}>", datatype)
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// A single statement: subject, predicate, object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// Triple whose three positions are IRIs.
    pub fn iris(subject: &str, predicate: &str, object: &str) -> Self {
        Self::new(Term::iri(subject), Term::iri(predicate), Term::iri(object))
    }

    /// Subject must be an IRI or blank node, predicate an IRI.
    pub fn is_well_formed(&self) -> bool {
        !self.subject.is_literal() && self.predicate.is_iri()
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// Selects triples by fixing any subset of the three positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TriplePattern {
    pub subject: Option<Term>,
    pub predicate: Option<Term>,
    pub object: Option<Term>,
}

impl TriplePattern {
    /// Pattern matching every triple.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn new(subject: Option<Term>, predicate: Option<Term>, object: Option<Term>) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    pub fn with_subject(mut self, subject: Term) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_predicate(mut self, predicate: Term) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_object(mut self, object: Term) -> Self {
        self.object = Some(object);
        self
    }

    pub fn matches(&self, triple: &Triple) -> bool {
        fn position(fixed: &Option<Term>, actual: &Term) -> bool {
            fixed.as_ref().is_none_or(|t| t == actual)
        }
        position(&self.subject, &triple.subject)
            && position(&self.predicate, &triple.predicate)
            && position(&self.object, &triple.object)
    }

    /// True when no position is fixed.
    pub fn is_wildcard(&self) -> bool {
        self.subject.is_none() && self.predicate.is_none() && self.object.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_graph_name_accepts_absolute_iris() {
        for iri in ["urn:g", "http://example.org/graph", "urn:x-local:a.b", "tag:x+y-z.w:1"] {
            let name = GraphName::new(iri).unwrap();
            assert_eq!(name.as_str(), iri);
        }
    }

    #[test]
    fn test_graph_name_rejects_relative_and_empty() {
        assert!(GraphName::new("").is_err());
        assert!(GraphName::new("graph").is_err());
        assert!(GraphName::new("/a/b").is_err());
        assert!(GraphName::new("1urn:g").is_err());
        assert!(GraphName::new("urn:").is_err());
        assert!(GraphName::new("urn:a b").is_err());
        assert!(GraphName::new("<urn:g>").is_err());
    }

    #[test]
    fn test_graph_name_exact_equality() {
        let a = GraphName::new("urn:G").unwrap();
        let b = GraphName::new("urn:g").unwrap();
        assert_ne!(a, b);
        assert_eq!(a, "urn:G".parse().unwrap());
    }

    #[test]
    fn test_graph_name_serde_validates() {
        let name: GraphName = serde_json::from_str("\"urn:g\"").unwrap();
        assert_eq!(name.as_str(), "urn:g");
        assert!(serde_json::from_str::<GraphName>("\"relative\"").is_err());
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"urn:g\"");
    }

    #[test]
    fn test_term_parse() {
        assert_eq!(Term::parse("urn:s"), Term::iri("urn:s"));
        assert_eq!(Term::parse("<urn:s>"), Term::iri("urn:s"));
        assert_eq!(Term::parse("_:b0"), Term::blank("b0"));
        assert_eq!(Term::parse("\"hello\""), Term::literal("hello"));
        assert_eq!(
            Term::parse("\"bonjour\"@fr"),
            Term::lang_literal("bonjour", "fr")
        );
        assert_eq!(
            Term::parse("\"42\"^^<http://www.w3.org/2001/XMLSchema#int>"),
            Term::typed_literal("42", "http://www.w3.org/2001/XMLSchema#int")
        );
    }

    #[test]
    fn test_term_display() {
        assert_eq!(Term::iri("urn:s").to_string(), "<urn:s>");
        assert_eq!(Term::blank("b").to_string(), "_:b");
        assert_eq!(Term::lang_literal("x", "en").to_string(), "\"x\"@en");
        let triple = Triple::iris("urn:s", "urn:p", "urn:o");
        assert_eq!(triple.to_string(), "<urn:s> <urn:p> <urn:o> .");
    }

    #[test]
    fn test_triple_well_formed() {
        assert!(Triple::iris("urn:s", "urn:p", "urn:o").is_well_formed());
        let bad = Triple::new(Term::literal("s"), Term::iri("urn:p"), Term::iri("urn:o"));
        assert!(!bad.is_well_formed());
    }

    #[test]
    fn test_pattern_matching() {
        let t = Triple::iris("urn:s", "urn:p", "urn:o");
        assert!(TriplePattern::any().matches(&t));
        assert!(TriplePattern::any().is_wildcard());
        assert!(TriplePattern::any()
            .with_subject(Term::iri("urn:s"))
            .with_object(Term::iri("urn:o"))
            .matches(&t));
        assert!(!TriplePattern::any()
            .with_predicate(Term::iri("urn:q"))
            .matches(&t));
    }
}
