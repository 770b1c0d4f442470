//! # Canonical Statements — N-Quads Terms and Lines
//!
//! A [`Statement`] is one normalized RDF quad rendered as a single N-Quads
//! line without the trailing newline. Statements are the unit of signing:
//! every statement becomes one signed message, and its position in the
//! ordered statement list is its message index.
//!
//! ## Invariants
//!
//! - A `Statement` always parses back into a [`Quad`]. The public
//!   constructor [`Statement::parse`] validates the line; internal
//!   producers render from a `Quad` and cannot emit malformed text.
//! - Literal escaping follows canonical N-Quads: only `\\`, `\"`, `\n` and
//!   `\r` are escaped on output. Literals typed `xsd:string` are rendered
//!   without a datatype suffix.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CanonicalizationError;

/// `rdf:type`.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
/// `rdf:langString`, the datatype of language-tagged literals.
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
/// `xsd:string`.
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
/// `xsd:int`.
pub const XSD_INT: &str = "http://www.w3.org/2001/XMLSchema#int";
/// `xsd:integer`.
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
/// `xsd:boolean`.
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";

/// A literal value with its datatype IRI and optional language tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    /// The lexical form, unescaped.
    pub value: String,
    /// The datatype IRI. Language-tagged literals carry `rdf:langString`.
    pub datatype: String,
    /// The language tag, if any.
    pub language: Option<String>,
}

impl Literal {
    /// A literal typed `xsd:string`.
    pub fn string(value: impl Into<String>) -> Self {
        Self::typed(value, XSD_STRING)
    }

    /// A literal with an explicit datatype.
    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: datatype.into(),
            language: None,
        }
    }

    /// A language-tagged string.
    pub fn lang(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: RDF_LANG_STRING.to_string(),
            language: Some(language.into()),
        }
    }
}

/// An RDF term in subject, object, or graph-name position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    /// An absolute IRI.
    Iri(String),
    /// A blank node, stored without the `_:` prefix.
    Blank(String),
    /// A literal.
    Literal(Literal),
}

impl Term {
    /// Render the term in N-Quads syntax.
    pub fn to_nquads(&self) -> String {
        match self {
            Term::Iri(iri) => format!("<{iri}>"),
            Term::Blank(label) => format!("_:{label}"),
            Term::Literal(lit) => {
                let mut out = format!("\"{}\"", escape_literal(&lit.value));
                if let Some(lang) = &lit.language {
                    out.push('@');
                    out.push_str(lang);
                } else if lit.datatype != XSD_STRING {
                    out.push_str("^^<");
                    out.push_str(&lit.datatype);
                    out.push('>');
                }
                out
            }
        }
    }

    /// Returns the blank node label if this is a blank node.
    pub fn as_blank(&self) -> Option<&str> {
        match self {
            Term::Blank(label) => Some(label),
            _ => None,
        }
    }

    /// Returns the IRI if this is a named node.
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// Returns the literal if this is a literal.
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_nquads())
    }
}

/// One RDF quad. A `None` graph name is the default graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quad {
    /// Subject: an IRI or blank node.
    pub subject: Term,
    /// Predicate IRI.
    pub predicate: String,
    /// Object: any term.
    pub object: Term,
    /// Graph name, if the quad is in a named graph.
    pub graph: Option<Term>,
}

impl Quad {
    /// Render as an N-Quads line (no trailing newline).
    pub fn to_nquads(&self) -> String {
        match &self.graph {
            Some(g) => format!(
                "{} <{}> {} {} .",
                self.subject.to_nquads(),
                self.predicate,
                self.object.to_nquads(),
                g.to_nquads()
            ),
            None => format!(
                "{} <{}> {} .",
                self.subject.to_nquads(),
                self.predicate,
                self.object.to_nquads()
            ),
        }
    }

    /// Render as a [`Statement`].
    pub fn to_statement(&self) -> Statement {
        Statement(self.to_nquads())
    }

    /// Parse one N-Quads line.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::InvalidStatement` if the line is not a
    /// well-formed quad with IRI/blank subject and graph name.
    pub fn parse(line: &str) -> Result<Self, CanonicalizationError> {
        let caps = patterns()?
            .line
            .captures(line.trim_end())
            .ok_or_else(|| CanonicalizationError::InvalidStatement(line.to_string()))?;
        let subject = parse_term(&caps["s"], line)?;
        let object = parse_term(&caps["o"], line)?;
        let graph = caps
            .name("g")
            .map(|g| parse_term(g.as_str(), line))
            .transpose()?;
        Ok(Self {
            subject,
            predicate: caps["p"].to_string(),
            object,
            graph,
        })
    }
}

/// A canonical statement: one N-Quads line.
///
/// Order-significant when held in a list; equality is exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Statement(String);

impl Statement {
    /// Validate and wrap an N-Quads line.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::InvalidStatement` if the line does not parse.
    pub fn parse(line: &str) -> Result<Self, CanonicalizationError> {
        let trimmed = line.trim_end();
        Quad::parse(trimmed)?;
        Ok(Self(trimmed.to_string()))
    }

    /// Wrap text already known to be a rendered quad.
    pub(crate) fn from_rendered(text: String) -> Self {
        Self(text)
    }

    /// The statement text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The statement text as UTF-8 bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Parse the statement back into a quad.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::InvalidStatement` if the text does not
    /// parse. Validated statements always parse.
    pub fn to_quad(&self) -> Result<Quad, CanonicalizationError> {
        Quad::parse(&self.0)
    }

    /// The predicate IRI of this statement.
    pub fn predicate(&self) -> Option<String> {
        self.to_quad().ok().map(|quad| quad.predicate)
    }
}

impl TryFrom<String> for Statement {
    type Error = CanonicalizationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Statement::parse(&value)
    }
}

impl From<Statement> for String {
    fn from(s: Statement) -> Self {
        s.0
    }
}

impl AsRef<str> for Statement {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const NODE: &str = r"<[^>]*>|_:[A-Za-z0-9_.\-]+";
const LITERAL: &str = r#""(?:[^"\\]|\\.)*"(?:\^\^<[^>]*>|@[A-Za-z]+(?:-[A-Za-z0-9]+)*)?"#;

struct Patterns {
    line: Regex,
    literal: Regex,
}

fn patterns() -> Result<&'static Patterns, CanonicalizationError> {
    static PATTERNS: OnceLock<Result<Patterns, regex::Error>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            let line = format!(
                r"^(?P<s>{NODE}) <(?P<p>[^>]*)> (?P<o>{NODE}|{LITERAL})(?: (?P<g>{NODE}))? \.$"
            );
            Ok(Patterns {
                line: Regex::new(&line)?,
                literal: Regex::new(
                    r#"^"((?:[^"\\]|\\.)*)"(?:\^\^<([^>]*)>|@([A-Za-z]+(?:-[A-Za-z0-9]+)*))?$"#,
                )?,
            })
        })
        .as_ref()
        .map_err(|e| CanonicalizationError::InvalidStatement(format!("N-Quads grammar: {e}")))
}

fn parse_term(text: &str, line: &str) -> Result<Term, CanonicalizationError> {
    if let Some(inner) = text.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return Ok(Term::Iri(inner.to_string()));
    }
    if let Some(label) = text.strip_prefix("_:") {
        return Ok(Term::Blank(label.to_string()));
    }
    let caps = patterns()?
        .literal
        .captures(text)
        .ok_or_else(|| CanonicalizationError::InvalidStatement(line.to_string()))?;
    let value = unescape_literal(&caps[1])
        .ok_or_else(|| CanonicalizationError::InvalidStatement(line.to_string()))?;
    let literal = match (caps.get(2), caps.get(3)) {
        (Some(dt), _) => Literal::typed(value, dt.as_str()),
        (None, Some(lang)) => Literal::lang(value, lang.as_str()),
        (None, None) => Literal::string(value),
    };
    Ok(Term::Literal(literal))
}

fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_literal(text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            '\'' => out.push('\''),
            'u' => out.push(read_hex_char(&mut chars, 4)?),
            'U' => out.push(read_hex_char(&mut chars, 8)?),
            _ => return None,
        }
    }
    Some(out)
}

fn read_hex_char(chars: &mut std::str::Chars<'_>, digits: usize) -> Option<char> {
    let hex: String = chars.by_ref().take(digits).collect();
    if hex.len() != digits {
        return None;
    }
    u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
}
