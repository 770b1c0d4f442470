//! # Canonical Statements — Deterministic N-Quads from JSON-LD
//!
//! This module turns a JSON-LD document into the ordered statement list that
//! is signed message-by-message. Signer, holder and verifier must all produce
//! the identical list for the same logical document, so every step is
//! deterministic.
//!
//! ## Security Invariant
//!
//! Statement order is message order. The list is sorted and deduplicated
//! after blank nodes receive canonical labels, so two documents that differ
//! only in key order, blank node naming, or repeated values canonicalize to
//! the same statements.
//!
//! ## Pipeline
//!
//! 1. **Expand** the document against its contexts (see [`crate::expand`]).
//! 2. **Convert to RDF.** Integers become `xsd:integer` unless coerced,
//!    booleans become `xsd:boolean`, and floats are **rejected**: their
//!    lexical form is not stable across serializers.
//! 3. **Label blank nodes** `_:c14n0`, `_:c14n1`, … ordered by a hash of
//!    each node's first-degree quads, refined by neighbour hashes until the
//!    partition stops splitting.
//! 4. **Sort** the rendered lines and drop duplicates.

use std::collections::{BTreeSet, HashMap};

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::CanonicalizationError;
use crate::expand::expand;
use crate::resolver::DocumentResolver;
use crate::statement::{
    Literal, Quad, Statement, Term, RDF_TYPE, XSD_BOOLEAN, XSD_INTEGER, XSD_STRING,
};

/// Prefix of canonical blank node labels.
pub const CANONICAL_BLANK_PREFIX: &str = "c14n";

/// Turns a document into its ordered canonical statements.
///
/// Implementations must be deterministic: the same document and resolver
/// contents always produce the same statements in the same order.
pub trait Canonicalizer: Send + Sync {
    /// Canonicalize `document`, resolving remote contexts through `resolver`.
    fn canonicalize(
        &self,
        document: &Value,
        resolver: &dyn DocumentResolver,
    ) -> Result<Vec<Statement>, CanonicalizationError>;
}

/// The built-in JSON-LD canonicalizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLdCanonicalizer;

impl JsonLdCanonicalizer {
    /// Create a canonicalizer.
    pub fn new() -> Self {
        Self
    }

    /// Convert a document to quads with document-local blank node labels
    /// (`b0`, `b1`, …), before canonical relabelling.
    pub fn to_quads(
        &self,
        document: &Value,
        resolver: &dyn DocumentResolver,
    ) -> Result<Vec<Quad>, CanonicalizationError> {
        let nodes = expand(document, resolver)?;
        let mut writer = RdfWriter::default();
        for node in &nodes {
            let Value::Object(node) = node else {
                continue;
            };
            writer.node(node, None)?;
        }
        Ok(writer.quads)
    }
}

impl Canonicalizer for JsonLdCanonicalizer {
    fn canonicalize(
        &self,
        document: &Value,
        resolver: &dyn DocumentResolver,
    ) -> Result<Vec<Statement>, CanonicalizationError> {
        let quads = self.to_quads(document, resolver)?;
        let statements = canonicalize_quads(&quads);
        tracing::trace!(quads = quads.len(), statements = statements.len(), "canonicalized document");
        Ok(statements)
    }
}

/// Relabel blank nodes canonically, then render, sort and deduplicate.
pub fn canonicalize_quads(quads: &[Quad]) -> Vec<Statement> {
    let labels = canonical_labels(quads);
    let relabel = |term: &Term| match term {
        Term::Blank(label) => Term::Blank(labels.get(label).cloned().unwrap_or_else(|| label.clone())),
        other => other.clone(),
    };
    let lines: BTreeSet<String> = quads
        .iter()
        .map(|q| {
            Quad {
                subject: relabel(&q.subject),
                predicate: q.predicate.clone(),
                object: relabel(&q.object),
                graph: q.graph.as_ref().map(relabel),
            }
            .to_nquads()
        })
        .collect();
    lines.into_iter().map(Statement::from_rendered).collect()
}

#[derive(Default)]
struct RdfWriter {
    quads: Vec<Quad>,
    blank_ids: HashMap<String, String>,
    counter: usize,
}

impl RdfWriter {
    fn fresh_blank(&mut self) -> Term {
        let label = format!("b{}", self.counter);
        self.counter += 1;
        Term::Blank(label)
    }

    fn subject_for(&mut self, id: Option<&str>) -> Term {
        match id {
            Some(id) if id.starts_with("_:") => {
                if let Some(label) = self.blank_ids.get(id) {
                    return Term::Blank(label.clone());
                }
                let term = self.fresh_blank();
                if let Term::Blank(label) = &term {
                    self.blank_ids.insert(id.to_string(), label.clone());
                }
                term
            }
            Some(id) => Term::Iri(id.to_string()),
            None => self.fresh_blank(),
        }
    }

    /// Emit the quads of one expanded node object and return its subject.
    fn node(
        &mut self,
        node: &Map<String, Value>,
        graph: Option<&Term>,
    ) -> Result<Term, CanonicalizationError> {
        let subject = self.subject_for(node.get("@id").and_then(Value::as_str));

        if let Some(Value::Array(types)) = node.get("@type") {
            for ty in types {
                let Some(ty) = ty.as_str() else { continue };
                let object = if ty.starts_with("_:") {
                    self.subject_for(Some(ty))
                } else {
                    Term::Iri(ty.to_string())
                };
                self.push(subject.clone(), RDF_TYPE, object, graph);
            }
        }

        for (property, values) in node {
            if property.starts_with('@') || property.starts_with("_:") {
                continue;
            }
            let Value::Array(values) = values else { continue };
            for value in values {
                let Value::Object(value) = value else { continue };
                if let Some(object) = self.object(value, graph)? {
                    self.push(subject.clone(), property, object, graph);
                }
            }
        }

        if let Some(Value::Array(members)) = node.get("@graph") {
            for member in members {
                if let Value::Object(member) = member {
                    self.node(member, Some(&subject))?;
                }
            }
        }
        Ok(subject)
    }

    fn object(
        &mut self,
        value: &Map<String, Value>,
        graph: Option<&Term>,
    ) -> Result<Option<Term>, CanonicalizationError> {
        if value.contains_key("@value") {
            return literal_from_value_object(value).map(|lit| Some(Term::Literal(lit)));
        }
        let graph_only = value.len() == 1 && value.contains_key("@graph");
        if graph_only {
            let name = self.fresh_blank();
            if let Some(Value::Array(members)) = value.get("@graph") {
                for member in members {
                    if let Value::Object(member) = member {
                        self.node(member, Some(&name))?;
                    }
                }
            }
            return Ok(Some(name));
        }
        self.node(value, graph).map(Some)
    }

    fn push(&mut self, subject: Term, predicate: &str, object: Term, graph: Option<&Term>) {
        self.quads.push(Quad {
            subject,
            predicate: predicate.to_string(),
            object,
            graph: graph.cloned(),
        });
    }
}

/// Convert an expanded value object (`@value` with optional `@type` or
/// `@language`) into an RDF literal.
///
/// # Errors
///
/// Returns [`CanonicalizationError::FloatRejected`] for non-integer numbers
/// and `Unsupported` for null, array, or object values.
pub fn literal_from_value_object(value: &Map<String, Value>) -> Result<Literal, CanonicalizationError> {
    let literal = value.get("@value").unwrap_or(&Value::Null);
    let datatype = value.get("@type").and_then(Value::as_str);
    let language = value.get("@language").and_then(Value::as_str);
    let lit = match literal {
        Value::String(s) => match (datatype, language) {
            (Some(dt), _) => Literal::typed(s.clone(), dt),
            (None, Some(lang)) => Literal::lang(s.clone(), lang),
            (None, None) => Literal::typed(s.clone(), XSD_STRING),
        },
        Value::Bool(b) => Literal::typed(b.to_string(), datatype.unwrap_or(XSD_BOOLEAN)),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Literal::typed(n.to_string(), datatype.unwrap_or(XSD_INTEGER))
            } else {
                return Err(CanonicalizationError::FloatRejected(n.as_f64().unwrap_or(f64::NAN)));
            }
        }
        other => {
            return Err(CanonicalizationError::Unsupported(format!(
                "literal value {other}"
            )))
        }
    };
    Ok(lit)
}

type Hash = [u8; 32];

/// Assign `c14nN` labels to every blank node in `quads`.
fn canonical_labels(quads: &[Quad]) -> HashMap<String, String> {
    let mut order: Vec<String> = Vec::new();
    let mut mentions: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, quad) in quads.iter().enumerate() {
        for term in quad_terms(quad) {
            if let Term::Blank(label) = term {
                let entry = mentions.entry(label.clone()).or_default();
                if entry.is_empty() {
                    order.push(label.clone());
                }
                if entry.last() != Some(&i) {
                    entry.push(i);
                }
            }
        }
    }

    let mut hashes: HashMap<String, Hash> = order
        .iter()
        .map(|label| (label.clone(), first_degree_hash(label, &mentions[label], quads)))
        .collect();

    let mut distinct = count_distinct(&hashes);
    for _ in 0..order.len() {
        if distinct == order.len() {
            break;
        }
        let refined: HashMap<String, Hash> = order
            .iter()
            .map(|label| (label.clone(), refine_hash(label, &mentions[label], quads, &hashes)))
            .collect();
        let next = count_distinct(&refined);
        hashes = refined;
        if next == distinct {
            break;
        }
        distinct = next;
    }

    let mut ranked: Vec<(Hash, usize, &String)> = order
        .iter()
        .enumerate()
        .map(|(i, label)| (hashes[label], i, label))
        .collect();
    ranked.sort();
    ranked
        .into_iter()
        .enumerate()
        .map(|(n, (_, _, label))| (label.clone(), format!("{CANONICAL_BLANK_PREFIX}{n}")))
        .collect()
}

fn quad_terms(quad: &Quad) -> impl Iterator<Item = &Term> {
    [Some(&quad.subject), Some(&quad.object), quad.graph.as_ref()]
        .into_iter()
        .flatten()
}

fn count_distinct(hashes: &HashMap<String, Hash>) -> usize {
    hashes.values().collect::<BTreeSet<_>>().len()
}

/// Hash of the quads mentioning `label`, with `label` written `_:a` and
/// every other blank node `_:z`.
fn first_degree_hash(label: &str, mentions: &[usize], quads: &[Quad]) -> Hash {
    let mask = |term: &Term| match term {
        Term::Blank(l) if l == label => Term::Blank("a".to_string()),
        Term::Blank(_) => Term::Blank("z".to_string()),
        other => other.clone(),
    };
    let mut lines: Vec<String> = mentions
        .iter()
        .map(|&i| {
            let q = &quads[i];
            Quad {
                subject: mask(&q.subject),
                predicate: q.predicate.clone(),
                object: mask(&q.object),
                graph: q.graph.as_ref().map(mask),
            }
            .to_nquads()
        })
        .collect();
    lines.sort();
    let mut hasher = Sha256::new();
    for line in lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().into()
}

/// One refinement round: fold in the current hashes of every blank node
/// related to `label`, tagged by position and predicate.
fn refine_hash(
    label: &str,
    mentions: &[usize],
    quads: &[Quad],
    hashes: &HashMap<String, Hash>,
) -> Hash {
    let mut related: Vec<Vec<u8>> = Vec::new();
    for &i in mentions {
        let q = &quads[i];
        let positions = [("s", Some(&q.subject)), ("o", Some(&q.object)), ("g", q.graph.as_ref())];
        for (position, term) in positions {
            let Some(Term::Blank(other)) = term else { continue };
            if other == label {
                continue;
            }
            let mut entry = Vec::with_capacity(q.predicate.len() + 40);
            entry.extend_from_slice(position.as_bytes());
            entry.extend_from_slice(q.predicate.as_bytes());
            entry.extend_from_slice(&hashes[other.as_str()]);
            related.push(entry);
        }
    }
    related.sort();
    let mut hasher = Sha256::new();
    hasher.update(hashes[label]);
    for entry in related {
        hasher.update(&entry);
    }
    hasher.finalize().into()
}
