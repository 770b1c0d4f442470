//! # Dataset — Statements Regrouped by Subject
//!
//! The inverse of canonicalization for framing purposes: statements are
//! parsed back into quads and grouped into one record per subject. Only the
//! default graph is grouped; quads in named graphs are kept aside untouched.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::CanonicalizationError;
use crate::statement::{Quad, Statement, Term, RDF_TYPE};

/// Everything the default graph says about one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    /// The subject term.
    pub subject: Term,
    /// `rdf:type` objects that are IRIs.
    pub types: BTreeSet<String>,
    /// Predicate IRI → objects, in statement order.
    pub properties: BTreeMap<String, Vec<Term>>,
}

impl NodeRecord {
    fn new(subject: Term) -> Self {
        Self {
            subject,
            types: BTreeSet::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Objects for `predicate`, or an empty slice.
    pub fn values(&self, predicate: &str) -> &[Term] {
        self.properties
            .get(predicate)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// A set of quads regrouped into subject records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    nodes: BTreeMap<Term, NodeRecord>,
    named: Vec<Quad>,
}

impl Dataset {
    /// Parse statements and group them by subject.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatement` if any statement fails to parse.
    pub fn from_statements(statements: &[Statement]) -> Result<Self, CanonicalizationError> {
        let quads = statements
            .iter()
            .map(Statement::to_quad)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_quads(quads))
    }

    /// Group already-parsed quads by subject.
    pub fn from_quads(quads: impl IntoIterator<Item = Quad>) -> Self {
        let mut dataset = Self::default();
        for quad in quads {
            if quad.graph.is_some() {
                dataset.named.push(quad);
                continue;
            }
            let record = dataset
                .nodes
                .entry(quad.subject.clone())
                .or_insert_with(|| NodeRecord::new(quad.subject.clone()));
            if quad.predicate == RDF_TYPE {
                if let Term::Iri(ty) = &quad.object {
                    record.types.insert(ty.clone());
                    continue;
                }
            }
            record
                .properties
                .entry(quad.predicate)
                .or_default()
                .push(quad.object);
        }
        dataset
    }

    /// The record for `subject`, if it has any default-graph statements.
    pub fn node(&self, subject: &Term) -> Option<&NodeRecord> {
        self.nodes.get(subject)
    }

    /// All subject records, ordered by subject term.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    /// Quads in named graphs.
    pub fn named_graph_quads(&self) -> &[Quad] {
        &self.named
    }

    /// Number of subjects in the default graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the default graph is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
