//! # Reveal Framing
//!
//! Selects the part of a signed document a reveal pattern asks for. The
//! framer works on the dataset re-materialized from the transformed
//! document statements, so every node already has a stable identifier
//! (synthetic `urn:bnid:` IRIs for former blank nodes).
//!
//! ## Output
//!
//! Expanded JSON-LD with an explicit `@id` on every node: one node object
//! for a single matching root, `{"@graph": [...]}` otherwise. Because no
//! node is anonymous, canonicalizing the output yields statements that can
//! be compared byte-for-byte with the signed ones.
//!
//! ## Security Invariant
//!
//! The framer only selects signed data, with one exception: a claimed value
//! in the pattern is emitted as written. If it was never signed, its
//! statement is absent from the signed list and index mapping rejects the
//! derivation.
//!
//! ## Strict Binding
//!
//! Framing alone omits what it cannot find. [`bind_pattern`] walks the same
//! pattern over the same dataset and fails with `RevealMismatch` when a
//! matched node lacks a property the pattern asks for with `{}`, a nested
//! frame, or a range sentinel. It also records which subject each range
//! sentinel applies to.

use sdvc_core::bnode::from_synthetic_term;
use sdvc_core::statement::XSD_STRING;
use sdvc_core::{Dataset, Literal, NodeRecord, Term};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::VcError;
use crate::pattern::{Claim, FrameNode, PropertyPattern, RevealPattern};
use crate::range::RangeField;

/// Applies a reveal pattern to a dataset.
pub trait RevealFramer: Send + Sync {
    /// Frame `dataset` with `pattern`, producing the document to disclose.
    fn frame(&self, dataset: &Dataset, pattern: &RevealPattern) -> Result<Value, VcError>;
}

/// The built-in framer.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphFramer;

impl GraphFramer {
    /// Create a framer.
    pub fn new() -> Self {
        Self
    }
}

impl RevealFramer for GraphFramer {
    fn frame(&self, dataset: &Dataset, pattern: &RevealPattern) -> Result<Value, VcError> {
        let root = &pattern.root;
        let roots = select_roots(dataset, root);
        debug!(subjects = dataset.len(), roots = roots.len(), "framing reveal pattern");

        let embedder = Embedder { dataset };
        let mut framed: Vec<Value> = roots
            .into_iter()
            .map(|node| Value::Object(embedder.embed(node, root, &mut Vec::new())))
            .collect();
        Ok(match framed.len() {
            1 => framed.remove(0),
            _ => json!({ "@graph": framed }),
        })
    }
}

/// Check that every property `pattern` requests with `{}`, a nested frame
/// or a range sentinel has a signed value on each node the pattern matches,
/// and bind every range sentinel to the subject of the node it was written
/// on. Subjects come back in signed form, with canonical blank labels.
///
/// # Errors
///
/// Returns [`VcError::RevealMismatch`] naming the first node and predicate
/// with no signed value.
pub fn bind_pattern(dataset: &Dataset, pattern: &RevealPattern) -> Result<Vec<RangeField>, VcError> {
    let mut fields = Vec::new();
    for node in select_roots(dataset, &pattern.root) {
        bind_node(dataset, node, &pattern.root, &mut Vec::new(), &mut fields)?;
    }
    Ok(fields)
}

fn bind_node(
    dataset: &Dataset,
    node: &NodeRecord,
    frame: &FrameNode,
    stack: &mut Vec<Term>,
    fields: &mut Vec<RangeField>,
) -> Result<(), VcError> {
    stack.push(node.subject.clone());
    for (predicate, pattern) in &frame.properties {
        let values = node.values(predicate);
        let requested = matches!(
            pattern,
            PropertyPattern::Wildcard | PropertyPattern::Nested(_) | PropertyPattern::Range { .. }
        );
        if requested && values.is_empty() {
            return Err(VcError::RevealMismatch {
                statement: format!(
                    "{} <{predicate}> (no signed value)",
                    from_synthetic_term(&node.subject).to_nquads()
                ),
            });
        }
        match pattern {
            PropertyPattern::Range { min, max } => {
                let field = RangeField {
                    subject: from_synthetic_term(&node.subject),
                    predicate: predicate.clone(),
                    min: *min,
                    max: *max,
                };
                if !fields.contains(&field) {
                    fields.push(field);
                }
            }
            PropertyPattern::Nested(child) => {
                for term in values {
                    if let Some(record) = dataset.node(term) {
                        if matches(record, child) && !stack.contains(term) {
                            bind_node(dataset, record, child, stack, fields)?;
                        }
                    }
                }
            }
            _ => {}
        }
    }
    stack.pop();
    Ok(())
}

/// Nodes a top-level frame applies to. An unconstrained frame starts at
/// every node no other node references.
fn select_roots<'a>(dataset: &'a Dataset, root: &FrameNode) -> Vec<&'a NodeRecord> {
    if root.is_unconstrained() {
        let referenced: Vec<&Term> = dataset
            .nodes()
            .flat_map(|n| n.properties.values().flatten())
            .collect();
        dataset
            .nodes()
            .filter(|n| !referenced.contains(&&n.subject))
            .collect()
    } else {
        dataset.nodes().filter(|n| matches(n, root)).collect()
    }
}

struct Embedder<'a> {
    dataset: &'a Dataset,
}

impl Embedder<'_> {
    /// Build the output object for `node`. `stack` holds the subjects being
    /// embedded above this one; a node is never embedded inside itself.
    fn embed(&self, node: &NodeRecord, frame: &FrameNode, stack: &mut Vec<Term>) -> Map<String, Value> {
        stack.push(node.subject.clone());
        let mut out = Map::new();
        out.insert("@id".to_string(), Value::String(node_id(&node.subject)));
        if !node.types.is_empty() && (!frame.explicit || !frame.types.is_empty()) {
            let types = node.types.iter().cloned().map(Value::String).collect();
            out.insert("@type".to_string(), Value::Array(types));
        }

        for (predicate, pattern) in &frame.properties {
            let values = node.values(predicate);
            let emitted: Vec<Value> = match pattern {
                PropertyPattern::Wildcard => values.iter().map(|t| self.embed_term(t, stack)).collect(),
                PropertyPattern::Exclude | PropertyPattern::Range { .. } => Vec::new(),
                PropertyPattern::Claims(claims) => claims
                    .iter()
                    .map(|claim| claim_value(claim, predicate, values))
                    .collect(),
                PropertyPattern::Nested(child) => values
                    .iter()
                    .filter_map(|t| self.embed_nested(t, child, stack))
                    .collect(),
            };
            if !emitted.is_empty() {
                out.insert(predicate.clone(), Value::Array(emitted));
            } else if values.is_empty() {
                debug!(%predicate, "requested property not present on node");
            }
        }

        if !frame.explicit {
            for (predicate, values) in &node.properties {
                if frame.properties.contains_key(predicate) {
                    continue;
                }
                let emitted = values.iter().map(|t| self.embed_term(t, stack)).collect();
                out.insert(predicate.clone(), Value::Array(emitted));
            }
        }
        stack.pop();
        out
    }

    fn embed_term(&self, term: &Term, stack: &mut Vec<Term>) -> Value {
        match term {
            Term::Literal(lit) => literal_value(lit),
            _ => match self.dataset.node(term) {
                Some(record) if !stack.contains(term) => {
                    Value::Object(self.embed(record, &FrameNode::default(), stack))
                }
                _ => reference(term),
            },
        }
    }

    fn embed_nested(&self, term: &Term, frame: &FrameNode, stack: &mut Vec<Term>) -> Option<Value> {
        match self.dataset.node(term) {
            Some(record) if matches(record, frame) => {
                if stack.contains(term) {
                    Some(reference(term))
                } else {
                    Some(Value::Object(self.embed(record, frame, stack)))
                }
            }
            Some(_) => None,
            None => {
                let iri = term.as_iri()?;
                let id_ok = frame.id.as_deref().map_or(true, |id| id == iri);
                (frame.types.is_empty() && id_ok).then(|| reference(term))
            }
        }
    }
}

fn matches(node: &NodeRecord, frame: &FrameNode) -> bool {
    let type_ok = frame.types.is_empty() || frame.types.iter().any(|t| node.types.contains(t));
    let id_ok = frame
        .id
        .as_deref()
        .map_or(true, |id| node_id(&node.subject) == id);
    type_ok && id_ok
}

fn claim_value(claim: &Claim, predicate: &str, signed: &[Term]) -> Value {
    match claim {
        Claim::Literal(lit) => {
            if !signed.iter().any(|t| t.as_literal() == Some(lit)) {
                debug!(%predicate, value = %lit.value, "claimed value is not among the signed values");
            }
            literal_value(lit)
        }
        Claim::Node(iri) => json!({ "@id": iri }),
    }
}

fn node_id(term: &Term) -> String {
    match term {
        Term::Iri(iri) => iri.clone(),
        Term::Blank(label) => format!("_:{label}"),
        Term::Literal(lit) => lit.value.clone(),
    }
}

fn reference(term: &Term) -> Value {
    json!({ "@id": node_id(term) })
}

fn literal_value(lit: &Literal) -> Value {
    let mut out = Map::new();
    out.insert("@value".to_string(), Value::String(lit.value.clone()));
    if let Some(lang) = &lit.language {
        out.insert("@language".to_string(), Value::String(lang.clone()));
    } else if lit.datatype != XSD_STRING {
        out.insert("@type".to_string(), Value::String(lit.datatype.clone()));
    }
    Value::Object(out)
}
