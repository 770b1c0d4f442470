//! # Reveal Patterns
//!
//! A reveal pattern is a JSON-LD frame written by the holder. It is expanded
//! with the same context processing as the credential, so every property is
//! keyed by its predicate IRI, and then read into a [`FrameNode`] tree.
//!
//! Property values in a pattern mean:
//!
//! | Pattern value            | Meaning                                        |
//! |--------------------------|------------------------------------------------|
//! | `{}`                     | reveal every value (embedding nested nodes)    |
//! | `[]`                     | reveal nothing                                 |
//! | `"range-18-60"`          | prove the integer lies in `[18, 60]`, withhold it |
//! | `{ "type": ..., ... }`   | nested frame applied to the referenced node    |
//! | any other literal or IRI | claim: reveal the matching signed value        |
//!
//! `@explicit: true` restricts the output to the properties the pattern
//! names. A key with no IRI mapping is an error rather than being dropped.

use std::collections::BTreeMap;

use sdvc_core::expand::expand_strict;
use sdvc_core::{literal_from_value_object, CanonicalizationError, DocumentResolver, Literal};
use serde_json::{Map, Value};

use crate::error::VcError;
use crate::range::parse_range_sentinel;

/// One node of an expanded reveal pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameNode {
    /// Required types: a node matches if it has any of them.
    pub types: Vec<String>,
    /// Required node identifier.
    pub id: Option<String>,
    /// Only output the properties named here.
    pub explicit: bool,
    /// Predicate IRI → what to reveal.
    pub properties: BTreeMap<String, PropertyPattern>,
}

/// What to reveal for one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyPattern {
    /// Every value.
    Wildcard,
    /// No values.
    Exclude,
    /// Only the listed values.
    Claims(Vec<Claim>),
    /// Withhold the value and prove it lies in `[min, max]`.
    Range {
        /// Lower bound (inclusive).
        min: u32,
        /// Upper bound (inclusive).
        max: u32,
    },
    /// Referenced nodes matching the nested frame.
    Nested(FrameNode),
}

/// A value the holder claims was signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// A literal value.
    Literal(Literal),
    /// A node reference.
    Node(String),
}

impl FrameNode {
    /// Returns true if the frame constrains neither type nor id.
    pub fn is_unconstrained(&self) -> bool {
        self.types.is_empty() && self.id.is_none()
    }
}

/// An expanded reveal pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealPattern {
    /// The top-level frame.
    pub root: FrameNode,
}

impl RevealPattern {
    /// Expand a reveal document and read its frame tree.
    ///
    /// # Errors
    ///
    /// Returns `RevealMismatch` for a key with no IRI mapping, since no
    /// signed statement can carry it. Returns `Canonicalization` if
    /// expansion otherwise fails, `InvalidDocument` if the pattern does not
    /// expand to exactly one frame, and `InvalidRangeSentinel` for malformed
    /// sentinels.
    pub fn from_document(
        reveal_document: &Value,
        resolver: &dyn DocumentResolver,
    ) -> Result<Self, VcError> {
        let expanded = expand_strict(reveal_document, resolver).map_err(|e| match e {
            CanonicalizationError::UnmappedTerm(term) => VcError::RevealMismatch {
                statement: format!("pattern term {term:?} maps to no signed predicate"),
            },
            other => other.into(),
        })?;
        let [Value::Object(root)] = expanded.as_slice() else {
            return Err(VcError::InvalidDocument(format!(
                "reveal pattern must expand to one frame, got {}",
                expanded.len()
            )));
        };
        Ok(Self {
            root: read_frame(root)?,
        })
    }
}

fn read_frame(node: &Map<String, Value>) -> Result<FrameNode, VcError> {
    let mut frame = FrameNode::default();
    for (key, value) in node {
        match key.as_str() {
            "@id" => {
                frame.id = Some(
                    value
                        .as_str()
                        .ok_or_else(|| VcError::InvalidDocument(format!("frame @id is not a string: {value}")))?
                        .to_string(),
                );
            }
            "@type" => {
                frame.types = as_array(value)
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect();
            }
            "@explicit" => frame.explicit = flag(value),
            k if k.starts_with('@') => {}
            predicate => {
                frame
                    .properties
                    .insert(predicate.to_string(), read_property(predicate, value)?);
            }
        }
    }
    Ok(frame)
}

fn read_property(predicate: &str, value: &Value) -> Result<PropertyPattern, VcError> {
    let items = as_array(value);
    if items.is_empty() {
        return Ok(PropertyPattern::Exclude);
    }

    let mut claims = Vec::new();
    for item in items {
        let Value::Object(obj) = item else {
            return Err(VcError::InvalidDocument(format!(
                "pattern value for {predicate} is not an object after expansion: {item}"
            )));
        };
        let single = match read_item(obj)? {
            Item::Claim(claim) => {
                claims.push(claim);
                continue;
            }
            Item::Pattern(pattern) => pattern,
        };
        if items.len() > 1 {
            return Err(VcError::InvalidDocument(format!(
                "pattern for {predicate} mixes a wildcard, range or nested frame with other values"
            )));
        }
        return Ok(single);
    }
    Ok(PropertyPattern::Claims(claims))
}

enum Item {
    Claim(Claim),
    Pattern(PropertyPattern),
}

fn read_item(obj: &Map<String, Value>) -> Result<Item, VcError> {
    if obj.is_empty() {
        return Ok(Item::Pattern(PropertyPattern::Wildcard));
    }
    if obj.contains_key("@value") {
        if let Some(Value::String(text)) = obj.get("@value") {
            if let Some((min, max)) = parse_range_sentinel(text)? {
                return Ok(Item::Pattern(PropertyPattern::Range { min, max }));
            }
        }
        let literal = literal_from_value_object(obj)?;
        return Ok(Item::Claim(Claim::Literal(literal)));
    }
    if let (1, Some(Value::String(id))) = (obj.len(), obj.get("@id")) {
        return Ok(Item::Claim(Claim::Node(id.clone())));
    }
    Ok(Item::Pattern(PropertyPattern::Nested(read_frame(obj)?)))
}

fn as_array(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        other => std::slice::from_ref(other),
    }
}

fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Array(items) => items.first().is_some_and(flag),
        Value::Object(obj) => obj.get("@value").is_some_and(flag),
        _ => false,
    }
}
