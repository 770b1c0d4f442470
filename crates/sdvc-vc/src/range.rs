//! # Range Extractor
//!
//! Decides which signed integer literals are proven in range instead of
//! revealed, and where their plaintext messages sit in the engine message
//! list.
//!
//! ## How It Works
//!
//! 1. The holder writes `range-<min>-<max>` in place of a field's value in
//!    the reveal pattern. Each sentinel becomes a [`RangeField`] for every
//!    signed node the enclosing frame matched, keyed by that node's subject
//!    and the field's predicate IRI.
//! 2. Every signed statement whose object is an `xsd:int` or `xsd:integer`
//!    literal with a canonical base-10 lexical form is an integer candidate.
//!    Its lexical value is appended to the message list after all
//!    statements. Signing appends the same messages, so the base signature
//!    covers them.
//! 3. A document candidate whose subject and predicate equal a range field's
//!    gets a [`RangeTriple`] pointing at its appended message.
//! 4. A range field that binds no candidate fails the derivation: the holder
//!    asked for a range proof the signed data cannot back.
//!
//! Predicates are compared exactly. A field named `age` never matches a
//! predicate ending in `ageGroup`, and a bound on the subject's `age` never
//! constrains an `age` elsewhere in the graph.

use sdvc_core::statement::{XSD_INT, XSD_INTEGER};
use sdvc_core::{Statement, Term};
use sdvc_zkp::RangeTriple;

use crate::error::VcError;

/// Prefix marking a range sentinel in a reveal pattern.
pub const RANGE_SENTINEL_PREFIX: &str = "range-";

/// A field to prove in range rather than reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeField {
    /// Subject of the node carrying the field, as it appears in the signed
    /// statements.
    pub subject: Term,
    /// Predicate IRI of the field.
    pub predicate: String,
    /// Lower bound (inclusive).
    pub min: u32,
    /// Upper bound (inclusive).
    pub max: u32,
}

impl RangeField {
    /// The local part of the predicate IRI, for logs.
    pub fn field_name(&self) -> &str {
        self.predicate
            .rsplit(['#', '/', ':'])
            .next()
            .unwrap_or(&self.predicate)
    }

    /// The sentinel this field was written as.
    pub fn sentinel(&self) -> String {
        format!("{RANGE_SENTINEL_PREFIX}{}-{}", self.min, self.max)
    }

    fn binds(&self, candidate: &IntegerCandidate) -> bool {
        self.subject == candidate.subject && self.predicate == candidate.predicate
    }
}

/// Parse a `range-<min>-<max>` sentinel.
///
/// Returns `Ok(None)` for values that are not sentinels.
///
/// # Errors
///
/// Returns [`VcError::InvalidRangeSentinel`] if the value has the sentinel
/// prefix but its bounds are missing, not `u32`, or inverted.
pub fn parse_range_sentinel(value: &str) -> Result<Option<(u32, u32)>, VcError> {
    let Some(bounds) = value.strip_prefix(RANGE_SENTINEL_PREFIX) else {
        return Ok(None);
    };
    let invalid = |reason: &str| VcError::InvalidRangeSentinel {
        value: value.to_string(),
        reason: reason.to_string(),
    };
    let (min, max) = bounds
        .split_once('-')
        .ok_or_else(|| invalid("expected range-<min>-<max>"))?;
    let min: u32 = min
        .parse()
        .map_err(|_| invalid("min is not an unsigned 32-bit integer"))?;
    let max: u32 = max
        .parse()
        .map_err(|_| invalid("max is not an unsigned 32-bit integer"))?;
    if min > max {
        return Err(invalid("min exceeds max"));
    }
    Ok(Some((min, max)))
}

/// A signed statement whose object is a canonical integer literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerCandidate {
    /// Position in the signed statement list.
    pub statement_index: usize,
    /// Subject of the statement.
    pub subject: Term,
    /// Predicate IRI of the statement.
    pub predicate: String,
    /// Lexical form of the integer.
    pub value: String,
}

/// Find every integer candidate, in statement order.
///
/// # Errors
///
/// Propagates statement parse failures.
pub fn integer_candidates(statements: &[Statement]) -> Result<Vec<IntegerCandidate>, VcError> {
    let mut candidates = Vec::new();
    for (statement_index, statement) in statements.iter().enumerate() {
        let quad = statement.to_quad()?;
        let Term::Literal(literal) = &quad.object else {
            continue;
        };
        if literal.datatype != XSD_INT && literal.datatype != XSD_INTEGER {
            continue;
        }
        if !is_canonical_integer(&literal.value) {
            continue;
        }
        candidates.push(IntegerCandidate {
            statement_index,
            subject: quad.subject,
            predicate: quad.predicate,
            value: literal.value.clone(),
        });
    }
    Ok(candidates)
}

fn is_canonical_integer(lexical: &str) -> bool {
    lexical
        .parse::<i64>()
        .is_ok_and(|n| n.to_string() == lexical)
}

/// Injected integer messages and the triples that constrain them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeExtraction {
    /// Plaintext integer messages, appended after the statements.
    pub injected: Vec<String>,
    /// Range constraints, in injected-message order.
    pub triples: Vec<RangeTriple>,
}

/// Compute injected messages and range triples over the full signed
/// statement list (proof segment followed by document segment). Range
/// fields only bind candidates at or after `document_start`.
///
/// # Errors
///
/// Propagates statement parse failures, fails if a message index does not
/// fit in 32 bits, and returns [`VcError::InvalidRangeSentinel`] for a range
/// field with no signed integer value on its subject.
pub fn extract_ranges(
    statements: &[Statement],
    document_start: usize,
    fields: &[RangeField],
) -> Result<RangeExtraction, VcError> {
    let mut extraction = RangeExtraction::default();
    let mut bound = vec![false; fields.len()];
    for candidate in integer_candidates(statements)? {
        let position = statements.len() + extraction.injected.len();
        if candidate.statement_index >= document_start {
            for (field, hit) in fields.iter().zip(bound.iter_mut()) {
                if !field.binds(&candidate) {
                    continue;
                }
                let message_index = u32::try_from(position).map_err(|_| {
                    VcError::InvalidDocument(format!("message index {position} exceeds u32"))
                })?;
                tracing::debug!(
                    field = field.field_name(),
                    message_index,
                    min = field.min,
                    max = field.max,
                    "range-bound integer message"
                );
                extraction
                    .triples
                    .push(RangeTriple::new(message_index, field.min, field.max));
                *hit = true;
            }
        }
        extraction.injected.push(candidate.value);
    }

    if let Some((field, _)) = fields.iter().zip(&bound).find(|(_, hit)| !**hit) {
        return Err(VcError::InvalidRangeSentinel {
            value: field.sentinel(),
            reason: format!(
                "{} of {} is not a signed integer",
                field.field_name(),
                field.subject.to_nquads()
            ),
        });
    }
    Ok(extraction)
}
