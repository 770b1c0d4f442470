//! # Blank-Node Transform
//!
//! Canonical blank node labels (`_:c14nN`) are only stable within one
//! canonicalization run. Before document statements are re-materialized and
//! framed, every canonical blank node is rewritten to a synthetic IRI
//! `<urn:bnid:_:c14nN>`, which survives re-canonicalization verbatim. The
//! verifier applies the inverse to recover the labels that were signed.
//!
//! Both directions are term-level rewrites: every occurrence of a label in a
//! statement is rewritten identically, statement order and count are
//! preserved, and literal content is never touched.

use crate::canonical::CANONICAL_BLANK_PREFIX;
use crate::error::CanonicalizationError;
use crate::statement::{Quad, Statement, Term};

/// Prefix of synthetic blank node IRIs.
pub const BNID_PREFIX: &str = "urn:bnid:";

/// Rewrite `_:c14nN` blank nodes to `<urn:bnid:_:c14nN>`.
pub fn to_synthetic_iris(statements: &[Statement]) -> Result<Vec<Statement>, CanonicalizationError> {
    statements.iter().map(|s| rewrite(s, to_synthetic_term)).collect()
}

/// Rewrite `<urn:bnid:_:c14nN>` back to `_:c14nN`.
pub fn from_synthetic_iris(statements: &[Statement]) -> Result<Vec<Statement>, CanonicalizationError> {
    statements.iter().map(|s| rewrite(s, from_synthetic_term)).collect()
}

/// Returns true if `label` (without `_:`) is a canonical label.
pub fn is_canonical_label(label: &str) -> bool {
    label
        .strip_prefix(CANONICAL_BLANK_PREFIX)
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Term-level form of [`to_synthetic_iris`].
pub fn to_synthetic_term(term: &Term) -> Term {
    match term {
        Term::Blank(label) if is_canonical_label(label) => Term::Iri(format!("{BNID_PREFIX}_:{label}")),
        other => other.clone(),
    }
}

/// Term-level form of [`from_synthetic_iris`].
pub fn from_synthetic_term(term: &Term) -> Term {
    match term {
        Term::Iri(iri) => match iri.strip_prefix(BNID_PREFIX).and_then(|rest| rest.strip_prefix("_:")) {
            Some(label) if is_canonical_label(label) => Term::Blank(label.to_string()),
            _ => term.clone(),
        },
        other => other.clone(),
    }
}

fn rewrite(statement: &Statement, f: fn(&Term) -> Term) -> Result<Statement, CanonicalizationError> {
    let quad = statement.to_quad()?;
    let rewritten = Quad {
        subject: f(&quad.subject),
        predicate: quad.predicate,
        object: f(&quad.object),
        graph: quad.graph.as_ref().map(f),
    };
    Ok(rewritten.to_statement())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(line: &str) -> Statement {
        Statement::parse(line).unwrap()
    }

    #[test]
    fn rewrites_subject_and_object_labels() {
        let input = vec![
            stmt("_:c14n0 <urn:p> _:c14n1 ."),
            stmt(r#"<urn:a> <urn:q> "_:c14n0" ."#),
        ];
        let out = to_synthetic_iris(&input).unwrap();
        assert_eq!(out[0].as_str(), "<urn:bnid:_:c14n0> <urn:p> <urn:bnid:_:c14n1> .");
        assert_eq!(out[1].as_str(), r#"<urn:a> <urn:q> "_:c14n0" ."#);
    }

    #[test]
    fn inverse_restores_labels() {
        let input = vec![
            stmt("_:c14n0 <urn:p> _:c14n12 ."),
            stmt(r#"_:c14n3 <urn:q> "v" ."#),
            stmt("<urn:a> <urn:r> <urn:b> ."),
        ];
        let there = to_synthetic_iris(&input).unwrap();
        let back = from_synthetic_iris(&there).unwrap();
        assert_eq!(back, input);
    }

    #[test]
    fn term_helpers_match_statement_rewrite() {
        let blank = Term::Blank("c14n4".to_string());
        let synthetic = to_synthetic_term(&blank);
        assert_eq!(synthetic, Term::Iri("urn:bnid:_:c14n4".to_string()));
        assert_eq!(from_synthetic_term(&synthetic), blank);
        let iri = Term::Iri("did:example:alice".to_string());
        assert_eq!(to_synthetic_term(&iri), iri);
    }

    #[test]
    fn non_canonical_labels_are_left_alone() {
        let input = vec![stmt("_:b0 <urn:p> _:c14nx .")];
        assert_eq!(to_synthetic_iris(&input).unwrap(), input);
    }

    #[test]
    fn unrelated_iris_survive_inverse() {
        let input = vec![stmt("<urn:bnid:other> <urn:p> <urn:bnid:_:b1> .")];
        assert_eq!(from_synthetic_iris(&input).unwrap(), input);
    }

    #[test]
    fn order_and_count_preserved() {
        let input: Vec<Statement> = (0..5)
            .map(|i| stmt(&format!(r#"_:c14n{i} <urn:p> "{i}" ."#)))
            .collect();
        let out = to_synthetic_iris(&input).unwrap();
        assert_eq!(out.len(), input.len());
        for (i, s) in out.iter().enumerate() {
            assert!(s.as_str().starts_with(&format!("<urn:bnid:_:c14n{i}>")));
        }
    }
}
