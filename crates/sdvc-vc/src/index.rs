//! # Index Mapper
//!
//! Maps the statements a reveal pattern produced back onto positions in the
//! signed statement list.
//!
//! ## Security Invariant
//!
//! Every revealed statement must be found among the signed document
//! statements. A statement that is not found means the pattern asked for
//! data that was never signed, and derivation aborts with
//! [`VcError::RevealMismatch`] rather than emitting a proof that silently
//! reveals less than requested.
//!
//! The proof segment `[0, p)` is always revealed, in order, ahead of the
//! document indices. Document indices keep the order in which the revealed
//! statements were produced; they are not re-sorted.

use std::collections::HashMap;

use sdvc_core::Statement;

use crate::error::VcError;

/// Compute the revealed index list `[0..p) ++ (position + p)`.
///
/// `document` is the transformed document statement list the reveal
/// statements were framed from.
///
/// # Errors
///
/// Returns [`VcError::RevealMismatch`] naming the first revealed statement
/// that is not in `document`.
pub fn map_reveal_indices(
    proof_count: usize,
    document: &[Statement],
    revealed: &[Statement],
) -> Result<Vec<u32>, VcError> {
    let mut positions: HashMap<&Statement, usize> = HashMap::with_capacity(document.len());
    for (i, statement) in document.iter().enumerate() {
        positions.entry(statement).or_insert(i);
    }

    let mut indices = Vec::with_capacity(proof_count + revealed.len());
    for i in 0..proof_count {
        indices.push(to_index(i)?);
    }
    for statement in revealed {
        let position = positions.get(statement).ok_or_else(|| VcError::RevealMismatch {
            statement: statement.to_string(),
        })?;
        indices.push(to_index(position + proof_count)?);
    }
    Ok(indices)
}

fn to_index(i: usize) -> Result<u32, VcError> {
    u32::try_from(i).map_err(|_| VcError::InvalidDocument(format!("statement index {i} exceeds u32")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmts(objects: &[&str]) -> Vec<Statement> {
        objects
            .iter()
            .map(|o| Statement::parse(&format!("<urn:s> <urn:p> \"{o}\" .")).unwrap())
            .collect()
    }

    #[test]
    fn scenario_indices() {
        let document = stmts(&["a", "b", "c", "d"]);
        let revealed = stmts(&["c"]);
        assert_eq!(map_reveal_indices(3, &document, &revealed).unwrap(), vec![0, 1, 2, 5]);
    }

    #[test]
    fn document_order_follows_reveal_order() {
        let document = stmts(&["a", "b", "c"]);
        let revealed = stmts(&["c", "a"]);
        assert_eq!(map_reveal_indices(1, &document, &revealed).unwrap(), vec![0, 3, 1]);
    }

    #[test]
    fn nothing_revealed_keeps_proof_segment() {
        let document = stmts(&["a"]);
        assert_eq!(map_reveal_indices(2, &document, &[]).unwrap(), vec![0, 1]);
    }

    #[test]
    fn unknown_statement_is_mismatch() {
        let document = stmts(&["a", "b"]);
        let revealed = stmts(&["a", "zzz"]);
        let err = map_reveal_indices(3, &document, &revealed).unwrap_err();
        match err {
            VcError::RevealMismatch { statement } => assert!(statement.contains("zzz")),
            other => panic!("expected RevealMismatch, got {other:?}"),
        }
    }
}
