//! # Message Assembly
//!
//! Every message handed to the proof engine is the statement (or injected
//! integer) text prefixed with a single zero byte. Signing, proof creation,
//! and verification must all assemble messages through this module or
//! proofs will not verify.

use sdvc_core::Statement;

/// The byte prepended to every message.
pub const MESSAGE_PREFIX: u8 = 0x00;

/// Prefix one message.
pub fn prefix_message(text: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(text.len() + 1);
    message.push(MESSAGE_PREFIX);
    message.extend_from_slice(text);
    message
}

/// Assemble the engine message list: statements in order, then injected
/// integer messages in order.
pub fn assemble(statements: &[Statement], injected: &[String]) -> Vec<Vec<u8>> {
    statements
        .iter()
        .map(|s| prefix_message(s.as_bytes()))
        .chain(injected.iter().map(|v| prefix_message(v.as_bytes())))
        .collect()
}
