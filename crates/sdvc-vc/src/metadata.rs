//! # Proof Metadata Codec
//!
//! The verifier never sees the reveal pattern, so the derived proof carries
//! the revealed statement indices and the range triples in its `domain`
//! field. Layout, in little-endian 32-bit words, base64-encoded:
//!
//! ```text
//! [magic/version]? [revealCount] [rowCount] [revealed ...] [index min max]*
//! ```
//!
//! The leading magic/version word (`0x5344_0001`) is emitted by default.
//! Blobs without it (the legacy layout) are still decoded.
//!
//! ## Security Invariant
//!
//! The blob is untrusted. Decoding checks that the word count equals
//! `2 + revealCount + 3 * rowCount` before slicing anything.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sdvc_zkp::RangeTriple;

use crate::error::VcError;

/// Magic/version word of the versioned layout.
pub const METADATA_MAGIC: u32 = 0x5344_0001;

const MAGIC_MASK: u32 = 0xFFFF_0000;
const MAGIC_TAG: u32 = METADATA_MAGIC & MAGIC_MASK;
const FORMAT_VERSION: u32 = METADATA_MAGIC & !MAGIC_MASK;

/// Which layout the encoder emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataFormat {
    /// Leading magic/version word, then the payload.
    #[default]
    Versioned,
    /// Payload only.
    Legacy,
}

impl fmt::Display for MetadataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataFormat::Versioned => write!(f, "versioned"),
            MetadataFormat::Legacy => write!(f, "legacy"),
        }
    }
}

impl FromStr for MetadataFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "versioned" => Ok(MetadataFormat::Versioned),
            "legacy" => Ok(MetadataFormat::Legacy),
            other => Err(format!("unknown metadata format: {other}")),
        }
    }
}

/// Revealed statement indices and range triples of one derived proof.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProofMetadata {
    /// Indices into the combined statement list, proof segment first.
    pub revealed: Vec<u32>,
    /// Range constraints on injected integer messages.
    pub ranges: Vec<RangeTriple>,
}

impl ProofMetadata {
    /// Bundle indices and triples.
    pub fn new(revealed: Vec<u32>, ranges: Vec<RangeTriple>) -> Self {
        Self { revealed, ranges }
    }

    /// The payload words: `[revealCount, rowCount, revealed..., triples...]`.
    pub fn to_words(&self) -> Result<Vec<u32>, VcError> {
        let reveal_count = u32::try_from(self.revealed.len())
            .map_err(|_| corrupt("too many revealed indices"))?;
        let row_count =
            u32::try_from(self.ranges.len()).map_err(|_| corrupt("too many range triples"))?;
        let mut words = Vec::with_capacity(2 + self.revealed.len() + 3 * self.ranges.len());
        words.push(reveal_count);
        words.push(row_count);
        words.extend_from_slice(&self.revealed);
        for triple in &self.ranges {
            words.extend_from_slice(&triple.to_words());
        }
        Ok(words)
    }

    /// Parse payload words.
    ///
    /// # Errors
    ///
    /// Returns [`VcError::MetadataCorrupt`] if the header counts disagree
    /// with the number of words.
    pub fn from_words(words: &[u32]) -> Result<Self, VcError> {
        let [reveal_count, row_count, body @ ..] = words else {
            return Err(corrupt("fewer than two header words"));
        };
        let expected = 2 + u64::from(*reveal_count) + 3 * u64::from(*row_count);
        if words.len() as u64 != expected {
            return Err(corrupt(format!(
                "header declares {expected} words but blob holds {}",
                words.len()
            )));
        }
        let (revealed, triples) = body.split_at(*reveal_count as usize);
        let ranges = triples
            .chunks_exact(3)
            .map(|row| RangeTriple::new(row[0], row[1], row[2]))
            .collect();
        Ok(Self {
            revealed: revealed.to_vec(),
            ranges,
        })
    }

    /// Encode for transport.
    pub fn encode(&self, format: MetadataFormat) -> Result<String, VcError> {
        let mut words = Vec::new();
        if format == MetadataFormat::Versioned {
            words.push(METADATA_MAGIC);
        }
        words.extend(self.to_words()?);
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        Ok(BASE64.encode(bytes))
    }

    /// Decode a transport blob in either layout.
    ///
    /// # Errors
    ///
    /// Returns [`VcError::MetadataCorrupt`] for invalid base64, a byte
    /// length that is not a whole number of words, an unknown format
    /// version, or inconsistent counts.
    pub fn decode(encoded: &str) -> Result<Self, VcError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| corrupt(format!("not base64: {e}")))?;
        if bytes.len() % 4 != 0 {
            return Err(corrupt(format!(
                "{} bytes is not a whole number of 32-bit words",
                bytes.len()
            )));
        }
        let words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        match words.split_first() {
            Some((&head, payload)) if head & MAGIC_MASK == MAGIC_TAG => {
                let version = head & !MAGIC_MASK;
                if version != FORMAT_VERSION {
                    return Err(corrupt(format!("unsupported format version {version}")));
                }
                Self::from_words(payload)
            }
            _ => Self::from_words(&words),
        }
    }
}

fn corrupt(reason: impl Into<String>) -> VcError {
    VcError::MetadataCorrupt(reason.into())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn triple() -> impl Strategy<Value = RangeTriple> {
        (any::<u32>(), any::<u32>(), any::<u32>()).prop_map(|(i, a, b)| RangeTriple::new(i, a, b))
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(
            revealed in proptest::collection::vec(any::<u32>(), 0..64),
            ranges in proptest::collection::vec(triple(), 0..8),
            legacy in any::<bool>(),
        ) {
            let format = if legacy { MetadataFormat::Legacy } else { MetadataFormat::Versioned };
            let meta = ProofMetadata::new(revealed, ranges);
            let encoded = meta.encode(format).unwrap();
            prop_assert_eq!(ProofMetadata::decode(&encoded).unwrap(), meta);
        }

        #[test]
        fn word_count_invariant_holds(
            revealed in proptest::collection::vec(any::<u32>(), 0..32),
            ranges in proptest::collection::vec(triple(), 0..8),
        ) {
            let meta = ProofMetadata::new(revealed, ranges);
            let words = meta.to_words().unwrap();
            prop_assert_eq!(words.len(), 2 + meta.revealed.len() + 3 * meta.ranges.len());
        }

        #[test]
        fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..96)) {
            let _ = ProofMetadata::decode(&BASE64.encode(bytes));
        }
    }
}
