//! Suite configuration.
//!
//! Defaults suit production use. Override via environment variables or
//! explicit construction for tests.

use std::time::Duration;

use crate::metadata::MetadataFormat;

/// Shortest nonce the configuration accepts, in bytes.
pub const MIN_NONCE_LEN: usize = 16;

/// Tunables shared by the signature suite, the proof suite, and the async
/// service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteConfig {
    /// Bound on one proof-engine call made through [`ProofService`](crate::ProofService).
    pub engine_timeout: Duration,
    /// Length of generated nonces.
    pub nonce_len: usize,
    /// Layout emitted by the metadata encoder. Decoding accepts every layout.
    pub metadata_format: MetadataFormat,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            engine_timeout: Duration::from_secs(30),
            nonce_len: sdvc_zkp::DEFAULT_NONCE_LEN,
            metadata_format: MetadataFormat::Versioned,
        }
    }
}

impl SuiteConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `SDVC_ENGINE_TIMEOUT_SECS` (default: 30)
    /// - `SDVC_NONCE_BYTES` (default: 50, minimum 16)
    /// - `SDVC_METADATA_FORMAT` = `versioned` | `legacy` (default: `versioned`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let engine_timeout = std::env::var("SDVC_ENGINE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.engine_timeout);

        let nonce_len = match std::env::var("SDVC_NONCE_BYTES") {
            Ok(raw) => raw
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue("SDVC_NONCE_BYTES".to_string(), raw.clone()))?,
            Err(_) => defaults.nonce_len,
        };
        if nonce_len < MIN_NONCE_LEN {
            return Err(ConfigError::NonceTooShort(nonce_len));
        }

        let metadata_format = match std::env::var("SDVC_METADATA_FORMAT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SDVC_METADATA_FORMAT".to_string(), raw.clone()))?,
            Err(_) => defaults.metadata_format,
        };

        Ok(Self {
            engine_timeout,
            nonce_len,
            metadata_format,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
    #[error("nonce length {0} is below the minimum of {MIN_NONCE_LEN} bytes")]
    NonceTooShort(usize),
}
