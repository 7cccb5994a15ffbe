//! Error types for document store operations.
//!
//! Covers backend failures, codec failures tied to the key being read or
//! written, and I/O and parsing failures of configuration and fixtures.

use record_codec_core::{DecodeError, EncodingError};
use thiserror::Error;

/// Errors raised around a document store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The storage backend failed.
    #[error("store backend error: {0}")]
    Backend(String),

    /// A stored document did not decode.
    #[error("document `{key}` failed to decode: {source}")]
    Decode {
        /// Key of the offending document.
        key: String,
        /// The codec's error, unchanged.
        source: DecodeError,
    },

    /// A domain value could not be encoded for storage.
    #[error("document `{key}` failed to encode: {source}")]
    Encode {
        /// Key the value was being written under.
        key: String,
        /// The codec's error, unchanged.
        source: EncodingError,
    },

    /// A key was empty or otherwise unusable.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl PersistenceError {
    /// The decode error behind this failure, if any.
    pub fn decode_error(&self) -> Option<&DecodeError> {
        match self {
            PersistenceError::Decode { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience alias for results with [`PersistenceError`].
pub type Result<T> = std::result::Result<T, PersistenceError>;
