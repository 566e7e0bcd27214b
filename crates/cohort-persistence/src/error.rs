//! Error types for client state handling

use cohort_experiment::SelectionError;

/// Errors encoding or decoding the state blob
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Token is not a flat JSON object of strings
    #[error("malformed state token: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Blob could not be serialized
    #[error("cannot encode state token: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Errors raised by a token transport
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Rendered token exceeds the transport ceiling
    #[error("token too long: {len} bytes exceeds limit of {limit}")]
    TooLong {
        /// Rendered length including framing
        len: usize,
        /// Configured ceiling
        limit: usize,
    },

    /// Token name is not usable as a cookie name
    #[error("invalid token name {name:?}: must be a non-empty RFC 6265 token")]
    InvalidName {
        /// Rejected name
        name: String,
    },

    /// Percent-escape sequence could not be decoded
    #[error("invalid escape sequence in token at byte {position}")]
    InvalidEscape {
        /// Byte offset of the bad sequence
        position: usize,
    },

    /// Unescaped token is not UTF-8
    #[error("token is not valid utf-8 after unescaping")]
    InvalidUtf8,

    /// Transport-specific failure
    #[error("token transport error: {0}")]
    Backend(String),
}

/// Errors raised by a start or finish transition
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Token could not be decoded or encoded
    #[error("state codec failed: {0}")]
    Codec(#[from] CodecError),

    /// Token could not be read or written
    #[error("token transport failed: {0}")]
    Transport(#[from] TransportError),

    /// No alternative could be drawn
    #[error("selection failed: {0}")]
    Selection(#[from] SelectionError),
}
