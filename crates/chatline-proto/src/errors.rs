//! Protocol errors.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// Frame is valid JSON but not an object.
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// Frame has no `type` discriminator.
    #[error("frame has no type")]
    MissingType,

    /// Frame declares a type this client does not understand.
    #[error("unknown frame type: {0}")]
    UnknownType(String),

    /// A required field is absent or null.
    #[error("{frame} frame is missing required field `{field}`")]
    MissingField {
        /// Declared frame type
        frame: &'static str,
        /// Name of the missing field
        field: &'static str,
    },

    /// A field is present but has the wrong JSON type.
    #[error("{frame} frame has invalid field `{field}`: expected {expected}")]
    InvalidField {
        /// Declared frame type
        frame: &'static str,
        /// Name of the offending field
        field: &'static str,
        /// Description of the expected value
        expected: &'static str,
    },

    /// Timestamp could not be parsed as ISO 8601.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Outbound message text is empty after trimming.
    #[error("message is empty")]
    EmptyMessage,

    /// Outbound frame could not be serialized.
    #[error("encode failed: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidJson(err.to_string())
    }
}
