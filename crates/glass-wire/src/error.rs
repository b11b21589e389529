//! Error types for request framing and payload decoding.

use glass_types::TimestampError;

/// The connection ended, or grew too large, before a request was framed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    /// The peer closed the connection before a full request arrived.
    #[error("connection closed with an incomplete request ({buffered} bytes buffered)")]
    ConnectionClosed {
        /// Bytes received before the close.
        buffered: usize,
    },

    /// The buffered request exceeded the size cap.
    #[error("request exceeds {limit} bytes")]
    TooLarge {
        /// The cap that was exceeded.
        limit: usize,
    },
}

/// The request body could not be turned into an event.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The body is not valid UTF-8.
    #[error("body is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The body is not well-formed JSON.
    #[error("body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The JSON value is not an object.
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// A required field is absent.
    #[error("payload is missing field `{0}`")]
    MissingField(&'static str),

    /// A required field is present but not a string.
    #[error("payload field `{0}` is not a string")]
    FieldNotString(&'static str),

    /// The timestamp matched no accepted format.
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
}
