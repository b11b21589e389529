//! Error types shared across the workspace.

/// Returned when a timestamp string matches none of the accepted formats.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised timestamp format: {raw:?}")]
pub struct TimestampError {
    /// The string that failed to resolve.
    pub raw: String,
}
