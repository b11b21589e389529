//! The notification event record.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{resolve_timestamp, TimestampError};

/// One decoded notification.
///
/// An `Event` can only be built through [`Event::new`], which resolves the
/// payload timestamp first, so `received_at` is always a valid instant.
/// Fields are read-only after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    id: Uuid,
    content: String,
    timestamp_raw: String,
    received_at: DateTime<Utc>,
}

impl Event {
    /// Builds an event from payload fields, assigning a fresh identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError`] if `timestamp_raw` matches neither
    /// accepted format; no event is produced in that case.
    pub fn new(
        content: impl Into<String>,
        timestamp_raw: impl Into<String>,
    ) -> Result<Self, TimestampError> {
        let timestamp_raw = timestamp_raw.into();
        let received_at = resolve_timestamp(&timestamp_raw)?;
        Ok(Self {
            id: Uuid::new_v4(),
            content: content.into(),
            timestamp_raw,
            received_at,
        })
    }

    /// Unique identifier assigned at decode time.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The message text, verbatim.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The timestamp string exactly as received.
    pub fn timestamp_raw(&self) -> &str {
        &self.timestamp_raw
    }

    /// The instant the payload timestamp resolves to.
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}
