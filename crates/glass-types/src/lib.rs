//! Shared types, error definitions, and constants for the Glass relay.
//!
//! This crate holds the notification [`Event`] model and the single
//! timestamp resolver used both when a payload is decoded and when a
//! display label is rendered. Every other crate in the workspace depends
//! on it; it depends on nothing internal.

mod error;
mod event;
mod timestamp;

use std::time::Duration;

pub use error::TimestampError;
pub use event::Event;
pub use timestamp::{display_label, display_label_in, resolve_timestamp};

/// How long an event stays visible after it arrives locally.
pub const VISIBILITY_WINDOW: Duration = Duration::from_secs(5);

/// Interval between two eviction sweeps.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Maximum number of bytes requested from a connection per read.
pub const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Port the relay listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 8080;
