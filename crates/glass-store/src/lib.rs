//! The in-memory feed of currently visible notifications.
//!
//! [`EventStore`] keeps events in arrival order and evicts them once they
//! have been visible locally for longer than the visibility window. Every
//! mutation publishes a fresh immutable [`Snapshot`] on a watch channel so
//! renderers can react to changes without ever observing a half-applied
//! sweep.

mod store;

pub use store::{EventStore, Snapshot, StoredEvent};
