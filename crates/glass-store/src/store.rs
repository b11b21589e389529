//! Arrival-ordered event storage with age-based eviction.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use glass_types::{Event, VISIBILITY_WINDOW};
use tokio::sync::watch;

/// An immutable view of the feed, oldest arrival first.
pub type Snapshot = Arc<Vec<StoredEvent>>;

/// An event together with the local time it was appended.
///
/// Eviction is measured from `arrived_at`, never from the payload
/// timestamp, so a skewed sender clock cannot shorten visibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    event: Event,
    arrived_at: DateTime<Utc>,
}

impl StoredEvent {
    /// The decoded event.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Local wall-clock time of the append.
    pub fn arrived_at(&self) -> DateTime<Utc> {
        self.arrived_at
    }

    /// Whether this entry has outlived `window` at `now`.
    ///
    /// Entries stamped in the future relative to `now` are never expired.
    pub fn is_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match now.signed_duration_since(self.arrived_at).to_std() {
            Ok(age) => age > window,
            Err(_) => false,
        }
    }
}

/// Single-owner collection of visible events.
///
/// The store takes `&mut self` for every mutation and holds no locks; the
/// owner is expected to serialise appends and sweeps. Readers on other
/// tasks go through [`EventStore::subscribe`].
#[derive(Debug)]
pub struct EventStore {
    events: Vec<StoredEvent>,
    visibility_window: Duration,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl EventStore {
    /// Creates an empty store with the standard visibility window.
    pub fn new() -> Self {
        Self::with_window(VISIBILITY_WINDOW)
    }

    /// Creates an empty store with a custom visibility window.
    pub fn with_window(visibility_window: Duration) -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            events: Vec::new(),
            visibility_window,
            snapshot_tx,
        }
    }

    /// How long an event stays visible after arrival.
    pub fn visibility_window(&self) -> Duration {
        self.visibility_window
    }

    /// Appends `event` at the tail, stamped with local arrival time.
    ///
    /// No deduplication or reordering happens: arrival order is display
    /// order whatever the payload timestamps say.
    pub fn append(&mut self, event: Event, arrived_at: DateTime<Utc>) {
        self.events.push(StoredEvent { event, arrived_at });
        self.publish();
    }

    /// Removes every event older than the visibility window at `now`.
    ///
    /// Returns the number of evicted events. Nothing is published when the
    /// sweep removes nothing.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.events.len();
        let window = self.visibility_window;
        self.events.retain(|stored| !stored.is_expired(now, window));

        let evicted = before - self.events.len();
        if evicted > 0 {
            self.publish();
        }
        evicted
    }

    /// The current feed, oldest arrival first.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribes to feed changes.
    ///
    /// The receiver starts out holding the current snapshot and is marked
    /// changed after every append or effective sweep.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Number of visible events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the feed is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(Arc::new(self.events.clone()));
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}
