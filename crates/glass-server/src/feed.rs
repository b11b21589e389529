//! The single control loop that owns the event store.
//!
//! Connection tasks never touch the [`EventStore`]. They hold an
//! [`EventSink`], an append-only handle, and their events are applied one
//! at a time by [`FeedLoop::run`], interleaved with the periodic sweeps
//! driven by the [`EvictionScheduler`]. Because appends and sweeps run on
//! one task, the store needs no locking and a renderer never sees a
//! partially applied sweep.

use std::time::Duration;

use chrono::{DateTime, Utc};
use glass_store::EventStore;
use glass_types::Event;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::error::FeedClosed;

/// Pending appends buffered between connection tasks and the feed loop.
const SINK_CAPACITY: usize = 256;

/// Append-only handle into the feed.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<Event>,
}

impl EventSink {
    /// Queues `event` for appending.
    ///
    /// # Errors
    ///
    /// Returns [`FeedClosed`] once the feed loop has stopped.
    pub async fn append(&self, event: Event) -> Result<(), FeedClosed> {
        self.tx.send(event).await.map_err(|_| FeedClosed)
    }
}

/// Fixed-interval tick that drives eviction sweeps.
#[derive(Debug)]
pub struct EvictionScheduler {
    ticker: Interval,
}

impl EvictionScheduler {
    /// Creates a scheduler ticking every `period`.
    ///
    /// The first tick completes immediately.
    pub fn new(period: Duration) -> Self {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { ticker }
    }

    /// Waits for the next tick and returns the wall-clock time of the sweep.
    pub async fn tick(&mut self) -> DateTime<Utc> {
        self.ticker.tick().await;
        Utc::now()
    }
}

/// What the loop does next.
#[derive(Debug)]
enum Step {
    Stop,
    Sweep(DateTime<Utc>),
    Append(Event),
}

/// Owns the store and serialises every mutation applied to it.
#[derive(Debug)]
pub struct FeedLoop {
    store: EventStore,
    rx: mpsc::Receiver<Event>,
    scheduler: EvictionScheduler,
}

impl FeedLoop {
    /// Wraps `store` and returns the loop with its sink.
    pub fn new(store: EventStore, sweep_interval: Duration) -> (Self, EventSink) {
        let (tx, rx) = mpsc::channel(SINK_CAPACITY);
        let feed = Self {
            store,
            rx,
            scheduler: EvictionScheduler::new(sweep_interval),
        };
        (feed, EventSink { tx })
    }

    /// Runs until `shutdown` fires or its sender is dropped.
    ///
    /// Returns the store so the caller can inspect its final state.
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) -> EventStore {
        loop {
            match self.next_step(&mut shutdown).await {
                Step::Stop => break,
                Step::Sweep(now) => self.sweep(now),
                Step::Append(event) => self.append(event),
            }
        }
        tracing::debug!(remaining = self.store.len(), "feed loop stopped");
        self.store
    }

    /// Picks the next step. A due tick is polled ahead of the queue so a
    /// steady stream of appends cannot hold eviction back.
    async fn next_step(&mut self, shutdown: &mut oneshot::Receiver<()>) -> Step {
        tokio::select! {
            biased;
            _ = shutdown => Step::Stop,
            now = self.scheduler.tick() => Step::Sweep(now),
            Some(event) = self.rx.recv() => Step::Append(event),
        }
    }

    fn append(&mut self, event: Event) {
        tracing::info!(
            id = %event.id(),
            timestamp = event.timestamp_raw(),
            "event appended"
        );
        self.store.append(event, Utc::now());
    }

    fn sweep(&mut self, now: DateTime<Utc>) {
        let evicted = self.store.sweep(now);
        if evicted > 0 {
            tracing::debug!(count = evicted, remaining = self.store.len(), "evicted expired events");
        }
    }
}
