//! The relay service: listener, feed loop and their lifetimes.

use std::net::SocketAddr;

use glass_store::{EventStore, Snapshot};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::feed::{EventSink, FeedLoop};
use crate::listener::Listener;

/// A running relay.
///
/// Built once by [`RelayService::start`] and torn down by
/// [`RelayService::stop`]. Renderers observe the feed through
/// [`RelayService::subscribe`]; they never get write access to the store.
#[derive(Debug)]
pub struct RelayService {
    listener_addr: Option<SocketAddr>,
    listener_task: Option<JoinHandle<()>>,
    feed_task: JoinHandle<EventStore>,
    shutdown_tx: oneshot::Sender<()>,
    snapshots: watch::Receiver<Snapshot>,
    sink: EventSink,
}

impl RelayService {
    /// Starts the feed loop and binds the listener.
    ///
    /// A bind failure is logged and the service keeps running without a
    /// listener; [`RelayService::listener_addr`] then returns `None`.
    pub async fn start(config: &Config) -> Self {
        let store = EventStore::with_window(config.feed.visibility_window());
        let snapshots = store.subscribe();
        let (feed, sink) = FeedLoop::new(store, config.feed.sweep_interval());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let feed_task = tokio::spawn(feed.run(shutdown_rx));

        let addr = config.server.socket_addr();
        let (listener_addr, listener_task) =
            match Listener::bind(addr, sink.clone(), config.server.read_timeout()).await {
                Ok(listener) => {
                    let bound = listener.local_addr();
                    (Some(bound), Some(tokio::spawn(listener.run())))
                }
                Err(e) => {
                    tracing::error!(error = %e, "listener failed to start, continuing without it");
                    (None, None)
                }
            };

        tracing::info!(
            listener = ?listener_addr,
            visibility_window_ms = config.feed.visibility_window_ms,
            sweep_interval_ms = config.feed.sweep_interval_ms,
            "relay service started"
        );

        Self {
            listener_addr,
            listener_task,
            feed_task,
            shutdown_tx,
            snapshots,
            sink,
        }
    }

    /// Address the listener is bound to, if it started.
    pub fn listener_addr(&self) -> Option<SocketAddr> {
        self.listener_addr
    }

    /// Subscribes to feed changes.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// The current feed, oldest arrival first.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// An append-only handle for in-process producers.
    pub fn sink(&self) -> EventSink {
        self.sink.clone()
    }

    /// Stops accepting connections and shuts the feed loop down.
    ///
    /// Returns the final feed contents.
    pub async fn stop(self) -> Snapshot {
        if let Some(task) = self.listener_task {
            task.abort();
            // The task only ends by cancellation.
            let _ = task.await;
        }

        let _ = self.shutdown_tx.send(());
        let remaining = match self.feed_task.await {
            Ok(store) => store.snapshot(),
            Err(e) => {
                tracing::error!(error = %e, "feed loop ended abnormally");
                self.snapshots.borrow().clone()
            }
        };

        tracing::info!(remaining = remaining.len(), "relay service stopped");
        remaining
    }
}
