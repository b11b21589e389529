//! Glass relay service library.
//!
//! Receives chat notifications as minimal HTTP POST requests on a local
//! port and keeps each one in a live feed for a few seconds after it
//! arrives.
//!
//! ```text
//! Listener ─► StreamAssembler ─► decode_payload ─► EventSink ─┐
//!                                                             ▼
//!                       EvictionScheduler ─► FeedLoop (owns EventStore)
//!                                                             │
//!                                          watch::Receiver<Snapshot> ─► render_feed
//! ```

pub mod config;
pub mod error;
pub mod feed;
pub mod listener;
pub mod logging;
pub mod render;
pub mod service;

pub use config::{load_config, Config, ConfigError};
pub use error::{ConnectionError, FeedClosed, ListenerStartError};
pub use feed::{EventSink, EvictionScheduler, FeedLoop};
pub use listener::{handle_connection, Listener};
pub use render::render_feed;
pub use service::RelayService;
