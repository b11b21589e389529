//! Error types for the relay service.

use std::net::SocketAddr;

use glass_wire::{DecodeError, FramingError};

/// Why a connection ended without producing an event.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Reading from the socket failed.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// No complete request could be framed.
    #[error(transparent)]
    Framing(#[from] FramingError),

    /// The body did not decode into an event.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The peer went quiet for longer than the read timeout.
    #[error("read timed out")]
    TimedOut,

    /// The feed stopped before the event could be appended.
    #[error(transparent)]
    FeedClosed(#[from] FeedClosed),
}

/// The feed loop is no longer accepting events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("feed is closed")]
pub struct FeedClosed;

/// The listener could not be started.
#[derive(Debug, thiserror::Error)]
pub enum ListenerStartError {
    /// Binding the listening socket failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that could not be bound.
        addr: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },
}
