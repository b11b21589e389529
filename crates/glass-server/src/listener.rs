//! TCP listener and per-connection request handling.
//!
//! Each accepted connection is served by its own task: bytes are read in
//! chunks of up to [`READ_CHUNK_SIZE`] into a [`StreamAssembler`] until a
//! request is framed, the body is decoded, and the resulting event is
//! handed to the [`EventSink`]. The connection is then closed without a
//! response, whatever the outcome.

use std::net::SocketAddr;
use std::time::Duration;

use glass_types::READ_CHUNK_SIZE;
use glass_wire::{decode_payload, AssemblyState, ParsedRequest, StreamAssembler};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpListener;
use uuid::Uuid;

use crate::error::{ConnectionError, ListenerStartError};
use crate::feed::EventSink;

/// Pause after a failed accept so a persistent error (fd exhaustion, say)
/// does not spin the task.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Accepts inbound notification requests.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
    sink: EventSink,
    read_timeout: Option<Duration>,
}

impl Listener {
    /// Binds `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerStartError::Bind`] when the address is unavailable.
    pub async fn bind(
        addr: SocketAddr,
        sink: EventSink,
        read_timeout: Option<Duration>,
    ) -> Result<Self, ListenerStartError> {
        let inner = TcpListener::bind(addr)
            .await
            .map_err(|source| ListenerStartError::Bind { addr, source })?;
        let local_addr = inner
            .local_addr()
            .map_err(|source| ListenerStartError::Bind { addr, source })?;

        Ok(Self {
            inner,
            local_addr,
            sink,
            read_timeout,
        })
    }

    /// The bound address, with the actual port when bound to port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections until the task is cancelled.
    pub async fn run(self) {
        tracing::info!(addr = %self.local_addr, "listening for notifications");

        loop {
            let (stream, peer) = match self.inner.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to accept connection");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    continue;
                }
            };
            tracing::debug!(%peer, "connection accepted");

            let sink = self.sink.clone();
            let read_timeout = self.read_timeout;
            tokio::spawn(async move {
                let result = handle_connection(stream, &sink, read_timeout).await;
                log_outcome(peer, result);
            });
        }
    }
}

/// Reads one request from `stream`, decodes it and appends the event.
///
/// The stream is dropped, and so closed, when this returns.
///
/// # Errors
///
/// Returns the [`ConnectionError`] that ended the connection early.
pub async fn handle_connection<S>(
    mut stream: S,
    sink: &EventSink,
    read_timeout: Option<Duration>,
) -> Result<Uuid, ConnectionError>
where
    S: AsyncRead + Unpin,
{
    let request = read_request(&mut stream, read_timeout).await?;
    let event = decode_payload(&request.body)?;
    let id = event.id();
    sink.append(event).await?;
    Ok(id)
}

/// Reads from `stream` until a complete request is buffered.
///
/// # Errors
///
/// Fails on socket errors, read timeouts, oversized requests, and peers
/// that close before the request is complete.
pub async fn read_request<S>(
    stream: &mut S,
    read_timeout: Option<Duration>,
) -> Result<ParsedRequest, ConnectionError>
where
    S: AsyncRead + Unpin,
{
    let mut assembler = StreamAssembler::new();
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];

    loop {
        let n = read_chunk(stream, &mut chunk, read_timeout).await?;
        if n == 0 {
            return Err(assembler.closed().into());
        }
        match assembler.feed(&chunk[..n])? {
            AssemblyState::AwaitingMoreData => continue,
            AssemblyState::Complete(request) => return Ok(request),
        }
    }
}

async fn read_chunk<S>(
    stream: &mut S,
    buf: &mut [u8],
    read_timeout: Option<Duration>,
) -> Result<usize, ConnectionError>
where
    S: AsyncRead + Unpin,
{
    match read_timeout {
        Some(limit) => tokio::time::timeout(limit, stream.read(buf))
            .await
            .map_err(|_| ConnectionError::TimedOut)?
            .map_err(ConnectionError::from),
        None => stream.read(buf).await.map_err(ConnectionError::from),
    }
}

fn log_outcome(peer: SocketAddr, result: Result<Uuid, ConnectionError>) {
    match result {
        Ok(id) => tracing::debug!(%peer, %id, "request handled"),
        Err(ConnectionError::Decode(e)) => {
            tracing::warn!(%peer, error = %e, "dropping undecodable payload");
        }
        Err(ConnectionError::Transport(e)) => {
            tracing::warn!(%peer, error = %e, "connection error");
        }
        Err(e @ (ConnectionError::Framing(_)
        | ConnectionError::TimedOut
        | ConnectionError::FeedClosed(_))) => {
            tracing::debug!(%peer, reason = %e, "connection closed without a request");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedLoop;
    use glass_store::EventStore;
    use glass_wire::{DecodeError, FramingError};
    use tokio::io::AsyncWriteExt;
    use tokio::sync::oneshot;

    const VALID: &str = "POST / HTTP/1.1\r\nHost: localhost\r\n\r\n{\"content\":\"hi\",\"timestamp\":\"2024-01-02T03:04:05.678Z\"}";

    fn sink() -> (EventSink, oneshot::Sender<()>) {
        let (feed, sink) = FeedLoop::new(EventStore::new(), Duration::from_secs(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(feed.run(shutdown_rx));
        (sink, shutdown_tx)
    }

    #[tokio::test]
    async fn handles_valid_request() {
        let (sink, _shutdown) = sink();
        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(VALID.as_bytes()).await.expect("write");

        let result = handle_connection(server, &sink, None).await;
        assert!(result.is_ok(), "unexpected error: {result:?}");
    }

    #[tokio::test]
    async fn reports_decode_error() {
        let (sink, _shutdown) = sink();
        let (mut client, server) = tokio::io::duplex(1024);
        client
            .write_all(b"POST / HTTP/1.1\r\n\r\nnot json")
            .await
            .expect("write");

        let err = handle_connection(server, &sink, None).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Decode(DecodeError::InvalidJson(_))));
    }

    #[tokio::test]
    async fn reports_early_close() {
        let (sink, _shutdown) = sink();
        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(b"POST / HTTP/1.1\r\n").await.expect("write");
        drop(client);

        let err = handle_connection(server, &sink, None).await.unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::Framing(FramingError::ConnectionClosed { buffered: 17 })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_peer_times_out() {
        let (mut client, _server_side) = tokio::io::duplex(1024);
        let err = read_request(&mut client, Some(Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::TimedOut));
    }

    #[tokio::test]
    async fn reports_closed_feed() {
        let (sink, shutdown) = sink();
        shutdown.send(()).expect("loop running");
        // Let the loop observe shutdown and drop its receiver.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(VALID.as_bytes()).await.expect("write");
        let err = handle_connection(server, &sink, None).await.unwrap_err();
        assert!(matches!(err, ConnectionError::FeedClosed(_)));
    }

    #[test]
    fn accept_retry_delay_backs_off() {
        assert!(ACCEPT_RETRY_DELAY >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn bind_reports_address_in_use() {
        let taken = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = taken.local_addr().expect("addr");
        let (sink, _shutdown) = sink();

        let err = Listener::bind(addr, sink, None).await.unwrap_err();
        let ListenerStartError::Bind { addr: failed, .. } = err;
        assert_eq!(failed, addr);
    }
}
