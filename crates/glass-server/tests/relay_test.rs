//! End-to-end tests for the relay over a real loopback socket.
//!
//! These tests verify:
//! - A valid POST produces exactly one event and no response bytes
//! - Both accepted timestamp formats decode
//! - Bad payloads are dropped while the listener keeps serving
//! - Requests split across writes are reassembled
//! - Events expire relative to local arrival, not the payload timestamp
//! - A failed bind leaves the service running without a listener

use std::net::SocketAddr;
use std::time::Duration;

use chrono::Utc;
use glass_server::{render_feed, Config, RelayService};
use glass_store::Snapshot;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(3);

fn test_config() -> Config {
    let mut config = Config::default();
    config.server.port = 0;
    config.server.read_timeout_ms = 500;
    config
}

fn post(body: &str) -> String {
    format!(
        "POST /notify HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\n\r\n{body}"
    )
}

async fn start(config: &Config) -> (RelayService, SocketAddr) {
    let service = RelayService::start(config).await;
    let addr = service.listener_addr().expect("listener should bind");
    (service, addr)
}

/// Sends `chunks` with a short pause between each, then waits for the
/// server to close the connection. Returns any bytes the server sent.
async fn send_chunks(addr: SocketAddr, chunks: &[&[u8]]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    for (i, chunk) in chunks.iter().enumerate() {
        if i > 0 {
            sleep(Duration::from_millis(50)).await;
        }
        stream.write_all(chunk).await.expect("write");
    }

    let mut response = Vec::new();
    timeout(WAIT, stream.read_to_end(&mut response))
        .await
        .expect("server should close the connection")
        .expect("read");
    response
}

async fn wait_for<F>(rx: &mut watch::Receiver<Snapshot>, condition: F) -> Snapshot
where
    F: Fn(&Snapshot) -> bool,
{
    timeout(WAIT, async {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if condition(&snapshot) {
                return snapshot;
            }
            rx.changed().await.expect("feed should be alive");
        }
    })
    .await
    .expect("condition not met in time")
}

#[tokio::test]
async fn valid_request_appends_one_event() {
    let (service, addr) = start(&test_config()).await;
    let mut rx = service.subscribe();

    let response = send_chunks(
        addr,
        &[post(r#"{"content":"hi","timestamp":"2024-01-02T03:04:05.678Z"}"#).as_bytes()],
    )
    .await;
    assert!(response.is_empty(), "relay must not send a response");

    let snapshot = wait_for(&mut rx, |s| !s.is_empty()).await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].event().content(), "hi");
    assert_eq!(render_feed(&snapshot, &Utc), vec!["03:04:05: hi"]);

    service.stop().await;
}

#[tokio::test]
async fn compact_timestamp_is_accepted() {
    let (service, addr) = start(&test_config()).await;
    let mut rx = service.subscribe();

    send_chunks(
        addr,
        &[post(r#"{"content":"fallback","timestamp":"2024-01-02T03:04:05Z"}"#).as_bytes()],
    )
    .await;

    let snapshot = wait_for(&mut rx, |s| !s.is_empty()).await;
    assert_eq!(snapshot[0].event().timestamp_raw(), "2024-01-02T03:04:05Z");
    assert_eq!(render_feed(&snapshot, &Utc), vec!["03:04:05: fallback"]);

    service.stop().await;
}

#[tokio::test]
async fn bad_payloads_are_dropped() {
    let (service, addr) = start(&test_config()).await;

    for body in [
        "not json",
        r#"["content","timestamp"]"#,
        r#"{"content":"hi"}"#,
        r#"{"content":"hi","timestamp":"tomorrow"}"#,
    ] {
        let response = send_chunks(addr, &[post(body).as_bytes()]).await;
        assert!(response.is_empty());
    }
    assert!(service.snapshot().is_empty());

    // The listener is still serving afterwards.
    let mut rx = service.subscribe();
    send_chunks(
        addr,
        &[post(r#"{"content":"after","timestamp":"2024-01-02T03:04:05Z"}"#).as_bytes()],
    )
    .await;
    let snapshot = wait_for(&mut rx, |s| !s.is_empty()).await;
    assert_eq!(snapshot[0].event().content(), "after");

    service.stop().await;
}

#[tokio::test]
async fn terminator_split_across_writes() {
    let (service, addr) = start(&test_config()).await;
    let mut rx = service.subscribe();

    let request = post(r#"{"content":"split","timestamp":"2024-01-02T03:04:05Z"}"#);
    let cut = request.find("\r\n\r\n").expect("terminator") + 2;
    let (head, tail) = request.as_bytes().split_at(cut);
    send_chunks(addr, &[head, tail]).await;

    let snapshot = wait_for(&mut rx, |s| !s.is_empty()).await;
    assert_eq!(snapshot[0].event().content(), "split");

    service.stop().await;
}

#[tokio::test]
async fn declared_body_split_across_writes() {
    let (service, addr) = start(&test_config()).await;
    let mut rx = service.subscribe();

    let body = r#"{"content":"framed","timestamp":"2024-01-02T03:04:05Z"}"#;
    let head = format!(
        "POST / HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        &body[..8]
    );
    send_chunks(addr, &[head.as_bytes(), body[8..].as_bytes()]).await;

    let snapshot = wait_for(&mut rx, |s| !s.is_empty()).await;
    assert_eq!(snapshot[0].event().content(), "framed");

    service.stop().await;
}

#[tokio::test]
async fn arrival_order_is_kept() {
    let (service, addr) = start(&test_config()).await;
    let mut rx = service.subscribe();

    send_chunks(
        addr,
        &[post(r#"{"content":"e1","timestamp":"2024-01-02T03:04:05Z"}"#).as_bytes()],
    )
    .await;
    wait_for(&mut rx, |s| s.len() == 1).await;
    send_chunks(
        addr,
        &[post(r#"{"content":"e2","timestamp":"2020-01-01T00:00:00Z"}"#).as_bytes()],
    )
    .await;

    let snapshot = wait_for(&mut rx, |s| s.len() == 2).await;
    let contents: Vec<_> = snapshot.iter().map(|s| s.event().content()).collect();
    assert_eq!(contents, vec!["e1", "e2"]);
    assert_eq!(
        render_feed(&snapshot, &Utc),
        vec!["00:00:00: e2", "03:04:05: e1"]
    );

    service.stop().await;
}

#[tokio::test]
async fn stale_event_expires_after_window_from_arrival() {
    let mut config = test_config();
    config.feed.visibility_window_ms = 400;
    config.feed.sweep_interval_ms = 50;
    let (service, addr) = start(&config).await;
    let mut rx = service.subscribe();

    send_chunks(
        addr,
        &[post(r#"{"content":"old","timestamp":"2001-09-09T01:46:40Z"}"#).as_bytes()],
    )
    .await;
    let snapshot = wait_for(&mut rx, |s| !s.is_empty()).await;
    let arrived = snapshot[0].arrived_at();

    // Well inside the window the event is still there despite its ancient payload time.
    sleep(Duration::from_millis(150)).await;
    assert_eq!(service.snapshot().len(), 1);

    wait_for(&mut rx, |s| s.is_empty()).await;
    let age = Utc::now() - arrived;
    assert!(
        age >= chrono::Duration::milliseconds(400),
        "evicted too early: {age}"
    );

    service.stop().await;
}

#[tokio::test]
async fn silent_peer_is_disconnected() {
    let (service, addr) = start(&test_config()).await;

    let response = send_chunks(addr, &[&b"POST / HTTP/1.1\r\n"[..]]).await;
    assert!(response.is_empty());
    assert!(service.snapshot().is_empty());

    service.stop().await;
}

#[tokio::test]
async fn bind_failure_keeps_service_running() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let mut config = test_config();
    config.server.port = taken.local_addr().expect("addr").port();

    let service = RelayService::start(&config).await;
    assert!(service.listener_addr().is_none());

    // The feed still works for in-process producers.
    let mut rx = service.subscribe();
    service
        .sink()
        .append(glass_types::Event::new("local", "2024-01-02T03:04:05Z").expect("valid"))
        .await
        .expect("feed open");
    wait_for(&mut rx, |s| s.len() == 1).await;

    let remaining = service.stop().await;
    assert_eq!(remaining.len(), 1);
}

#[tokio::test]
async fn stop_closes_the_listener() {
    let (service, addr) = start(&test_config()).await;
    service.stop().await;

    let result = timeout(WAIT, TcpStream::connect(addr))
        .await
        .expect("connect should not hang");
    assert!(result.is_err(), "listener should be closed after stop");
}
