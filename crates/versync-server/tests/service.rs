//! End-to-end tests against the real WebSocket service.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as Frame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use versync_core::{Message, MessageType, MetricCatalogue, Version};
use versync_server::{serve, CancellationToken, Server, ServerConfig, ServerResult};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Harness {
    server: Arc<Server>,
    url: String,
    service: JoinHandle<ServerResult<()>>,
}

async fn start(config: ServerConfig) -> Harness {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let server = Arc::new(Server::new(&config, CancellationToken::new()));
    let service = tokio::spawn(serve(server.clone(), listener));
    Harness { server, url, service }
}

fn config() -> ServerConfig {
    ServerConfig {
        poll_interval_ms: 20,
        ..ServerConfig::default()
    }
}

async fn connect(url: &str) -> Client {
    let (ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    ws
}

async fn next_text(ws: &mut Client) -> String {
    let deadline = Duration::from_secs(5);
    loop {
        let frame = tokio::time::timeout(deadline, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .unwrap();
        if let Frame::Text(text) = frame {
            return text.as_str().to_owned();
        }
    }
}

async fn exchange(ws: &mut Client, request: &str) -> String {
    ws.send(Frame::Text(request.to_owned().into())).await.unwrap();
    next_text(ws).await
}

#[tokio::test]
async fn stale_version_is_told_about_updates() {
    let h = start(config()).await;
    let mut ws = connect(&h.url).await;

    let reply = exchange(&mut ws, r#"{"type":"Version","payload":{"version":"0.1.0"}}"#).await;
    assert_eq!(
        reply,
        r#"{"type":"VersionUpdatesAvailable","payload":{"version":"0.1.5"}}"#
    );
}

#[tokio::test]
async fn missing_version_is_a_bad_request() {
    let h = start(config()).await;
    let mut ws = connect(&h.url).await;

    let reply = exchange(&mut ws, r#"{"type":"Version","payload":{}}"#).await;
    assert_eq!(reply, r#"{"type":"BadRequest","payload":{"request":{}}}"#);
}

#[tokio::test]
async fn push_settings_accepted_and_deprecated() {
    let h = start(config()).await;
    let mut ws = connect(&h.url).await;
    let current = Version::new(0, 1, 5);

    let complete = Message::push_settings(&current, h.server.snapshot().metrics());
    let reply = exchange(&mut ws, &complete.serialize()).await;
    assert_eq!(reply, r#"{"type":"Accepted"}"#);

    let empty = Message::push_settings(&current, &MetricCatalogue::new());
    let reply = Message::parse(&exchange(&mut ws, &empty.serialize()).await).unwrap();
    assert_eq!(reply.ty, MessageType::Deprecated);
    let error = reply.error_text().unwrap();
    for name in ["availability", "os_name", "performance"] {
        assert!(error.contains(name), "{error}");
    }
}

#[tokio::test]
async fn malformed_frame_gets_bad_request_and_keeps_state() {
    let h = start(config()).await;
    let mut ws = connect(&h.url).await;
    let before = h.server.snapshot();

    let reply = exchange(&mut ws, "not json").await;
    assert_eq!(reply, r#"{"type":"BadRequest","payload":{"request":"not json"}}"#);
    assert_eq!(h.server.snapshot(), before);

    // The connection survives.
    let reply = exchange(&mut ws, r#"{"type":"Version","payload":{"version":"0.1.5"}}"#).await;
    assert_eq!(reply, r#"{"type":"Accepted"}"#);
}

#[tokio::test]
async fn replies_keep_request_order() {
    let h = start(config()).await;
    let mut ws = connect(&h.url).await;

    for version in ["0.1.0", "0.1.5", "0.1.1"] {
        let request = Message::version_request(&version.parse().unwrap());
        ws.send(Frame::Text(request.serialize().into())).await.unwrap();
    }
    assert_eq!(
        Message::parse(&next_text(&mut ws).await).unwrap().ty,
        MessageType::VersionUpdatesAvailable
    );
    assert_eq!(
        Message::parse(&next_text(&mut ws).await).unwrap().ty,
        MessageType::Accepted
    );
    assert_eq!(
        Message::parse(&next_text(&mut ws).await).unwrap().ty,
        MessageType::VersionUpdatesAvailable
    );
}

#[tokio::test]
async fn release_is_broadcast_to_every_client() {
    let h = start(config()).await;
    assert_eq!(h.server.release_new_version(), 0);

    let mut a = connect(&h.url).await;
    let mut b = connect(&h.url).await;
    // A round trip guarantees the connection is registered.
    let current = r#"{"type":"Version","payload":{"version":"0.2.0"}}"#;
    assert_eq!(exchange(&mut a, current).await, r#"{"type":"Accepted"}"#);
    assert_eq!(exchange(&mut b, current).await, r#"{"type":"Accepted"}"#);
    assert_eq!(h.server.connections().len(), 2);

    assert_eq!(h.server.release_new_version(), 2);
    let notice = r#"{"type":"VersionUpdatesAvailable","payload":{"version":"0.2.0"}}"#;
    assert_eq!(next_text(&mut a).await, notice);
    assert_eq!(next_text(&mut b).await, notice);
}

#[tokio::test]
async fn closed_connections_leave_the_registry() {
    let h = start(config()).await;
    let mut ws = connect(&h.url).await;
    exchange(&mut ws, r#"{"type":"GetUpdates"}"#).await;
    assert_eq!(h.server.connections().len(), 1);

    ws.close(None).await.unwrap();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !h.server.connections().is_empty() {
        assert!(tokio::time::Instant::now() < deadline, "connection never removed");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn shutdown_drains_connections() {
    let h = start(config()).await;
    let mut ws = connect(&h.url).await;
    exchange(&mut ws, r#"{"type":"GetUpdates"}"#).await;

    h.server.shutdown().cancel();
    tokio::time::timeout(Duration::from_secs(5), h.service)
        .await
        .expect("service did not stop")
        .unwrap()
        .unwrap();

    // The client sees a close frame (or the stream ending) rather than hanging.
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Frame::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok());
    assert!(h.server.connections().is_empty());
}

#[tokio::test]
async fn shutdown_does_not_wait_for_a_stalled_upgrade() {
    let h = start(config()).await;
    let addr = h.url.trim_start_matches("ws://").to_owned();

    // Open the TCP connection but never send the upgrade request.
    let _idle = TcpStream::connect(addr.as_str()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    h.server.shutdown().cancel();
    tokio::time::timeout(Duration::from_secs(5), h.service)
        .await
        .expect("service blocked on a connection that never upgraded")
        .unwrap()
        .unwrap();
    assert!(h.server.connections().is_empty());
}
