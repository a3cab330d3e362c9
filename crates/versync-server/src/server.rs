//! WebSocket service.
//!
//! One task per connection: the reader handles each text frame to completion
//! (parse, dispatch, queue reply) before reading the next, so replies on a
//! connection keep request order. A writer task drains the connection's
//! outbox, which also carries broadcasts.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as Frame;
use versync_core::{HandlerRegistry, Message, Version};

use crate::config::{ReleaseConfig, ServerConfig};
use crate::error::ServerResult;
use crate::registry::{ConnectionId, ConnectionRegistry, Outbound};
use crate::shutdown::CancellationToken;
use crate::state::{handlers, ServerState};

/// Shared server: protocol state, dispatch table and open connections.
#[derive(Debug)]
pub struct Server {
    state: Mutex<ServerState>,
    handlers: HandlerRegistry<ServerState>,
    connections: ConnectionRegistry,
    release: ReleaseConfig,
    poll_interval: Duration,
    shutdown: CancellationToken,
}

impl Server {
    pub fn new(config: &ServerConfig, shutdown: CancellationToken) -> Self {
        Self {
            state: Mutex::new(ServerState::new(
                config.version.clone(),
                config.metrics.clone(),
            )),
            handlers: handlers(),
            connections: ConnectionRegistry::new(),
            release: config.release.clone(),
            poll_interval: config.poll_interval(),
            shutdown,
        }
    }

    fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current state.
    pub fn snapshot(&self) -> ServerState {
        self.state().clone()
    }

    pub fn version(&self) -> Version {
        self.state().version().clone()
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Version the "release" action will adopt.
    pub fn pending_release(&self) -> &Version {
        &self.release.version
    }

    /// Handle one inbound text frame and return the reply to send back.
    ///
    /// A frame that is not JSON is answered with `BadRequest` carrying the
    /// raw text; state is left untouched.
    pub fn handle_text(&self, raw: &str) -> Option<Message> {
        match Message::parse(raw) {
            Ok(message) => {
                tracing::debug!(ty = %message.ty, "request");
                let mut state = self.state();
                self.handlers.dispatch(&mut state, message)
            }
            Err(e) => {
                tracing::warn!("dropping malformed request: {}", e);
                Some(Message::bad_request(Value::String(raw.to_string())))
            }
        }
    }

    /// Adopt the configured release and notify every connected client.
    ///
    /// Returns how many clients were notified.
    pub fn release_new_version(&self) -> usize {
        let notice = {
            let mut state = self.state();
            state.release(&self.release);
            Message::version_updates_available(state.version())
        };
        let notified = self.connections.broadcast(&notice);
        tracing::info!(
            "released version {}, notified {} clients",
            self.release.version,
            notified
        );
        notified
    }
}

/// Accept connections until the shutdown token is cancelled, then close
/// every open connection and wait for their tasks to finish.
pub async fn serve(server: Arc<Server>, listener: TcpListener) -> ServerResult<()> {
    let local = listener.local_addr()?;
    tracing::info!("Listening on ws://{}", local);

    let mut tasks = JoinSet::new();
    while !server.shutdown.is_cancelled() {
        while tasks.try_join_next().is_some() {}

        let accepted = match tokio::time::timeout(server.poll_interval, listener.accept()).await {
            Ok(accepted) => accepted,
            Err(_elapsed) => continue,
        };
        let (stream, addr) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!("accept failed: {}", e);
                continue;
            }
        };

        let server = server.clone();
        tasks.spawn(async move {
            if let Err(e) = handle_connection(&server, stream, addr).await {
                tracing::warn!("Connection error from {}: {}", addr, e);
            }
        });
    }

    let closing = server.connections.close_all();
    tracing::info!("shutting down, closing {} connections", closing);
    while tasks.join_next().await.is_some() {}
    tracing::info!("web service stopped");
    Ok(())
}

async fn handle_connection(server: &Server, stream: TcpStream, addr: SocketAddr) -> ServerResult<()> {
    let Some(ws) = upgrade(server, stream).await? else {
        tracing::debug!("dropping {} before upgrade: server shutting down", addr);
        return Ok(());
    };
    let (mut sink, mut frames) = ws.split();

    let (id, mut outbox) = server.connections.open(addr);
    tracing::info!("new websocket connection {} from {}", id, addr);

    let writer = tokio::spawn(async move {
        while let Some(outbound) = outbox.recv().await {
            let frame = match outbound {
                Outbound::Text(text) => Frame::Text(text.into()),
                Outbound::Close => Frame::Close(None),
            };
            let closing = matches!(frame, Frame::Close(_));
            if let Err(e) = sink.send(frame).await {
                tracing::debug!("write to {} failed: {}", addr, e);
                break;
            }
            if closing {
                break;
            }
        }
    });

    let reason = read_loop(server, id, &mut frames).await;

    server.connections.close(id);
    tracing::info!("websocket connection {} closed: {}", id, reason);
    let _ = writer.await;
    Ok(())
}

/// Perform the WebSocket upgrade, giving up if shutdown is requested first.
async fn upgrade(
    server: &Server,
    stream: TcpStream,
) -> ServerResult<Option<WebSocketStream<TcpStream>>> {
    let handshake = tokio_tungstenite::accept_async(stream);
    tokio::pin!(handshake);
    loop {
        match tokio::time::timeout(server.poll_interval, &mut handshake).await {
            Ok(ws) => return Ok(Some(ws?)),
            Err(_elapsed) if server.shutdown.is_cancelled() => return Ok(None),
            Err(_elapsed) => {}
        }
    }
}

async fn read_loop<S>(server: &Server, id: ConnectionId, frames: &mut S) -> String
where
    S: futures_util::Stream<Item = Result<Frame, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let next = match tokio::time::timeout(server.poll_interval, frames.next()).await {
            Ok(next) => next,
            Err(_elapsed) => {
                if server.shutdown.is_cancelled() {
                    return "server shutting down".to_string();
                }
                continue;
            }
        };

        match next {
            Some(Ok(Frame::Text(text))) => {
                if let Some(reply) = server.handle_text(text.as_str()) {
                    server.connections.send(id, &reply);
                }
            }
            Some(Ok(Frame::Close(frame))) => {
                return frame
                    .map(|f| f.reason.as_str().to_owned())
                    .filter(|reason| !reason.is_empty())
                    .unwrap_or_else(|| "closed by peer".to_string());
            }
            // Binary frames carry no protocol messages; pings are answered
            // by tungstenite.
            Some(Ok(_)) => {}
            Some(Err(e)) => return format!("transport error: {e}"),
            None => return "end of stream".to_string(),
        }
    }
}
