//! Client session driver.
//!
//! Strict request/response alternation: the user picks an action, the
//! request is written, and the session blocks until the server's reply to it
//! arrives before offering the menu again. Pushes received in the meantime
//! are handled on the way. Frames that are not JSON are dropped without
//! touching state.

use std::io::Write;

use versync_core::{ActionSelector, HandlerRegistry, Message, SessionPhase, Selection};

use crate::error::ClientResult;
use crate::state::{handlers, ClientState, Notice};
use crate::transport::{Transport, WsTransport};

/// What the user can ask the server for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAction {
    CheckVersion,
    GetUpdates,
    PushSettings,
}

impl ClientAction {
    pub const ALL: [ClientAction; 3] = [
        ClientAction::CheckVersion,
        ClientAction::GetUpdates,
        ClientAction::PushSettings,
    ];

    pub const LABELS: [&'static str; 3] = ["Check version", "Get updates", "Push settings"];

    /// The request this action sends, given the current client state.
    pub fn request(self, state: &ClientState) -> Message {
        match self {
            ClientAction::CheckVersion => Message::version_request(state.version()),
            ClientAction::GetUpdates => Message::get_updates(),
            ClientAction::PushSettings => Message::push_settings(state.version(), state.metrics()),
        }
    }
}

/// One connection to a server.
pub struct Session<T> {
    transport: T,
    state: ClientState,
    handlers: HandlerRegistry<ClientState>,
    phase: SessionPhase,
    peer: String,
}

impl Session<WsTransport> {
    /// Connect to `url` over WebSocket.
    pub async fn connect(url: &str, state: ClientState) -> ClientResult<Self> {
        tracing::debug!("connecting to {}", url);
        let transport = WsTransport::connect(url).await?;
        Ok(Self::new(transport, state, url))
    }
}

impl<T: Transport> Session<T> {
    /// Wrap an already connected transport. The session starts in
    /// [`SessionPhase::Connecting`] until [`Session::handshake`] announces us.
    pub fn new(transport: T, state: ClientState, peer: impl Into<String>) -> Self {
        Self {
            transport,
            state,
            handlers: handlers(),
            phase: SessionPhase::Connecting,
            peer: peer.into(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    fn enter(&mut self, phase: SessionPhase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "session phase");
        self.phase = phase;
    }

    /// Send one request and wait for its reply.
    ///
    /// Pushes that arrive first (a release broadcast, say) are dispatched as
    /// they come and the wait goes on. Notices from both are returned.
    pub async fn request(&mut self, request: Message) -> ClientResult<Vec<Notice>> {
        let pending = request.ty;
        tracing::debug!(ty = %pending, "request");
        if let Err(e) = self.transport.send(request.serialize()).await {
            self.enter(SessionPhase::Disconnected);
            return Err(e);
        }
        self.enter(SessionPhase::AwaitingResponse);

        loop {
            let raw = match self.transport.receive().await {
                Ok(raw) => raw,
                Err(e) => {
                    self.enter(SessionPhase::Disconnected);
                    return Err(e);
                }
            };
            let message = match Message::parse(&raw) {
                Ok(message) => message,
                Err(e) => {
                    tracing::debug!("dropping malformed frame: {}", e);
                    continue;
                }
            };

            let answered = message.ty.answers(pending);
            if !answered {
                tracing::debug!(ty = %message.ty, "push while awaiting {}", pending);
            }
            // The client never answers the server.
            let _ = self.handlers.dispatch(&mut self.state, message);
            if answered {
                break;
            }
        }

        self.enter(SessionPhase::Ready);
        Ok(self.state.take_notices())
    }

    /// Announce our version; entered once right after connecting.
    pub async fn handshake(&mut self) -> ClientResult<Vec<Notice>> {
        self.enter(SessionPhase::Handshake);
        let announce = Message::version_request(self.state.version());
        self.request(announce).await
    }

    /// Close the connection gracefully. A lost connection is just marked
    /// closed.
    pub async fn close(&mut self) -> ClientResult<()> {
        let previous = self.phase;
        if previous == SessionPhase::Closed {
            return Ok(());
        }
        self.enter(SessionPhase::Closed);
        if previous == SessionPhase::Disconnected {
            return Ok(());
        }
        self.transport.close().await
    }

    /// Drive the session: handshake, then menu-driven requests until the
    /// user quits. Notices are written to `out`. Returns the selector.
    pub async fn run<S, W>(mut self, mut selector: S, out: &mut W) -> ClientResult<S>
    where
        S: ActionSelector + Send + 'static,
        W: Write,
    {
        let notices = self.handshake().await?;
        print_notices(out, &notices)?;

        loop {
            let title = format!(
                "[MENU] Client (v{}) connected to {}",
                self.state.version(),
                self.peer
            );
            // The menu blocks on user input; keep it off the async workers.
            let (returned, choice) = tokio::task::spawn_blocking(move || {
                let choice = selector.offer(&title, &ClientAction::LABELS);
                (selector, choice)
            })
            .await?;
            selector = returned;

            let action = match choice? {
                Selection::Quit => break,
                Selection::Action(index) => match ClientAction::ALL.get(index) {
                    Some(action) => *action,
                    None => continue,
                },
            };

            let notices = self.request(action.request(&self.state)).await?;
            print_notices(out, &notices)?;
        }

        self.close().await?;
        Ok(selector)
    }
}

fn print_notices<W: Write>(out: &mut W, notices: &[Notice]) -> std::io::Result<()> {
    for notice in notices {
        writeln!(out, "\n{notice}")?;
    }
    out.flush()
}
