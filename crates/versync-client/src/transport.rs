//! Duplex text transport under the client session.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as Frame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::{ClientError, ClientResult};

/// A connection that carries one text message per frame.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&mut self, text: String) -> ClientResult<()>;

    /// Wait for the next text frame.
    async fn receive(&mut self) -> ClientResult<String>;

    async fn close(&mut self) -> ClientResult<()>;
}

/// WebSocket transport over tokio-tungstenite.
pub struct WsTransport {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsTransport {
    /// Resolve, connect and perform the WebSocket upgrade.
    pub async fn connect(url: &str) -> ClientResult<Self> {
        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| ClientError::connection_failed(url, e))?;
        tracing::info!("connected to {}", url);
        Ok(Self { ws })
    }
}

impl Transport for WsTransport {
    async fn send(&mut self, text: String) -> ClientResult<()> {
        self.ws.send(Frame::Text(text.into())).await?;
        Ok(())
    }

    async fn receive(&mut self) -> ClientResult<String> {
        loop {
            match self.ws.next().await {
                Some(Ok(Frame::Text(text))) => return Ok(text.as_str().to_owned()),
                Some(Ok(Frame::Close(_))) | None => return Err(ClientError::Closed),
                // Pings are answered by tungstenite; binary frames are not ours.
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    async fn close(&mut self) -> ClientResult<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}
