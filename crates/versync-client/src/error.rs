//! Error types for the client

use thiserror::Error;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that end a client session
#[derive(Error, Debug)]
pub enum ClientError {
    /// Could not reach or upgrade to the server
    #[error("Connection failed to {url}: {source}")]
    ConnectionFailed {
        url: String,
        source: tokio_tungstenite::tungstenite::Error,
    },

    /// Read or write failed on an open connection
    #[error("WebSocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// The server closed the connection
    #[error("Connection closed by server")]
    Closed,

    /// Console I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking menu task panicked or was cancelled
    #[error("menu task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ClientError {
    /// Create a connection failed error
    pub fn connection_failed(
        url: impl Into<String>,
        source: tokio_tungstenite::tungstenite::Error,
    ) -> Self {
        Self::ConnectionFailed {
            url: url.into(),
            source,
        }
    }
}
