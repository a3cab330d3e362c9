//! Error types for the server.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while configuring or running the server
#[derive(Error, Debug)]
pub enum ServerError {
    /// Socket I/O error (bind, accept)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket upgrade or transport error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Config file could not be read
    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`ServerConfig`](crate::ServerConfig)
    #[error("invalid config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Config parsed but a value is out of range
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
