//! versync server.
//!
//! Tracks the authoritative version and metric catalogue, answers client
//! requests over WebSocket, and lets an operator roll out a new version that
//! is broadcast to every connected client.

mod config;
mod control;
mod error;
mod registry;
mod server;
mod shutdown;
mod state;

pub use config::{ReleaseConfig, ServerConfig, DEFAULT_PORT};
pub use control::run_control_loop;
pub use error::{ServerError, ServerResult};
pub use registry::{ConnectionId, ConnectionRegistry, Outbound};
pub use server::{serve, Server};
pub use shutdown::CancellationToken;
pub use state::{handlers, ServerState};
