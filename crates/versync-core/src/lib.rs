//! Core types for versync.
//!
//! This crate holds the protocol layer shared by client and server: the
//! message envelope, metric catalogue, version ordering, handler dispatch and
//! the reconciliation that decides whether a client is still compatible.

mod handler;
mod menu;
mod message;
mod metric;
mod reconcile;
mod version;

pub use handler::{Handler, HandlerRegistry, Unhandled};
pub use menu::{ActionSelector, ConsoleMenu, Selection};
pub use message::{keys, Message, MessageType, ProtocolError};
pub use metric::{Metric, MetricCatalogue, MetricKind, AVAILABILITY, PERFORMANCE};
pub use reconcile::{missing_metrics, Reconciliation, VersionDrift};
pub use version::{Version, VersionParseError};

/// Client session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// The transport failed or was closed by the server.
    Disconnected,
    /// Transport is up; the version has not been announced yet.
    Connecting,
    /// Transport is up; announcing our version.
    Handshake,
    /// Waiting for the user to pick an action.
    Ready,
    /// A request is on the wire; waiting for the reply.
    AwaitingResponse,
    /// Session ended.
    Closed,
}
