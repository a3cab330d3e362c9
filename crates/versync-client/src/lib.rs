//! versync client.
//!
//! Connects to a versync server, announces its version, then lets the user
//! check for a newer version, pull the server's metric catalogue, or push its
//! own settings for validation.

mod error;
mod session;
mod state;
mod transport;

pub use error::{ClientError, ClientResult};
pub use session::{ClientAction, Session};
pub use state::{handlers, ClientState, Notice};
pub use transport::{Transport, WsTransport};
