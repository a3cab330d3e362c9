//! Administrative control loop.
//!
//! Runs on its own thread, blocking on the operator's menu choice. Choosing
//! quit (or losing stdin) raises the shutdown token; the web service notices
//! it on its next poll and drains.

use std::io;

use versync_core::{ActionSelector, Selection};

use crate::server::Server;

/// Offer the operator menu until quit or shutdown.
pub fn run_control_loop<S: ActionSelector>(
    server: &Server,
    selector: &mut S,
    port: u16,
) -> io::Result<()> {
    let release_label = format!(
        "Update to version {} and notify clients",
        server.pending_release()
    );

    let outcome = loop {
        if server.shutdown().is_cancelled() {
            break Ok(());
        }

        let title = format!("[MENU] Server (v{}) port: {}", server.version(), port);
        match selector.offer(&title, &[release_label.as_str()]) {
            Ok(Selection::Action(_)) => {
                server.release_new_version();
            }
            Ok(Selection::Quit) => {
                tracing::info!("shutdown requested from the control loop");
                break Ok(());
            }
            Err(e) => break Err(e),
        }
    };

    server.shutdown().cancel();
    outcome
}
