//! versync client binary.
//!
//! Run (with a server listening on the default port):
//!   cargo run -p versync-client
//!   cargo run -p versync-client -- --url ws://localhost:8008/ws --version 0.1.5

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use versync_client::{ClientState, Session};
use versync_core::{ConsoleMenu, MetricCatalogue, Version};

#[derive(Debug, Parser)]
#[command(name = "versync-client", about = "Interactive versync client")]
struct Cli {
    /// Server WebSocket URL
    #[arg(long, env = "VERSYNC_URL", default_value = "ws://127.0.0.1:8008/ws")]
    url: String,

    /// Version this client reports
    #[arg(long = "version", env = "VERSYNC_CLIENT_VERSION", default_value = "0.1.0")]
    client_version: Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Keep logs quiet by default; they share the terminal with the menu.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("versync_client=warn".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let state = ClientState::new(cli.client_version, MetricCatalogue::defaults());

    let session = Session::connect(&cli.url, state)
        .await
        .context("cannot start the client")?;

    let menu = ConsoleMenu::new(std::io::BufReader::new(std::io::stdin()), std::io::stdout());
    session.run(menu, &mut std::io::stdout()).await?;
    println!("\nDisconnected, bye!");
    Ok(())
}
