//! versync server binary.
//!
//! Run:
//!   cargo run -p versync-server -- --port 8008
//!   cargo run -p versync-server -- --config versync.toml

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use versync_core::ConsoleMenu;
use versync_server::{run_control_loop, serve, CancellationToken, Server, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "versync-server", about = "Version and metric negotiation server")]
struct Cli {
    /// TOML config file
    #[arg(long, env = "VERSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address (overrides the config file)
    #[arg(long, env = "VERSYNC_BIND")]
    bind: Option<SocketAddr>,

    /// Listen port (overrides the port of `bind`)
    #[arg(long, env = "VERSYNC_PORT")]
    port: Option<u16>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(port) = self.port {
            config.bind.set_port(port);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("versync_server=info".parse()?),
        )
        .init();

    let config = Cli::parse().into_config()?;
    let shutdown = CancellationToken::new();
    let server = Arc::new(Server::new(&config, shutdown.clone()));

    let listener = TcpListener::bind(config.bind).await?;
    let port = listener.local_addr()?.port();
    tracing::info!(
        "Starting versync server v{} on {}",
        server.version(),
        config.bind
    );

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received");
                shutdown.cancel();
            }
        });
    }

    // Not joined: after Ctrl-C the thread may still be blocked on stdin.
    let control_server = server.clone();
    std::thread::Builder::new()
        .name("control".into())
        .spawn(move || {
            let mut menu = ConsoleMenu::stdio();
            if let Err(e) = run_control_loop(&control_server, &mut menu, port) {
                tracing::warn!("control loop failed: {}", e);
            }
            println!("\n\nShutdown has been requested, bye!\n");
        })?;

    serve(server, listener).await?;
    Ok(())
}
