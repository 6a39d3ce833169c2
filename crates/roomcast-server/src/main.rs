use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use roomcast::prelude::*;
use tracing::{info, warn};

/// Multi-room chat server speaking the length-prefixed roomcast protocol.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Socket address to listen on. Overrides `bind_addr` from the config file.
    #[arg(long)]
    bind: Option<String>,

    /// JSON config file. Missing keys keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serve WebSocket clients instead of raw TCP.
    #[cfg(feature = "websocket")]
    #[arg(long)]
    websocket: bool,
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = ?err, "failed to install ctrl-c handler");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_json_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }

    let builder = ChatServer::builder().config(config);

    #[cfg(feature = "websocket")]
    if cli.websocket {
        let server = builder.build_websocket().await?;
        info!(addr = %server.local_addr()?, "serving WebSocket clients");
        server.run_until(shutdown_signal()).await?;
        return Ok(());
    }

    let server = builder.build().await?;
    info!(addr = %server.local_addr()?, "serving TCP clients");
    server.run_until(shutdown_signal()).await?;

    info!("server stopped");
    Ok(())
}
