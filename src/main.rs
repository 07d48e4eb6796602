use anyhow::Result;
use rmcp::{ServiceExt, transport::stdio};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tunebridge::config::Config;
use tunebridge::server::TunebridgeServer;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the MCP transport, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    info!(
        "Starting audio player MCP server with directory: {}",
        config.music_dir.display()
    );

    let service = TunebridgeServer::new(config).serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
