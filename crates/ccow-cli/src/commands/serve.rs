//! `ccow serve` - start the MCP server.

use super::load_config;
use anyhow::{Context, Result};
use ccow_backend::HttpBackendClient;
use ccow_core::Transport;
use ccow_mcp::McpServer;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Arguments for `ccow serve`.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Configuration file (defaults to ./ccow.yaml when present).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Transport: stdio or http. Overrides the file and environment.
    #[arg(short, long)]
    pub transport: Option<Transport>,

    /// HTTP port. Implies the HTTP transport.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// HTTP bind host.
    #[arg(long)]
    pub host: Option<String>,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(port) = args.port {
        config.mcp.transport = Transport::Http;
        config.mcp.port = port;
    }
    if let Some(transport) = args.transport {
        config.mcp.transport = transport;
    }
    if let Some(host) = args.host {
        config.mcp.host = host;
    }
    config.validate().context("Invalid configuration")?;

    let backend = HttpBackendClient::from_config(&config.backend)
        .context("Failed to create backend client")?;
    info!(
        backend = %backend.base_url(),
        transport = ?config.mcp.transport,
        "Starting ComplianceCow MCP server"
    );

    let server = McpServer::new(&config, Arc::new(backend))
        .context("Failed to build MCP server")?;
    server.run().await.context("MCP server failed")?;
    Ok(())
}
