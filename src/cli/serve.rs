//! The `serve` subcommand.

use super::Transport;
use crate::config::ServerConfig;
use crate::mcp::McpServer;
use crate::observability::{LogFormat, init_logging};
use crate::Result;

/// Starts the MCP server on the selected transport.
///
/// # Errors
///
/// Propagates transport failures (bind errors, stdio I/O).
pub async fn run_serve(
    transport: Transport,
    host: &str,
    port: u16,
    log_format: &str,
) -> Result<()> {
    init_logging(LogFormat::parse(log_format));
    let config = ServerConfig::from_env();
    tracing::info!(
        catalog_url = %config.catalog_url,
        default_registry = %config.default_registry,
        "starting quilt-mcp server"
    );

    let server = McpServer::new(config).await;
    match transport {
        Transport::Stdio => server.run_stdio().await,
        Transport::Http => server.run_http(host, port).await,
    }
}
