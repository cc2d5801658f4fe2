//! Binary entry point for the Quilt MCP server.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
// CLI output goes to stdout/stderr by design.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use clap::Parser;
use quilt_mcp::cli::{Cli, Command, run_serve};
use quilt_mcp::mcp::ToolRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve {
            transport,
            host,
            port,
            log_format,
        } => {
            run_serve(transport, &host, port, &log_format).await?;
        }
        Command::Tools => {
            let registry = ToolRegistry::new();
            println!("{}", serde_json::to_string_pretty(&registry.list_tools())?);
        }
    }
    Ok(())
}
