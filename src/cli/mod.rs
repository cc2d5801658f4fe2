//! Command-line interface.

mod serve;

pub use serve::run_serve;

use clap::{Parser, Subcommand, ValueEnum};

/// MCP server for the Quilt data catalog.
#[derive(Debug, Parser)]
#[command(name = "quilt-mcp", version, about)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the MCP server.
    Serve {
        /// Transport to serve on.
        #[arg(long, value_enum, default_value_t = Transport::Stdio)]
        transport: Transport,
        /// Bind host for the HTTP transport.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Bind port for the HTTP transport.
        #[arg(long, default_value_t = 8000, env = "MCP_HTTP_PORT")]
        port: u16,
        /// Log output format.
        #[arg(long, default_value = "pretty")]
        log_format: String,
    },
    /// Print the tool catalog and exit.
    Tools,
}

/// MCP transport selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    /// JSON-RPC frames over stdin/stdout.
    Stdio,
    /// JSON-RPC over HTTP (`POST /mcp`).
    Http,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::parse_from(["quilt-mcp", "serve"]);
        match cli.command {
            Command::Serve {
                transport,
                host,
                port,
                ..
            } => {
                assert_eq!(transport, Transport::Stdio);
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, 8000);
            }
            Command::Tools => unreachable!("expected serve"),
        }
    }

    #[test]
    fn test_serve_http_flags() {
        let cli = Cli::parse_from([
            "quilt-mcp",
            "serve",
            "--transport",
            "http",
            "--host",
            "0.0.0.0",
            "--port",
            "3000",
        ]);
        match cli.command {
            Command::Serve {
                transport, port, ..
            } => {
                assert_eq!(transport, Transport::Http);
                assert_eq!(port, 3000);
            }
            Command::Tools => unreachable!("expected serve"),
        }
    }
}
