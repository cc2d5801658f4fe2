//! Structured logging initialization.
//!
//! Logs go to stderr so the stdio MCP transport keeps stdout clean for
//! JSON-RPC frames. `RUST_LOG` overrides the default filter.

use tracing_subscriber::EnvFilter;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output for terminals.
    #[default]
    Pretty,
    /// Newline-delimited JSON for log aggregation.
    Json,
}

impl LogFormat {
    /// Parses a format string; unknown values fall back to pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Initializes the global tracing subscriber.
///
/// Safe to call more than once; subsequent calls are no-ops because the
/// global default can only be set once.
pub fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quilt_mcp=info,warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already initialized");
    }
}
