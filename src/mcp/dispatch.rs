//! MCP method dispatch using typed method variants.
//!
//! String matching happens exactly once, at the protocol boundary;
//! everything downstream works with [`McpMethod`] variants.

use std::fmt;

/// MCP protocol method identifier.
///
/// Unknown methods are captured for error reporting; notifications are
/// one-way and never answered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum McpMethod {
    /// Initialize the MCP session.
    Initialize,
    /// List available tools.
    ListTools,
    /// Call a specific tool.
    CallTool,
    /// List available resources.
    ListResources,
    /// Read a specific resource.
    ReadResource,
    /// Health check.
    Ping,
    /// One-way notification (e.g. `notifications/initialized`).
    Notification(String),
    /// Unknown method (for error handling).
    Unknown(String),
}

impl McpMethod {
    /// Returns the MCP protocol method name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Initialize => "initialize",
            Self::ListTools => "tools/list",
            Self::CallTool => "tools/call",
            Self::ListResources => "resources/list",
            Self::ReadResource => "resources/read",
            Self::Ping => "ping",
            Self::Notification(s) | Self::Unknown(s) => s.as_str(),
        }
    }

    /// Returns true if this is a known request method.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<&str> for McpMethod {
    fn from(s: &str) -> Self {
        match s {
            "initialize" => Self::Initialize,
            "tools/list" => Self::ListTools,
            "tools/call" => Self::CallTool,
            "resources/list" => Self::ListResources,
            "resources/read" => Self::ReadResource,
            "ping" => Self::Ping,
            other if other.starts_with("notifications/") => {
                Self::Notification(other.to_string())
            }
            unknown => Self::Unknown(unknown.to_string()),
        }
    }
}

impl fmt::Display for McpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
