//! MCP server implementation.
//!
//! JSON-RPC dispatch over stdio or HTTP: authenticate the bearer token,
//! bind a request context, authorize the tool call, run the handler, and
//! serialize the result into the wire envelope.

mod dispatch;
mod resources;
mod server;
mod tool_types;
mod tools;

pub use dispatch::McpMethod;
pub use resources::ResourceRegistry;
pub use server::{McpServer, ServerState};
pub use tools::{ToolDefinition, ToolRegistry};
