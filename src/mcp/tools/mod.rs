//! MCP tool registry and execution.
//!
//! Tools are module-level: each one exposes a set of actions dispatched
//! from `{action, params}` arguments. The registry owns the JSON-Schema
//! definitions; execution routes to the handler modules.

mod definitions;
mod handlers;

use super::server::ServerState;
use super::tool_types::split_arguments;
use crate::runtime::RequestContext;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Definition of one MCP tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON Schema for the tool arguments.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Registry of the server's tools.
pub struct ToolRegistry {
    tools: HashMap<String, ToolDefinition>,
}

impl ToolRegistry {
    /// Creates the registry with every tool the server exposes.
    #[must_use]
    pub fn new() -> Self {
        let mut tools = HashMap::new();
        for definition in [
            definitions::search_tool(),
            definitions::packaging_tool(),
            definitions::buckets_tool(),
            definitions::permissions_tool(),
            definitions::governance_tool(),
            definitions::workflow_tool(),
        ] {
            tools.insert(definition.name.clone(), definition);
        }
        Self { tools }
    }

    /// Returns all tool definitions, sorted by name.
    #[must_use]
    pub fn list_tools(&self) -> Vec<&ToolDefinition> {
        let mut tools: Vec<&ToolDefinition> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Gets a tool definition by name.
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    /// Executes a tool call and returns the success payload.
    ///
    /// # Errors
    ///
    /// `not_found` for unknown tools; everything else propagates from
    /// the handler.
    pub async fn execute(
        &self,
        state: &ServerState,
        ctx: &RequestContext,
        name: &str,
        arguments: &Value,
    ) -> Result<Value> {
        if !self.tools.contains_key(name) {
            return Err(Error::NotFound(format!("Unknown tool: {name}")));
        }
        let (action, params) = split_arguments(arguments);
        let action = action.as_deref();
        match name {
            "search" => handlers::search::execute(state, ctx, action, &params).await,
            "packaging" => handlers::packaging::execute(state, ctx, action, &params).await,
            "buckets" => handlers::buckets::execute(state, ctx, action, &params).await,
            "permissions" => handlers::permissions::execute(state, ctx, action, &params).await,
            "governance" => handlers::governance::execute(state, ctx, action, &params).await,
            "workflow" => handlers::workflow::execute(state, ctx, action, &params),
            other => Err(Error::NotFound(format!("Unknown tool: {other}"))),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
