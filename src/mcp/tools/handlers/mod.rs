//! Tool execution handlers.
//!
//! One module per tool; handlers receive the shared server state and the
//! request context, return success payloads, and propagate errors for
//! the dispatcher to serialize.

pub mod buckets;
pub mod governance;
pub mod packaging;
pub mod permissions;
pub mod search;
pub mod workflow;

use crate::Error;
use serde_json::{Value, json};

/// Answers an action-less call with the tool's action listing.
pub(crate) fn action_listing(module: &str, actions: &[&str], description: &str) -> Value {
    json!({
        "module": module,
        "actions": actions,
        "description": description,
    })
}

/// Rejects an unknown action with the available ones.
pub(crate) fn unknown_action(module: &str, action: &str, actions: &[&str]) -> Error {
    Error::Validation(format!(
        "Unknown {module} action '{action}'. Available actions: {}",
        actions.join(", ")
    ))
}
