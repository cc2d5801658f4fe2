//! Argument helpers shared by the tool handlers.
//!
//! Every module tool takes `{action, params}`; these helpers pull typed
//! values out of the `params` map with consistent validation errors.

use crate::{Error, Result};
use serde_json::Value;

/// Splits tool-call arguments into `(action, params)`.
///
/// A missing `params` is an empty object; a missing `action` is `None`
/// (tools answer with their action listing).
#[must_use]
pub fn split_arguments(arguments: &Value) -> (Option<String>, Value) {
    let action = arguments
        .get("action")
        .and_then(Value::as_str)
        .map(ToString::to_string);
    let params = arguments
        .get("params")
        .cloned()
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
    (action, params)
}

/// Reads a required string parameter.
///
/// # Errors
///
/// `validation_error` when absent or empty.
pub fn require_str(params: &Value, key: &str) -> Result<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| Error::Validation(format!("Parameter '{key}' is required")))
}

/// Reads an optional string parameter.
#[must_use]
pub fn optional_str(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Reads an optional boolean parameter with a default.
#[must_use]
pub fn optional_bool(params: &Value, key: &str, default: bool) -> bool {
    params.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// Reads an optional unsigned parameter with a default.
#[must_use]
pub fn optional_usize(params: &Value, key: &str, default: usize) -> usize {
    params
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default)
}

/// Reads an optional string-array parameter.
#[must_use]
pub fn optional_string_list(params: &Value, key: &str) -> Vec<String> {
    params
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Resolves the effective offset: explicit `offset` wins, else a 1-based
/// `page` is converted (`offset = (page - 1) * limit`).
#[must_use]
pub fn resolve_offset(params: &Value, limit: usize) -> usize {
    if let Some(offset) = params.get("offset").and_then(Value::as_u64) {
        return usize::try_from(offset).unwrap_or(0);
    }
    params
        .get("page")
        .and_then(Value::as_u64)
        .and_then(|page| usize::try_from(page).ok())
        .map_or(0, |page| page.saturating_sub(1) * limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_arguments() {
        let (action, params) = split_arguments(&json!({
            "action": "unified_search",
            "params": {"query": "x"},
        }));
        assert_eq!(action.as_deref(), Some("unified_search"));
        assert_eq!(params["query"], json!("x"));
    }

    #[test]
    fn test_split_arguments_defaults() {
        let (action, params) = split_arguments(&json!({}));
        assert!(action.is_none());
        assert!(params.as_object().is_some_and(serde_json::Map::is_empty));
    }

    #[test]
    fn test_require_str() {
        assert_eq!(
            require_str(&json!({"name": " a/b "}), "name").unwrap(),
            "a/b"
        );
        assert!(require_str(&json!({}), "name").is_err());
        assert!(require_str(&json!({"name": "  "}), "name").is_err());
        assert!(require_str(&json!({"name": 42}), "name").is_err());
    }

    #[test]
    fn test_optional_helpers() {
        let params = json!({"flag": true, "n": 7, "list": ["a", "b"]});
        assert!(optional_bool(&params, "flag", false));
        assert!(optional_bool(&params, "missing", true));
        assert_eq!(optional_usize(&params, "n", 1), 7);
        assert_eq!(optional_usize(&params, "missing", 1), 1);
        assert_eq!(optional_string_list(&params, "list"), vec!["a", "b"]);
        assert!(optional_str(&params, "missing").is_none());
    }

    #[test]
    fn test_resolve_offset_explicit_wins() {
        assert_eq!(resolve_offset(&json!({"offset": 40, "page": 3}), 20), 40);
    }

    #[test]
    fn test_resolve_offset_from_page() {
        assert_eq!(resolve_offset(&json!({"page": 3}), 20), 40);
        assert_eq!(resolve_offset(&json!({"page": 1}), 20), 0);
        assert_eq!(resolve_offset(&json!({"page": 0}), 20), 0);
        assert_eq!(resolve_offset(&json!({}), 20), 0);
    }
}
