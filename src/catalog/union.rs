//! GraphQL union-result decoding.
//!
//! Catalog mutations return unions of a success shape plus `InvalidInput`
//! and `OperationError`. Decoding happens exactly once, here, so every
//! admin/tabulator operation surfaces the same error taxonomy.

use crate::{Error, Result};
use serde_json::Value;

/// Decodes a union payload into its success shape.
///
/// Accepts `__typename` equal to `"Ok"` or any of `success_types`; a
/// payload without `__typename` is treated as the success shape (some
/// queries omit it). The `__typename` marker is stripped from the
/// returned value.
///
/// # Errors
///
/// - `InvalidInput` → `validation_error` with the joined messages.
/// - `OperationError` → `catalog_error` with the upstream message.
/// - Any other typename → `catalog_error`.
pub fn decode_union(payload: Value, success_types: &[&str]) -> Result<Value> {
    let Some(object) = payload.as_object() else {
        return Err(Error::Catalog {
            status: None,
            message: "unexpected non-object mutation response".to_string(),
        });
    };

    let typename = object.get("__typename").and_then(Value::as_str);
    match typename {
        None | Some("Ok") => Ok(strip_typename(payload)),
        Some(name) if success_types.contains(&name) => Ok(strip_typename(payload)),
        Some("InvalidInput") => {
            let messages = object
                .get("errors")
                .and_then(Value::as_array)
                .map(|errors| {
                    errors
                        .iter()
                        .map(|e| {
                            e.get("message")
                                .and_then(Value::as_str)
                                .unwrap_or("Invalid input")
                                .to_string()
                        })
                        .collect::<Vec<_>>()
                        .join("; ")
                })
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Invalid input".to_string());
            Err(Error::Validation(messages))
        }
        Some("OperationError") => {
            let message = object
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Operation failed")
                .to_string();
            Err(Error::Catalog {
                status: None,
                message,
            })
        }
        Some(other) => Err(Error::Catalog {
            status: None,
            message: format!("unexpected mutation result type '{other}'"),
        }),
    }
}

fn strip_typename(mut payload: Value) -> Value {
    if let Some(object) = payload.as_object_mut() {
        object.remove("__typename");
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_typename() {
        let decoded = decode_union(json!({"__typename": "Ok"}), &[]).unwrap();
        assert_eq!(decoded, json!({}));
    }

    #[test]
    fn test_expected_success_type_strips_marker() {
        let decoded = decode_union(
            json!({"__typename": "BucketConfig", "name": "b", "tabulatorTables": []}),
            &["BucketConfig"],
        )
        .unwrap();
        assert_eq!(decoded, json!({"name": "b", "tabulatorTables": []}));
    }

    #[test]
    fn test_missing_typename_is_success() {
        let decoded = decode_union(json!({"name": "b"}), &["User"]).unwrap();
        assert_eq!(decoded["name"], json!("b"));
    }

    #[test]
    fn test_invalid_input_joins_messages() {
        let err = decode_union(
            json!({
                "__typename": "InvalidInput",
                "errors": [
                    {"message": "name taken", "path": "name"},
                    {"message": "bad email"},
                ],
            }),
            &["User"],
        )
        .map(|_| ())
        .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
        assert_eq!(err.to_string(), "name taken; bad email");
    }

    #[test]
    fn test_invalid_input_without_errors() {
        let err = decode_union(json!({"__typename": "InvalidInput"}), &[])
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid input");
    }

    #[test]
    fn test_operation_error() {
        let err = decode_union(
            json!({"__typename": "OperationError", "message": "backend down"}),
            &[],
        )
        .map(|_| ())
        .unwrap_err();
        assert_eq!(err.kind(), "catalog_error");
        assert!(err.to_string().contains("backend down"));
    }

    #[test]
    fn test_unknown_typename() {
        let err = decode_union(json!({"__typename": "Surprise"}), &["User"])
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.kind(), "catalog_error");
        assert!(err.to_string().contains("Surprise"));
    }

    #[test]
    fn test_non_object_payload() {
        let err = decode_union(json!([1, 2]), &[]).map(|_| ()).unwrap_err();
        assert_eq!(err.kind(), "catalog_error");
    }
}
