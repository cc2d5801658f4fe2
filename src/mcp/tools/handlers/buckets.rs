//! S3 object tool handlers.
//!
//! Every operation runs with the caller's AWS session; nothing here uses
//! ambient server credentials unless the token resolves to them.

use super::{action_listing, unknown_action};
use crate::aws::s3::S3Operations;
use crate::mcp::server::ServerState;
use crate::mcp::tool_types::{optional_str, optional_usize, require_str};
use crate::runtime::RequestContext;
use crate::{Error, Result};
use base64::Engine as _;
use serde_json::{Value, json};

const ACTIONS: &[&str] = &[
    "objects_list",
    "object_info",
    "object_text",
    "object_fetch",
    "objects_put",
];

/// Cap applied to text/fetch reads when the caller does not set one.
const DEFAULT_MAX_BYTES: u64 = 65_536;

/// Dispatches a buckets tool call.
///
/// # Errors
///
/// Propagates validation and AWS failures.
pub async fn execute(
    state: &ServerState,
    ctx: &RequestContext,
    action: Option<&str>,
    params: &Value,
) -> Result<Value> {
    let Some(action) = action else {
        return Ok(action_listing(
            "buckets",
            ACTIONS,
            "Direct S3 object operations with the caller's AWS identity",
        ));
    };
    if !ACTIONS.contains(&action) {
        return Err(unknown_action("buckets", action, ACTIONS));
    }

    let bucket = require_str(params, "bucket")?;
    let session = state.auth.session_for(ctx.auth()).await?;
    let s3 = S3Operations::new(&session);

    match action {
        "objects_list" => {
            let prefix = optional_str(params, "prefix").unwrap_or_default();
            let max_keys = optional_usize(params, "max_keys", 100).clamp(1, 1000);
            let continuation = optional_str(params, "continuation_token");
            let page = s3
                .list_objects(
                    &bucket,
                    &prefix,
                    i32::try_from(max_keys).unwrap_or(100),
                    continuation.as_deref(),
                )
                .await?;
            let objects: Vec<Value> = page
                .objects
                .iter()
                .map(|o| {
                    json!({
                        "key": o.key,
                        "size": o.size,
                        "last_modified": o.last_modified,
                        "storage_class": o.storage_class,
                        "s3_uri": format!("s3://{bucket}/{}", o.key),
                    })
                })
                .collect();
            Ok(json!({
                "bucket": bucket,
                "prefix": prefix,
                "objects": objects,
                "count": objects.len(),
                "next_continuation_token": page.next_token,
            }))
        }
        "object_info" => {
            let key = require_str(params, "key")?;
            let info = s3.head_object(&bucket, &key).await?;
            Ok(json!({
                "bucket": bucket,
                "key": key,
                "size": info.size,
                "last_modified": info.last_modified,
                "storage_class": info.storage_class,
                "etag": info.etag,
                "s3_uri": format!("s3://{bucket}/{key}"),
            }))
        }
        "object_text" => {
            let key = require_str(params, "key")?;
            let max_bytes = params
                .get("max_bytes")
                .and_then(Value::as_u64)
                .unwrap_or(DEFAULT_MAX_BYTES);
            let bytes = s3.get_object(&bucket, &key, Some(max_bytes)).await?;
            let truncated = bytes.len() as u64 >= max_bytes;
            Ok(json!({
                "bucket": bucket,
                "key": key,
                "text": String::from_utf8_lossy(&bytes),
                "bytes_read": bytes.len(),
                "truncated": truncated,
            }))
        }
        "object_fetch" => {
            let key = require_str(params, "key")?;
            let max_bytes = params.get("max_bytes").and_then(Value::as_u64);
            let bytes = s3.get_object(&bucket, &key, max_bytes).await?;
            Ok(json!({
                "bucket": bucket,
                "key": key,
                "data_base64": base64::engine::general_purpose::STANDARD.encode(&bytes),
                "bytes_read": bytes.len(),
            }))
        }
        "objects_put" => {
            let key = require_str(params, "key")?;
            let content = params
                .get("content")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    Error::Validation("Parameter 'content' is required for objects_put".to_string())
                })?;
            s3.put_object(&bucket, &key, content.as_bytes().to_vec())
                .await?;
            Ok(json!({
                "bucket": bucket,
                "key": key,
                "bytes_written": content.len(),
                "s3_uri": format!("s3://{bucket}/{key}"),
            }))
        }
        _ => Err(unknown_action("buckets", action, ACTIONS)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::server::test_auth;

    #[tokio::test]
    async fn test_bucket_required() {
        let state = ServerState::for_tests();
        let ctx = RequestContext::new(test_auth());
        let err = execute(&state, &ctx, Some("objects_list"), &json!({}))
            .await
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn test_unknown_action_rejected_before_aws() {
        let state = ServerState::for_tests();
        let ctx = RequestContext::new(test_auth());
        let err = execute(&state, &ctx, Some("bogus"), &json!({"bucket": "b"}))
            .await
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn test_action_listing() {
        let state = ServerState::for_tests();
        let ctx = RequestContext::new(test_auth());
        let payload = execute(&state, &ctx, None, &json!({})).await.unwrap();
        assert_eq!(payload["module"], json!("buckets"));
        assert_eq!(payload["actions"], json!(ACTIONS));
    }
}
