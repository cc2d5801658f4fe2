//! Permission discovery tool handlers.

use super::{action_listing, unknown_action};
use crate::aws::permissions::{PermissionDiscovery, PermissionLevel, score_recommendations};
use crate::catalog::CatalogClient;
use crate::mcp::server::ServerState;
use crate::mcp::tool_types::{optional_bool, optional_str, optional_string_list, require_str};
use crate::runtime::RequestContext;
use crate::Result;
use serde_json::{Value, json};

const ACTIONS: &[&str] = &["discover", "access_check", "recommendations_get"];

/// Dispatches a permissions tool call.
///
/// # Errors
///
/// Propagates AWS identity failures; individual probe failures are
/// captured per bucket.
pub async fn execute(
    state: &ServerState,
    ctx: &RequestContext,
    action: Option<&str>,
    params: &Value,
) -> Result<Value> {
    let Some(action) = action else {
        return Ok(action_listing(
            "permissions",
            ACTIONS,
            "AWS permission discovery and bucket recommendations",
        ));
    };

    let session = state.auth.session_for(ctx.auth()).await?;
    let discovery = PermissionDiscovery::new(
        session,
        state.config.permission_cache_ttl,
        state.config.enable_write_probes,
    )
    .with_claims_hint(ctx.auth().clone());

    match action {
        "discover" => discover(state, ctx, &discovery, params).await,
        "access_check" => access_check(&discovery, params).await,
        "recommendations_get" => recommendations(state, ctx, &discovery, params).await,
        other => Err(unknown_action("permissions", other, ACTIONS)),
    }
}

/// Full permission report across candidate buckets.
async fn discover(
    state: &ServerState,
    ctx: &RequestContext,
    discovery: &PermissionDiscovery,
    params: &Value,
) -> Result<Value> {
    if optional_bool(params, "force_refresh", false) {
        PermissionDiscovery::clear_cache();
    }

    let identity = discovery.identity_arn().await?;

    let check_buckets = optional_string_list(params, "check_buckets");
    let buckets = if check_buckets.is_empty() {
        let catalog = CatalogClient::new(&state.config, ctx.token()).ok();
        discovery.enumerate_buckets(catalog.as_ref()).await
    } else {
        check_buckets
    };

    let infos = discovery.discover_all(&buckets).await?;

    let mut categorized = json!({
        "full_access": [],
        "read_write": [],
        "read_only": [],
        "list_only": [],
        "no_access": [],
    });
    for info in &infos {
        if let Some(bucket_list) = categorized[info.permission_level.as_str()].as_array_mut() {
            bucket_list.push(json!(info));
        }
    }

    let writable: Vec<_> = infos
        .iter()
        .filter(|b| b.permission_level.is_writable())
        .cloned()
        .collect();
    let recommendations = score_recommendations(&writable, None, None);

    Ok(json!({
        "user_identity": {"arn": identity},
        "bucket_permissions": infos,
        "categorized_buckets": categorized,
        "recommendations": recommendations,
        "cache_entries": PermissionDiscovery::cache_len(),
        "total_buckets_checked": infos.len(),
    }))
}

/// Detailed access report for one bucket.
async fn access_check(discovery: &PermissionDiscovery, params: &Value) -> Result<Value> {
    let bucket_name = require_str(params, "bucket_name")
        .or_else(|_| require_str(params, "bucket"))?;
    let info = discovery.discover_bucket(&bucket_name).await?;

    let mut guidance: Vec<String> = Vec::new();
    match info.permission_level {
        PermissionLevel::ReadOnly => guidance.push(
            "This bucket appears to be read-only. Consider a different bucket for package \
             creation."
                .to_string(),
        ),
        PermissionLevel::ListOnly => guidance.push(
            "Limited access detected. You can see bucket contents but may not be able to \
             read or write files."
                .to_string(),
        ),
        PermissionLevel::NoAccess => guidance.push(
            "No access detected. Check your AWS permissions or verify the bucket name."
                .to_string(),
        ),
        _ => {}
    }
    if info.can_write {
        guidance.push("This bucket can be used for Quilt package creation.".to_string());
    } else {
        guidance.push(
            "This bucket cannot be used for Quilt package creation (no write access)."
                .to_string(),
        );
    }

    Ok(json!({
        "bucket_name": bucket_name,
        "permission_level": info.permission_level,
        "access_summary": {
            "can_read": info.can_read,
            "can_write": info.can_write,
            "can_list": info.can_list,
        },
        "bucket_region": info.region,
        "last_checked": info.last_checked,
        "error_message": info.error_message,
        "guidance": guidance,
        "quilt_compatible": info.can_write,
        "recommended_for_packages": info.permission_level.is_writable(),
    }))
}

/// Smart bucket recommendations for a target operation.
async fn recommendations(
    state: &ServerState,
    ctx: &RequestContext,
    discovery: &PermissionDiscovery,
    params: &Value,
) -> Result<Value> {
    let source_bucket = optional_str(params, "source_bucket");
    let operation_type =
        optional_str(params, "operation_type").unwrap_or_else(|| "package_creation".to_string());
    let user_context = params.get("user_context").cloned();

    let catalog = CatalogClient::new(&state.config, ctx.token()).ok();
    let buckets = discovery.enumerate_buckets(catalog.as_ref()).await;
    let infos = discovery.discover_all(&buckets).await?;
    let writable: Vec<_> = infos
        .iter()
        .filter(|b| b.permission_level.is_writable())
        .cloned()
        .collect();

    let scored = score_recommendations(
        &writable,
        source_bucket.as_deref(),
        user_context.as_ref(),
    );
    let (primary, alternatives) = if scored.len() > 3 {
        let (head, tail) = scored.split_at(3);
        (head.to_vec(), tail.to_vec())
    } else {
        (scored, Vec::new())
    };

    Ok(json!({
        "operation_type": operation_type,
        "source_bucket": source_bucket,
        "recommendations": {
            "primary_recommendations": primary,
            "alternative_options": alternatives,
        },
        "total_writable_buckets": writable.len(),
        "total_accessible_buckets": infos.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::server::test_auth;

    #[tokio::test]
    async fn test_action_listing() {
        let state = ServerState::for_tests();
        let ctx = RequestContext::new(test_auth());
        let payload = execute(&state, &ctx, None, &json!({})).await.unwrap();
        assert_eq!(payload["module"], json!("permissions"));
        assert_eq!(payload["actions"], json!(ACTIONS));
    }
}
