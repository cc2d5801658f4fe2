//! Packaging tool handlers.

use super::{action_listing, unknown_action};
use crate::aws::permissions::PermissionDiscovery;
use crate::aws::s3::S3Operations;
use crate::catalog::CatalogClient;
use crate::mcp::server::ServerState;
use crate::mcp::tool_types::{optional_str, require_str};
use crate::packaging::{CreateRequest, PackageWritePipeline, metadata_template, metadata_templates};
use crate::runtime::RequestContext;
use crate::{Error, Result};
use serde_json::{Value, json};

const ACTIONS: &[&str] = &[
    "browse",
    "create",
    "update",
    "delete",
    "metadata_templates",
    "get_template",
];

/// Dispatches a packaging tool call.
///
/// # Errors
///
/// Propagates validation, authorization, and catalog failures.
pub async fn execute(
    state: &ServerState,
    ctx: &RequestContext,
    action: Option<&str>,
    params: &Value,
) -> Result<Value> {
    let Some(action) = action else {
        return Ok(action_listing(
            "packaging",
            ACTIONS,
            "Package management via the Quilt catalog; use search for package discovery",
        ));
    };
    match action {
        "browse" => browse(state, ctx, params).await,
        "create" => write(state, ctx, params, WriteKind::Create).await,
        "update" => write(state, ctx, params, WriteKind::Update).await,
        "delete" => delete(state, ctx, params).await,
        "metadata_templates" => Ok(json!({"templates": metadata_templates()})),
        "get_template" => {
            let name = optional_str(params, "template_name").unwrap_or_else(|| "standard".to_string());
            Ok(json!({"template": metadata_template(&name)?, "name": name}))
        }
        other => Err(unknown_action("packaging", other, ACTIONS)),
    }
}

/// Browses a package's entries.
async fn browse(state: &ServerState, ctx: &RequestContext, params: &Value) -> Result<Value> {
    let name = require_str(params, "name")?;
    let Some(bucket) = optional_str(params, "bucket") else {
        return Err(Error::Validation(format!(
            "Bucket parameter required for package browsing. Specify the bucket holding \
             package '{name}'"
        )));
    };
    let catalog = CatalogClient::new(&state.config, ctx.token())?;
    let entries = catalog.package_entries(&name, None).await?;
    Ok(json!({
        "package": {
            "name": name,
            "bucket": bucket,
            "entries": entries,
        },
    }))
}

enum WriteKind {
    Create,
    Update,
}

/// Runs the write pipeline for create/update.
async fn write(
    state: &ServerState,
    ctx: &RequestContext,
    params: &Value,
    kind: WriteKind,
) -> Result<Value> {
    let request = CreateRequest::from_params(params)?;
    let catalog = CatalogClient::new(&state.config, ctx.token())?;

    // The AWS session powers discovery and README staging; a session
    // failure degrades both rather than failing the write outright.
    let (discovery, s3) = match state.auth.session_for(ctx.auth()).await {
        Ok(session) => {
            let discovery = PermissionDiscovery::new(
                session.clone(),
                state.config.permission_cache_ttl,
                state.config.enable_write_probes,
            )
            .with_claims_hint(ctx.auth().clone());
            (Some(discovery), Some(S3Operations::new(&session)))
        }
        Err(e) => {
            tracing::warn!(error = %e, "AWS session unavailable; skipping permission discovery");
            (None, None)
        }
    };

    let pipeline = PackageWritePipeline::new(
        &state.config,
        &catalog,
        discovery.as_ref(),
        s3.as_ref(),
    );
    let outcome = match kind {
        WriteKind::Create => pipeline.create(&request).await?,
        WriteKind::Update => pipeline.update(&request).await?,
    };
    serde_json::to_value(&outcome)
        .map_err(|e| Error::Internal(format!("failed to serialize write outcome: {e}")))
}

/// Deletes a package.
async fn delete(state: &ServerState, ctx: &RequestContext, params: &Value) -> Result<Value> {
    let name = require_str(params, "name")?;
    crate::packaging::validate_package_name(&name)?;
    let catalog = CatalogClient::new(&state.config, ctx.token())?;
    let response = catalog.package_delete(&name).await?;
    Ok(json!({
        "package_name": name,
        "result": response,
        "message": format!("Package '{name}' deleted"),
    }))
}
