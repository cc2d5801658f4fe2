//! Governance tool handlers.
//!
//! Thin dispatch over the consolidated admin client; union decoding and
//! input validation live in the catalog layer.

use super::{action_listing, unknown_action};
use crate::catalog::{CatalogClient, PolicyPermission};
use crate::mcp::server::ServerState;
use crate::mcp::tool_types::{optional_str, optional_string_list, require_str};
use crate::runtime::RequestContext;
use crate::{Error, Result};
use serde_json::{Value, json};

const ACTIONS: &[&str] = &[
    "users_list",
    "user_get",
    "user_create",
    "user_delete",
    "user_set_email",
    "user_set_admin",
    "user_set_active",
    "user_set_role",
    "roles_list",
    "role_create",
    "role_delete",
    "sso_config_get",
    "sso_config_set",
    "policies_list",
    "policy_get",
    "policy_create_managed",
    "policy_create_unmanaged",
    "policy_update_managed",
    "policy_delete",
    "tabulator_list",
    "tabulator_create",
    "tabulator_rename",
    "tabulator_delete",
    "tabulator_open_query_get",
    "tabulator_open_query_set",
];

/// Dispatches a governance tool call.
///
/// # Errors
///
/// Propagates validation and catalog failures; union mutation errors
/// surface as `validation_error`/`catalog_error`.
#[allow(clippy::too_many_lines)]
pub async fn execute(
    state: &ServerState,
    ctx: &RequestContext,
    action: Option<&str>,
    params: &Value,
) -> Result<Value> {
    let Some(action) = action else {
        return Ok(action_listing(
            "governance",
            ACTIONS,
            "Catalog administration: users, roles, SSO, policies, tabulator",
        ));
    };

    let catalog = CatalogClient::new(&state.config, ctx.token())?;

    match action {
        "users_list" => {
            let users = catalog.admin_users_list().await?;
            Ok(json!({"users": users, "count": users.len()}))
        }
        "user_get" => {
            let name = require_str(params, "name")?;
            Ok(json!({"user": catalog.admin_user_get(&name).await?}))
        }
        "user_create" => {
            let name = require_str(params, "name")?;
            let email = require_str(params, "email")?;
            if !email.contains('@') || !email.contains('.') {
                return Err(Error::Validation(format!("Invalid email format: {email}")));
            }
            let role = require_str(params, "role")?;
            let extra_roles = optional_string_list(params, "extra_roles");
            let user = catalog
                .admin_user_create(&name, &email, &role, &extra_roles)
                .await?;
            Ok(json!({"user": user}))
        }
        "user_delete" => {
            let name = require_str(params, "name")?;
            catalog.admin_user_delete(&name).await?;
            Ok(json!({"message": format!("User '{name}' deleted")}))
        }
        "user_set_email" => {
            let name = require_str(params, "name")?;
            let email = require_str(params, "email")?;
            Ok(json!({"user": catalog.admin_user_set_email(&name, &email).await?}))
        }
        "user_set_admin" => {
            let name = require_str(params, "name")?;
            let admin = params
                .get("admin")
                .and_then(Value::as_bool)
                .ok_or_else(|| Error::Validation("Parameter 'admin' is required".to_string()))?;
            Ok(json!({"user": catalog.admin_user_set_admin(&name, admin).await?}))
        }
        "user_set_active" => {
            let name = require_str(params, "name")?;
            let active = params
                .get("active")
                .and_then(Value::as_bool)
                .ok_or_else(|| Error::Validation("Parameter 'active' is required".to_string()))?;
            Ok(json!({"user": catalog.admin_user_set_active(&name, active).await?}))
        }
        "user_set_role" => {
            let name = require_str(params, "name")?;
            let role = require_str(params, "role")?;
            Ok(json!({"user": catalog.admin_user_set_role(&name, &role).await?}))
        }
        "roles_list" => {
            let roles = catalog.admin_roles_list().await?;
            Ok(json!({"roles": roles, "count": roles.len()}))
        }
        "role_create" => {
            let name = require_str(params, "name")?;
            let arn = require_str(params, "arn")?;
            Ok(json!({"role": catalog.admin_role_create(&name, &arn).await?}))
        }
        "role_delete" => {
            let role_id = require_str(params, "role_id")?;
            catalog.admin_role_delete(&role_id).await?;
            Ok(json!({"message": format!("Role '{role_id}' deleted")}))
        }
        "sso_config_get" => {
            let config = catalog.admin_sso_config_get().await?;
            Ok(json!({"config": config, "configured": config.is_some()}))
        }
        "sso_config_set" => {
            // Config arrives as an object or a serialized string; null
            // removes the configuration.
            let config = match params.get("config") {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => Some(serde_json::to_string(other).map_err(|e| {
                    Error::Internal(format!("failed to serialize SSO config: {e}"))
                })?),
            };
            let result = catalog.admin_sso_config_set(config.as_deref()).await?;
            Ok(json!({"result": result}))
        }
        "policies_list" => {
            let policies = catalog.admin_policies_list().await?;
            Ok(json!({"policies": policies, "count": policies.len()}))
        }
        "policy_get" => {
            let policy_id = require_str(params, "policy_id")?;
            Ok(json!({"policy": catalog.admin_policy_get(&policy_id).await?}))
        }
        "policy_create_managed" => {
            let title = require_str(params, "title")?;
            let raw_permissions = params
                .get("permissions")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let permissions = PolicyPermission::parse_list(&raw_permissions)?;
            let roles = optional_string_list(params, "roles");
            let policy = catalog
                .admin_policy_create_managed(&title, &permissions, &roles)
                .await?;
            Ok(json!({"policy": policy}))
        }
        "policy_create_unmanaged" => {
            let title = require_str(params, "title")?;
            let arn = require_str(params, "arn")?;
            let roles = optional_string_list(params, "roles");
            let policy = catalog
                .admin_policy_create_unmanaged(&title, &arn, &roles)
                .await?;
            Ok(json!({"policy": policy}))
        }
        "policy_update_managed" => {
            let policy_id = require_str(params, "policy_id")?;
            let title = require_str(params, "title")?;
            let raw_permissions = params
                .get("permissions")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let permissions = PolicyPermission::parse_list(&raw_permissions)?;
            let policy = catalog
                .admin_policy_update_managed(&policy_id, &title, &permissions)
                .await?;
            Ok(json!({"policy": policy}))
        }
        "policy_delete" => {
            let policy_id = require_str(params, "policy_id")?;
            catalog.admin_policy_delete(&policy_id).await?;
            Ok(json!({"message": format!("Policy '{policy_id}' deleted")}))
        }
        "tabulator_list" => {
            let bucket_name = require_str(params, "bucket_name")?;
            let tables = catalog.tabulator_tables_list(&bucket_name).await?;
            Ok(json!({"bucket": bucket_name, "tables": tables, "count": tables.len()}))
        }
        "tabulator_create" => {
            let bucket_name = require_str(params, "bucket_name")?;
            let table_name = require_str(params, "table_name")?;
            let config_yaml = require_str(params, "config_yaml")?;
            let tables = catalog
                .tabulator_table_set(&bucket_name, &table_name, Some(&config_yaml))
                .await?;
            Ok(json!({
                "bucket": bucket_name,
                "table": table_name,
                "tables": tables,
            }))
        }
        "tabulator_rename" => {
            let bucket_name = require_str(params, "bucket_name")?;
            let table_name = require_str(params, "table_name")?;
            let new_table_name = require_str(params, "new_table_name")?;
            let tables = catalog
                .tabulator_table_rename(&bucket_name, &table_name, &new_table_name)
                .await?;
            Ok(json!({
                "bucket": bucket_name,
                "table": new_table_name,
                "tables": tables,
            }))
        }
        "tabulator_delete" => {
            // Deleting a table is setting its config to null.
            let bucket_name = require_str(params, "bucket_name")?;
            let table_name = require_str(params, "table_name")?;
            let tables = catalog
                .tabulator_table_set(&bucket_name, &table_name, None)
                .await?;
            Ok(json!({
                "bucket": bucket_name,
                "deleted": table_name,
                "tables": tables,
            }))
        }
        "tabulator_open_query_get" => {
            let enabled = catalog.tabulator_open_query_get().await?;
            Ok(json!({"open_query_enabled": enabled}))
        }
        "tabulator_open_query_set" => {
            let enabled = params
                .get("enabled")
                .and_then(Value::as_bool)
                .ok_or_else(|| Error::Validation("Parameter 'enabled' is required".to_string()))?;
            let now = catalog.tabulator_open_query_set(enabled).await?;
            Ok(json!({"open_query_enabled": now}))
        }
        other => Err(unknown_action("governance", other, ACTIONS)),
    }
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
        assert_eq!(payload["module"], json!("governance"));
    }

    #[tokio::test]
    async fn test_user_create_validates_email() {
        let state = ServerState::for_tests();
        let ctx = RequestContext::new(test_auth());
        let err = execute(
            &state,
            &ctx,
            Some("user_create"),
            &json!({"name": "u", "email": "not-an-email", "role": "r"}),
        )
        .await
        .map(|_| ())
        .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn test_policy_create_requires_permissions() {
        let state = ServerState::for_tests();
        let ctx = RequestContext::new(test_auth());
        let err = execute(
            &state,
            &ctx,
            Some("policy_create_managed"),
            &json!({"title": "t", "permissions": []}),
        )
        .await
        .map(|_| ())
        .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn test_unknown_action_rejected() {
        let state = ServerState::for_tests();
        let ctx = RequestContext::new(test_auth());
        let err = execute(&state, &ctx, Some("nuke"), &json!({}))
            .await
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }
}
