//! Catalog administration operations (users, roles, SSO, policies).
//!
//! One typed client for the whole admin surface; every mutation returning
//! a union goes through [`decode_union`](super::union::decode_union) so
//! `InvalidInput`/`OperationError` always surface as the same error
//! kinds.

use super::client::CatalogClient;
use super::union::decode_union;
use crate::{Error, Result};
use serde_json::{Value, json};

/// Role selection fragment shared by the user queries.
const ROLE_FRAGMENT: &str = r"
  role {
    ... on ManagedRole { name arn }
    ... on UnmanagedRole { name arn }
  }
  extraRoles {
    ... on ManagedRole { name arn }
    ... on UnmanagedRole { name arn }
  }";

/// One bucket permission entry on a managed policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyPermission {
    /// Bucket name.
    pub bucket: String,
    /// Permission level: `READ` or `READ_WRITE`.
    pub level: String,
}

impl PolicyPermission {
    /// Validates and normalizes a raw permission entry.
    ///
    /// # Errors
    ///
    /// `validation_error` when the bucket is empty or the level is not
    /// `READ`/`READ_WRITE`.
    pub fn parse(raw: &Value) -> Result<Self> {
        let bucket = raw
            .get("bucket")
            .or_else(|| raw.get("bucket_name"))
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if bucket.is_empty() {
            return Err(Error::Validation(
                "Each permission must include a bucket value".to_string(),
            ));
        }
        let level = raw
            .get("level")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default()
            .to_uppercase();
        if level != "READ" && level != "READ_WRITE" {
            return Err(Error::Validation(
                "Permission level must be READ or READ_WRITE".to_string(),
            ));
        }
        Ok(Self { bucket, level })
    }

    /// Parses a list of entries, requiring at least one.
    ///
    /// # Errors
    ///
    /// `validation_error` for an empty list or any malformed entry.
    pub fn parse_list(raw: &[Value]) -> Result<Vec<Self>> {
        if raw.is_empty() {
            return Err(Error::Validation(
                "Managed policies require at least one permission entry".to_string(),
            ));
        }
        raw.iter().map(Self::parse).collect()
    }

    fn to_input(&self) -> Value {
        json!({"bucket": self.bucket, "level": self.level})
    }
}

impl CatalogClient {
    /// Lists catalog users.
    ///
    /// # Errors
    ///
    /// Propagates catalog failures.
    pub async fn admin_users_list(&self) -> Result<Vec<Value>> {
        let query = format!(
            r"query AdminUsersList {{
              admin {{
                user {{
                  list {{
                    name
                    email
                    dateJoined
                    lastLogin
                    isActive
                    isAdmin
                    isSsoOnly
                    isService
                    {ROLE_FRAGMENT}
                  }}
                }}
              }}
            }}"
        );
        let data = self.graphql(&query, json!({})).await?;
        Ok(data["admin"]["user"]["list"]
            .as_array()
            .cloned()
            .unwrap_or_default())
    }

    /// Fetches one user by name.
    ///
    /// # Errors
    ///
    /// `not_found` when the user does not exist.
    pub async fn admin_user_get(&self, name: &str) -> Result<Value> {
        let query = format!(
            r"query AdminUserGet($name: String!) {{
              admin {{
                user {{
                  get(name: $name) {{
                    name
                    email
                    dateJoined
                    lastLogin
                    isActive
                    isAdmin
                    isSsoOnly
                    isService
                    {ROLE_FRAGMENT}
                  }}
                }}
              }}
            }}"
        );
        let data = self.graphql(&query, json!({"name": name})).await?;
        let user = data["admin"]["user"]["get"].clone();
        if user.is_null() {
            return Err(Error::NotFound(format!("User '{name}' not found")));
        }
        Ok(user)
    }

    /// Creates a user.
    ///
    /// # Errors
    ///
    /// `validation_error`/`catalog_error` from the union result.
    pub async fn admin_user_create(
        &self,
        name: &str,
        email: &str,
        role: &str,
        extra_roles: &[String],
    ) -> Result<Value> {
        let mutation = r"
        mutation AdminUserCreate($input: UserInput!) {
          admin {
            user {
              create(input: $input) {
                __typename
                ... on User {
                  name
                  email
                  isActive
                  isAdmin
                }
                ... on InvalidInput { errors { name message path } }
                ... on OperationError { message name }
              }
            }
          }
        }";
        let data = self
            .graphql(
                mutation,
                json!({
                    "input": {
                        "name": name,
                        "email": email,
                        "role": role,
                        "extraRoles": extra_roles,
                    }
                }),
            )
            .await?;
        decode_union(data["admin"]["user"]["create"].clone(), &["User"])
    }

    /// Deletes a user.
    ///
    /// # Errors
    ///
    /// `validation_error`/`catalog_error` from the union result.
    pub async fn admin_user_delete(&self, name: &str) -> Result<Value> {
        let mutation = r"
        mutation AdminUserDelete($name: String!) {
          admin {
            user {
              mutate(name: $name) {
                delete {
                  __typename
                  ... on Ok { _ }
                  ... on InvalidInput { errors { name message path } }
                  ... on OperationError { message name }
                }
              }
            }
          }
        }";
        let data = self.graphql(mutation, json!({"name": name})).await?;
        let payload = data["admin"]["user"]["mutate"]["delete"].clone();
        if payload.is_null() {
            return Err(Error::NotFound(format!("User '{name}' not found")));
        }
        decode_union(payload, &[])
    }

    /// Updates a user's email.
    ///
    /// # Errors
    ///
    /// `validation_error`/`catalog_error` from the union result.
    pub async fn admin_user_set_email(&self, name: &str, email: &str) -> Result<Value> {
        self.user_mutation(
            name,
            "setEmail",
            "email: $value",
            json!({"name": name, "value": email}),
            "$value: String!",
        )
        .await
    }

    /// Grants or revokes catalog admin.
    ///
    /// # Errors
    ///
    /// `validation_error`/`catalog_error` from the union result.
    pub async fn admin_user_set_admin(&self, name: &str, admin: bool) -> Result<Value> {
        self.user_mutation(
            name,
            "setAdmin",
            "admin: $value",
            json!({"name": name, "value": admin}),
            "$value: Boolean!",
        )
        .await
    }

    /// Activates or deactivates a user.
    ///
    /// # Errors
    ///
    /// `validation_error`/`catalog_error` from the union result.
    pub async fn admin_user_set_active(&self, name: &str, active: bool) -> Result<Value> {
        self.user_mutation(
            name,
            "setActive",
            "active: $value",
            json!({"name": name, "value": active}),
            "$value: Boolean!",
        )
        .await
    }

    /// Assigns a user's primary role.
    ///
    /// # Errors
    ///
    /// `validation_error`/`catalog_error` from the union result.
    pub async fn admin_user_set_role(&self, name: &str, role: &str) -> Result<Value> {
        self.user_mutation(
            name,
            "setRole",
            "role: $value",
            json!({"name": name, "value": role}),
            "$value: String!",
        )
        .await
    }

    /// Shared shape of the per-user field mutations.
    async fn user_mutation(
        &self,
        name: &str,
        field: &str,
        args: &str,
        variables: Value,
        value_decl: &str,
    ) -> Result<Value> {
        let mutation = format!(
            r"mutation AdminUserMutate($name: String!, {value_decl}) {{
              admin {{
                user {{
                  mutate(name: $name) {{
                    {field}({args}) {{
                      __typename
                      ... on User {{ name email isActive isAdmin }}
                      ... on InvalidInput {{ errors {{ name message path }} }}
                      ... on OperationError {{ message name }}
                    }}
                  }}
                }}
              }}
            }}"
        );
        let data = self.graphql(&mutation, variables).await?;
        let payload = data["admin"]["user"]["mutate"][field].clone();
        if payload.is_null() {
            return Err(Error::NotFound(format!("User '{name}' not found")));
        }
        decode_union(payload, &["User"])
    }

    /// Lists roles.
    ///
    /// # Errors
    ///
    /// Propagates catalog failures.
    pub async fn admin_roles_list(&self) -> Result<Vec<Value>> {
        let query = r"
        query AdminRolesList {
          roles {
            ... on ManagedRole { id name arn typename: __typename }
            ... on UnmanagedRole { id name arn typename: __typename }
          }
        }";
        let data = self.graphql(query, json!({})).await?;
        Ok(data["roles"].as_array().cloned().unwrap_or_default())
    }

    /// Creates an unmanaged role bound to an existing ARN.
    ///
    /// # Errors
    ///
    /// `validation_error`/`catalog_error` from the union result.
    pub async fn admin_role_create(&self, name: &str, arn: &str) -> Result<Value> {
        let mutation = r"
        mutation AdminRoleCreate($input: UnmanagedRoleInput!) {
          roleCreateUnmanaged(input: $input) {
            __typename
            ... on RoleCreateSuccess {
              role {
                ... on UnmanagedRole { id name arn }
                ... on ManagedRole { id name arn }
              }
            }
            ... on InvalidInput { errors { name message path } }
            ... on OperationError { message name }
          }
        }";
        let data = self
            .graphql(mutation, json!({"input": {"name": name, "arn": arn}}))
            .await?;
        decode_union(
            data["roleCreateUnmanaged"].clone(),
            &["RoleCreateSuccess"],
        )
    }

    /// Deletes a role by id.
    ///
    /// # Errors
    ///
    /// `validation_error`/`catalog_error` from the union result.
    pub async fn admin_role_delete(&self, role_id: &str) -> Result<Value> {
        let mutation = r"
        mutation AdminRoleDelete($id: ID!) {
          roleDelete(id: $id) {
            __typename
            ... on RoleDeleteSuccess { _ }
            ... on InvalidInput { errors { name message path } }
            ... on OperationError { message name }
          }
        }";
        let data = self.graphql(mutation, json!({"id": role_id})).await?;
        decode_union(data["roleDelete"].clone(), &["RoleDeleteSuccess"])
    }

    /// Reads the SSO configuration (serialized JSON text, may be absent).
    ///
    /// # Errors
    ///
    /// Propagates catalog failures.
    pub async fn admin_sso_config_get(&self) -> Result<Option<String>> {
        let query = r"
        query AdminSsoConfigGet {
          admin {
            ssoConfig { text timestamp uploader { name } }
          }
        }";
        let data = self.graphql(query, json!({})).await?;
        Ok(data["admin"]["ssoConfig"]["text"]
            .as_str()
            .map(ToString::to_string))
    }

    /// Replaces (or with `None` removes) the SSO configuration.
    ///
    /// # Errors
    ///
    /// `validation_error`/`catalog_error` from the union result.
    pub async fn admin_sso_config_set(&self, config: Option<&str>) -> Result<Value> {
        let mutation = r"
        mutation AdminSsoConfigSet($config: String) {
          admin {
            setSsoConfig(config: $config) {
              __typename
              ... on SsoConfig { text timestamp }
              ... on InvalidInput { errors { name message path } }
              ... on OperationError { message name }
            }
          }
        }";
        let data = self.graphql(mutation, json!({"config": config})).await?;
        let payload = data["admin"]["setSsoConfig"].clone();
        if payload.is_null() {
            // Removing the config returns null payload on success.
            return Ok(json!({"removed": true}));
        }
        decode_union(payload, &["SsoConfig"])
    }

    /// Lists policies.
    ///
    /// # Errors
    ///
    /// Propagates catalog failures.
    pub async fn admin_policies_list(&self) -> Result<Vec<Value>> {
        let query = r"
        query AdminPoliciesList {
          policies {
            id
            title
            arn
            managed
            permissions { bucket { name } level }
            roles { id name }
          }
        }";
        let data = self.graphql(query, json!({})).await?;
        Ok(data["policies"].as_array().cloned().unwrap_or_default())
    }

    /// Fetches one policy by id.
    ///
    /// # Errors
    ///
    /// `not_found` when the policy does not exist.
    pub async fn admin_policy_get(&self, policy_id: &str) -> Result<Value> {
        let query = r"
        query AdminPolicyGet($policyId: ID!) {
          policy(id: $policyId) {
            id
            title
            arn
            managed
            permissions { bucket { name } level }
          }
        }";
        let data = self.graphql(query, json!({"policyId": policy_id})).await?;
        let policy = data["policy"].clone();
        if policy.is_null() {
            return Err(Error::NotFound(format!("Policy '{policy_id}' not found")));
        }
        Ok(policy)
    }

    /// Creates a managed policy with validated permission entries.
    ///
    /// # Errors
    ///
    /// `validation_error` for rejected inputs, `catalog_error` for
    /// operation failures.
    pub async fn admin_policy_create_managed(
        &self,
        title: &str,
        permissions: &[PolicyPermission],
        roles: &[String],
    ) -> Result<Value> {
        let mutation = r"
        mutation AdminPolicyCreateManaged($input: ManagedPolicyInput!) {
          policyCreateManaged(input: $input) {
            __typename
            ... on Policy { id title arn managed }
            ... on InvalidInput { errors { name message path } }
            ... on OperationError { message name }
          }
        }";
        let permission_inputs: Vec<Value> =
            permissions.iter().map(PolicyPermission::to_input).collect();
        let data = self
            .graphql(
                mutation,
                json!({
                    "input": {
                        "title": title,
                        "permissions": permission_inputs,
                        "roles": roles,
                    }
                }),
            )
            .await?;
        decode_union(data["policyCreateManaged"].clone(), &["Policy"])
    }

    /// Creates an unmanaged policy bound to an existing ARN.
    ///
    /// # Errors
    ///
    /// `validation_error`/`catalog_error` from the union result.
    pub async fn admin_policy_create_unmanaged(
        &self,
        title: &str,
        arn: &str,
        roles: &[String],
    ) -> Result<Value> {
        let mutation = r"
        mutation AdminPolicyCreateUnmanaged($input: UnmanagedPolicyInput!) {
          policyCreateUnmanaged(input: $input) {
            __typename
            ... on Policy { id title arn managed }
            ... on InvalidInput { errors { name message path } }
            ... on OperationError { message name }
          }
        }";
        let data = self
            .graphql(
                mutation,
                json!({
                    "input": {"title": title, "arn": arn, "roles": roles}
                }),
            )
            .await?;
        decode_union(data["policyCreateUnmanaged"].clone(), &["Policy"])
    }

    /// Updates a managed policy's title and permission entries.
    ///
    /// # Errors
    ///
    /// `validation_error`/`catalog_error` from the union result.
    pub async fn admin_policy_update_managed(
        &self,
        policy_id: &str,
        title: &str,
        permissions: &[PolicyPermission],
    ) -> Result<Value> {
        let mutation = r"
        mutation AdminPolicyUpdateManaged($id: ID!, $input: ManagedPolicyInput!) {
          policyUpdateManaged(id: $id, input: $input) {
            __typename
            ... on Policy { id title arn managed }
            ... on InvalidInput { errors { name message path } }
            ... on OperationError { message name }
          }
        }";
        let permission_inputs: Vec<Value> =
            permissions.iter().map(PolicyPermission::to_input).collect();
        let data = self
            .graphql(
                mutation,
                json!({
                    "id": policy_id,
                    "input": {"title": title, "permissions": permission_inputs},
                }),
            )
            .await?;
        decode_union(data["policyUpdateManaged"].clone(), &["Policy"])
    }

    /// Deletes a policy by id.
    ///
    /// # Errors
    ///
    /// `validation_error`/`catalog_error` from the union result.
    pub async fn admin_policy_delete(&self, policy_id: &str) -> Result<Value> {
        let mutation = r"
        mutation AdminPolicyDelete($id: ID!) {
          policyDelete(id: $id) {
            __typename
            ... on Ok { _ }
            ... on InvalidInput { errors { name message path } }
            ... on OperationError { message name }
          }
        }";
        let data = self.graphql(mutation, json!({"id": policy_id})).await?;
        decode_union(data["policyDelete"].clone(), &[])
    }
}
