//! Bearer token authentication and per-tool authorization.

use super::session::AwsSession;
use super::{AuthResult, claims, secret::ResolvedSecret};
use crate::config::ServerConfig;
use crate::{Error, Result};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Outcome of an authorization check.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationDecision {
    /// Whether the call may proceed.
    pub allowed: bool,
    /// Denial reason, when not allowed.
    pub reason: Option<String>,
    /// Required permissions the caller lacks.
    pub missing_permissions: Vec<String>,
    /// Buckets outside the caller's allow-list.
    pub missing_buckets: Vec<String>,
}

impl AuthorizationDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            ..Self::default()
        }
    }

    /// Converts a denial into the matching error; allowed decisions map to `Ok`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Authorization` when the decision denies the call.
    pub fn into_result(self) -> Result<()> {
        if self.allowed {
            return Ok(());
        }
        Err(Error::Authorization {
            reason: self
                .reason
                .unwrap_or_else(|| "Access denied".to_string()),
            missing_permissions: self.missing_permissions,
            missing_buckets: self.missing_buckets,
        })
    }
}

/// Authenticates enhanced catalog JWTs and authorizes tool access.
///
/// One instance per process; the AWS session cache inside is keyed by
/// token so repeated calls from the same identity reuse credentials.
pub struct BearerAuthService {
    secret: ResolvedSecret,
    jwt_kid: String,
    default_region: Option<String>,
    tool_permissions: HashMap<String, Vec<String>>,
    session_cache: RwLock<HashMap<String, AwsSession>>,
}

impl std::fmt::Debug for BearerAuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuthService")
            .field("secret_source", &self.secret.source)
            .field("jwt_kid", &self.jwt_kid)
            .field("tools", &self.tool_permissions.len())
            .finish_non_exhaustive()
    }
}

impl BearerAuthService {
    /// Creates the service, resolving the signing secret.
    pub async fn new(config: &ServerConfig) -> Self {
        let secret = super::secret::resolve_jwt_secret(config.region.as_deref()).await;
        let service = Self {
            secret,
            jwt_kid: config.jwt_kid.clone(),
            default_region: config.region.clone(),
            tool_permissions: build_tool_permissions(&config.tool_permission_overrides),
            session_cache: RwLock::new(HashMap::new()),
        };
        tracing::info!(
            secret_source = %service.secret.source,
            kid = %service.jwt_kid,
            tools = service.tool_permissions.len(),
            "BearerAuthService initialized"
        );
        service
    }

    /// Creates a service with an explicit secret (for tests).
    #[must_use]
    pub fn with_secret(secret: impl Into<String>, config: &ServerConfig) -> Self {
        let secret: String = secret.into();
        Self {
            secret: ResolvedSecret {
                secret: secret.into(),
                source: "explicit".to_string(),
            },
            jwt_kid: config.jwt_kid.clone(),
            default_region: config.region.clone(),
            tool_permissions: build_tool_permissions(&config.tool_permission_overrides),
            session_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Authenticates an `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Returns an authentication error with code `missing_authorization`,
    /// `token_expired`, or `invalid_token`.
    pub fn authenticate_header(&self, header_value: Option<&str>) -> Result<AuthResult> {
        let header = header_value.ok_or_else(|| {
            Error::authentication(
                "missing_authorization",
                "Bearer token required on tool endpoints",
            )
        })?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::authentication(
                    "missing_authorization",
                    "Bearer token required on tool endpoints",
                )
            })?;

        self.authenticate_token(token)
    }

    /// Authenticates a bare token (no `Bearer ` prefix).
    ///
    /// # Errors
    ///
    /// Returns `token_expired` for expired signatures and `invalid_token`
    /// for any other verification failure.
    pub fn authenticate_token(&self, token: &str) -> Result<AuthResult> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;

        let decoded = decode::<Value>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            if matches!(e.kind(), ErrorKind::ExpiredSignature) {
                tracing::warn!(kid = %self.jwt_kid, "JWT token expired");
                Error::authentication("token_expired", "JWT token expired")
            } else {
                tracing::warn!(
                    kid = %self.jwt_kid,
                    secret_source = %self.secret.source,
                    error = %e,
                    "JWT validation failed"
                );
                Error::authentication("invalid_token", "JWT token could not be verified")
            }
        })?;

        let payload = decoded.claims;
        let normalized = claims::expand_claims(&payload);
        let aws_credentials = claims::extract_aws_credentials(&payload);
        let aws_role_arn = claims::extract_role_arn(&payload);

        let user_id = payload
            .get("sub")
            .or_else(|| payload.get("id"))
            .and_then(Value::as_str)
            .map(ToString::to_string);
        let username = payload
            .get("username")
            .and_then(Value::as_str)
            .map(ToString::to_string);

        let result = AuthResult {
            token: token.to_string(),
            permissions: normalized.permissions.clone(),
            buckets: normalized.buckets.clone(),
            roles: normalized.roles.clone(),
            claims: normalized,
            aws_credentials,
            aws_role_arn,
            user_id,
            username,
        };

        tracing::info!(
            user = result.username.as_deref().or(result.user_id.as_deref()).unwrap_or("?"),
            buckets = result.buckets.len(),
            permissions = result.permissions.len(),
            "JWT authentication successful"
        );
        Ok(result)
    }

    /// Evaluates the per-tool authorization policy.
    ///
    /// The permission table is consulted under `tool.action` first, then
    /// the bare tool name; tools with no entry are allowed. When the
    /// arguments carry a `bucket`/`bucket_name` (top level or inside
    /// `params`), it must match the caller's allow-list.
    #[must_use]
    pub fn authorize_tool(
        &self,
        auth: &AuthResult,
        tool_name: &str,
        action: Option<&str>,
        args: &Value,
    ) -> AuthorizationDecision {
        let required = action
            .and_then(|a| self.tool_permissions.get(&format!("{tool_name}.{a}")))
            .or_else(|| self.tool_permissions.get(tool_name));

        if let Some(required) = required {
            let missing: Vec<String> = required
                .iter()
                .filter(|p| !auth.permissions.contains(p))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return AuthorizationDecision {
                    allowed: false,
                    reason: Some(format!(
                        "Missing required permission(s): {}",
                        missing.join(", ")
                    )),
                    missing_permissions: missing,
                    missing_buckets: Vec::new(),
                };
            }
        }

        if let Some(bucket) = requested_bucket(args)
            && !auth.is_bucket_allowed(&bucket)
        {
            return AuthorizationDecision {
                allowed: false,
                reason: Some(format!("Access denied to bucket {bucket}")),
                missing_permissions: Vec::new(),
                missing_buckets: vec![bucket],
            };
        }

        AuthorizationDecision::allow()
    }

    /// Returns the AWS session for this identity, building it on first use.
    ///
    /// # Errors
    ///
    /// Propagates `AssumeRole` failures from the session build.
    pub async fn session_for(&self, auth: &AuthResult) -> Result<AwsSession> {
        if let Some(session) = self.session_cache.read().await.get(&auth.token) {
            return Ok(session.clone());
        }
        let session = AwsSession::for_auth(auth, self.default_region.as_deref()).await?;
        self.session_cache
            .write()
            .await
            .insert(auth.token.clone(), session.clone());
        Ok(session)
    }

    /// Returns the required permissions registered for a table key.
    #[must_use]
    pub fn required_permissions(&self, key: &str) -> Option<&[String]> {
        self.tool_permissions.get(key).map(Vec::as_slice)
    }
}

/// Extracts the bucket a call is targeting from its arguments.
fn requested_bucket(args: &Value) -> Option<String> {
    let direct = args
        .get("bucket")
        .or_else(|| args.get("bucket_name"))
        .and_then(Value::as_str);
    if let Some(bucket) = direct {
        return Some(normalize_bucket(bucket));
    }
    args.get("params")
        .and_then(|p| p.get("bucket").or_else(|| p.get("bucket_name")))
        .and_then(Value::as_str)
        .map(normalize_bucket)
}

fn normalize_bucket(bucket: &str) -> String {
    bucket
        .strip_prefix("s3://")
        .unwrap_or(bucket)
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Builds the tool-permission table: spec defaults merged with overrides.
fn build_tool_permissions(
    overrides: &HashMap<String, Vec<String>>,
) -> HashMap<String, Vec<String>> {
    let mut table: HashMap<String, Vec<String>> = [
        ("buckets.object_info", vec!["s3:GetObject", "s3:ListBucket"]),
        ("buckets.object_text", vec!["s3:GetObject"]),
        ("buckets.object_fetch", vec!["s3:GetObject"]),
        ("buckets.objects_list", vec!["s3:ListBucket"]),
        ("buckets.objects_put", vec!["s3:PutObject"]),
        ("packaging.browse", vec!["quilt:BrowsePackages"]),
        ("packaging.create", vec!["quilt:UpdatePackage"]),
        ("packaging.update", vec!["quilt:UpdatePackage"]),
        ("packaging.delete", vec!["quilt:UpdatePackage"]),
        ("search.unified_search", vec!["quilt:BrowsePackages"]),
    ]
    .into_iter()
    .map(|(k, v)| {
        (
            k.to_string(),
            v.into_iter().map(ToString::to_string).collect(),
        )
    })
    .collect();

    for (key, value) in overrides {
        table.insert(key.clone(), value.clone());
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    const TEST_SECRET: &str = "a-test-secret-key-that-is-long-enough";

    fn service() -> BearerAuthService {
        BearerAuthService::with_secret(TEST_SECRET, &ServerConfig::default())
    }

    fn sign(payload: &Value) -> String {
        encode(
            &Header::default(),
            payload,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap_or_default()
    }

    fn future_exp() -> u64 {
        crate::current_timestamp() + 3600
    }

    #[test]
    fn test_authenticate_valid_token() {
        let token = sign(&json!({
            "sub": "u-1",
            "username": "alice",
            "exp": future_exp(),
            "permissions": ["s3:GetObject"],
            "buckets": ["bucket-a"],
        }));
        let result = service().authenticate_header(Some(&format!("Bearer {token}")));
        let auth = result.unwrap_or_else(|e| panic!("expected success: {e}"));
        assert_eq!(auth.username.as_deref(), Some("alice"));
        assert_eq!(auth.user_id.as_deref(), Some("u-1"));
        assert_eq!(auth.permissions, vec!["s3:GetObject"]);
    }

    #[test]
    fn test_missing_header() {
        let err = service()
            .authenticate_header(None)
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Authentication {
                code: "missing_authorization",
                ..
            }
        ));
    }

    #[test]
    fn test_non_bearer_header() {
        let err = service()
            .authenticate_header(Some("Basic dXNlcjpwYXNz"))
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Authentication {
                code: "missing_authorization",
                ..
            }
        ));
    }

    #[test]
    fn test_empty_token_after_prefix() {
        let err = service()
            .authenticate_header(Some("Bearer   "))
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Authentication {
                code: "missing_authorization",
                ..
            }
        ));
    }

    #[test]
    fn test_expired_token() {
        let token = sign(&json!({
            "sub": "u-1",
            "exp": crate::current_timestamp().saturating_sub(120),
        }));
        let err = service()
            .authenticate_token(&token)
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Authentication {
                code: "token_expired",
                ..
            }
        ));
        assert_eq!(err.to_string(), "JWT token expired");
    }

    #[test]
    fn test_wrong_secret() {
        let token = jsonwebtoken::encode(
            &Header::default(),
            &json!({"sub": "u", "exp": future_exp()}),
            &EncodingKey::from_secret(b"a-completely-different-secret"),
        )
        .unwrap_or_default();
        let err = service()
            .authenticate_token(&token)
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Authentication {
                code: "invalid_token",
                ..
            }
        ));
    }

    #[test]
    fn test_compressed_claims_authenticate() {
        let token = sign(&json!({
            "sub": "u-1",
            "exp": future_exp(),
            "ec": {"v": 1, "p": ["g", "up"], "b": ["team-bucket"]},
        }));
        let auth = service()
            .authenticate_token(&token)
            .unwrap_or_else(|e| panic!("expected success: {e}"));
        assert_eq!(
            auth.permissions,
            vec!["s3:GetObject", "quilt:UpdatePackage"]
        );
        assert_eq!(auth.buckets, vec!["team-bucket"]);
    }

    fn auth(permissions: &[&str], buckets: &[&str]) -> AuthResult {
        AuthResult {
            token: "t".to_string(),
            claims: super::super::Claims::default(),
            permissions: permissions.iter().map(ToString::to_string).collect(),
            buckets: buckets.iter().map(ToString::to_string).collect(),
            roles: Vec::new(),
            aws_credentials: None,
            aws_role_arn: None,
            user_id: None,
            username: None,
        }
    }

    #[test]
    fn test_authorize_unlisted_tool_allowed() {
        let decision = service().authorize_tool(&auth(&[], &[]), "workflow", Some("create"), &json!({}));
        assert!(decision.allowed);
    }

    #[test]
    fn test_authorize_missing_permission() {
        let decision = service().authorize_tool(
            &auth(&["quilt:BrowsePackages"], &[]),
            "packaging",
            Some("create"),
            &json!({}),
        );
        assert!(!decision.allowed);
        assert_eq!(decision.missing_permissions, vec!["quilt:UpdatePackage"]);
        let err = decision.into_result().unwrap_err();
        assert_eq!(err.kind(), "authorization_error");
    }

    #[test]
    fn test_authorize_strict_subset_reports_difference() {
        let decision = service().authorize_tool(
            &auth(&["s3:GetObject"], &["b"]),
            "buckets",
            Some("object_info"),
            &json!({}),
        );
        assert!(!decision.allowed);
        assert_eq!(decision.missing_permissions, vec!["s3:ListBucket"]);
    }

    #[test]
    fn test_authorize_bucket_denied() {
        let decision = service().authorize_tool(
            &auth(&["s3:ListBucket"], &["prod-*"]),
            "buckets",
            Some("objects_list"),
            &json!({"bucket": "staging-data"}),
        );
        assert!(!decision.allowed);
        assert_eq!(decision.missing_buckets, vec!["staging-data"]);
    }

    #[test]
    fn test_authorize_bucket_wildcard_allowed() {
        let decision = service().authorize_tool(
            &auth(&["s3:ListBucket"], &["prod-*"]),
            "buckets",
            Some("objects_list"),
            &json!({"bucket": "prod-data"}),
        );
        assert!(decision.allowed);
    }

    #[test]
    fn test_authorize_bucket_inside_params() {
        let decision = service().authorize_tool(
            &auth(&["quilt:BrowsePackages"], &["allowed"]),
            "search",
            Some("unified_search"),
            &json!({"params": {"bucket": "forbidden"}}),
        );
        assert!(!decision.allowed);
        assert_eq!(decision.missing_buckets, vec!["forbidden"]);
    }

    #[test]
    fn test_bucket_normalization_strips_scheme() {
        assert_eq!(
            requested_bucket(&json!({"bucket": "s3://my-bucket/prefix"})),
            Some("my-bucket".to_string())
        );
    }

    #[test]
    fn test_override_replaces_default() {
        let mut config = ServerConfig::default();
        config.tool_permission_overrides.insert(
            "packaging.create".to_string(),
            vec!["quilt:Admin".to_string()],
        );
        let service = BearerAuthService::with_secret(TEST_SECRET, &config);
        assert_eq!(
            service.required_permissions("packaging.create"),
            Some(["quilt:Admin".to_string()].as_slice())
        );
    }
}
