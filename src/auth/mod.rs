//! JWT authentication and authorization.
//!
//! Every tool call is authenticated from its `Authorization: Bearer`
//! header: the token is verified (HS256, secret resolved from the
//! environment or SSM), its compressed claim schema is expanded, and the
//! result is bound to the request context. Authorization then checks the
//! tool's required permissions and the bucket allow-list before any
//! handler runs.

mod claims;
mod secret;
mod service;
mod session;

pub use claims::{Claims, expand_claims, extract_aws_credentials, extract_role_arn};
pub use secret::{ResolvedSecret, resolve_jwt_secret};
pub use service::{AuthorizationDecision, BearerAuthService};
pub use session::{AwsCredentialSpec, AwsSession};

/// Normalized result of authenticating one bearer token.
///
/// Owned by the per-request task; never shared across requests.
#[derive(Debug, Clone)]
pub struct AuthResult {
    /// The opaque bearer token, re-used verbatim for catalog calls.
    pub token: String,
    /// Decoded and decompressed claims.
    pub claims: Claims,
    /// Permissions granted to the caller (e.g. `s3:GetObject`).
    pub permissions: Vec<String>,
    /// Bucket allow-list; entries may carry a trailing `*` wildcard.
    pub buckets: Vec<String>,
    /// Catalog roles.
    pub roles: Vec<String>,
    /// Embedded AWS credentials, when the token carries them.
    pub aws_credentials: Option<AwsCredentialSpec>,
    /// Role to assume when no embedded credentials are present.
    pub aws_role_arn: Option<String>,
    /// Subject claim.
    pub user_id: Option<String>,
    /// Username claim.
    pub username: Option<String>,
}

impl AuthResult {
    /// Returns true when the caller holds every listed permission.
    #[must_use]
    pub fn has_permissions(&self, required: &[String]) -> bool {
        required.iter().all(|p| self.permissions.contains(p))
    }

    /// Checks the bucket allow-list, honoring trailing-`*` wildcards.
    ///
    /// An empty allow-list denies everything.
    #[must_use]
    pub fn is_bucket_allowed(&self, bucket: &str) -> bool {
        self.buckets.iter().any(|pattern| {
            pattern
                .strip_suffix('*')
                .map_or(pattern == bucket, |prefix| bucket.starts_with(prefix))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_with_buckets(buckets: &[&str]) -> AuthResult {
        AuthResult {
            token: "t".to_string(),
            claims: Claims::default(),
            permissions: Vec::new(),
            buckets: buckets.iter().map(ToString::to_string).collect(),
            roles: Vec::new(),
            aws_credentials: None,
            aws_role_arn: None,
            user_id: None,
            username: None,
        }
    }

    #[test]
    fn test_bucket_allowed_literal() {
        let auth = auth_with_buckets(&["prod-data", "staging-data"]);
        assert!(auth.is_bucket_allowed("prod-data"));
        assert!(!auth.is_bucket_allowed("prod-logs"));
    }

    #[test]
    fn test_bucket_allowed_wildcard() {
        let auth = auth_with_buckets(&["prod-*"]);
        assert!(auth.is_bucket_allowed("prod-data"));
        assert!(auth.is_bucket_allowed("prod-"));
        assert!(!auth.is_bucket_allowed("staging-data"));
    }

    #[test]
    fn test_empty_allow_list_denies() {
        let auth = auth_with_buckets(&[]);
        assert!(!auth.is_bucket_allowed("anything"));
    }
}
