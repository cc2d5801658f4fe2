//! Request-scoped runtime context.
//!
//! Each tool invocation runs inside exactly one [`RequestContext`] holding
//! the authenticated identity, the bearer token, and arbitrary metadata.
//! The context is built by the dispatcher after authentication, handed to
//! the handler, and dropped when the invocation returns. It is never
//! visible to other concurrent requests.
//!
//! A `task_local` carries the request id so deeply nested log lines can be
//! correlated without threading the context through every call.

use crate::auth::AuthResult;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

/// Per-request context for one tool invocation.
#[derive(Clone, Debug)]
pub struct RequestContext {
    /// Correlation id for log lines.
    request_id: String,
    /// The authenticated identity for this request.
    auth: Arc<AuthResult>,
    /// Arbitrary request metadata (transport, client info).
    metadata: HashMap<String, Value>,
}

impl RequestContext {
    /// Creates a context for an authenticated request.
    #[must_use]
    pub fn new(auth: AuthResult) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            auth: Arc::new(auth),
            metadata: HashMap::new(),
        }
    }

    /// Attaches a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns the correlation id.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the authenticated identity.
    #[must_use]
    pub fn auth(&self) -> &AuthResult {
        &self.auth
    }

    /// Returns the raw bearer token for catalog calls.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.auth.token
    }

    /// Returns a metadata entry, if set.
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}

tokio::task_local! {
    static ACTIVE_REQUEST_ID: String;
}

/// Scopes a future to a request context.
///
/// Inside the future, [`current_request_id`] resolves to this request's
/// correlation id, including in any subtasks spawned with the same scope.
pub async fn scope_request<F, T>(context: &RequestContext, fut: F) -> T
where
    F: Future<Output = T>,
{
    ACTIVE_REQUEST_ID
        .scope(context.request_id.clone(), fut)
        .await
}

/// Returns the active request's correlation id, if inside a request scope.
#[must_use]
pub fn current_request_id() -> Option<String> {
    ACTIVE_REQUEST_ID.try_with(Clone::clone).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthResult;

    fn test_auth() -> AuthResult {
        AuthResult {
            token: "token".to_string(),
            claims: crate::auth::Claims::default(),
            permissions: vec!["s3:GetObject".to_string()],
            buckets: vec!["bucket-a".to_string()],
            roles: Vec::new(),
            aws_credentials: None,
            aws_role_arn: None,
            user_id: Some("u1".to_string()),
            username: Some("alice".to_string()),
        }
    }

    #[test]
    fn test_context_accessors() {
        let ctx = RequestContext::new(test_auth())
            .with_metadata("transport", serde_json::json!("stdio"));
        assert_eq!(ctx.token(), "token");
        assert_eq!(ctx.auth().username.as_deref(), Some("alice"));
        assert_eq!(ctx.metadata("transport"), Some(&serde_json::json!("stdio")));
        assert!(ctx.metadata("missing").is_none());
        assert!(!ctx.request_id().is_empty());
    }

    #[tokio::test]
    async fn test_request_id_scoped_to_task() {
        let ctx = RequestContext::new(test_auth());
        assert!(current_request_id().is_none());
        let id = scope_request(&ctx, async { current_request_id() }).await;
        assert_eq!(id.as_deref(), Some(ctx.request_id()));
        assert!(current_request_id().is_none());
    }

    #[tokio::test]
    async fn test_distinct_requests_distinct_ids() {
        let a = RequestContext::new(test_auth());
        let b = RequestContext::new(test_auth());
        assert_ne!(a.request_id(), b.request_id());
    }
}
