//! # Quilt MCP
//!
//! A Model Context Protocol server for the Quilt data catalog.
//!
//! The server exposes a curated set of tools and resources that an MCP
//! client can invoke to discover, search, browse, create, and govern
//! versioned data packages stored in an S3-backed catalog. Every tool call
//! arrives with a bearer JWT identifying the end user; the server
//! authenticates and authorizes the call, runs it against the catalog's
//! GraphQL/REST endpoints and AWS S3/STS, and returns a structured JSON
//! result.
//!
//! ## Architecture
//!
//! - Per-request authentication ([`auth`]) with compressed-claim expansion
//!   and AWS session resolution
//! - A typed catalog client ([`catalog`]) over GraphQL and REST
//! - Multi-backend unified search ([`search`])
//! - The package write pipeline ([`packaging`])
//! - S3 permission discovery with a TTL cache ([`aws`])
//! - JSON-RPC dispatch over stdio or HTTP ([`mcp`])

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod auth;
pub mod aws;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod mcp;
pub mod observability;
pub mod packaging;
pub mod runtime;
pub mod search;
pub mod visualize;
pub mod workflow;

// Re-exports for convenience
pub use auth::{AuthResult, BearerAuthService, Claims};
pub use config::ServerConfig;
pub use runtime::RequestContext;
pub use search::{SearchQuery, SearchResult};

/// Error type for all server operations.
///
/// Each variant corresponds to one wire-observable `error_type` kind; the
/// dispatcher serializes errors into the uniform
/// `{"success": false, "error": ..., "error_type": ...}` envelope via
/// [`Error::to_envelope`]. Handlers propagate `Error` with `?` and never
/// build envelopes themselves.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Validation` | Malformed inputs: bad package name, bad JSON, empty required field |
/// | `Authentication` | Missing/invalid/expired bearer token; unresolved AWS identity |
/// | `Authorization` | Tool permission denied; bucket not in allow-list; registry unwritable |
/// | `NotFound` | Package/user/role/policy/resource does not exist |
/// | `Conflict` | Entity already exists (user/role/policy/workflow) |
/// | `Catalog` | Upstream GraphQL/REST failure (HTTP status or GraphQL errors) |
/// | `Aws` | S3/STS/SSM failure |
/// | `Timeout` | Deadline exceeded on an outbound call |
/// | `Internal` | Anything unclassified |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Inputs failed validation; no remote call was made.
    #[error("{0}")]
    Validation(String),

    /// The bearer token was missing, invalid, or expired.
    ///
    /// `code` is one of `missing_authorization`, `token_expired`,
    /// `invalid_token`, or `no_aws_identity`.
    #[error("{detail}")]
    Authentication {
        /// Stable machine-readable failure code.
        code: &'static str,
        /// Human-readable detail.
        detail: String,
    },

    /// The authenticated caller may not perform this operation.
    #[error("{reason}")]
    Authorization {
        /// Why the call was denied.
        reason: String,
        /// Required permissions absent from the caller's claims.
        missing_permissions: Vec<String>,
        /// Buckets absent from the caller's allow-list.
        missing_buckets: Vec<String>,
    },

    /// The referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The entity already exists.
    #[error("{0}")]
    Conflict(String),

    /// The catalog returned an error (HTTP >= 400 or GraphQL `errors[]`).
    #[error("catalog request failed: {message}")]
    Catalog {
        /// HTTP status when the failure was transport-level.
        status: Option<u16>,
        /// Upstream message or body snippet.
        message: String,
    },

    /// An AWS SDK call failed.
    #[error("aws operation '{operation}' failed: {message}")]
    Aws {
        /// The SDK operation that failed (e.g. `AssumeRole`, `ListObjectsV2`).
        operation: &'static str,
        /// The SDK error rendered as a string.
        message: String,
    },

    /// An outbound call exceeded its deadline.
    #[error("operation '{0}' timed out")]
    Timeout(&'static str),

    /// Unclassified internal failure.
    #[error("{0}")]
    Internal(String),
}

impl Error {
    /// Returns the wire `error_type` kind for this error.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Authentication { .. } => "authentication_error",
            Self::Authorization { .. } => "authorization_error",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Catalog { .. } => "catalog_error",
            Self::Aws { .. } => "aws_error",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Builds an authentication error with a stable code.
    #[must_use]
    pub fn authentication(code: &'static str, detail: impl Into<String>) -> Self {
        Self::Authentication {
            code,
            detail: detail.into(),
        }
    }

    /// Builds an authorization error without missing-entity context.
    #[must_use]
    pub fn authorization(reason: impl Into<String>) -> Self {
        Self::Authorization {
            reason: reason.into(),
            missing_permissions: Vec::new(),
            missing_buckets: Vec::new(),
        }
    }

    /// Serializes this error into the wire envelope.
    ///
    /// Every failed tool result is
    /// `{"success": false, "error": <message>, "error_type": <kind>, ...}`
    /// with optional context fields depending on the variant.
    #[must_use]
    pub fn to_envelope(&self) -> serde_json::Value {
        let mut envelope = serde_json::json!({
            "success": false,
            "error": self.to_string(),
            "error_type": self.kind(),
        });
        match self {
            Self::Authentication { code, .. } => {
                envelope["code"] = serde_json::json!(code);
            }
            Self::Authorization {
                missing_permissions,
                missing_buckets,
                ..
            } => {
                if !missing_permissions.is_empty() {
                    envelope["missing_permissions"] = serde_json::json!(missing_permissions);
                }
                if !missing_buckets.is_empty() {
                    envelope["missing_buckets"] = serde_json::json!(missing_buckets);
                }
            }
            Self::Catalog {
                status: Some(s), ..
            } => {
                envelope["status"] = serde_json::json!(s);
            }
            _ => {}
        }
        envelope
    }
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Centralized so session names and cache stamps agree on a clock. Falls
/// back to 0 if the system clock is before the Unix epoch.
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
