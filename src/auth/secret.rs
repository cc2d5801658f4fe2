//! JWT signing-secret resolution.
//!
//! Resolution order, first hit wins:
//!
//! 1. `MCP_ENHANCED_JWT_SECRET` literal.
//! 2. The SSM parameter named by `MCP_ENHANCED_JWT_SECRET_SSM_PARAMETER`
//!    (also accepted: `MCP_ENHANCED_JWT_SECRET_PARAM`); requires a region.
//! 3. When running inside AWS and a region is configured, the well-known
//!    `/quilt/mcp-server/jwt-secret` parameter.
//! 4. A development fallback literal, logged as a warning.
//!
//! Resolved SSM values are cached per `(parameter, region)` for the life
//! of the process; the cache is read-mostly and guarded for first-write.

use crate::{Error, Result};
use once_cell::sync::Lazy;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::RwLock;

/// Well-known parameter consulted inside AWS when nothing is configured.
const DEFAULT_SSM_PARAMETER: &str = "/quilt/mcp-server/jwt-secret";

/// Development fallback secret. Signature mismatches against real catalog
/// tokens are expected when this is in effect.
const DEVELOPMENT_SECRET: &str = "development-enhanced-jwt-secret";

static SECRET_CACHE: Lazy<RwLock<HashMap<(String, String), String>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// A resolved signing secret together with its provenance.
#[derive(Clone)]
pub struct ResolvedSecret {
    /// The secret material.
    pub secret: SecretString,
    /// Where the secret came from, for log lines
    /// (`env:...`, `ssm:<name>:<region>`, `fallback:development`).
    pub source: String,
}

impl std::fmt::Debug for ResolvedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecret")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl ResolvedSecret {
    /// Returns the secret bytes for HS256 verification.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.secret.expose_secret().as_bytes()
    }
}

/// Resolves the JWT signing secret.
///
/// Never fails: the development fallback is always available. SSM errors
/// are logged and treated as a miss.
pub async fn resolve_jwt_secret(region: Option<&str>) -> ResolvedSecret {
    if let Ok(env_secret) = std::env::var("MCP_ENHANCED_JWT_SECRET")
        && !env_secret.is_empty()
    {
        tracing::debug!("Loaded JWT secret from environment variable MCP_ENHANCED_JWT_SECRET");
        return ResolvedSecret {
            secret: env_secret.into(),
            source: "env:MCP_ENHANCED_JWT_SECRET".to_string(),
        };
    }

    let parameter_name = std::env::var("MCP_ENHANCED_JWT_SECRET_SSM_PARAMETER")
        .or_else(|_| std::env::var("MCP_ENHANCED_JWT_SECRET_PARAM"))
        .ok()
        .filter(|v| !v.is_empty());

    if parameter_name.is_some() && region.is_none() {
        tracing::error!(
            "MCP_ENHANCED_JWT_SECRET_SSM_PARAMETER is set but AWS region is missing; \
             unable to retrieve JWT secret from SSM"
        );
    }

    if let (Some(name), Some(region)) = (parameter_name.as_deref(), region)
        && let Ok(secret) = fetch_from_ssm(name, region).await
    {
        tracing::info!(
            parameter = name,
            region,
            length = secret.len(),
            "Loaded JWT secret from SSM parameter"
        );
        return ResolvedSecret {
            secret: secret.into(),
            source: format!("ssm:{name}:{region}"),
        };
    }

    if parameter_name.is_none()
        && running_in_aws()
        && let Some(region) = region
        && let Ok(secret) = fetch_from_ssm(DEFAULT_SSM_PARAMETER, region).await
    {
        tracing::info!(
            parameter = DEFAULT_SSM_PARAMETER,
            region,
            "Loaded JWT secret from default SSM parameter"
        );
        return ResolvedSecret {
            secret: secret.into(),
            source: format!("ssm:{DEFAULT_SSM_PARAMETER}:{region}"),
        };
    }

    tracing::warn!(
        "Falling back to development JWT secret; configure MCP_ENHANCED_JWT_SECRET or \
         MCP_ENHANCED_JWT_SECRET_SSM_PARAMETER to avoid signature mismatches"
    );
    ResolvedSecret {
        secret: DEVELOPMENT_SECRET.to_string().into(),
        source: "fallback:development".to_string(),
    }
}

/// Detects the AWS container/lambda runtimes via their environment markers.
fn running_in_aws() -> bool {
    std::env::var("AWS_EXECUTION_ENV").is_ok()
        || std::env::var("ECS_CONTAINER_METADATA_URI_V4").is_ok()
}

/// Fetches one decrypted parameter, going through the process cache.
async fn fetch_from_ssm(parameter_name: &str, region: &str) -> Result<String> {
    let cache_key = (parameter_name.to_string(), region.to_string());
    if let Ok(cache) = SECRET_CACHE.read()
        && let Some(cached) = cache.get(&cache_key)
    {
        tracing::debug!(parameter = parameter_name, "Using cached JWT secret");
        return Ok(cached.clone());
    }

    let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()))
        .load()
        .await;
    let client = aws_sdk_ssm::Client::new(&sdk_config);

    let response = client
        .get_parameter()
        .name(parameter_name)
        .with_decryption(true)
        .send()
        .await
        .map_err(|e| {
            tracing::error!(parameter = parameter_name, error = %e, "SSM GetParameter failed");
            Error::Aws {
                operation: "GetParameter",
                message: e.to_string(),
            }
        })?;

    let value = response
        .parameter()
        .and_then(aws_sdk_ssm::types::Parameter::value)
        .ok_or_else(|| Error::Aws {
            operation: "GetParameter",
            message: format!("SSM parameter {parameter_name} did not return a value"),
        })?
        .to_string();

    if let Ok(mut cache) = SECRET_CACHE.write() {
        cache.insert(cache_key, value.clone());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_fallback_without_env() {
        // No env configuration in the test process: the fallback applies.
        let resolved = tokio_test::block_on(resolve_jwt_secret(None));
        assert_eq!(resolved.source, "fallback:development");
        assert_eq!(resolved.as_bytes(), DEVELOPMENT_SECRET.as_bytes());
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let resolved = ResolvedSecret {
            secret: "super-secret-value".to_string().into(),
            source: "env:TEST".to_string(),
        };
        let rendered = format!("{resolved:?}");
        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("env:TEST"));
    }

    #[test]
    fn test_running_in_aws_detection() {
        // Markers absent in the test environment.
        assert!(!running_in_aws());
    }
}
