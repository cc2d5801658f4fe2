//! Server configuration.
//!
//! All knobs come from the environment (optionally via a `.env` file in
//! development); defaults live here and nowhere else.
//!
//! | Variable | Purpose |
//! |----------|---------|
//! | `QUILT_CATALOG_URL` | Override the catalog URL |
//! | `DEFAULT_REGISTRY` | Fallback registry when none resolves |
//! | `AWS_REGION` / `AWS_DEFAULT_REGION` | AWS region |
//! | `MCP_ENHANCED_JWT_SECRET` | JWT signing secret (literal) |
//! | `MCP_ENHANCED_JWT_SECRET_SSM_PARAMETER` | SSM parameter holding the secret |
//! | `MCP_ENHANCED_JWT_KID` | Key id used in log lines |
//! | `MCP_TOOL_PERMISSIONS` | JSON map overriding the tool-permission table |
//! | `MCP_ENABLE_WRITE_PROBES` | Opt into sentinel write probes during discovery |

use std::collections::HashMap;
use std::time::Duration;

/// Catalog URL used when `QUILT_CATALOG_URL` is not set.
pub const DEFAULT_CATALOG_URL: &str = "https://demo.quiltdata.com";

/// Registry used when neither the caller nor discovery resolves one.
pub const DEFAULT_REGISTRY: &str = "s3://quilt-example";

/// Default timeout for catalog HTTP calls.
pub const CATALOG_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for STS `AssumeRole`.
pub const ASSUME_ROLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for individual S3 permission probes.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default TTL for permission discovery cache entries.
pub const PERMISSION_CACHE_TTL: Duration = Duration::from_secs(300);

/// Main configuration for the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Human-facing catalog URL (GraphQL host is derived from it).
    pub catalog_url: String,
    /// Fallback registry (`s3://bucket` form).
    pub default_registry: String,
    /// AWS region, when configured.
    pub region: Option<String>,
    /// Key id attached to JWT log lines.
    pub jwt_kid: String,
    /// Per-tool required-permission overrides from `MCP_TOOL_PERMISSIONS`.
    pub tool_permission_overrides: HashMap<String, Vec<String>>,
    /// Whether permission discovery may upload sentinel probe objects.
    pub enable_write_probes: bool,
    /// TTL for permission discovery cache entries.
    pub permission_cache_ttl: Duration,
    /// Timeout for catalog HTTP calls.
    pub catalog_timeout: Duration,
}

impl ServerConfig {
    /// Loads configuration from the environment.
    ///
    /// Never fails: unset variables fall back to defaults, and a malformed
    /// `MCP_TOOL_PERMISSIONS` override is logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        // Best-effort .env loading for development; errors are fine.
        let _ = dotenvy::dotenv();

        let catalog_url = std::env::var("QUILT_CATALOG_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string());

        let default_registry = std::env::var("DEFAULT_REGISTRY")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REGISTRY.to_string());

        let region = std::env::var("AWS_REGION")
            .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
            .ok()
            .filter(|v| !v.trim().is_empty());

        let jwt_kid = std::env::var("MCP_ENHANCED_JWT_KID")
            .unwrap_or_else(|_| "frontend-enhanced".to_string());

        let tool_permission_overrides = std::env::var("MCP_TOOL_PERMISSIONS")
            .ok()
            .map(|raw| parse_tool_permission_overrides(&raw))
            .unwrap_or_default();

        let enable_write_probes = std::env::var("MCP_ENABLE_WRITE_PROBES")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            catalog_url,
            default_registry,
            region,
            jwt_kid,
            tool_permission_overrides,
            enable_write_probes,
            permission_cache_ttl: PERMISSION_CACHE_TTL,
            catalog_timeout: CATALOG_TIMEOUT,
        }
    }

    /// Returns the default registry bucket name without the `s3://` scheme.
    #[must_use]
    pub fn default_registry_bucket(&self) -> &str {
        self.default_registry
            .strip_prefix("s3://")
            .unwrap_or(&self.default_registry)
            .trim_matches('/')
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            default_registry: DEFAULT_REGISTRY.to_string(),
            region: None,
            jwt_kid: "frontend-enhanced".to_string(),
            tool_permission_overrides: HashMap::new(),
            enable_write_probes: false,
            permission_cache_ttl: PERMISSION_CACHE_TTL,
            catalog_timeout: CATALOG_TIMEOUT,
        }
    }
}

/// Parses the `MCP_TOOL_PERMISSIONS` override map.
///
/// Accepts `{"tool": ["perm", ...]}` or `{"tool": "perm"}` entries; other
/// shapes are skipped with a warning so a typo cannot take the server down.
fn parse_tool_permission_overrides(raw: &str) -> HashMap<String, Vec<String>> {
    let mut overrides = HashMap::new();
    let parsed: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse MCP_TOOL_PERMISSIONS override");
            return overrides;
        }
    };
    let Some(map) = parsed.as_object() else {
        tracing::warn!("MCP_TOOL_PERMISSIONS must be a JSON object");
        return overrides;
    };
    for (key, value) in map {
        match value {
            serde_json::Value::String(s) => {
                overrides.insert(key.clone(), vec![s.clone()]);
            }
            serde_json::Value::Array(items) => {
                let perms: Vec<String> = items
                    .iter()
                    .filter_map(|v| v.as_str().map(ToString::to_string))
                    .collect();
                overrides.insert(key.clone(), perms);
            }
            _ => {
                tracing::warn!(tool = %key, "Ignoring non-string MCP_TOOL_PERMISSIONS entry");
            }
        }
    }
    overrides
}
