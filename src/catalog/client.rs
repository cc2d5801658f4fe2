//! Catalog HTTP transport.

use crate::config::ServerConfig;
use crate::{Error, Result};
use serde_json::Value;
use std::time::Duration;

/// Longest body snippet carried into an error message.
const BODY_SNIPPET_LEN: usize = 300;

/// Stateless client for one catalog, bound to one bearer token.
///
/// Construction is cheap; a client is typically built per request from
/// the active context's token.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    registry_url: String,
    token: String,
    http: reqwest::Client,
}

impl CatalogClient {
    /// Creates a client for the configured catalog.
    ///
    /// # Errors
    ///
    /// Returns `validation_error` when the token is empty; catalog
    /// requests without a token are never attempted.
    pub fn new(config: &ServerConfig, token: &str) -> Result<Self> {
        Self::with_timeout(config, token, config.catalog_timeout)
    }

    /// Creates a client with an explicit timeout.
    ///
    /// # Errors
    ///
    /// Returns `validation_error` when the token is empty.
    pub fn with_timeout(config: &ServerConfig, token: &str, timeout: Duration) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::Validation(
                "Authorization token is required for catalog requests".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("Quilt-MCP-Server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            registry_url: config.catalog_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http,
        })
    }

    /// Returns the registry base URL (no trailing slash).
    #[must_use]
    pub fn registry_url(&self) -> &str {
        &self.registry_url
    }

    /// Returns the GraphQL endpoint for this catalog.
    ///
    /// A human-facing host of the form `X.quiltdata.com` serves GraphQL
    /// from `X-registry.quiltdata.com`.
    #[must_use]
    pub fn graphql_url(&self) -> String {
        format!("{}/graphql", derive_registry_host(&self.registry_url))
    }

    /// Executes a GraphQL query and returns the `data` payload.
    ///
    /// # Errors
    ///
    /// `catalog_error` for HTTP >= 400 or a top-level `errors[]` array;
    /// `timeout` when the deadline elapses.
    pub async fn graphql(&self, query: &str, variables: Value) -> Result<Value> {
        let payload = serde_json::json!({"query": query, "variables": variables});
        let response = self
            .http
            .post(self.graphql_url())
            .bearer_auth(&self.token)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let body = Self::read_json(response).await?;

        if let Some(errors) = body.get("errors").and_then(Value::as_array)
            && !errors.is_empty()
        {
            let messages: Vec<String> = errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown GraphQL error")
                        .to_string()
                })
                .collect();
            tracing::warn!(errors = ?messages, "GraphQL errors returned");
            return Err(Error::Catalog {
                status: None,
                message: messages.join("; "),
            });
        }

        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    }

    /// Executes a REST request against `{registry}{path}`.
    ///
    /// # Errors
    ///
    /// `catalog_error` for HTTP >= 400; `timeout` when the deadline
    /// elapses.
    pub async fn rest(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = format!("{}{path}", self.registry_url);
        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(classify_transport_error)?;
        Self::read_json(response).await
    }

    /// Lifts HTTP failures into the error taxonomy and parses the body.
    async fn read_json(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(BODY_SNIPPET_LEN).collect();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(Error::NotFound(format!(
                    "catalog returned 404: {snippet}"
                )));
            }
            return Err(Error::Catalog {
                status: Some(status.as_u16()),
                message: snippet,
            });
        }
        response
            .json()
            .await
            .map_err(|e| Error::Catalog {
                status: None,
                message: format!("invalid JSON from catalog: {e}"),
            })
    }
}

/// Classifies reqwest transport errors into timeout vs catalog failures.
fn classify_transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout("catalog_request")
    } else {
        Error::Catalog {
            status: None,
            message: e.to_string(),
        }
    }
}

/// Rewrites a human-facing catalog host into its registry host.
fn derive_registry_host(registry_url: &str) -> String {
    let Some((scheme, rest)) = registry_url.split_once("://") else {
        return registry_url.to_string();
    };
    let (host, path) = rest.split_once('/').map_or((rest, ""), |(h, p)| (h, p));

    let rewritten = host.strip_suffix(".quiltdata.com").map_or_else(
        || host.to_string(),
        |stem| {
            if stem.ends_with("-registry") || stem.contains('.') {
                host.to_string()
            } else {
                format!("{stem}-registry.quiltdata.com")
            }
        },
    );

    if path.is_empty() {
        format!("{scheme}://{rewritten}")
    } else {
        format!("{scheme}://{rewritten}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(url: &str) -> CatalogClient {
        let config = ServerConfig {
            catalog_url: url.to_string(),
            ..ServerConfig::default()
        };
        CatalogClient::new(&config, "token").unwrap()
    }

    #[test]
    fn test_graphql_url_rewrites_catalog_host() {
        let client = client_for("https://demo.quiltdata.com");
        assert_eq!(
            client.graphql_url(),
            "https://demo-registry.quiltdata.com/graphql"
        );
    }

    #[test]
    fn test_graphql_url_keeps_registry_host() {
        let client = client_for("https://demo-registry.quiltdata.com/");
        assert_eq!(
            client.graphql_url(),
            "https://demo-registry.quiltdata.com/graphql"
        );
    }

    #[test]
    fn test_graphql_url_other_domains_untouched() {
        let client = client_for("https://catalog.internal.example.com");
        assert_eq!(
            client.graphql_url(),
            "https://catalog.internal.example.com/graphql"
        );
    }

    #[test]
    fn test_trailing_slash_normalized() {
        let client = client_for("https://demo.quiltdata.com///");
        assert_eq!(client.registry_url(), "https://demo.quiltdata.com");
    }

    #[test]
    fn test_empty_token_rejected() {
        let config = ServerConfig::default();
        let err = CatalogClient::new(&config, "  ").map(|_| ()).unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }
}
