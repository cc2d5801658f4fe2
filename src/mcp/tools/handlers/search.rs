//! Search tool handlers.

use super::{action_listing, unknown_action};
use crate::aws::s3::S3Operations;
use crate::catalog::CatalogClient;
use crate::mcp::server::ServerState;
use crate::mcp::tool_types::{optional_str, optional_string_list, optional_usize, require_str, resolve_offset};
use crate::runtime::RequestContext;
use crate::search::backends::{AnyBackend, GraphqlBackend, S3FallbackBackend};
use crate::search::{SearchFilters, SearchQuery, SearchScope, SearchType, UnifiedSearch};
use crate::{Error, Result};
use serde_json::{Value, json};

const ACTIONS: &[&str] = &[
    "discover",
    "unified_search",
    "search_packages",
    "search_objects",
    "bucket_search",
    "suggest",
];

/// Dispatches a search tool call.
///
/// # Errors
///
/// Propagates validation and backend failures.
pub async fn execute(
    state: &ServerState,
    ctx: &RequestContext,
    action: Option<&str>,
    params: &Value,
) -> Result<Value> {
    let Some(action) = action else {
        return Ok(action_listing(
            "search",
            ACTIONS,
            "Intelligent search via Quilt Catalog GraphQL with distinct package and object \
             search types",
        ));
    };
    match action {
        "discover" => Ok(discover(state)),
        "unified_search" => unified(state, ctx, params, None).await,
        "search_packages" => unified(state, ctx, params, Some(SearchType::Packages)).await,
        "search_objects" => unified(state, ctx, params, Some(SearchType::Objects)).await,
        "bucket_search" => bucket_search(state, ctx, params).await,
        "suggest" => {
            let partial = optional_str(params, "partial_query").unwrap_or_default();
            let limit = optional_usize(params, "limit", 10);
            Ok(json!({
                "partial_query": partial,
                "suggestions": crate::search::suggest::suggest(&partial, limit),
            }))
        }
        other => Err(unknown_action("search", other, ACTIONS)),
    }
}

/// Server-side bucket search through the catalog REST endpoint.
async fn bucket_search(
    state: &ServerState,
    ctx: &RequestContext,
    params: &Value,
) -> Result<Value> {
    let bucket = require_str(params, "bucket")?;
    let query = params
        .get("query")
        .cloned()
        .ok_or_else(|| Error::Validation("Parameter 'query' is required".to_string()))?;
    let limit = i64::try_from(optional_usize(params, "limit", 20)).unwrap_or(20);
    let client = CatalogClient::new(&state.config, ctx.token())?;
    let response = client.bucket_search(&bucket, &query, limit).await?;
    Ok(json!({
        "bucket": bucket,
        "result": response,
    }))
}

/// Reports search capabilities and available backends.
fn discover(state: &ServerState) -> Value {
    json!({
        "search_capabilities": {
            "graphql_search": true,
            "unified_search": true,
            "s3_fallback": true,
        },
        "available_backends": ["graphql", "s3"],
        "search_scopes": ["global", "catalog", "bucket", "package"],
        "supported_filters": ["file_extensions", "size_min", "size_max"],
        "catalog_url": state.config.catalog_url,
        "common_queries": [
            "CSV files",
            "genomics data",
            "files larger than 100MB",
            "README files",
        ],
    })
}

/// Runs a unified search, optionally forcing the search type.
async fn unified(
    state: &ServerState,
    ctx: &RequestContext,
    params: &Value,
    forced_type: Option<SearchType>,
) -> Result<Value> {
    let raw_text = require_str(params, "query")?;
    let limit = optional_usize(params, "limit", 20).min(1000);
    let offset = resolve_offset(params, limit);

    let scope = optional_str(params, "scope").map_or(SearchScope::Global, |s| {
        SearchScope::parse(&s)
    });
    // `bucket` doubles as the target for bucket-scoped searches.
    let target = optional_str(params, "target")
        .or_else(|| optional_str(params, "bucket"))
        .unwrap_or_default();
    let search_type = forced_type.unwrap_or_else(|| {
        optional_str(params, "search_type")
            .map_or(SearchType::Auto, |s| SearchType::parse(&s))
    });
    let filters = SearchFilters::from_value(params.get("filters"))?;

    let query = SearchQuery {
        raw_text,
        scope,
        target,
        search_type,
        filters,
        limit,
        offset,
    };

    let requested_backends = {
        let list = optional_string_list(params, "backends");
        if list.is_empty() {
            vec!["graphql".to_string()]
        } else {
            list
        }
    };

    let mut backends = Vec::new();
    for name in &requested_backends {
        match name.as_str() {
            "graphql" => {
                let client = CatalogClient::new(&state.config, ctx.token())?;
                backends.push(AnyBackend::Graphql(GraphqlBackend::new(client)));
            }
            "s3" => {
                let session = state.auth.session_for(ctx.auth()).await?;
                backends.push(AnyBackend::S3(S3FallbackBackend::new(
                    S3Operations::new(&session),
                    state.config.default_registry_bucket().to_string(),
                )));
            }
            other => {
                return Err(Error::Validation(format!(
                    "Unknown search backend '{other}'; expected graphql or s3"
                )));
            }
        }
    }

    let orchestrator = UnifiedSearch::new(backends);
    let response = orchestrator.search(&query).await?;
    serde_json::to_value(&response)
        .map_err(|e| Error::Internal(format!("failed to serialize search response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_lists_backends() {
        let state = ServerState::for_tests();
        let report = discover(&state);
        assert_eq!(report["available_backends"], json!(["graphql", "s3"]));
        assert!(
            report["search_scopes"]
                .as_array()
                .is_some_and(|s| s.len() == 4)
        );
    }

    #[tokio::test]
    async fn test_unified_requires_query() {
        let state = ServerState::for_tests();
        let ctx = crate::runtime::RequestContext::new(crate::mcp::server::test_auth());
        let err = unified(&state, &ctx, &json!({}), None)
            .await
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn test_unified_rejects_unknown_backend() {
        let state = ServerState::for_tests();
        let ctx = crate::runtime::RequestContext::new(crate::mcp::server::test_auth());
        let err = unified(
            &state,
            &ctx,
            &json!({"query": "x", "backends": ["elasticsearch"]}),
            None,
        )
        .await
        .map(|_| ())
        .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn test_unified_rejects_bad_size_window() {
        let state = ServerState::for_tests();
        let ctx = crate::runtime::RequestContext::new(crate::mcp::server::test_auth());
        let err = unified(
            &state,
            &ctx,
            &json!({"query": "x", "filters": {"size_min": 10, "size_max": 1}}),
            None,
        )
        .await
        .map(|_| ())
        .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }
}
