//! The unified search orchestrator.
//!
//! Resolves `auto` intent, fans out to the selected backends, and merges
//! normalized hits. `search_type=both` runs the package and object
//! queries concurrently with the limit split evenly; merged output is
//! packages first, then objects, trimmed to the limit. A failing backend
//! contributes an empty list plus its error message; the whole search
//! only fails when every selected backend is unavailable.

use super::backends::{AnyBackend, SearchBackend};
use super::intent;
use super::types::{
    BackendResponse, BackendStatus, SearchQuery, SearchResult, SearchType,
};
use crate::{Error, Result};
use serde::Serialize;
use std::time::Instant;

/// Aggregated response of one unified search.
#[derive(Debug, Serialize)]
pub struct UnifiedResponse {
    /// Echo of the query text.
    pub query: String,
    /// Echo of the scope.
    pub scope: super::types::SearchScope,
    /// Echo of the target (empty unless scoped).
    pub target: String,
    /// The search type after intent resolution.
    pub search_type: SearchType,
    /// Merged, trimmed hits.
    pub results: Vec<SearchResult>,
    /// Total hits across backends before trimming, when reported.
    pub total: u64,
    /// The producing backend, when exactly one was involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<&'static str>,
    /// Per-backend reports.
    pub backends: Vec<BackendReport>,
    /// Wall-clock time for the whole search.
    pub query_time_ms: f64,
}

/// Status of one backend within a unified search response.
#[derive(Debug, Serialize)]
pub struct BackendReport {
    /// Backend name.
    pub backend: &'static str,
    /// Backend health during the search.
    pub status: BackendStatus,
    /// Hits contributed.
    pub result_count: usize,
    /// Backend-local query time.
    pub query_time_ms: f64,
    /// Error detail when the backend failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Orchestrator over a fixed set of selected backends.
pub struct UnifiedSearch {
    backends: Vec<AnyBackend>,
}

impl UnifiedSearch {
    /// Creates the orchestrator with the backends chosen for this call.
    #[must_use]
    pub fn new(backends: Vec<AnyBackend>) -> Self {
        Self { backends }
    }

    /// Executes a search.
    ///
    /// # Errors
    ///
    /// `validation_error` when no backend was selected; `catalog_error`
    /// when every selected backend reported unavailable/error.
    pub async fn search(&self, query: &SearchQuery) -> Result<UnifiedResponse> {
        if self.backends.is_empty() {
            return Err(Error::Validation(
                "No search backends selected".to_string(),
            ));
        }
        let start = Instant::now();
        let resolved = intent::resolve(query.search_type, &query.raw_text);

        let mut reports: Vec<BackendReport> = Vec::new();
        let mut merged: Vec<SearchResult> = Vec::new();
        let mut total: u64 = 0;
        let mut any_available = false;

        for backend in &self.backends {
            let responses = if resolved == SearchType::Both {
                self.fan_out_both(backend, query).await
            } else {
                let mut routed = query.clone();
                routed.search_type = resolved;
                vec![backend.search(&routed).await]
            };

            for response in responses {
                if response.status == BackendStatus::Available {
                    any_available = true;
                }
                total += response
                    .total
                    .unwrap_or(response.results.len() as u64);
                reports.push(BackendReport {
                    backend: response.backend,
                    status: response.status,
                    result_count: response.results.len(),
                    query_time_ms: response.query_time_ms,
                    error_message: response.error_message,
                });
                merged.extend(response.results);
            }
        }

        if !any_available {
            let detail = reports
                .iter()
                .filter_map(|r| r.error_message.as_deref())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::Catalog {
                status: None,
                message: format!("all search backends unavailable: {detail}"),
            });
        }

        merged.truncate(query.effective_limit());

        let mut names: Vec<&'static str> = reports.iter().map(|r| r.backend).collect();
        names.dedup();
        let backend = if names.len() == 1 {
            names.first().copied()
        } else {
            None
        };

        Ok(UnifiedResponse {
            query: query.raw_text.clone(),
            scope: query.scope,
            target: query.target.clone(),
            search_type: resolved,
            results: merged,
            total,
            backend,
            backends: reports,
            query_time_ms: start.elapsed().as_secs_f64() * 1000.0,
        })
    }

    /// Runs the packages and objects halves of a `both` search
    /// concurrently. Packages come back first in the merged ordering.
    async fn fan_out_both(
        &self,
        backend: &AnyBackend,
        query: &SearchQuery,
    ) -> Vec<BackendResponse> {
        let mut packages_query = query.clone();
        packages_query.search_type = SearchType::Packages;
        packages_query.limit = query.effective_limit() / 2;
        packages_query.offset = query.offset / 2;

        let mut objects_query = query.clone();
        objects_query.search_type = SearchType::Objects;
        objects_query.limit = query.effective_limit() / 2;
        objects_query.offset = query.offset / 2;

        let (packages, objects) = tokio::join!(
            backend.search(&packages_query),
            backend.search(&objects_query)
        );
        vec![packages, objects]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::types::SearchScope;

    #[tokio::test]
    async fn test_empty_backend_set_is_validation_error() {
        let orchestrator = UnifiedSearch::new(Vec::new());
        let err = orchestrator
            .search(&SearchQuery::new("x"))
            .await
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn test_both_split_halves_limit() {
        let mut query = SearchQuery::new("x");
        query.limit = 10;
        query.offset = 4;
        query.search_type = SearchType::Both;
        // The split rules live in fan_out_both; assert the arithmetic
        // they encode.
        assert_eq!(query.effective_limit() / 2, 5);
        assert_eq!(query.offset / 2, 2);
    }

    #[test]
    fn test_report_serialization_skips_absent_error() {
        let report = BackendReport {
            backend: "graphql",
            status: BackendStatus::Available,
            result_count: 3,
            query_time_ms: 1.5,
            error_message: None,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("error_message").is_none());
        assert_eq!(value["status"], serde_json::json!("available"));
    }

    #[test]
    fn test_query_scope_default() {
        let query = SearchQuery::new("q");
        assert_eq!(query.scope, SearchScope::Global);
    }
}
