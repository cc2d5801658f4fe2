//! Search data model: queries, filters, normalized hits.

use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Where a search looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Everything reachable.
    #[default]
    Global,
    /// The current catalog.
    Catalog,
    /// One bucket (`target` names it).
    Bucket,
    /// One package (`target` names it).
    Package,
}

impl SearchScope {
    /// Parses a scope string; unknown values fall back to global.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "catalog" => Self::Catalog,
            "bucket" => Self::Bucket,
            "package" => Self::Package,
            _ => Self::Global,
        }
    }
}

/// What a search looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    /// Classify from the query text.
    #[default]
    Auto,
    /// Packages / collections only.
    Packages,
    /// Individual files/objects only.
    Objects,
    /// Both, with the limit split evenly.
    Both,
}

impl SearchType {
    /// Parses a type string; unknown values fall back to auto.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "packages" => Self::Packages,
            "objects" => Self::Objects,
            "both" => Self::Both,
            _ => Self::Auto,
        }
    }
}

/// Structured filters accompanying a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    /// Restrict to these file extensions (dots stripped, lowercased).
    pub file_extensions: Vec<String>,
    /// Minimum object size in bytes.
    pub size_min: Option<u64>,
    /// Maximum object size in bytes.
    pub size_max: Option<u64>,
}

impl SearchFilters {
    /// Parses a filter map from tool arguments.
    ///
    /// # Errors
    ///
    /// `validation_error` when `size_min > size_max`.
    pub fn from_value(value: Option<&Value>) -> Result<Self> {
        let Some(map) = value.and_then(Value::as_object) else {
            return Ok(Self::default());
        };
        let file_extensions = map
            .get("file_extensions")
            .and_then(Value::as_array)
            .map(|exts| {
                exts.iter()
                    .filter_map(Value::as_str)
                    .map(|e| e.trim_start_matches('.').to_lowercase())
                    .collect()
            })
            .unwrap_or_default();
        let size_min = map.get("size_min").and_then(Value::as_u64);
        let size_max = map.get("size_max").and_then(Value::as_u64);
        if let (Some(min), Some(max)) = (size_min, size_max)
            && min > max
        {
            return Err(Error::Validation(format!(
                "size_min ({min}) must not exceed size_max ({max})"
            )));
        }
        Ok(Self {
            file_extensions,
            size_min,
            size_max,
        })
    }

    /// Whether no filter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.file_extensions.is_empty() && self.size_min.is_none() && self.size_max.is_none()
    }
}

/// One search request, already validated.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Raw query text.
    pub raw_text: String,
    /// Search scope.
    pub scope: SearchScope,
    /// Scope target (bucket or package name) when the scope is narrow.
    pub target: String,
    /// What to search for.
    pub search_type: SearchType,
    /// Structured filters.
    pub filters: SearchFilters,
    /// Page size, clamped to `1..=1000` (0 allowed: count-style calls).
    pub limit: usize,
    /// Offset into the backend's stable ordering.
    pub offset: usize,
}

impl SearchQuery {
    /// Creates a query with defaults for everything but the text.
    #[must_use]
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            limit: 20,
            ..Self::default()
        }
    }

    /// Returns the effective page size (`limit` capped at 1000).
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        self.limit.min(1000)
    }
}

/// Kind of a normalized hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    /// A package revision.
    Package,
    /// An individual object.
    File,
    /// A bucket.
    Bucket,
    /// A backend-reported error hit.
    Error,
}

/// One normalized search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Stable hit id (`graphql-object-...`, `graphql-pkg-...`, `s3://...`).
    pub id: String,
    /// Hit kind.
    #[serde(rename = "type")]
    pub kind: ResultKind,
    /// Display title.
    pub title: String,
    /// Human-readable description.
    pub description: String,
    /// S3 URI, when the hit maps to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_uri: Option<String>,
    /// Package name, when the hit belongs to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    /// Logical key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logical_key: Option<String>,
    /// Size in bytes, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Last-modified timestamp, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// Backend-specific metadata.
    pub metadata: BTreeMap<String, Value>,
    /// Relevance score; opaque, comparable only within one backend.
    pub score: f64,
    /// The backend that produced this hit.
    pub backend: &'static str,
}

/// Health of a backend during one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendStatus {
    /// The backend answered.
    Available,
    /// The backend could not be used (no token, no endpoint).
    Unavailable,
    /// The backend failed mid-query.
    Error,
}

/// One backend's contribution to a unified search.
#[derive(Debug, Clone, Serialize)]
pub struct BackendResponse {
    /// Backend name.
    pub backend: &'static str,
    /// Health during this search.
    pub status: BackendStatus,
    /// Normalized hits.
    pub results: Vec<SearchResult>,
    /// Backend-reported total, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    /// Wall-clock query time in milliseconds.
    pub query_time_ms: f64,
    /// Error detail for `Unavailable`/`Error` statuses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl BackendResponse {
    /// Builds a failed response carrying no hits.
    #[must_use]
    pub fn failed(
        backend: &'static str,
        status: BackendStatus,
        query_time_ms: f64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            status,
            results: Vec::new(),
            total: None,
            query_time_ms,
            error_message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scope_parse() {
        assert_eq!(SearchScope::parse("bucket"), SearchScope::Bucket);
        assert_eq!(SearchScope::parse("CATALOG"), SearchScope::Catalog);
        assert_eq!(SearchScope::parse("package"), SearchScope::Package);
        assert_eq!(SearchScope::parse("anything"), SearchScope::Global);
    }

    #[test]
    fn test_type_parse() {
        assert_eq!(SearchType::parse("objects"), SearchType::Objects);
        assert_eq!(SearchType::parse("Packages"), SearchType::Packages);
        assert_eq!(SearchType::parse("both"), SearchType::Both);
        assert_eq!(SearchType::parse("?"), SearchType::Auto);
    }

    #[test]
    fn test_filters_normalize_extensions() {
        let filters = SearchFilters::from_value(Some(&json!({
            "file_extensions": [".CSV", "Parquet"],
        })))
        .unwrap();
        assert_eq!(filters.file_extensions, vec!["csv", "parquet"]);
    }

    #[test]
    fn test_filters_size_window_validation() {
        let err = SearchFilters::from_value(Some(&json!({
            "size_min": 100, "size_max": 10,
        })))
        .map(|_| ())
        .unwrap_err();
        assert_eq!(err.kind(), "validation_error");

        let ok = SearchFilters::from_value(Some(&json!({"size_min": 10, "size_max": 100})));
        assert!(ok.is_ok());
    }

    #[test]
    fn test_filters_absent() {
        let filters = SearchFilters::from_value(None).unwrap();
        assert!(filters.is_empty());
    }

    #[test]
    fn test_effective_limit_clamped() {
        let mut query = SearchQuery::new("x");
        query.limit = 5000;
        assert_eq!(query.effective_limit(), 1000);
        query.limit = 0;
        assert_eq!(query.effective_limit(), 0);
    }

    #[test]
    fn test_result_serialization_skips_empty_options() {
        let result = SearchResult {
            id: "graphql-object-b-k".to_string(),
            kind: ResultKind::File,
            title: "k".to_string(),
            description: "Object in b".to_string(),
            s3_uri: None,
            package_name: None,
            logical_key: Some("k".to_string()),
            size: None,
            last_modified: None,
            metadata: BTreeMap::new(),
            score: 1.0,
            backend: "graphql",
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["type"], json!("file"));
        assert!(value.get("s3_uri").is_none());
        assert_eq!(value["backend"], json!("graphql"));
    }
}
