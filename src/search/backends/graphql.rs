//! Catalog GraphQL search backend.
//!
//! The primary backend: routes queries to `searchPackages`,
//! `searchObjects`, the paged `packages(bucket:)` listing, or a
//! per-package contents scan, and normalizes every hit into the common
//! shape.
//!
//! Offset handling slices the backend's first page: the `firstPage`
//! ordering dictates the global ordering and `offset`/`limit` select a
//! contiguous window of it. This matches the catalog frontend and is
//! exact while the ordered set fits one page.

use super::SearchBackend;
use crate::catalog::{CatalogClient, ObjectHit, PackageHit};
use crate::search::types::{
    BackendResponse, BackendStatus, ResultKind, SearchFilters, SearchQuery, SearchResult,
    SearchScope, SearchType,
};
use crate::Result;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::time::Instant;

/// GraphQL search backend over one catalog client.
pub struct GraphqlBackend {
    client: CatalogClient,
}

impl GraphqlBackend {
    /// Creates the backend.
    #[must_use]
    pub const fn new(client: CatalogClient) -> Self {
        Self { client }
    }

    async fn route(&self, query: &SearchQuery) -> Result<(Vec<SearchResult>, Option<u64>)> {
        match (query.scope, query.search_type) {
            (SearchScope::Package, _) => self.search_package_contents(query).await,
            (SearchScope::Bucket, SearchType::Packages) => {
                self.search_bucket_packages(query).await
            }
            (_, SearchType::Packages) => self.search_packages_global(query, &[]).await,
            (SearchScope::Bucket, _) => {
                self.search_objects_global(query, &[query.target.clone()])
                    .await
            }
            _ => self.search_objects_global(query, &[]).await,
        }
    }

    async fn search_packages_global(
        &self,
        query: &SearchQuery,
        buckets: &[String],
    ) -> Result<(Vec<SearchResult>, Option<u64>)> {
        let hits = self
            .client
            .search_packages(&query.raw_text, false, buckets)
            .await?;
        let total = hits.len() as u64;
        let results = apply_offset(hits, query.offset, query.effective_limit())
            .map(|hit| normalize_package_hit(&hit))
            .collect();
        Ok((results, Some(total)))
    }

    async fn search_objects_global(
        &self,
        query: &SearchQuery,
        buckets: &[String],
    ) -> Result<(Vec<SearchResult>, Option<u64>)> {
        let filter = build_objects_filter(&query.raw_text, &query.filters);
        let outcome = self
            .client
            .search_objects(&query.raw_text, filter.as_ref(), buckets)
            .await?;
        let total = outcome.total;
        let results = apply_offset(outcome.hits, query.offset, query.effective_limit())
            .map(|hit| normalize_object_hit(&hit))
            .collect();
        Ok((results, total))
    }

    async fn search_bucket_packages(
        &self,
        query: &SearchQuery,
    ) -> Result<(Vec<SearchResult>, Option<u64>)> {
        let limit = query.effective_limit();
        let page_number = if limit == 0 {
            1
        } else {
            (query.offset / limit) + 1
        };
        let page = self
            .client
            .bucket_packages(
                &query.target,
                Some(query.raw_text.as_str()).filter(|q| !q.is_empty()),
                u32::try_from(page_number).unwrap_or(1),
                u32::try_from(limit).unwrap_or(20),
            )
            .await?;
        let results = page
            .packages
            .into_iter()
            .map(|(bucket, name, modified)| SearchResult {
                id: format!("graphql-package-{bucket}/{name}"),
                kind: ResultKind::Package,
                title: name.clone(),
                description: format!("Package in {bucket}"),
                s3_uri: Some(format!("s3://{bucket}/.quilt/named_packages/{name}")),
                package_name: Some(name.clone()),
                logical_key: Some(name.clone()),
                size: None,
                last_modified: modified.clone(),
                metadata: BTreeMap::from([
                    ("bucket".to_string(), json!(bucket)),
                    ("name".to_string(), json!(name)),
                    ("modified".to_string(), json!(modified)),
                ]),
                score: 1.0,
                backend: "graphql",
            })
            .collect();
        Ok((results, Some(page.total)))
    }

    /// Search within one package: filter entries by logical-key substring.
    async fn search_package_contents(
        &self,
        query: &SearchQuery,
    ) -> Result<(Vec<SearchResult>, Option<u64>)> {
        let entries = self.client.package_entries(&query.target, None).await?;
        let needle = query.raw_text.to_lowercase();
        let matches: Vec<SearchResult> = entries
            .into_iter()
            .filter(|entry| {
                needle.is_empty()
                    || needle == "*"
                    || entry.logical_key.to_lowercase().contains(&needle)
            })
            .map(|entry| SearchResult {
                id: format!("graphql-pkg-entry-{}-{}", query.target, entry.logical_key),
                kind: ResultKind::File,
                title: basename(&entry.logical_key),
                description: format!("Entry in {}", query.target),
                s3_uri: entry.physical_key.clone(),
                package_name: Some(query.target.clone()),
                logical_key: Some(entry.logical_key.clone()),
                size: entry.size,
                last_modified: None,
                metadata: BTreeMap::from([("hash".to_string(), entry.hash.unwrap_or(Value::Null))]),
                score: 1.0,
                backend: "graphql",
            })
            .collect();
        let total = matches.len() as u64;
        let results: Vec<SearchResult> =
            apply_offset(matches, query.offset, query.effective_limit()).collect();
        Ok((results, Some(total)))
    }
}

impl SearchBackend for GraphqlBackend {
    fn name(&self) -> &'static str {
        "graphql"
    }

    async fn search(&self, query: &SearchQuery) -> BackendResponse {
        let start = Instant::now();
        match self.route(query).await {
            Ok((results, total)) => BackendResponse {
                backend: "graphql",
                status: BackendStatus::Available,
                results,
                total,
                query_time_ms: elapsed_ms(start),
                error_message: None,
            },
            Err(e) => BackendResponse::failed(
                "graphql",
                BackendStatus::Error,
                elapsed_ms(start),
                e.to_string(),
            ),
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Slices a hit list to the `offset..offset+limit` window.
fn apply_offset<T>(hits: Vec<T>, offset: usize, limit: usize) -> impl Iterator<Item = T> {
    hits.into_iter().skip(offset).take(limit)
}

/// Translates a query plus filters into an `ObjectFilterInput`.
///
/// Extension filters become `ext.terms`; a single-extension wildcard
/// query like `*.csv` additionally pins `key.wildcard`; size bounds map
/// to `size.gte/lte`. A bare wildcard query with no filters still pins
/// `key.wildcard`.
#[must_use]
pub fn build_objects_filter(query: &str, filters: &SearchFilters) -> Option<Value> {
    let mut gql_filter = serde_json::Map::new();
    let search_terms = query.trim();

    if filters.file_extensions.is_empty() {
        if !search_terms.is_empty() && search_terms != "*" && search_terms.starts_with("*.") {
            gql_filter.insert("key".to_string(), json!({"wildcard": search_terms}));
        }
    } else {
        gql_filter.insert(
            "ext".to_string(),
            json!({"terms": filters.file_extensions}),
        );
        if search_terms.starts_with("*.") && filters.file_extensions.len() == 1 {
            gql_filter.insert("key".to_string(), json!({"wildcard": search_terms}));
        } else if search_terms.is_empty() || search_terms == "*" {
            gql_filter.insert(
                "key".to_string(),
                json!({"wildcard": format!("*.{}", filters.file_extensions[0])}),
            );
        }
    }

    let mut size_filter = serde_json::Map::new();
    if let Some(min) = filters.size_min {
        size_filter.insert("gte".to_string(), json!(min));
    }
    if let Some(max) = filters.size_max {
        size_filter.insert("lte".to_string(), json!(max));
    }
    if !size_filter.is_empty() {
        gql_filter.insert("size".to_string(), Value::Object(size_filter));
    }

    if gql_filter.is_empty() {
        None
    } else {
        Some(Value::Object(gql_filter))
    }
}

fn basename(key: &str) -> String {
    key.rsplit('/').next().unwrap_or(key).to_string()
}

/// Normalizes one `searchObjects` hit.
fn normalize_object_hit(hit: &ObjectHit) -> SearchResult {
    SearchResult {
        id: format!("graphql-object-{}-{}", hit.bucket, hit.key),
        kind: ResultKind::File,
        title: if hit.key.is_empty() {
            "(unknown)".to_string()
        } else {
            basename(&hit.key)
        },
        description: format!("Object in {}", hit.bucket),
        s3_uri: (!hit.bucket.is_empty() && !hit.key.is_empty())
            .then(|| format!("s3://{}/{}", hit.bucket, hit.key)),
        package_name: None,
        logical_key: Some(hit.key.clone()),
        size: hit.size,
        last_modified: hit.modified.clone(),
        metadata: BTreeMap::from([
            ("bucket".to_string(), json!(hit.bucket)),
            ("version".to_string(), json!(hit.version)),
            ("size".to_string(), json!(hit.size)),
            ("modified".to_string(), json!(hit.modified)),
            ("deleted".to_string(), json!(hit.deleted)),
            ("score".to_string(), json!(hit.score)),
            ("indexed_content".to_string(), json!(hit.indexed_content)),
        ]),
        score: hit.score,
        backend: "graphql",
    }
}

/// Normalizes one `searchPackages` hit, building the
/// `"<count> files | <size> | <comment>"` description.
fn normalize_package_hit(hit: &PackageHit) -> SearchResult {
    let mut description_parts = vec![format!("{} files", hit.total_entries_count)];
    if hit.size > 0 {
        description_parts.push(human_size(hit.size));
    }
    if let Some(comment) = hit.comment.as_deref().filter(|c| !c.is_empty()) {
        description_parts.push(comment.chars().take(100).collect());
    }

    SearchResult {
        id: format!("graphql-pkg-{}-{}-{}", hit.bucket, hit.name, hit.hash),
        kind: ResultKind::Package,
        title: format!("{}/{}", hit.bucket, hit.name),
        description: description_parts.join(" | "),
        s3_uri: Some(format!(
            "s3://{}/.quilt/named_packages/{}",
            hit.bucket, hit.name
        )),
        package_name: Some(hit.name.clone()),
        logical_key: Some(hit.name.clone()),
        size: Some(hit.size),
        last_modified: Some(hit.modified.clone()),
        metadata: BTreeMap::from([
            ("bucket".to_string(), json!(hit.bucket)),
            ("name".to_string(), json!(hit.name)),
            ("hash".to_string(), json!(hit.hash)),
            ("pointer".to_string(), json!(hit.pointer)),
            ("size".to_string(), json!(hit.size)),
            ("modified".to_string(), json!(hit.modified)),
            (
                "totalEntriesCount".to_string(),
                json!(hit.total_entries_count),
            ),
            ("comment".to_string(), json!(hit.comment)),
            ("workflow".to_string(), hit.workflow.clone().unwrap_or(Value::Null)),
        ]),
        score: hit.score,
        backend: "graphql",
    }
}

/// Renders a byte count the way the catalog UI does (MB below 1 GB).
fn human_size(bytes: u64) -> String {
    #[allow(clippy::cast_precision_loss)]
    let mb = bytes as f64 / 1_048_576.0;
    if mb < 1024.0 {
        format!("{mb:.1} MB")
    } else {
        format!("{:.1} GB", mb / 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_wildcard_query_only() {
        let filter = build_objects_filter("*.csv", &SearchFilters::default());
        assert_eq!(filter, Some(json!({"key": {"wildcard": "*.csv"}})));
    }

    #[test]
    fn test_filter_extensions_and_wildcard() {
        let filters = SearchFilters {
            file_extensions: vec!["csv".to_string()],
            ..SearchFilters::default()
        };
        let filter = build_objects_filter("*.csv", &filters).unwrap_or(Value::Null);
        assert_eq!(filter["ext"], json!({"terms": ["csv"]}));
        assert_eq!(filter["key"], json!({"wildcard": "*.csv"}));
    }

    #[test]
    fn test_filter_extensions_without_query_synthesizes_wildcard() {
        let filters = SearchFilters {
            file_extensions: vec!["parquet".to_string()],
            ..SearchFilters::default()
        };
        let filter = build_objects_filter("*", &filters).unwrap_or(Value::Null);
        assert_eq!(filter["key"], json!({"wildcard": "*.parquet"}));
    }

    #[test]
    fn test_filter_size_bounds() {
        let filters = SearchFilters {
            size_min: Some(100),
            size_max: Some(5000),
            ..SearchFilters::default()
        };
        let filter = build_objects_filter("data", &filters).unwrap_or(Value::Null);
        assert_eq!(filter["size"], json!({"gte": 100, "lte": 5000}));
    }

    #[test]
    fn test_filter_plain_text_is_none() {
        assert!(build_objects_filter("genomics data", &SearchFilters::default()).is_none());
    }

    #[test]
    fn test_apply_offset_contiguous_window() {
        let hits: Vec<i32> = (0..10).collect();
        let window: Vec<i32> = apply_offset(hits, 3, 4).collect();
        assert_eq!(window, vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_apply_offset_limit_zero() {
        let hits: Vec<i32> = (0..10).collect();
        assert_eq!(apply_offset(hits, 0, 0).count(), 0);
    }

    #[test]
    fn test_normalize_object_hit_shape() {
        let hit = ObjectHit {
            id: "x".to_string(),
            score: 2.0,
            bucket: "quilt-open-ccle-virginia".to_string(),
            key: "data/expression.csv".to_string(),
            version: Some("v1".to_string()),
            size: Some(123),
            modified: Some("2026-01-01".to_string()),
            deleted: false,
            indexed_content: None,
        };
        let result = normalize_object_hit(&hit);
        assert_eq!(
            result.id,
            "graphql-object-quilt-open-ccle-virginia-data/expression.csv"
        );
        assert_eq!(result.title, "expression.csv");
        assert_eq!(
            result.s3_uri.as_deref(),
            Some("s3://quilt-open-ccle-virginia/data/expression.csv")
        );
        assert_eq!(result.kind, ResultKind::File);
        assert_eq!(result.backend, "graphql");
    }

    #[test]
    fn test_normalize_package_hit_description() {
        let hit = PackageHit {
            id: "x".to_string(),
            score: 1.0,
            bucket: "b".to_string(),
            name: "team/pkg".to_string(),
            pointer: "latest".to_string(),
            hash: "abc".to_string(),
            size: 3 * 1_048_576,
            modified: "2026-01-01".to_string(),
            total_entries_count: 7,
            comment: Some("weekly refresh".to_string()),
            workflow: None,
        };
        let result = normalize_package_hit(&hit);
        assert_eq!(result.id, "graphql-pkg-b-team/pkg-abc");
        assert_eq!(result.title, "b/team/pkg");
        assert_eq!(result.description, "7 files | 3.0 MB | weekly refresh");
        assert_eq!(
            result.s3_uri.as_deref(),
            Some("s3://b/.quilt/named_packages/team/pkg")
        );
    }

    #[test]
    fn test_human_size_gb() {
        assert_eq!(human_size(2 * 1024 * 1_048_576), "2.0 GB");
        assert_eq!(human_size(512 * 1024), "0.5 MB");
    }
}
