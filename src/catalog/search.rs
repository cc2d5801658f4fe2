//! Catalog search operations (GraphQL).
//!
//! Query shapes follow the catalog frontend: `searchPackages` and
//! `searchObjects` read their hits from `firstPage(order: BEST_MATCH)`
//! without a page-size argument, and bucket-scoped package listings go
//! through the paged `packages(bucket:)` query.

use super::client::CatalogClient;
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::{Value, json};

/// One package hit from `searchPackages`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageHit {
    /// Backend hit id.
    pub id: String,
    /// Relevance score (`BEST_MATCH` ordering).
    pub score: f64,
    /// Bucket holding the package.
    pub bucket: String,
    /// Package name (`namespace/name`).
    pub name: String,
    /// Named-package pointer.
    pub pointer: String,
    /// Revision top hash.
    pub hash: String,
    /// Total package size in bytes.
    pub size: u64,
    /// Last-modified timestamp.
    pub modified: String,
    /// Number of manifest entries.
    pub total_entries_count: u64,
    /// Revision comment.
    pub comment: Option<String>,
    /// Workflow metadata.
    pub workflow: Option<Value>,
}

/// One object hit from `searchObjects`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectHit {
    /// Backend hit id.
    pub id: String,
    /// Relevance score.
    pub score: f64,
    /// Bucket holding the object.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Object version id.
    pub version: Option<String>,
    /// Object size in bytes.
    pub size: Option<u64>,
    /// Last-modified timestamp.
    pub modified: Option<String>,
    /// Whether the hit is a delete marker.
    pub deleted: bool,
    /// Indexed text content, when available.
    pub indexed_content: Option<String>,
}

/// Result of an object search, distinguishing "no results" from hits.
#[derive(Debug, Clone, Default)]
pub struct ObjectsSearchOutcome {
    /// Matching objects in backend order.
    pub hits: Vec<ObjectHit>,
    /// Backend-reported total, when the result set was non-empty.
    pub total: Option<u64>,
}

/// One page of a bucket-scoped package listing.
#[derive(Debug, Clone, Default)]
pub struct BucketPackagesPage {
    /// Total packages matching the filter.
    pub total: u64,
    /// Packages on the requested page as `(bucket, name, modified)`.
    pub packages: Vec<(String, String, Option<String>)>,
}

impl CatalogClient {
    /// Global package search via `searchPackages`.
    ///
    /// An `EmptySearchResultSet` response yields an empty vector, not an
    /// error.
    ///
    /// # Errors
    ///
    /// Propagates catalog failures.
    pub async fn search_packages(
        &self,
        search_string: &str,
        latest_only: bool,
        buckets: &[String],
    ) -> Result<Vec<PackageHit>> {
        let query = r"
        query SearchPackages($searchString: String!, $buckets: [String!], $order: SearchResultOrder!, $latestOnly: Boolean!) {
          searchPackages(buckets: $buckets, searchString: $searchString, latestOnly: $latestOnly) {
            __typename
            ... on PackagesSearchResultSet {
              total
              firstPage(order: $order) {
                hits {
                  id
                  score
                  bucket
                  name
                  pointer
                  hash
                  size
                  modified
                  totalEntriesCount
                  comment
                  workflow
                }
              }
            }
            ... on EmptySearchResultSet { _ }
          }
        }";
        let normalized = if search_string == "*" { "" } else { search_string };
        let data = self
            .graphql(
                query,
                json!({
                    "searchString": normalized,
                    "buckets": buckets,
                    "order": "BEST_MATCH",
                    "latestOnly": latest_only,
                }),
            )
            .await?;

        let result = &data["searchPackages"];
        if result["__typename"] == json!("EmptySearchResultSet") {
            return Ok(Vec::new());
        }
        let hits = result["firstPage"]["hits"]
            .as_array()
            .map(|hits| {
                hits.iter()
                    .filter_map(|h| serde_json::from_value(h.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();
        Ok(hits)
    }

    /// Global object search via `searchObjects`.
    ///
    /// # Errors
    ///
    /// `validation_error` on `InvalidInput`, `catalog_error` on
    /// `OperationError` or an unexpected response type.
    pub async fn search_objects(
        &self,
        search_string: &str,
        filter: Option<&Value>,
        buckets: &[String],
    ) -> Result<ObjectsSearchOutcome> {
        let query = r"
        query SearchObjects($searchString: String!, $filter: ObjectsSearchFilter, $order: SearchResultOrder!, $buckets: [String!]) {
          searchObjects(buckets: $buckets, searchString: $searchString, filter: $filter) {
            __typename
            ... on ObjectsSearchResultSet {
              total
              firstPage(order: $order) {
                hits {
                  id
                  score
                  bucket
                  key
                  version
                  size
                  modified
                  deleted
                  indexedContent
                }
              }
            }
            ... on EmptySearchResultSet { _ }
            ... on InvalidInput { errors { path message name context } }
            ... on OperationError { name message context }
          }
        }";
        let normalized = if search_string == "*" { "" } else { search_string };
        let data = self
            .graphql(
                query,
                json!({
                    "searchString": normalized,
                    "filter": filter,
                    "order": "BEST_MATCH",
                    "buckets": buckets,
                }),
            )
            .await?;

        let result = &data["searchObjects"];
        match result["__typename"].as_str() {
            Some("EmptySearchResultSet") => Ok(ObjectsSearchOutcome::default()),
            Some("ObjectsSearchResultSet") | None => {
                let hits = result["firstPage"]["hits"]
                    .as_array()
                    .map(|hits| {
                        hits.iter()
                            .filter_map(|h| serde_json::from_value(h.clone()).ok())
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(ObjectsSearchOutcome {
                    hits,
                    total: result["total"].as_u64(),
                })
            }
            Some("InvalidInput") => {
                let message = result["errors"]
                    .as_array()
                    .map(|errors| {
                        errors
                            .iter()
                            .filter_map(|e| e["message"].as_str())
                            .collect::<Vec<_>>()
                            .join("; ")
                    })
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Invalid search input".to_string());
                Err(Error::Validation(message))
            }
            Some("OperationError") => Err(Error::Catalog {
                status: None,
                message: result["message"]
                    .as_str()
                    .unwrap_or("search operation failed")
                    .to_string(),
            }),
            Some(other) => Err(Error::Catalog {
                status: None,
                message: format!("unexpected searchObjects response type '{other}'"),
            }),
        }
    }

    /// Bucket-scoped package listing via the paged `packages` query.
    ///
    /// # Errors
    ///
    /// Propagates catalog failures.
    pub async fn bucket_packages(
        &self,
        bucket: &str,
        filter: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<BucketPackagesPage> {
        let query = r"
        query BucketPackages($bucket: String!, $filter: String, $page: Int!, $perPage: Int!) {
          packages(bucket: $bucket, filter: $filter) {
            total
            page(number: $page, perPage: $perPage) {
              bucket
              name
              modified
            }
          }
        }";
        let data = self
            .graphql(
                query,
                json!({
                    "bucket": bucket.trim_start_matches("s3://"),
                    "filter": filter.filter(|f| !f.is_empty()),
                    "page": page.max(1),
                    "perPage": per_page,
                }),
            )
            .await?;

        let packages = data["packages"]["page"]
            .as_array()
            .map(|page| {
                page.iter()
                    .map(|p| {
                        (
                            p["bucket"].as_str().unwrap_or(bucket).to_string(),
                            p["name"].as_str().unwrap_or_default().to_string(),
                            p["modified"].as_str().map(ToString::to_string),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(BucketPackagesPage {
            total: data["packages"]["total"].as_u64().unwrap_or_default(),
            packages,
        })
    }

    /// Cursor-paged object listing within a bucket.
    ///
    /// `first` is clamped to `1..=1000`.
    ///
    /// # Errors
    ///
    /// Propagates catalog failures.
    pub async fn bucket_objects(
        &self,
        bucket: &str,
        filter: Option<&Value>,
        first: u32,
        after: Option<&str>,
    ) -> Result<Value> {
        let query = r"
        query BucketObjects($bucket: String!, $filter: ObjectFilterInput, $first: Int, $after: String) {
          objects(bucket: $bucket, filter: $filter, first: $first, after: $after) {
            edges {
              node { key size updated contentType extension package { name topHash tag } }
              cursor
            }
            pageInfo { endCursor hasNextPage }
          }
        }";
        self.graphql(
            query,
            json!({
                "bucket": bucket,
                "filter": filter,
                "first": first.clamp(1, 1000),
                "after": after,
            }),
        )
        .await
    }
}
