//! Package read and revision operations.

use super::client::CatalogClient;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// One entry of a package manifest.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageEntry {
    /// Logical key inside the package.
    pub logical_key: String,
    /// Backing physical key (usually an `s3://` URI).
    pub physical_key: Option<String>,
    /// Entry size in bytes.
    pub size: Option<u64>,
    /// Content hash.
    pub hash: Option<Value>,
}

impl CatalogClient {
    /// Lists package names, optionally under a prefix.
    ///
    /// # Errors
    ///
    /// Propagates catalog failures.
    pub async fn packages_list(
        &self,
        prefix: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<String>> {
        let query = r"
        query PackagesList($prefix: String, $limit: Int) {
          packages(prefix: $prefix, first: $limit) {
            edges { node { name } }
          }
        }";
        let data = self
            .graphql(query, json!({"prefix": prefix, "limit": limit}))
            .await?;
        let names = data["packages"]["edges"]
            .as_array()
            .map(|edges| {
                edges
                    .iter()
                    .filter_map(|e| e["node"]["name"].as_str().map(ToString::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Ok(names)
    }

    /// Fetches the entries of a package, optionally capped.
    ///
    /// # Errors
    ///
    /// `not_found` when the package does not exist; catalog failures
    /// otherwise.
    pub async fn package_entries(
        &self,
        package_name: &str,
        top: Option<u32>,
    ) -> Result<Vec<PackageEntry>> {
        let query = r"
        query PackageEntries($name: String!, $first: Int) {
          package(name: $name) {
            entries(first: $first) {
              edges { node { logicalKey physicalKey size hash } }
            }
          }
        }";
        let data = self
            .graphql(query, json!({"name": package_name, "first": top}))
            .await?;
        if data["package"].is_null() {
            return Err(Error::NotFound(format!(
                "Package '{package_name}' not found"
            )));
        }
        let entries = data["package"]["entries"]["edges"]
            .as_array()
            .map(|edges| {
                edges
                    .iter()
                    .filter_map(|e| serde_json::from_value(e["node"].clone()).ok())
                    .collect()
            })
            .unwrap_or_default();
        Ok(entries)
    }

    /// Creates a package revision via `POST /api/package_revisions`.
    ///
    /// # Errors
    ///
    /// Propagates catalog failures.
    pub async fn package_create(
        &self,
        package_name: &str,
        s3_uris: &[String],
        metadata: &Value,
        message: &str,
        flatten: bool,
        copy_mode: &str,
    ) -> Result<Value> {
        let payload = json!({
            "package": package_name,
            "s3_uris": s3_uris,
            "metadata": metadata,
            "message": message,
            "flatten": flatten,
            "copy_mode": copy_mode,
        });
        self.rest(
            reqwest::Method::POST,
            "/api/package_revisions",
            Some(&payload),
        )
        .await
    }

    /// Updates a package via `POST /api/package_revisions/update`.
    ///
    /// # Errors
    ///
    /// Propagates catalog failures.
    pub async fn package_update(
        &self,
        package_name: &str,
        s3_uris: &[String],
        metadata: &Value,
        message: &str,
        flatten: bool,
        copy_mode: &str,
    ) -> Result<Value> {
        let payload = json!({
            "package": package_name,
            "s3_uris": s3_uris,
            "metadata": metadata,
            "message": message,
            "copy_mode": copy_mode,
            "flatten": flatten,
        });
        self.rest(
            reqwest::Method::POST,
            "/api/package_revisions/update",
            Some(&payload),
        )
        .await
    }

    /// Deletes a package via `DELETE /api/packages/{name}`.
    ///
    /// # Errors
    ///
    /// Propagates catalog failures.
    pub async fn package_delete(&self, package_name: &str) -> Result<Value> {
        self.rest(
            reqwest::Method::DELETE,
            &format!("/api/packages/{package_name}"),
            None,
        )
        .await
    }

    /// Runs the server-side bucket search (`POST /api/search/bucket`).
    ///
    /// # Errors
    ///
    /// Propagates catalog failures.
    pub async fn bucket_search(&self, bucket: &str, query: &Value, limit: i64) -> Result<Value> {
        let payload = json!({
            "bucket": bucket,
            "query": query,
            "limit": limit.max(0),
        });
        self.rest(reqwest::Method::POST, "/api/search/bucket", Some(&payload))
            .await
    }
}
