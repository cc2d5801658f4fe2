//! Tabulator table administration.
//!
//! Tabulator tables are catalog-managed virtual table definitions stored
//! per bucket. Deleting a table is setting its config to null.

use super::client::CatalogClient;
use super::union::decode_union;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// One tabulator table definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TabulatorTable {
    /// Table name.
    pub name: String,
    /// YAML configuration.
    pub config: Option<String>,
}

impl CatalogClient {
    /// Lists the tabulator tables configured on a bucket.
    ///
    /// # Errors
    ///
    /// `not_found` when the bucket is unknown to the catalog.
    pub async fn tabulator_tables_list(&self, bucket_name: &str) -> Result<Vec<TabulatorTable>> {
        let query = r"
        query ($bucketName: String!) {
          bucketConfig(name: $bucketName) {
            name
            tabulatorTables { name config }
          }
        }";
        let data = self
            .graphql(query, json!({"bucketName": bucket_name}))
            .await?;
        if data["bucketConfig"].is_null() {
            return Err(Error::NotFound(format!(
                "Bucket '{bucket_name}' not found or tabulator data unavailable"
            )));
        }
        let tables = data["bucketConfig"]["tabulatorTables"]
            .as_array()
            .map(|tables| {
                tables
                    .iter()
                    .filter_map(|t| serde_json::from_value(t.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();
        Ok(tables)
    }

    /// Creates, replaces, or (with `config = None`) deletes a table.
    ///
    /// # Errors
    ///
    /// `validation_error` for rejected configs, `catalog_error` for
    /// operation failures.
    pub async fn tabulator_table_set(
        &self,
        bucket_name: &str,
        table_name: &str,
        config_yaml: Option<&str>,
    ) -> Result<Vec<TabulatorTable>> {
        let mutation = r"
        mutation ($bucketName: String!, $tableName: String!, $config: String) {
          admin {
            bucketSetTabulatorTable(bucketName: $bucketName, tableName: $tableName, config: $config) {
              __typename
              ... on BucketConfig {
                name
                tabulatorTables { name config }
              }
              ... on InvalidInput { errors { message path } }
              ... on OperationError { message name }
            }
          }
        }";
        let data = self
            .graphql(
                mutation,
                json!({
                    "bucketName": bucket_name,
                    "tableName": table_name,
                    "config": config_yaml,
                }),
            )
            .await?;
        let payload = data["admin"]["bucketSetTabulatorTable"].clone();
        if payload.is_null() {
            return Err(Error::Catalog {
                status: None,
                message: "missing tabulator mutation result".to_string(),
            });
        }
        let decoded = decode_union(payload, &["BucketConfig"])?;
        let tables = decoded["tabulatorTables"]
            .as_array()
            .map(|tables| {
                tables
                    .iter()
                    .filter_map(|t| serde_json::from_value(t.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();
        Ok(tables)
    }

    /// Renames a tabulator table.
    ///
    /// # Errors
    ///
    /// As [`CatalogClient::tabulator_table_set`].
    pub async fn tabulator_table_rename(
        &self,
        bucket_name: &str,
        table_name: &str,
        new_table_name: &str,
    ) -> Result<Vec<TabulatorTable>> {
        let mutation = r"
        mutation ($bucketName: String!, $tableName: String!, $newTableName: String!) {
          admin {
            bucketRenameTabulatorTable(
              bucketName: $bucketName
              tableName: $tableName
              newTableName: $newTableName
            ) {
              __typename
              ... on BucketConfig {
                name
                tabulatorTables { name config }
              }
              ... on InvalidInput { errors { message path } }
              ... on OperationError { message name }
            }
          }
        }";
        let data = self
            .graphql(
                mutation,
                json!({
                    "bucketName": bucket_name,
                    "tableName": table_name,
                    "newTableName": new_table_name,
                }),
            )
            .await?;
        let payload = data["admin"]["bucketRenameTabulatorTable"].clone();
        if payload.is_null() {
            return Err(Error::Catalog {
                status: None,
                message: "missing tabulator rename result".to_string(),
            });
        }
        let decoded = decode_union(payload, &["BucketConfig"])?;
        let tables = decoded["tabulatorTables"]
            .as_array()
            .map(|tables| {
                tables
                    .iter()
                    .filter_map(|t| serde_json::from_value(t.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();
        Ok(tables)
    }

    /// Reads the tabulator open-query flag.
    ///
    /// # Errors
    ///
    /// `catalog_error` when the flag is unavailable.
    pub async fn tabulator_open_query_get(&self) -> Result<bool> {
        let data = self
            .graphql("query { admin { tabulatorOpenQuery } }", json!({}))
            .await?;
        data["admin"]["tabulatorOpenQuery"]
            .as_bool()
            .ok_or_else(|| Error::Catalog {
                status: None,
                message: "tabulator open query status unavailable".to_string(),
            })
    }

    /// Sets the tabulator open-query flag, returning the new value.
    ///
    /// # Errors
    ///
    /// `catalog_error` when the mutation response is malformed.
    pub async fn tabulator_open_query_set(&self, enabled: bool) -> Result<bool> {
        let mutation = r"
        mutation ($enabled: Boolean!) {
          admin {
            setTabulatorOpenQuery(enabled: $enabled) { tabulatorOpenQuery }
          }
        }";
        let data = self.graphql(mutation, json!({"enabled": enabled})).await?;
        data["admin"]["setTabulatorOpenQuery"]["tabulatorOpenQuery"]
            .as_bool()
            .ok_or_else(|| Error::Catalog {
                status: None,
                message: "invalid tabulator open query response".to_string(),
            })
    }
}
