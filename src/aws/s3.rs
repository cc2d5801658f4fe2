//! Thin S3 wrappers used by the object tools and the search fallback.
//!
//! Every call carries a deadline and maps SDK failures into the error
//! taxonomy; callers never see raw SDK error types.

use crate::auth::AwsSession;
use crate::{Error, Result};
use aws_sdk_s3::primitives::{ByteStream, DateTimeFormat};
use std::time::Duration;

/// Default deadline for S3 calls made by tools.
const S3_DEADLINE: Duration = Duration::from_secs(30);

/// One listed S3 object.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    /// Object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last-modified timestamp (RFC 3339), when reported.
    pub last_modified: Option<String>,
    /// Storage class, when reported.
    pub storage_class: Option<String>,
    /// ETag, when reported.
    pub etag: Option<String>,
}

/// One page of a bucket listing.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    /// Objects on this page.
    pub objects: Vec<ObjectInfo>,
    /// Continuation token for the next page, when truncated.
    pub next_token: Option<String>,
}

/// S3 operations bound to one session.
#[derive(Debug, Clone)]
pub struct S3Operations {
    client: aws_sdk_s3::Client,
    deadline: Duration,
}

impl S3Operations {
    /// Creates the wrapper over a session.
    #[must_use]
    pub fn new(session: &AwsSession) -> Self {
        Self {
            client: session.s3_client(),
            deadline: S3_DEADLINE,
        }
    }

    /// Overrides the per-call deadline (used by permission probes).
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Lists one page of objects under a prefix.
    ///
    /// # Errors
    ///
    /// `aws_error` for SDK failures, `timeout` past the deadline.
    pub async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        max_keys: i32,
        continuation: Option<&str>,
    ) -> Result<ObjectPage> {
        let mut request = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .max_keys(max_keys);
        if !prefix.is_empty() {
            request = request.prefix(prefix);
        }
        if let Some(token) = continuation {
            request = request.continuation_token(token);
        }

        let response = tokio::time::timeout(self.deadline, request.send())
            .await
            .map_err(|_| Error::Timeout("ListObjectsV2"))?
            .map_err(|e| Error::Aws {
                operation: "ListObjectsV2",
                message: e.to_string(),
            })?;

        let objects = response
            .contents()
            .iter()
            .map(|obj| ObjectInfo {
                key: obj.key().unwrap_or_default().to_string(),
                size: obj.size().unwrap_or_default().max(0).unsigned_abs(),
                last_modified: obj
                    .last_modified()
                    .and_then(|dt| dt.fmt(DateTimeFormat::DateTime).ok()),
                storage_class: obj.storage_class().map(|sc| sc.as_str().to_string()),
                etag: obj.e_tag().map(ToString::to_string),
            })
            .collect();

        Ok(ObjectPage {
            objects,
            next_token: response.next_continuation_token().map(ToString::to_string),
        })
    }

    /// Checks bucket existence/accessibility via `HeadBucket`.
    ///
    /// # Errors
    ///
    /// `aws_error` carrying the SDK failure, `timeout` past the deadline.
    pub async fn head_bucket(&self, bucket: &str) -> Result<()> {
        tokio::time::timeout(
            self.deadline,
            self.client.head_bucket().bucket(bucket).send(),
        )
        .await
        .map_err(|_| Error::Timeout("HeadBucket"))?
        .map_err(|e| Error::Aws {
            operation: "HeadBucket",
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Fetches object metadata via `HeadObject`.
    ///
    /// # Errors
    ///
    /// `aws_error` for SDK failures, `timeout` past the deadline.
    pub async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectInfo> {
        let response = tokio::time::timeout(
            self.deadline,
            self.client.head_object().bucket(bucket).key(key).send(),
        )
        .await
        .map_err(|_| Error::Timeout("HeadObject"))?
        .map_err(|e| Error::Aws {
            operation: "HeadObject",
            message: e.to_string(),
        })?;

        Ok(ObjectInfo {
            key: key.to_string(),
            size: response.content_length().unwrap_or_default().max(0).unsigned_abs(),
            last_modified: response
                .last_modified()
                .and_then(|dt| dt.fmt(DateTimeFormat::DateTime).ok()),
            storage_class: response.storage_class().map(|sc| sc.as_str().to_string()),
            etag: response.e_tag().map(ToString::to_string),
        })
    }

    /// Downloads an object, optionally only its first `range_bytes` bytes.
    ///
    /// # Errors
    ///
    /// `aws_error` for SDK failures, `timeout` past the deadline.
    pub async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        range_bytes: Option<u64>,
    ) -> Result<Vec<u8>> {
        let mut request = self.client.get_object().bucket(bucket).key(key);
        if let Some(limit) = range_bytes {
            request = request.range(format!("bytes=0-{}", limit.saturating_sub(1)));
        }
        let response = tokio::time::timeout(self.deadline, request.send())
            .await
            .map_err(|_| Error::Timeout("GetObject"))?
            .map_err(|e| Error::Aws {
                operation: "GetObject",
                message: e.to_string(),
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| Error::Aws {
                operation: "GetObject",
                message: format!("failed to read body: {e}"),
            })?
            .into_bytes();
        Ok(bytes.to_vec())
    }

    /// Uploads an object.
    ///
    /// # Errors
    ///
    /// `aws_error` for SDK failures, `timeout` past the deadline.
    pub async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        tokio::time::timeout(
            self.deadline,
            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(ByteStream::from(body))
                .send(),
        )
        .await
        .map_err(|_| Error::Timeout("PutObject"))?
        .map_err(|e| Error::Aws {
            operation: "PutObject",
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Deletes an object (used to clean up write probes).
    ///
    /// # Errors
    ///
    /// `aws_error` for SDK failures, `timeout` past the deadline.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        tokio::time::timeout(
            self.deadline,
            self.client.delete_object().bucket(bucket).key(key).send(),
        )
        .await
        .map_err(|_| Error::Timeout("DeleteObject"))?
        .map_err(|e| Error::Aws {
            operation: "DeleteObject",
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Lists the buckets visible to this identity.
    ///
    /// # Errors
    ///
    /// `aws_error` for SDK failures, `timeout` past the deadline.
    pub async fn list_buckets(&self) -> Result<Vec<String>> {
        let response = tokio::time::timeout(self.deadline, self.client.list_buckets().send())
            .await
            .map_err(|_| Error::Timeout("ListBuckets"))?
            .map_err(|e| Error::Aws {
                operation: "ListBuckets",
                message: e.to_string(),
            })?;
        Ok(response
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(ToString::to_string))
            .collect())
    }
}

/// Splits an `s3://bucket/key` URI into `(bucket, key)`.
///
/// # Errors
///
/// `validation_error` when the scheme is missing or the bucket/key parts
/// are empty.
pub fn parse_s3_uri(uri: &str) -> Result<(String, String)> {
    let rest = uri
        .strip_prefix("s3://")
        .ok_or_else(|| Error::Validation(format!("Invalid S3 URI (missing s3:// scheme): {uri}")))?;
    let (bucket, key) = rest
        .split_once('/')
        .ok_or_else(|| Error::Validation(format!("Invalid S3 URI (missing key): {uri}")))?;
    if bucket.is_empty() || key.is_empty() {
        return Err(Error::Validation(format!(
            "Invalid S3 URI (empty bucket or key): {uri}"
        )));
    }
    Ok((bucket.to_string(), key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_s3_uri_valid() {
        let (bucket, key) = parse_s3_uri("s3://my-bucket/path/to/data.csv").unwrap();
        assert_eq!(bucket, "my-bucket");
        assert_eq!(key, "path/to/data.csv");
    }

    #[test]
    fn test_parse_s3_uri_rejects_missing_scheme() {
        assert!(parse_s3_uri("my-bucket/key").is_err());
        assert!(parse_s3_uri("http://my-bucket/key").is_err());
    }

    #[test]
    fn test_parse_s3_uri_rejects_missing_key() {
        assert!(parse_s3_uri("s3://my-bucket").is_err());
        assert!(parse_s3_uri("s3://my-bucket/").is_err());
        assert!(parse_s3_uri("s3:///key").is_err());
    }
}
