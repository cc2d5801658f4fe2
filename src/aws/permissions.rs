//! Per-bucket permission discovery.
//!
//! Anchors the caller's identity with `GetCallerIdentity`, enumerates
//! candidate buckets (catalog `bucketConfigs` preferred, `ListBuckets`
//! fallback), and probes each bucket in order: `HeadBucket` gates any
//! access, `ListObjectsV2 (MaxKeys=1)` sets `can_list`, a 1-byte
//! `GetObject` on the first listed key sets `can_read`, and — only when
//! write probes are enabled — a zero-byte `.quilt_test_write` upload
//! (deleted immediately) sets `can_write`. With probes disabled,
//! write-ability is inferred from the caller's claims when available.
//!
//! Probe failures never propagate to callers: they land in
//! `BucketInfo.error_message` with level `no_access`. Results are cached
//! process-wide per `(identity_arn, bucket)` with a TTL.

use crate::auth::{AuthResult, AwsSession};
use crate::aws::s3::S3Operations;
use crate::catalog::CatalogClient;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde_json::json;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Sentinel key uploaded (and removed) by the opt-in write probe.
const WRITE_PROBE_KEY: &str = ".quilt_test_write";

/// Deadline for each individual probe call.
const PROBE_DEADLINE: Duration = Duration::from_secs(5);

/// Access level derived from the probe ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    /// No probe succeeded.
    NoAccess,
    /// Listing only.
    ListOnly,
    /// List + read.
    ReadOnly,
    /// Read + write.
    ReadWrite,
    /// List + read + write.
    FullAccess,
}

impl PermissionLevel {
    /// Returns the wire name of this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoAccess => "no_access",
            Self::ListOnly => "list_only",
            Self::ReadOnly => "read_only",
            Self::ReadWrite => "read_write",
            Self::FullAccess => "full_access",
        }
    }

    /// Derives the level from the three probe booleans.
    #[must_use]
    pub const fn from_probes(can_list: bool, can_read: bool, can_write: bool) -> Self {
        match (can_list, can_read, can_write) {
            (true, true, true) => Self::FullAccess,
            (_, true, true) => Self::ReadWrite,
            (true, true, false) => Self::ReadOnly,
            (true, false, false) => Self::ListOnly,
            _ => Self::NoAccess,
        }
    }

    /// Whether the level permits package creation.
    #[must_use]
    pub const fn is_writable(self) -> bool {
        matches!(self, Self::ReadWrite | Self::FullAccess)
    }
}

/// Cached probe result for one bucket.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BucketInfo {
    /// Bucket name.
    pub name: String,
    /// Region, when known.
    pub region: Option<String>,
    /// Derived access level.
    pub permission_level: PermissionLevel,
    /// Read probe outcome.
    pub can_read: bool,
    /// Write probe (or claims inference) outcome.
    pub can_write: bool,
    /// List probe outcome.
    pub can_list: bool,
    /// When the probes ran (RFC 3339).
    pub last_checked: String,
    /// Probe failure detail, when any probe failed.
    pub error_message: Option<String>,
}

struct CacheEntry {
    info: BucketInfo,
    inserted: Instant,
}

static PERMISSION_CACHE: Lazy<RwLock<HashMap<(String, String), CacheEntry>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Permission discovery bound to one request's session.
pub struct PermissionDiscovery {
    s3: S3Operations,
    session: AwsSession,
    ttl: Duration,
    enable_write_probes: bool,
    claims_hint: Option<AuthResult>,
    identity_arn: tokio::sync::OnceCell<String>,
}

impl PermissionDiscovery {
    /// Creates discovery over a session.
    #[must_use]
    pub fn new(session: AwsSession, ttl: Duration, enable_write_probes: bool) -> Self {
        Self {
            s3: S3Operations::new(&session).with_deadline(PROBE_DEADLINE),
            session,
            ttl,
            enable_write_probes,
            claims_hint: None,
            identity_arn: tokio::sync::OnceCell::new(),
        }
    }

    /// Supplies the caller's claims for write-ability inference.
    #[must_use]
    pub fn with_claims_hint(mut self, auth: AuthResult) -> Self {
        self.claims_hint = Some(auth);
        self
    }

    /// Anchors and returns the caller identity ARN.
    ///
    /// # Errors
    ///
    /// `aws_error` when `GetCallerIdentity` fails.
    pub async fn identity_arn(&self) -> Result<String> {
        self.identity_arn
            .get_or_try_init(|| async {
                let response = tokio::time::timeout(
                    PROBE_DEADLINE,
                    self.session.sts_client().get_caller_identity().send(),
                )
                .await
                .map_err(|_| Error::Timeout("GetCallerIdentity"))?
                .map_err(|e| Error::Aws {
                    operation: "GetCallerIdentity",
                    message: e.to_string(),
                })?;
                Ok(response.arn().unwrap_or("unknown").to_string())
            })
            .await
            .cloned()
    }

    /// Enumerates candidate buckets.
    ///
    /// Prefers the catalog's `bucketConfigs` (reflecting the stack's
    /// configured buckets); falls back to S3 `ListBuckets` when no
    /// catalog client is available or the query fails.
    pub async fn enumerate_buckets(&self, catalog: Option<&CatalogClient>) -> Vec<String> {
        if let Some(catalog) = catalog {
            match catalog
                .graphql("query { bucketConfigs { name } }", json!({}))
                .await
            {
                Ok(data) => {
                    let names: Vec<String> = data["bucketConfigs"]
                        .as_array()
                        .map(|configs| {
                            configs
                                .iter()
                                .filter_map(|c| c["name"].as_str().map(ToString::to_string))
                                .collect()
                        })
                        .unwrap_or_default();
                    if !names.is_empty() {
                        return names;
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "bucketConfigs enumeration failed, falling back to ListBuckets");
                }
            }
        }
        self.s3.list_buckets().await.unwrap_or_default()
    }

    /// Probes one bucket, consulting the cache first.
    ///
    /// Never fails: probe errors are folded into the returned
    /// `BucketInfo`.
    ///
    /// # Errors
    ///
    /// Only identity anchoring can fail (`aws_error`); probes themselves
    /// cannot.
    pub async fn discover_bucket(&self, bucket: &str) -> Result<BucketInfo> {
        let identity = self.identity_arn().await?;
        let cache_key = (identity, bucket.to_string());

        if let Ok(cache) = PERMISSION_CACHE.read()
            && let Some(entry) = cache.get(&cache_key)
            && entry.inserted.elapsed() < self.ttl
        {
            return Ok(entry.info.clone());
        }

        let info = self.probe_bucket(bucket).await;

        if let Ok(mut cache) = PERMISSION_CACHE.write() {
            cache.insert(
                cache_key,
                CacheEntry {
                    info: info.clone(),
                    inserted: Instant::now(),
                },
            );
        }
        Ok(info)
    }

    /// Runs the probe ladder against one bucket.
    async fn probe_bucket(&self, bucket: &str) -> BucketInfo {
        let now = chrono::Utc::now().to_rfc3339();
        let mut error_message = None;

        // HeadBucket gates any access.
        if let Err(e) = self.s3.head_bucket(bucket).await {
            let message = e.to_string();
            let detail = if message.contains("404") || message.contains("NotFound") {
                format!("Bucket '{bucket}' does not exist")
            } else {
                message
            };
            return BucketInfo {
                name: bucket.to_string(),
                region: self.session.region(),
                permission_level: PermissionLevel::NoAccess,
                can_read: false,
                can_write: false,
                can_list: false,
                last_checked: now,
                error_message: Some(detail),
            };
        }

        // ListObjectsV2 with MaxKeys=1 sets can_list and yields a key for
        // the read probe.
        let (can_list, first_key) = match self.s3.list_objects(bucket, "", 1, None).await {
            Ok(page) => (true, page.objects.first().map(|o| o.key.clone())),
            Err(e) => {
                error_message = Some(e.to_string());
                (false, None)
            }
        };

        // A 1-byte ranged GetObject on the first listed key sets can_read.
        let can_read = match &first_key {
            Some(key) => self.s3.get_object(bucket, key, Some(1)).await.is_ok(),
            None => false,
        };

        let can_write = self.probe_write(bucket).await;

        BucketInfo {
            name: bucket.to_string(),
            region: self.session.region(),
            permission_level: PermissionLevel::from_probes(can_list, can_read, can_write),
            can_read,
            can_write,
            can_list,
            last_checked: now,
            error_message,
        }
    }

    /// Determines write-ability.
    ///
    /// With probes enabled this uploads and deletes the sentinel object;
    /// otherwise it infers from the claims hint (`s3:PutObject` plus the
    /// bucket allow-list).
    async fn probe_write(&self, bucket: &str) -> bool {
        if self.enable_write_probes {
            let uploaded = self
                .s3
                .put_object(bucket, WRITE_PROBE_KEY, Vec::new())
                .await
                .is_ok();
            if uploaded && let Err(e) = self.s3.delete_object(bucket, WRITE_PROBE_KEY).await {
                tracing::warn!(bucket, error = %e, "failed to remove write probe object");
            }
            return uploaded;
        }
        self.claims_hint.as_ref().is_some_and(|auth| {
            auth.permissions.iter().any(|p| p == "s3:PutObject") && auth.is_bucket_allowed(bucket)
        })
    }

    /// Discovers permissions for a set of buckets, best-effort.
    ///
    /// # Errors
    ///
    /// `aws_error` only when identity anchoring fails.
    pub async fn discover_all(
        &self,
        buckets: &[String],
    ) -> Result<Vec<BucketInfo>> {
        let mut results = Vec::with_capacity(buckets.len());
        for bucket in buckets {
            results.push(self.discover_bucket(bucket).await?);
        }
        Ok(results)
    }

    /// Drops every cached entry (force refresh).
    pub fn clear_cache() {
        if let Ok(mut cache) = PERMISSION_CACHE.write() {
            cache.clear();
        }
    }

    /// Returns the number of live cache entries.
    #[must_use]
    pub fn cache_len() -> usize {
        PERMISSION_CACHE.read().map(|c| c.len()).unwrap_or(0)
    }
}

/// A scored bucket recommendation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BucketRecommendation {
    /// Bucket name.
    pub bucket_name: String,
    /// Access level at scoring time.
    pub permission_level: PermissionLevel,
    /// Heuristic score; higher is better.
    pub score: i64,
    /// Why the bucket scored what it did.
    pub rationale: Vec<String>,
    /// Bucket region, when known.
    pub region: Option<String>,
}

/// Scores writable buckets for package creation.
///
/// Scoring: +50 when the name carries a package/registry/quilt token,
/// +30 when it shares a hyphen-separated token with the source bucket,
/// +20 for full access / +10 for read-write, +25 when it matches the
/// caller's department or project context. Sorted descending; the first
/// three are the primary recommendations.
#[must_use]
pub fn score_recommendations(
    writable: &[BucketInfo],
    source_bucket: Option<&str>,
    user_context: Option<&serde_json::Value>,
) -> Vec<BucketRecommendation> {
    let mut scored: Vec<BucketRecommendation> = writable
        .iter()
        .map(|bucket| {
            let mut score = 0;
            let mut rationale = Vec::new();
            let name = bucket.name.to_lowercase();

            if ["package", "registry", "quilt"]
                .iter()
                .any(|token| name.contains(token))
            {
                score += 50;
                rationale.push("Naming pattern suggests package storage".to_string());
            }

            if let Some(source) = source_bucket {
                let source = source.to_lowercase();
                if source
                    .split('-')
                    .any(|part| !part.is_empty() && name.contains(part))
                {
                    score += 30;
                    rationale.push("Related to source bucket naming pattern".to_string());
                }
            }

            match bucket.permission_level {
                PermissionLevel::FullAccess => {
                    score += 20;
                    rationale.push("Full administrative access".to_string());
                }
                PermissionLevel::ReadWrite => {
                    score += 10;
                    rationale.push("Read and write access".to_string());
                }
                _ => {}
            }

            if let Some(context) = user_context {
                for key in ["department", "project"] {
                    if let Some(value) = context.get(key).and_then(serde_json::Value::as_str)
                        && name.contains(&value.to_lowercase())
                    {
                        score += 25;
                        rationale.push(format!("Matches {value} {key}"));
                    }
                }
            }

            BucketRecommendation {
                bucket_name: bucket.name.clone(),
                permission_level: bucket.permission_level,
                score,
                rationale,
                region: bucket.region.clone(),
            }
        })
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(name: &str, level: PermissionLevel) -> BucketInfo {
        BucketInfo {
            name: name.to_string(),
            region: None,
            permission_level: level,
            can_read: level.is_writable() || level == PermissionLevel::ReadOnly,
            can_write: level.is_writable(),
            can_list: level != PermissionLevel::NoAccess,
            last_checked: "2026-01-01T00:00:00Z".to_string(),
            error_message: None,
        }
    }

    #[test]
    fn test_level_from_probes() {
        assert_eq!(
            PermissionLevel::from_probes(true, true, true),
            PermissionLevel::FullAccess
        );
        assert_eq!(
            PermissionLevel::from_probes(false, true, true),
            PermissionLevel::ReadWrite
        );
        assert_eq!(
            PermissionLevel::from_probes(true, true, false),
            PermissionLevel::ReadOnly
        );
        assert_eq!(
            PermissionLevel::from_probes(true, false, false),
            PermissionLevel::ListOnly
        );
        assert_eq!(
            PermissionLevel::from_probes(false, false, false),
            PermissionLevel::NoAccess
        );
    }

    #[test]
    fn test_level_wire_names() {
        assert_eq!(PermissionLevel::FullAccess.as_str(), "full_access");
        assert_eq!(PermissionLevel::NoAccess.as_str(), "no_access");
    }

    #[test]
    fn test_scoring_prefers_registry_names() {
        let buckets = [
            bucket("misc-storage", PermissionLevel::ReadWrite),
            bucket("team-packages", PermissionLevel::ReadWrite),
        ];
        let scored = score_recommendations(&buckets, None, None);
        assert_eq!(scored[0].bucket_name, "team-packages");
        assert_eq!(scored[0].score, 60);
        assert_eq!(scored[1].score, 10);
    }

    #[test]
    fn test_scoring_source_bucket_relationship() {
        let buckets = [bucket("genomics-archive", PermissionLevel::FullAccess)];
        let scored = score_recommendations(&buckets, Some("genomics-raw"), None);
        assert_eq!(scored[0].score, 30 + 20);
        assert!(
            scored[0]
                .rationale
                .iter()
                .any(|r| r.contains("source bucket"))
        );
    }

    #[test]
    fn test_scoring_user_context() {
        let buckets = [bucket("oncology-data", PermissionLevel::ReadWrite)];
        let context = serde_json::json!({"department": "Oncology"});
        let scored = score_recommendations(&buckets, None, Some(&context));
        assert_eq!(scored[0].score, 10 + 25);
    }

    #[test]
    fn test_cache_clear() {
        PermissionDiscovery::clear_cache();
        assert_eq!(PermissionDiscovery::cache_len(), 0);
    }
}
