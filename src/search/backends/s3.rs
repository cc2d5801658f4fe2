//! S3 list-and-filter fallback backend.
//!
//! Used when the caller asks for it or GraphQL is unavailable. Lists keys
//! under a prefix extracted from the query, filters them against tokens
//! and structured filters, and ranks by a basename-weighted heuristic.
//! Scores are opaque; only the descending ordering is meaningful.

use super::SearchBackend;
use crate::aws::s3::S3Operations;
use crate::search::types::{
    BackendResponse, BackendStatus, ResultKind, SearchFilters, SearchQuery, SearchResult,
    SearchScope,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Instant;

/// Words stripped before token matching.
const STOP_WORDS: &[&str] = &[
    "find", "search", "get", "files", "file", "data", "show", "list",
];

static EXT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\*\.([a-z0-9]{2,5})",              // *.csv
        r"\.([a-z0-9]{2,5})\s+(?:files?|data)", // .csv files
        r"\b([a-z0-9]{2,5})\s+(?:files?|data)", // csv files
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// S3 fallback backend bound to one request's session.
pub struct S3FallbackBackend {
    s3: S3Operations,
    default_bucket: String,
}

impl S3FallbackBackend {
    /// Creates the backend.
    ///
    /// `default_bucket` serves global/catalog-scoped queries, which have
    /// no bucket of their own to list.
    #[must_use]
    pub const fn new(s3: S3Operations, default_bucket: String) -> Self {
        Self { s3, default_bucket }
    }

    async fn search_bucket(
        &self,
        query: &SearchQuery,
        bucket: &str,
    ) -> crate::Result<Vec<SearchResult>> {
        let bucket_name = bucket
            .trim_start_matches("s3://")
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string();

        let plan = QueryPlan::build(&query.raw_text);
        let limit = query.effective_limit();
        let collect_target = limit.saturating_mul(2).max(limit);

        let mut results: Vec<SearchResult> = Vec::new();
        let mut seen = 0usize;
        let mut continuation: Option<String> = None;

        loop {
            let page = self
                .s3
                .list_objects(
                    &bucket_name,
                    &plan.prefix,
                    1000,
                    continuation.as_deref(),
                )
                .await?;

            for object in &page.objects {
                seen += 1;
                if !plan.matches(&object.key) {
                    continue;
                }
                if !matches_filters(object.size, &object.key, &query.filters) {
                    continue;
                }
                results.push(SearchResult {
                    id: format!("s3://{bucket_name}/{}", object.key),
                    kind: ResultKind::File,
                    title: basename(&object.key),
                    description: format!("S3 object in {bucket_name}"),
                    s3_uri: Some(format!("s3://{bucket_name}/{}", object.key)),
                    package_name: None,
                    logical_key: Some(object.key.clone()),
                    size: Some(object.size),
                    last_modified: object.last_modified.clone(),
                    metadata: BTreeMap::from([
                        ("bucket".to_string(), json!(bucket_name)),
                        (
                            "storage_class".to_string(),
                            json!(object.storage_class.clone().unwrap_or_else(|| "STANDARD".to_string())),
                        ),
                        ("etag".to_string(), json!(object.etag)),
                    ]),
                    score: plan.score(&object.key),
                    backend: "s3",
                });
            }

            continuation = page.next_token;
            if continuation.is_none() || seen >= collect_target || results.len() >= limit {
                break;
            }
        }

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);
        Ok(results)
    }
}

impl SearchBackend for S3FallbackBackend {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn search(&self, query: &SearchQuery) -> BackendResponse {
        let start = Instant::now();
        let bucket = match query.scope {
            SearchScope::Bucket if !query.target.is_empty() => query.target.clone(),
            SearchScope::Global | SearchScope::Catalog => self.default_bucket.clone(),
            _ => {
                return BackendResponse::failed(
                    "s3",
                    BackendStatus::Unavailable,
                    start.elapsed().as_secs_f64() * 1000.0,
                    "S3 fallback requires a bucket-scoped query",
                );
            }
        };

        match self.search_bucket(query, &bucket).await {
            Ok(results) => BackendResponse {
                backend: "s3",
                status: BackendStatus::Available,
                total: Some(results.len() as u64),
                results,
                query_time_ms: start.elapsed().as_secs_f64() * 1000.0,
                error_message: None,
            },
            Err(e) => BackendResponse::failed(
                "s3",
                BackendStatus::Error,
                start.elapsed().as_secs_f64() * 1000.0,
                e.to_string(),
            ),
        }
    }
}

/// The listing prefix and match tokens extracted from a query.
#[derive(Debug, Clone, PartialEq)]
struct QueryPlan {
    prefix: String,
    tokens: Vec<String>,
}

impl QueryPlan {
    /// Builds the plan: path-like queries become listing prefixes,
    /// everything else is tokenized (extension patterns first, stopwords
    /// dropped).
    fn build(query: &str) -> Self {
        let query_lower = query.to_lowercase();

        let is_path_like = query.contains('/')
            && !["find", "search", "get"]
                .iter()
                .any(|op| query_lower.contains(op));
        if is_path_like {
            return Self {
                prefix: query.to_string(),
                tokens: Vec::new(),
            };
        }

        let mut tokens: Vec<String> = Vec::new();
        for pattern in EXT_PATTERNS.iter() {
            for capture in pattern.captures_iter(&query_lower) {
                if let Some(ext) = capture.get(1) {
                    let ext = ext.as_str().to_string();
                    if !tokens.contains(&ext) {
                        tokens.push(ext);
                    }
                }
            }
        }
        for word in query_lower.split_whitespace() {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric());
            if word.is_empty() || STOP_WORDS.contains(&word) {
                continue;
            }
            let word = word.to_string();
            if !tokens.contains(&word) {
                tokens.push(word);
            }
        }

        Self {
            prefix: String::new(),
            tokens,
        }
    }

    /// A key matches when any token appears in it (or no tokens exist).
    fn matches(&self, key: &str) -> bool {
        if self.tokens.is_empty() {
            return true;
        }
        let key_lower = key.to_lowercase();
        self.tokens.iter().any(|t| key_lower.contains(t))
    }

    /// Scores a key: 1.0 per token in the basename, 0.5 per token found
    /// elsewhere, normalized by token count and capped at 1.0.
    fn score(&self, key: &str) -> f64 {
        if self.tokens.is_empty() {
            return 0.5;
        }
        let key_lower = key.to_lowercase();
        let name_lower = basename(key).to_lowercase();
        let mut score = 0.0;
        for token in &self.tokens {
            if name_lower.contains(token) {
                score += 1.0;
            } else if key_lower.contains(token) {
                score += 0.5;
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let normalized = score / self.tokens.len() as f64;
        normalized.min(1.0)
    }
}

fn matches_filters(size: u64, key: &str, filters: &SearchFilters) -> bool {
    if !filters.file_extensions.is_empty() {
        let ext = key
            .rsplit('.')
            .next()
            .filter(|e| !e.contains('/'))
            .unwrap_or_default()
            .to_lowercase();
        if !filters.file_extensions.iter().any(|f| *f == ext) {
            return false;
        }
    }
    if let Some(min) = filters.size_min
        && size < min
    {
        return false;
    }
    if let Some(max) = filters.size_max
        && size > max
    {
        return false;
    }
    true
}

fn basename(key: &str) -> String {
    key.rsplit('/').next().unwrap_or(key).to_string()
}
