//! Search suggestions for partial queries.
//!
//! Pure heuristics: complete the partial text against common query
//! shapes, propose filters when an extension is recognizable, and
//! propose scopes when the text names a container. No backend calls.

use super::intent;
use super::types::SearchType;
use serde::Serialize;

/// One suggestion with its rationale.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    /// Suggested query, filter, or scope text.
    pub suggestion: String,
    /// `query`, `filter`, or `scope`.
    pub kind: &'static str,
    /// Why this was suggested.
    pub explanation: String,
}

/// Query completions offered for short prefixes.
const COMMON_QUERIES: &[&str] = &[
    "CSV files",
    "README files",
    "genomics data",
    "machine learning packages",
    "files larger than 100MB",
    "packages created this month",
];

/// Extensions recognized for filter suggestions.
const KNOWN_EXTENSIONS: &[&str] = &[
    "csv", "tsv", "json", "parquet", "txt", "md", "ipynb", "bam", "vcf", "fastq", "png",
];

/// Builds suggestions for a partial query.
///
/// Returns at most `limit` suggestions; an empty partial yields the
/// common-query starters.
#[must_use]
pub fn suggest(partial_query: &str, limit: usize) -> Vec<Suggestion> {
    let partial = partial_query.trim();
    let partial_lower = partial.to_lowercase();
    let mut suggestions: Vec<Suggestion> = Vec::new();

    if partial.is_empty() {
        suggestions.extend(COMMON_QUERIES.iter().map(|q| Suggestion {
            suggestion: (*q).to_string(),
            kind: "query",
            explanation: "Common search query".to_string(),
        }));
        suggestions.truncate(limit);
        return suggestions;
    }

    // Prefix completions against the common queries.
    for query in COMMON_QUERIES {
        if query.to_lowercase().starts_with(&partial_lower) && !query.eq_ignore_ascii_case(partial)
        {
            suggestions.push(Suggestion {
                suggestion: (*query).to_string(),
                kind: "query",
                explanation: format!("Completes '{partial}'"),
            });
        }
    }

    // Extension-shaped input suggests a wildcard query plus a filter.
    let bare = partial_lower.trim_start_matches("*.").trim_start_matches('.');
    if KNOWN_EXTENSIONS.contains(&bare) {
        suggestions.push(Suggestion {
            suggestion: format!("*.{bare}"),
            kind: "query",
            explanation: format!("Wildcard search for .{bare} objects"),
        });
        suggestions.push(Suggestion {
            suggestion: format!("{{\"file_extensions\": [\"{bare}\"]}}"),
            kind: "filter",
            explanation: format!("Restrict results to .{bare} files"),
        });
    }

    // Container nouns suggest narrowing the scope.
    if partial_lower.contains("bucket") {
        suggestions.push(Suggestion {
            suggestion: "scope=bucket target=<bucket-name>".to_string(),
            kind: "scope",
            explanation: "Narrow the search to one bucket".to_string(),
        });
    }
    if intent::classify(partial) == SearchType::Packages {
        suggestions.push(Suggestion {
            suggestion: "search_type=packages".to_string(),
            kind: "scope",
            explanation: "The query reads like a package search".to_string(),
        });
    }

    suggestions.truncate(limit);
    suggestions
}
