//! Query intent classification.
//!
//! Decides whether an `auto` search targets objects or packages. The
//! heuristics mirror what users actually type: extension tokens and
//! wildcards mean files, collection nouns mean packages, and ambiguous
//! text defaults to objects.

use super::types::SearchType;

/// Extension tokens that mark a query as object-oriented.
const FILE_EXTENSIONS: &[&str] = &[
    ".csv", ".json", ".parquet", ".tsv", ".txt", ".md", ".py", ".r", ".ipynb", ".h5", ".hdf5",
    ".zarr", ".nc", ".tif", ".tiff", ".png", ".jpg", ".jpeg", ".bam", ".vcf", ".fastq",
];

/// Keywords that mark a query as object-oriented.
const FILE_KEYWORDS: &[&str] = &[
    "file",
    "files",
    "object",
    "objects",
    "readme",
    "config",
];

/// Keywords that mark a query as package-oriented.
const PACKAGE_KEYWORDS: &[&str] = &[
    "package",
    "packages",
    "dataset",
    "datasets",
    "collection",
    "collections",
    "project",
    "projects",
    "experiment",
    "experiments",
    "study",
    "studies",
];

/// Classifies a query as [`SearchType::Objects`] or
/// [`SearchType::Packages`].
///
/// Extension tokens and wildcards win over package keywords; with no
/// signal at all the query is treated as an object query.
#[must_use]
pub fn classify(query: &str) -> SearchType {
    let query_lower = query.to_lowercase();

    if FILE_EXTENSIONS.iter().any(|ext| query_lower.contains(ext)) {
        return SearchType::Objects;
    }

    if query.contains('*') || query_lower.contains("wildcard") {
        return SearchType::Objects;
    }

    let has_word = |words: &[&str]| {
        query_lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| words.contains(&word))
    };

    if has_word(FILE_KEYWORDS) {
        return SearchType::Objects;
    }

    if has_word(PACKAGE_KEYWORDS) {
        return SearchType::Packages;
    }

    SearchType::Objects
}

/// Resolves an `auto` search type; concrete types pass through.
#[must_use]
pub fn resolve(search_type: SearchType, query: &str) -> SearchType {
    match search_type {
        SearchType::Auto => classify(query),
        other => other,
    }
}
