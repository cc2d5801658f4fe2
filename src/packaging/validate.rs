//! Input validation for the write pipeline.
//!
//! Validation failures are returned before any remote call is made.

use crate::aws::s3::parse_s3_uri;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static PACKAGE_NAME: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_-]+/[a-z0-9_-]+$").ok());

/// Validates a `namespace/name` package name.
///
/// # Errors
///
/// `validation_error` when the name is empty or does not match
/// `^[a-z0-9_-]+/[a-z0-9_-]+$`.
pub fn validate_package_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Validation("Package name is required".to_string()));
    }
    let valid = PACKAGE_NAME
        .as_ref()
        .is_some_and(|re| re.is_match(name));
    if !valid {
        return Err(Error::Validation(format!(
            "Invalid package name: {name}. Must be in format 'namespace/packagename'"
        )));
    }
    Ok(())
}

/// Validates the file list: non-empty, every entry a well-formed
/// `s3://bucket/key` URI.
///
/// Returns the parsed `(bucket, key)` pairs in input order.
///
/// # Errors
///
/// `validation_error` for an empty list or any malformed URI.
pub fn validate_files(files: &[String]) -> Result<Vec<(String, String)>> {
    if files.is_empty() {
        return Err(Error::Validation(
            "Package creation requires at least one S3 URI in 'files'".to_string(),
        ));
    }
    files.iter().map(|uri| parse_s3_uri(uri)).collect()
}

/// How entry data is copied into the target registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyMode {
    /// Copy every entry.
    #[default]
    All,
    /// Copy nothing; entries reference their source objects.
    None,
    /// Copy only entries already living in the registry bucket.
    SameBucket,
}

impl CopyMode {
    /// Parses a copy-mode string.
    ///
    /// # Errors
    ///
    /// `validation_error` for anything but `all`, `none`, `same_bucket`.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "none" => Ok(Self::None),
            "same_bucket" => Ok(Self::SameBucket),
            other => Err(Error::Validation(format!(
                "Invalid copy_mode '{other}'; expected one of all, none, same_bucket"
            ))),
        }
    }

    /// Wire name of this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::None => "none",
            Self::SameBucket => "same_bucket",
        }
    }

    /// Whether an entry in `entry_bucket` would be copied into
    /// `registry_bucket`. Mirrors the predicate the catalog evaluates;
    /// used for dry-run previews.
    #[must_use]
    pub fn applies(self, entry_bucket: &str, registry_bucket: &str) -> bool {
        match self {
            Self::All => true,
            Self::None => false,
            Self::SameBucket => entry_bucket == registry_bucket,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("team/pkg" => true)]
    #[test_case("a-b_c/d-0" => true)]
    #[test_case("team" => false; "missing slash")]
    #[test_case("Team/pkg" => false; "uppercase rejected")]
    #[test_case("team/pkg/extra" => false; "too many segments")]
    #[test_case("team/" => false; "empty package part")]
    #[test_case("" => false; "empty")]
    fn test_validate_package_name(name: &str) -> bool {
        validate_package_name(name).is_ok()
    }

    #[test]
    fn test_validate_files_empty_rejected() {
        let err = validate_files(&[]).map(|_| ()).unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn test_validate_files_parses_pairs() {
        let files = vec![
            "s3://bucket-a/data.csv".to_string(),
            "s3://bucket-b/nested/readme.md".to_string(),
        ];
        let pairs = validate_files(&files).unwrap();
        assert_eq!(pairs[0], ("bucket-a".to_string(), "data.csv".to_string()));
        assert_eq!(
            pairs[1],
            ("bucket-b".to_string(), "nested/readme.md".to_string())
        );
    }

    #[test]
    fn test_validate_files_rejects_bad_uri() {
        let files = vec!["https://bucket/key".to_string()];
        assert!(validate_files(&files).is_err());
    }

    #[test]
    fn test_copy_mode_parse() {
        assert_eq!(CopyMode::parse("all").unwrap(), CopyMode::All);
        assert_eq!(CopyMode::parse("NONE").unwrap(), CopyMode::None);
        assert_eq!(
            CopyMode::parse("same_bucket").unwrap(),
            CopyMode::SameBucket
        );
        assert!(CopyMode::parse("metadata").is_err());
    }

    #[test]
    fn test_copy_mode_predicate() {
        assert!(CopyMode::All.applies("a", "b"));
        assert!(!CopyMode::None.applies("a", "a"));
        assert!(CopyMode::SameBucket.applies("reg", "reg"));
        assert!(!CopyMode::SameBucket.applies("src", "reg"));
    }
}
