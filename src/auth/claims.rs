//! Claim normalization and the compressed-claims codec.
//!
//! Enhanced catalog tokens keep their payload small by carrying an `ec`
//! object instead of the full `permissions`/`buckets`/`roles` arrays:
//!
//! ```json
//! {
//!   "sub": "u-42",
//!   "ec": {
//!     "v": 1,
//!     "p": ["g", "l", "bp", "quilt:Tabulator"],
//!     "b": ["quilt-example", {"p": "prod-", "s": ["data", "logs"]}, "team-*"],
//!     "r": ["analyst"]
//!   }
//! }
//! ```
//!
//! `p` entries are either short codes from [`PERMISSION_CODES`] or full
//! permission strings (anything containing `:`). `b` entries are bucket
//! names, trailing-`*` wildcards, or `{p, s}` groups expanding to
//! `<prefix><suffix>` per suffix. Expansion is lossless and total: a
//! malformed `ec` degrades to empty arrays with a warning, never an error.
//! When the payload carries explicit arrays they win over `ec`, so
//! compressed and expanded tokens with the same semantics are
//! indistinguishable downstream.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Short-code dictionary for compressed permission entries.
pub const PERMISSION_CODES: &[(&str, &str)] = &[
    ("g", "s3:GetObject"),
    ("l", "s3:ListBucket"),
    ("w", "s3:PutObject"),
    ("d", "s3:DeleteObject"),
    ("bp", "quilt:BrowsePackages"),
    ("up", "quilt:UpdatePackage"),
    ("ad", "quilt:Admin"),
];

/// Normalized claims after decompression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Granted permissions.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Bucket allow-list (may contain trailing-`*` wildcards).
    #[serde(default)]
    pub buckets: Vec<String>,
    /// Catalog roles.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Expands a decoded JWT payload into normalized [`Claims`].
///
/// Explicit `permissions`/`buckets`/`roles` arrays take precedence; the
/// `ec` object is consulted only for fields the payload does not spell
/// out. Unknown or malformed shapes produce empty arrays.
#[must_use]
pub fn expand_claims(payload: &Value) -> Claims {
    let compressed = payload.get("ec").and_then(Value::as_object);

    let permissions = explicit_strings(payload, "permissions").unwrap_or_else(|| {
        compressed
            .and_then(|ec| ec.get("p"))
            .map(expand_permissions)
            .unwrap_or_default()
    });

    let buckets = explicit_strings(payload, "buckets").unwrap_or_else(|| {
        compressed
            .and_then(|ec| ec.get("b"))
            .map(expand_buckets)
            .unwrap_or_default()
    });

    let roles = explicit_strings(payload, "roles").unwrap_or_else(|| {
        compressed
            .and_then(|ec| ec.get("r"))
            .and_then(|v| string_array(v))
            .unwrap_or_default()
    });

    if compressed.is_some() && permissions.is_empty() && buckets.is_empty() && roles.is_empty() {
        tracing::warn!("compressed claims expanded to empty arrays; malformed ec payload?");
    }

    Claims {
        permissions,
        buckets,
        roles,
    }
}

/// Reads an explicit string array claim, if present and well-formed.
fn explicit_strings(payload: &Value, key: &str) -> Option<Vec<String>> {
    payload.get(key).and_then(string_array)
}

fn string_array(value: &Value) -> Option<Vec<String>> {
    value.as_array().map(|items| {
        items
            .iter()
            .filter_map(|v| v.as_str().map(ToString::to_string))
            .collect()
    })
}

fn expand_permissions(value: &Value) -> Vec<String> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_str)
        .map(expand_permission_code)
        .collect()
}

/// Expands one permission entry: a known short code becomes its full name,
/// anything namespaced (`:`) passes through, everything else is kept
/// verbatim so new codes fail open as harmless unknown permissions.
fn expand_permission_code(code: &str) -> String {
    if code.contains(':') {
        return code.to_string();
    }
    PERMISSION_CODES
        .iter()
        .find(|(short, _)| *short == code)
        .map_or_else(|| code.to_string(), |(_, full)| (*full).to_string())
}

fn expand_buckets(value: &Value) -> Vec<String> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    let mut buckets = Vec::new();
    for item in items {
        match item {
            Value::String(name) => buckets.push(name.clone()),
            Value::Object(group) => {
                let prefix = group.get("p").and_then(Value::as_str).unwrap_or_default();
                let Some(suffixes) = group.get("s").and_then(Value::as_array) else {
                    tracing::warn!("bucket group without suffix list in compressed claims");
                    continue;
                };
                for suffix in suffixes.iter().filter_map(Value::as_str) {
                    buckets.push(format!("{prefix}{suffix}"));
                }
            }
            _ => tracing::warn!("unrecognized bucket entry in compressed claims"),
        }
    }
    buckets
}

/// Extracts embedded AWS credentials from a payload.
///
/// Accepts both `aws_credentials` and `awsCredentials`, with snake or
/// camel case fields inside. Returns `None` unless both key id and secret
/// are present.
#[must_use]
pub fn extract_aws_credentials(payload: &Value) -> Option<super::AwsCredentialSpec> {
    let candidate = payload
        .get("aws_credentials")
        .or_else(|| payload.get("awsCredentials"))?
        .as_object()?;

    let field = |snake: &str, camel: &str| {
        candidate
            .get(snake)
            .or_else(|| candidate.get(camel))
            .and_then(Value::as_str)
            .map(ToString::to_string)
    };

    let access_key_id = field("access_key_id", "accessKeyId")?;
    let secret_access_key = field("secret_access_key", "secretAccessKey")?;

    Some(super::AwsCredentialSpec {
        access_key_id,
        secret_access_key,
        session_token: field("session_token", "sessionToken"),
        region: candidate
            .get("region")
            .and_then(Value::as_str)
            .map(ToString::to_string),
    })
}

/// Extracts the role ARN from a payload (`aws_role_arn` or `awsRoleArn`).
#[must_use]
pub fn extract_role_arn(payload: &Value) -> Option<String> {
    payload
        .get("aws_role_arn")
        .or_else(|| payload.get("awsRoleArn"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expand_explicit_arrays_pass_through() {
        let payload = json!({
            "permissions": ["s3:GetObject", "quilt:BrowsePackages"],
            "buckets": ["bucket-a"],
            "roles": ["admin"],
        });
        let claims = expand_claims(&payload);
        assert_eq!(claims.permissions, vec!["s3:GetObject", "quilt:BrowsePackages"]);
        assert_eq!(claims.buckets, vec!["bucket-a"]);
        assert_eq!(claims.roles, vec!["admin"]);
    }

    #[test]
    fn test_expand_compressed_codes() {
        let payload = json!({
            "ec": {"v": 1, "p": ["g", "l", "up"], "b": ["quilt-example"], "r": ["analyst"]},
        });
        let claims = expand_claims(&payload);
        assert_eq!(
            claims.permissions,
            vec!["s3:GetObject", "s3:ListBucket", "quilt:UpdatePackage"]
        );
        assert_eq!(claims.buckets, vec!["quilt-example"]);
        assert_eq!(claims.roles, vec!["analyst"]);
    }

    #[test]
    fn test_compressed_and_expanded_indistinguishable() {
        let compressed = json!({
            "ec": {"v": 1, "p": ["g", "bp"], "b": [{"p": "prod-", "s": ["data", "logs"]}]},
        });
        let expanded = json!({
            "permissions": ["s3:GetObject", "quilt:BrowsePackages"],
            "buckets": ["prod-data", "prod-logs"],
        });
        assert_eq!(expand_claims(&compressed), expand_claims(&expanded));
    }

    #[test]
    fn test_full_permission_strings_pass_through() {
        let payload = json!({"ec": {"p": ["quilt:Tabulator", "g"]}});
        let claims = expand_claims(&payload);
        assert_eq!(claims.permissions, vec!["quilt:Tabulator", "s3:GetObject"]);
    }

    #[test]
    fn test_unknown_code_kept_verbatim() {
        let payload = json!({"ec": {"p": ["zz"]}});
        assert_eq!(expand_claims(&payload).permissions, vec!["zz"]);
    }

    #[test]
    fn test_bucket_group_expansion() {
        let payload = json!({"ec": {"b": [{"p": "team-", "s": ["a", "b"]}, "solo", "wild-*"]}});
        let claims = expand_claims(&payload);
        assert_eq!(claims.buckets, vec!["team-a", "team-b", "solo", "wild-*"]);
    }

    #[test]
    fn test_malformed_shapes_degrade_to_empty() {
        for payload in [
            json!({"ec": "not an object"}),
            json!({"ec": {"p": "not an array", "b": 42}}),
            json!({"ec": {}}),
            json!({}),
        ] {
            let claims = expand_claims(&payload);
            assert!(claims.permissions.is_empty());
            assert!(claims.buckets.is_empty());
            assert!(claims.roles.is_empty());
        }
    }

    #[test]
    fn test_explicit_wins_over_compressed() {
        let payload = json!({
            "permissions": ["s3:PutObject"],
            "ec": {"p": ["g"]},
        });
        assert_eq!(expand_claims(&payload).permissions, vec!["s3:PutObject"]);
    }

    #[test]
    fn test_extract_credentials_snake_case() {
        let payload = json!({
            "aws_credentials": {
                "access_key_id": "AKIA",
                "secret_access_key": "secret",
                "session_token": "tok",
                "region": "us-west-2",
            }
        });
        let creds = extract_aws_credentials(&payload).unwrap_or_else(|| unreachable!());
        assert_eq!(creds.access_key_id, "AKIA");
        assert_eq!(creds.region.as_deref(), Some("us-west-2"));
    }

    #[test]
    fn test_extract_credentials_camel_case() {
        let payload = json!({
            "awsCredentials": {
                "accessKeyId": "AKIA",
                "secretAccessKey": "secret",
                "sessionToken": "tok",
            }
        });
        let creds = extract_aws_credentials(&payload).unwrap_or_else(|| unreachable!());
        assert_eq!(creds.access_key_id, "AKIA");
        assert_eq!(creds.session_token.as_deref(), Some("tok"));
        assert!(creds.region.is_none());
    }

    #[test]
    fn test_extract_credentials_requires_both_keys() {
        let payload = json!({"aws_credentials": {"access_key_id": "AKIA"}});
        assert!(extract_aws_credentials(&payload).is_none());
    }

    #[test]
    fn test_extract_role_arn_trims_and_rejects_empty() {
        let payload = json!({"aws_role_arn": "  arn:aws:iam::1:role/r  "});
        assert_eq!(
            extract_role_arn(&payload).as_deref(),
            Some("arn:aws:iam::1:role/r")
        );
        assert!(extract_role_arn(&json!({"awsRoleArn": "   "})).is_none());
        assert!(extract_role_arn(&json!({})).is_none());
    }
}
