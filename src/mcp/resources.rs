//! Read-only MCP resources.
//!
//! Static documents a client can read without tool calls: the tool
//! catalog, the default permission table, and a search syntax guide.

use super::tools::ToolRegistry;
use crate::{Error, Result};
use serde::Serialize;
use serde_json::json;

/// One resource listing entry.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDescriptor {
    /// Resource URI.
    pub uri: String,
    /// Display name.
    pub name: String,
    /// What the resource contains.
    pub description: String,
    /// MIME type of the content.
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// Registry of static resources.
pub struct ResourceRegistry;

impl ResourceRegistry {
    /// Lists the available resources.
    #[must_use]
    pub fn list() -> Vec<ResourceDescriptor> {
        vec![
            ResourceDescriptor {
                uri: "quilt://tools".to_string(),
                name: "Tool catalog".to_string(),
                description: "All registered tools with their input schemas".to_string(),
                mime_type: "application/json".to_string(),
            },
            ResourceDescriptor {
                uri: "quilt://permissions/defaults".to_string(),
                name: "Default tool permissions".to_string(),
                description: "Required permissions per tool action, before overrides"
                    .to_string(),
                mime_type: "application/json".to_string(),
            },
            ResourceDescriptor {
                uri: "quilt://search/guide".to_string(),
                name: "Search guide".to_string(),
                description: "Scopes, search types, and filters accepted by the search tool"
                    .to_string(),
                mime_type: "text/markdown".to_string(),
            },
        ]
    }

    /// Reads one resource by URI.
    ///
    /// # Errors
    ///
    /// `not_found` for unknown URIs.
    pub fn read(uri: &str) -> Result<String> {
        match uri {
            "quilt://tools" => {
                let registry = ToolRegistry::new();
                serde_json::to_string_pretty(&registry.list_tools())
                    .map_err(|e| Error::Internal(format!("failed to render tool catalog: {e}")))
            }
            "quilt://permissions/defaults" => {
                let defaults = json!({
                    "buckets.object_info": ["s3:GetObject", "s3:ListBucket"],
                    "buckets.object_text": ["s3:GetObject"],
                    "buckets.object_fetch": ["s3:GetObject"],
                    "buckets.objects_list": ["s3:ListBucket"],
                    "buckets.objects_put": ["s3:PutObject"],
                    "packaging.browse": ["quilt:BrowsePackages"],
                    "packaging.create": ["quilt:UpdatePackage"],
                    "packaging.update": ["quilt:UpdatePackage"],
                    "packaging.delete": ["quilt:UpdatePackage"],
                    "search.unified_search": ["quilt:BrowsePackages"],
                });
                serde_json::to_string_pretty(&defaults)
                    .map_err(|e| Error::Internal(format!("failed to render defaults: {e}")))
            }
            "quilt://search/guide" => Ok(SEARCH_GUIDE.to_string()),
            other => Err(Error::NotFound(format!("Unknown resource: {other}"))),
        }
    }
}

const SEARCH_GUIDE: &str = r"# Search guide

## Scopes

- `global` / `catalog`: the whole catalog
- `bucket`: one bucket; set `target` (or `bucket`) to its name
- `package`: one package; set `target` to `namespace/name`

## Search types

- `auto` (default): extension tokens and wildcards mean objects,
  collection nouns (dataset, package, study) mean packages
- `packages`, `objects`, `both`

## Filters

```json
{ 'file_extensions': ['csv'], 'size_min': 1024, 'size_max': 10485760 }
```

## Pagination

`limit` caps the page size (max 1000); pass `offset`, or `page` (1-based)
as a convenience.
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_and_read_round_trip() {
        for descriptor in ResourceRegistry::list() {
            let content = ResourceRegistry::read(&descriptor.uri).unwrap();
            assert!(!content.is_empty(), "empty resource {}", descriptor.uri);
        }
    }

    #[test]
    fn test_unknown_resource() {
        let err = ResourceRegistry::read("quilt://nope").map(|_| ()).unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_tool_catalog_is_json() {
        let content = ResourceRegistry::read("quilt://tools").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert!(parsed.as_array().is_some_and(|tools| tools.len() >= 6));
    }
}
