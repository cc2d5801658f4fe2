//! `quilt_summarize.json` generation.
//!
//! A machine-readable summary of package contents, structure, and access
//! paths, attached to packages when the caller asks for one.

use super::organize::OrganizedLayout;
use serde_json::{Map, Value, json};

/// Builds the `quilt_summarize.json` document.
#[must_use]
pub fn generate_summarize(
    package_name: &str,
    metadata: &Map<String, Value>,
    layout: &OrganizedLayout,
    readme_len: usize,
    source_bucket: &str,
    visualizations: Option<&Value>,
) -> Value {
    let (namespace, short_name) = package_name
        .split_once('/')
        .unwrap_or(("unknown", package_name));

    let folders = layout.folders();
    let mut folder_stats = Map::new();
    for (folder, entries) in &folders {
        let display = if folder.is_empty() { "root" } else { folder };
        folder_stats.insert(
            display.to_string(),
            json!({"file_count": entries.len()}),
        );
    }

    let mut type_counts: Map<String, Value> = Map::new();
    for file_type in layout.file_types() {
        let count = layout
            .entries
            .iter()
            .filter(|e| e.logical_key.ends_with(&format!(".{file_type}")))
            .count();
        type_counts.insert(file_type, json!(count));
    }

    let mut summary = json!({
        "package_info": {
            "name": package_name,
            "namespace": namespace,
            "package_name": short_name,
            "created_by": "quilt-mcp-server",
            "description": metadata
                .get("description")
                .cloned()
                .unwrap_or_else(|| json!("Data package created via Quilt MCP Server")),
        },
        "data_summary": {
            "total_files": layout.entries.len(),
            "file_types": Value::Object(type_counts),
        },
        "structure": {
            "folders": Value::Object(folder_stats),
            "organization_type": if folders.keys().any(|f| !f.is_empty()) {
                "smart_hierarchy"
            } else {
                "flat"
            },
        },
        "source": {
            "type": "s3_bucket",
            "bucket": source_bucket,
        },
        "documentation": {
            "readme_generated": readme_len > 0,
            "readme_length": readme_len,
            "metadata_complete": !metadata.is_empty(),
        },
        "access": {
            "browse_command": format!(
                "Use search.unified_search with scope='package' and target='{package_name}'"
            ),
            "catalog_url": format!(
                "https://open.quiltdata.com/b/{source_bucket}/packages/{package_name}"
            ),
            "api_access": true,
            "cli_access": true,
        },
        "generator": "quilt-mcp-server",
        "generator_version": env!("CARGO_PKG_VERSION"),
    });

    if let Some(visualizations) = visualizations
        && let Some(object) = summary.as_object_mut()
    {
        object.insert("visualizations".to_string(), visualizations.clone());
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> OrganizedLayout {
        OrganizedLayout::smart(&[
            ("src".to_string(), "a/x.csv".to_string()),
            ("src".to_string(), "b/y.csv".to_string()),
            ("src".to_string(), "z.log".to_string()),
        ])
    }

    #[test]
    fn test_summary_counts() {
        let summary = generate_summarize("team/pkg", &Map::new(), &layout(), 100, "src", None);
        assert_eq!(summary["data_summary"]["total_files"], json!(3));
        assert_eq!(summary["data_summary"]["file_types"]["csv"], json!(2));
        assert_eq!(summary["structure"]["folders"]["data/processed"]["file_count"], json!(2));
        assert_eq!(summary["package_info"]["namespace"], json!("team"));
    }

    #[test]
    fn test_summary_organization_type() {
        let smart = generate_summarize("t/p", &Map::new(), &layout(), 0, "src", None);
        assert_eq!(smart["structure"]["organization_type"], json!("smart_hierarchy"));

        let flat_layout =
            OrganizedLayout::flat(&[("src".to_string(), "a/x.csv".to_string())]);
        let flat = generate_summarize("t/p", &Map::new(), &flat_layout, 0, "src", None);
        assert_eq!(flat["structure"]["organization_type"], json!("flat"));
    }

    #[test]
    fn test_summary_documentation_flags() {
        let summary = generate_summarize("t/p", &Map::new(), &layout(), 0, "src", None);
        assert_eq!(summary["documentation"]["readme_generated"], json!(false));
        let summary = generate_summarize("t/p", &Map::new(), &layout(), 10, "src", None);
        assert_eq!(summary["documentation"]["readme_generated"], json!(true));
    }

    #[test]
    fn test_summary_attaches_visualizations() {
        let dashboards = json!([{"type": "bar"}]);
        let summary =
            generate_summarize("t/p", &Map::new(), &layout(), 0, "src", Some(&dashboards));
        assert_eq!(summary["visualizations"], dashboards);
    }

    #[test]
    fn test_summary_access_block() {
        let summary = generate_summarize("team/pkg", &Map::new(), &layout(), 0, "src", None);
        assert!(
            summary["access"]["catalog_url"]
                .as_str()
                .is_some_and(|u| u.contains("/b/src/packages/team/pkg"))
        );
    }
}
