//! Generated README content.

use super::organize::OrganizedLayout;
use std::fmt::Write as _;

/// Builds README.md content describing the package layout, size, source,
/// and usage.
#[must_use]
pub fn generate_readme(
    package_name: &str,
    description: &str,
    layout: &OrganizedLayout,
    source_bucket: &str,
) -> String {
    let folders = layout.folders();
    let total_files = layout.entries.len();
    let file_types = layout.file_types();

    let mut readme = format!("# {package_name}\n\n## Overview\n");
    if description.is_empty() {
        let _ = writeln!(
            readme,
            "This package contains data sourced from s3://{source_bucket}."
        );
    } else {
        let _ = writeln!(readme, "{description}");
    }

    readme.push_str("\n## Contents\n\n");
    for (folder, entries) in &folders {
        if folder.is_empty() {
            continue;
        }
        let _ = writeln!(readme, "### `{folder}/` ({} files)", entries.len());
        let blurb = match folder.as_str() {
            "data/processed" => "Cleaned and processed data files ready for analysis.",
            "data/raw" => "Original source data in raw format.",
            "docs" => "Documentation, schemas, and supplementary materials.",
            "metadata" => "Configuration files and package metadata.",
            _ => "",
        };
        if blurb.is_empty() {
            let _ = writeln!(readme, "Files organized in {folder}.\n");
        } else {
            let _ = writeln!(readme, "{blurb}\n");
        }
    }

    readme.push_str("## File Summary\n\n| Folder | File Count | Types |\n|--------|------------|-------|\n");
    for (folder, entries) in &folders {
        let mut types: Vec<String> = entries
            .iter()
            .filter_map(|e| e.logical_key.rsplit_once('.').map(|(_, ext)| ext.to_string()))
            .collect();
        types.sort();
        types.dedup();
        let display = if folder.is_empty() { "root" } else { folder };
        let _ = writeln!(
            readme,
            "| `{display}/` | {} | {} |",
            entries.len(),
            types.join(", ")
        );
    }

    readme.push_str("\n## Usage\n\n```python\n");
    let _ = writeln!(readme, "# Browse the package\n# pkg = Package.browse(\"{package_name}\")");
    if let Some(entry) = layout.entries.first() {
        let _ = writeln!(readme, "\n# Access a file\ndata = pkg[\"{}\"]()", entry.logical_key);
    }
    readme.push_str("```\n\n## Package Metadata\n\n");
    let _ = writeln!(readme, "- **Source**: s3://{source_bucket}");
    let _ = writeln!(readme, "- **File Count**: {total_files}");
    let _ = writeln!(readme, "- **File Types**: {}", file_types.join(", "));

    readme
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> OrganizedLayout {
        OrganizedLayout::smart(&[
            ("src".to_string(), "runs/expression.csv".to_string()),
            ("src".to_string(), "notes.txt".to_string()),
        ])
    }

    #[test]
    fn test_readme_carries_title_and_source() {
        let readme = generate_readme("team/pkg", "", &layout(), "src");
        assert!(readme.starts_with("# team/pkg\n"));
        assert!(readme.contains("sourced from s3://src"));
        assert!(readme.contains("- **File Count**: 2"));
    }

    #[test]
    fn test_readme_uses_description_when_given() {
        let readme = generate_readme("team/pkg", "Weekly CCLE refresh.", &layout(), "src");
        assert!(readme.contains("Weekly CCLE refresh."));
        assert!(!readme.contains("sourced from s3://src."));
    }

    #[test]
    fn test_readme_lists_folders() {
        let readme = generate_readme("team/pkg", "", &layout(), "src");
        assert!(readme.contains("### `data/processed/` (1 files)"));
        assert!(readme.contains("### `data/raw/` (1 files)"));
        assert!(readme.contains("| `data/processed/` | 1 | csv |"));
    }

    #[test]
    fn test_readme_usage_references_first_entry() {
        let readme = generate_readme("team/pkg", "", &layout(), "src");
        assert!(readme.contains("pkg[\"data/processed/expression.csv\"]()"));
    }
}
