//! Logical-key organization.
//!
//! Two modes: flat (basename only, numeric prefixes on collisions) and
//! smart folders (extension-driven hierarchy with name-based overrides).

use std::collections::BTreeMap;

/// One planned package entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutEntry {
    /// Logical key inside the package.
    pub logical_key: String,
    /// Source S3 URI.
    pub physical_key: String,
    /// Source bucket.
    pub bucket: String,
}

/// The planned layout of a package.
#[derive(Debug, Clone, Default)]
pub struct OrganizedLayout {
    /// All entries, in input order.
    pub entries: Vec<LayoutEntry>,
}

impl OrganizedLayout {
    /// Builds a flat layout: logical key = basename, collisions
    /// disambiguated with `1_`, `2_`, ... prefixes.
    #[must_use]
    pub fn flat(files: &[(String, String)]) -> Self {
        let mut entries = Vec::with_capacity(files.len());
        let mut used: BTreeMap<String, usize> = BTreeMap::new();
        for (bucket, key) in files {
            let name = basename(key);
            let logical_key = match used.get_mut(&name) {
                None => {
                    used.insert(name.clone(), 0);
                    name
                }
                Some(count) => {
                    *count += 1;
                    format!("{count}_{name}")
                }
            };
            entries.push(LayoutEntry {
                logical_key,
                physical_key: format!("s3://{bucket}/{key}"),
                bucket: bucket.clone(),
            });
        }
        Self { entries }
    }

    /// Builds a smart-folder layout: entries land under the folder
    /// derived from their extension and name, collisions disambiguated
    /// like the flat mode.
    #[must_use]
    pub fn smart(files: &[(String, String)]) -> Self {
        let mut entries = Vec::with_capacity(files.len());
        let mut used: BTreeMap<String, usize> = BTreeMap::new();
        for (bucket, key) in files {
            let folder = smart_folder(key);
            let candidate = format!("{folder}/{}", basename(key));
            let logical_key = match used.get_mut(&candidate) {
                None => {
                    used.insert(candidate.clone(), 0);
                    candidate
                }
                Some(count) => {
                    *count += 1;
                    format!("{folder}/{count}_{}", basename(key))
                }
            };
            entries.push(LayoutEntry {
                logical_key,
                physical_key: format!("s3://{bucket}/{key}"),
                bucket: bucket.clone(),
            });
        }
        Self { entries }
    }

    /// Groups entries by their top folder (`""` for root-level keys).
    #[must_use]
    pub fn folders(&self) -> BTreeMap<String, Vec<&LayoutEntry>> {
        let mut folders: BTreeMap<String, Vec<&LayoutEntry>> = BTreeMap::new();
        for entry in &self.entries {
            let folder = entry
                .logical_key
                .rsplit_once('/')
                .map_or(String::new(), |(folder, _)| folder.to_string());
            folders.entry(folder).or_default().push(entry);
        }
        folders
    }

    /// Distinct extensions across all entries.
    #[must_use]
    pub fn file_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .entries
            .iter()
            .filter_map(|e| extension(&e.logical_key))
            .collect();
        types.sort();
        types.dedup();
        types
    }
}

/// Derives the smart folder for a key.
///
/// Name-based overrides win over the extension mapping: README and
/// documentation files go to `docs`, schemas/definitions to
/// `docs/schemas`, configs/settings to `metadata`.
#[must_use]
pub fn smart_folder(key: &str) -> &'static str {
    let key_lower = key.to_lowercase();
    if key_lower.contains("readme") || key_lower.contains("documentation") {
        return "docs";
    }
    if key_lower.contains("schema") || key_lower.contains("definition") {
        return "docs/schemas";
    }
    if key_lower.contains("config") || key_lower.contains("settings") {
        return "metadata";
    }

    match extension(&key_lower).as_deref() {
        Some("csv" | "tsv" | "parquet" | "json" | "jsonl" | "xml") => "data/processed",
        Some("log" | "txt" | "raw") => "data/raw",
        Some("md" | "rst" | "pdf" | "docx") => "docs",
        Some("yml" | "yaml" | "toml" | "ini" | "conf") => "metadata",
        Some("png" | "jpg" | "jpeg" | "gif" | "mp4" | "avi") => "data/media",
        _ => "data/misc",
    }
}

fn basename(key: &str) -> String {
    key.rsplit('/').next().unwrap_or(key).to_string()
}

fn extension(key: &str) -> Option<String> {
    let name = basename(key);
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn files(keys: &[&str]) -> Vec<(String, String)> {
        keys.iter()
            .map(|k| ("bucket".to_string(), (*k).to_string()))
            .collect()
    }

    #[test_case("runs/expression.csv" => "data/processed")]
    #[test_case("x.parquet" => "data/processed")]
    #[test_case("server.log" => "data/raw")]
    #[test_case("notes.txt" => "data/raw")]
    #[test_case("guide.pdf" => "docs")]
    #[test_case("deploy.yaml" => "metadata")]
    #[test_case("photo.JPG" => "data/media")]
    #[test_case("archive.tar.gz" => "data/misc")]
    #[test_case("no_extension" => "data/misc")]
    fn test_smart_folder_by_extension(key: &str) -> &'static str {
        smart_folder(key)
    }

    #[test]
    fn test_smart_folder_name_overrides() {
        assert_eq!(smart_folder("path/README.txt"), "docs");
        assert_eq!(smart_folder("table_schema.csv"), "docs/schemas");
        assert_eq!(smart_folder("app_config.csv"), "metadata");
        assert_eq!(smart_folder("settings.csv"), "metadata");
    }

    #[test]
    fn test_flat_layout_basenames() {
        let layout = OrganizedLayout::flat(&files(&["a/data.csv", "docs/readme.md"]));
        assert_eq!(layout.entries[0].logical_key, "data.csv");
        assert_eq!(layout.entries[1].logical_key, "readme.md");
        assert_eq!(layout.entries[0].physical_key, "s3://bucket/a/data.csv");
    }

    #[test]
    fn test_flat_layout_collisions_numbered() {
        let layout = OrganizedLayout::flat(&files(&["a/data.csv", "b/data.csv", "c/data.csv"]));
        let keys: Vec<&str> = layout
            .entries
            .iter()
            .map(|e| e.logical_key.as_str())
            .collect();
        assert_eq!(keys, vec!["data.csv", "1_data.csv", "2_data.csv"]);
    }

    #[test]
    fn test_smart_layout_folders() {
        let layout = OrganizedLayout::smart(&files(&["runs/x.csv", "y.log", "z.md"]));
        let keys: Vec<&str> = layout
            .entries
            .iter()
            .map(|e| e.logical_key.as_str())
            .collect();
        assert_eq!(
            keys,
            vec!["data/processed/x.csv", "data/raw/y.log", "docs/z.md"]
        );
    }

    #[test]
    fn test_smart_layout_collisions_numbered() {
        let layout = OrganizedLayout::smart(&files(&["a/x.csv", "b/x.csv"]));
        assert_eq!(layout.entries[0].logical_key, "data/processed/x.csv");
        assert_eq!(layout.entries[1].logical_key, "data/processed/1_x.csv");
    }

    #[test]
    fn test_folder_grouping() {
        let layout = OrganizedLayout::smart(&files(&["a/x.csv", "b/y.csv", "z.log"]));
        let folders = layout.folders();
        assert_eq!(folders["data/processed"].len(), 2);
        assert_eq!(folders["data/raw"].len(), 1);
    }

    #[test]
    fn test_file_types_deduped_sorted() {
        let layout = OrganizedLayout::flat(&files(&["a.csv", "b.csv", "c.md"]));
        assert_eq!(layout.file_types(), vec!["csv", "md"]);
    }
}
