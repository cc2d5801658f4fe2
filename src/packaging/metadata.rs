//! Metadata preparation for package writes.
//!
//! Callers hand metadata over as either a JSON object or a string of
//! JSON; both normalize to one map here, at the boundary. README content
//! is never stored as metadata: `readme_content`/`readme` keys are
//! extracted (first present wins) and both removed, becoming a
//! `README.md` file later in the pipeline.

use crate::{Error, Result};
use serde_json::{Map, Value, json};

/// Metadata after normalization and README extraction.
#[derive(Debug, Clone, Default)]
pub struct PreparedMetadata {
    /// The metadata map to persist (no README keys).
    pub metadata: Map<String, Value>,
    /// README content extracted from the metadata, if any.
    pub readme_content: Option<String>,
    /// Warnings to surface to the caller.
    pub warnings: Vec<String>,
}

/// Normalizes a metadata argument and extracts README content.
///
/// # Errors
///
/// `validation_error` when a string argument is not valid JSON or when
/// the value is neither a string nor an object; the message carries a
/// usage example.
pub fn prepare_metadata(metadata: Option<&Value>) -> Result<PreparedMetadata> {
    let mut map = match metadata {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(Error::Validation(
                    "Invalid metadata format: JSON string must encode an object, \
                     e.g. '{\"description\": \"...\"}'"
                        .to_string(),
                ));
            }
            Err(e) => {
                return Err(Error::Validation(format!(
                    "Invalid metadata format: not valid JSON ({e}). \
                     Expected an object like {{\"description\": \"...\"}}"
                )));
            }
        },
        Some(other) => {
            return Err(Error::Validation(format!(
                "Invalid metadata format: got {other}, expected a JSON object or string of JSON"
            )));
        }
    };

    let readme_content = map
        .get("readme_content")
        .or_else(|| map.get("readme"))
        .and_then(Value::as_str)
        .map(ToString::to_string);

    let mut warnings = Vec::new();
    let had_readme = map.remove("readme_content").is_some() | map.remove("readme").is_some();
    if had_readme {
        warnings.push(
            "README content extracted from metadata; it will be written as a README.md file"
                .to_string(),
        );
    }

    Ok(PreparedMetadata {
        metadata: map,
        readme_content,
        warnings,
    })
}

/// Names of the built-in metadata templates.
const TEMPLATE_NAMES: &[&str] = &["standard", "dataset", "ml"];

/// Returns one metadata template by name.
///
/// # Errors
///
/// `not_found` for an unknown template name.
pub fn metadata_template(name: &str) -> Result<Value> {
    let fields = match name {
        "standard" => json!({
            "title": {"type": "string", "required": true, "description": "Package title"},
            "description": {"type": "string", "required": true, "description": "Package description"},
            "version": {"type": "string", "required": false, "default": "1.0.0", "description": "Package version"},
            "author": {"type": "string", "required": false, "description": "Package author"},
            "license": {"type": "string", "required": false, "description": "Package license"},
            "tags": {"type": "array", "required": false, "description": "Package tags"},
        }),
        "dataset" => json!({
            "title": {"type": "string", "required": true, "description": "Dataset title"},
            "description": {"type": "string", "required": true, "description": "Dataset description"},
            "version": {"type": "string", "required": false, "default": "1.0.0", "description": "Dataset version"},
            "source": {"type": "string", "required": false, "description": "Data source"},
            "collection_date": {"type": "string", "required": false, "description": "Data collection date"},
            "format": {"type": "string", "required": false, "description": "Data format"},
            "tags": {"type": "array", "required": false, "description": "Dataset tags"},
        }),
        "ml" => json!({
            "title": {"type": "string", "required": true, "description": "Model title"},
            "description": {"type": "string", "required": true, "description": "Model description"},
            "version": {"type": "string", "required": false, "default": "1.0.0", "description": "Model version"},
            "algorithm": {"type": "string", "required": false, "description": "ML algorithm"},
            "framework": {"type": "string", "required": false, "description": "ML framework"},
            "performance": {"type": "object", "required": false, "description": "Model performance metrics"},
            "training_data": {"type": "string", "required": false, "description": "Training data reference"},
            "tags": {"type": "array", "required": false, "description": "Model tags"},
        }),
        other => {
            return Err(Error::NotFound(format!(
                "Unknown metadata template: {other}"
            )));
        }
    };
    Ok(json!({
        "name": name,
        "description": format!("{name} package metadata template"),
        "fields": fields,
    }))
}

/// Lists the available metadata templates with their field names.
#[must_use]
pub fn metadata_templates() -> Value {
    let mut templates = Map::new();
    for name in TEMPLATE_NAMES {
        if let Ok(template) = metadata_template(name) {
            let fields: Vec<String> = template["fields"]
                .as_object()
                .map(|fields| fields.keys().cloned().collect())
                .unwrap_or_default();
            templates.insert(
                (*name).to_string(),
                json!({
                    "description": template["description"],
                    "fields": fields,
                }),
            );
        }
    }
    Value::Object(templates)
}
