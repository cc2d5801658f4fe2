//! The package write pipeline.
//!
//! Orchestrates a create/update end to end: validation, metadata
//! preparation, registry resolution via permission discovery, logical-key
//! organization, README/summary materialization, and revision submission
//! through the catalog REST endpoint. Dry-run performs everything except
//! the submission and returns the planned layout.

use super::metadata::{PreparedMetadata, prepare_metadata};
use super::organize::OrganizedLayout;
use super::readme::generate_readme;
use super::summary::generate_summarize;
use super::validate::{CopyMode, validate_files, validate_package_name};
use crate::aws::permissions::{PermissionDiscovery, score_recommendations};
use crate::aws::s3::S3Operations;
use crate::catalog::CatalogClient;
use crate::config::ServerConfig;
use crate::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value, json};

/// A validated-on-entry package write request.
#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    /// Package name (`namespace/name`).
    pub name: String,
    /// Source S3 URIs.
    pub files: Vec<String>,
    /// Revision description; doubles as the commit message default.
    pub description: String,
    /// Raw metadata argument (object or string of JSON).
    pub metadata: Option<Value>,
    /// Metadata template to overlay under the user metadata.
    pub template: Option<String>,
    /// Explicit target registry (`bucket` or `s3://bucket`).
    pub registry: Option<String>,
    /// Commit message; defaults to a generated one.
    pub message: Option<String>,
    /// Flat layout instead of smart folders.
    pub flatten: bool,
    /// Copy mode string (`all`, `none`, `same_bucket`).
    pub copy_mode: String,
    /// Validate and plan without submitting.
    pub dry_run: bool,
    /// Force README generation even without extracted content.
    pub generate_readme: bool,
    /// Attach a `quilt_summarize.json`.
    pub generate_summary: bool,
    /// Optional chart spec: `{data, plot_type, x_column, y_column, title?}`.
    /// Implies a summary with the dashboard entry attached.
    pub visualization: Option<Value>,
    /// Caller context for registry recommendation scoring.
    pub user_context: Option<Value>,
}

impl CreateRequest {
    /// Parses a request from tool parameters.
    ///
    /// # Errors
    ///
    /// `validation_error` when the name is missing.
    pub fn from_params(params: &Value) -> Result<Self> {
        let name = params
            .get("name")
            .or_else(|| params.get("package_name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if name.is_empty() {
            return Err(Error::Validation("Package name is required".to_string()));
        }
        let files = params
            .get("files")
            .and_then(Value::as_array)
            .map(|files| {
                files
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            name,
            files,
            description: params
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            metadata: params
                .get("metadata")
                .or_else(|| params.get("meta"))
                .cloned(),
            template: params
                .get("template")
                .or_else(|| params.get("metadata_template"))
                .and_then(Value::as_str)
                .map(ToString::to_string),
            registry: params
                .get("registry")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            message: params
                .get("message")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            flatten: !params
                .get("auto_organize")
                .and_then(Value::as_bool)
                .unwrap_or(true),
            copy_mode: params
                .get("copy_mode")
                .and_then(Value::as_str)
                .unwrap_or("all")
                .to_string(),
            dry_run: params
                .get("dry_run")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            generate_readme: params
                .get("generate_readme")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            generate_summary: params
                .get("generate_summary")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            visualization: params.get("visualization").cloned(),
            user_context: params.get("user_context").cloned(),
        })
    }
}

/// Result of a write-pipeline run.
#[derive(Debug, Serialize)]
pub struct WriteOutcome {
    /// `success` for submitted revisions, `dry_run` for previews.
    pub status: &'static str,
    /// Package name.
    pub package_name: String,
    /// Revision top hash (absent for dry runs).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_hash: Option<String>,
    /// Target registry (`s3://bucket`).
    pub registry: String,
    /// Commit message used.
    pub message: String,
    /// Planned entries as `logical_key -> physical_key`.
    pub entries: Vec<(String, String)>,
    /// Whether a README.md was attached.
    pub readme_attached: bool,
    /// Generated summary document, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Value>,
    /// Final metadata persisted with the revision.
    pub metadata: Value,
    /// Non-fatal notes collected along the way.
    pub warnings: Vec<String>,
}

/// The write pipeline, bound to one request's catalog client and
/// (optionally) its AWS session.
pub struct PackageWritePipeline<'a> {
    config: &'a ServerConfig,
    catalog: &'a CatalogClient,
    discovery: Option<&'a PermissionDiscovery>,
    s3: Option<&'a S3Operations>,
}

impl<'a> PackageWritePipeline<'a> {
    /// Creates the pipeline.
    #[must_use]
    pub const fn new(
        config: &'a ServerConfig,
        catalog: &'a CatalogClient,
        discovery: Option<&'a PermissionDiscovery>,
        s3: Option<&'a S3Operations>,
    ) -> Self {
        Self {
            config,
            catalog,
            discovery,
            s3,
        }
    }

    /// Runs the create pipeline.
    ///
    /// # Errors
    ///
    /// `validation_error` for malformed inputs, `authorization_error`
    /// when the registry is not writable, `catalog_error` for submission
    /// failures.
    pub async fn create(&self, request: &CreateRequest) -> Result<WriteOutcome> {
        // Validation happens before any remote call.
        validate_package_name(&request.name)?;
        let parsed_files = validate_files(&request.files)?;
        let copy_mode = CopyMode::parse(&request.copy_mode)?;

        // Metadata normalization and README extraction.
        let PreparedMetadata {
            mut metadata,
            readme_content,
            mut warnings,
        } = prepare_metadata(request.metadata.as_ref())?;
        if let Some(template) = &request.template {
            metadata = overlay_template(template, metadata)?;
        }
        if !request.description.is_empty() && !metadata.contains_key("description") {
            metadata.insert("description".to_string(), json!(request.description));
        }

        // Registry resolution.
        let source_bucket = parsed_files[0].0.clone();
        let registry_bucket = self
            .resolve_registry(request, &source_bucket, &mut warnings)
            .await;

        // Write-permission check on the resolved registry.
        self.check_registry_writable(&registry_bucket, &source_bucket, request)
            .await?;

        // Logical-key organization.
        let layout = if request.flatten {
            OrganizedLayout::flat(&parsed_files)
        } else {
            OrganizedLayout::smart(&parsed_files)
        };

        // The copy-mode selector is evaluated per entry by the catalog;
        // the mode string travels with the submission below.
        let readme = match (&readme_content, request.generate_readme) {
            (Some(content), _) => Some(content.clone()),
            (None, true) => Some(generate_readme(
                &request.name,
                &request.description,
                &layout,
                &source_bucket,
            )),
            (None, false) => None,
        };

        // Optional summary and dashboard generation.
        let visualization = match &request.visualization {
            Some(spec) => Some(build_visualization_from_spec(spec)?),
            None => None,
        };
        let dashboard_entries = visualization
            .as_ref()
            .map(|viz| crate::visualize::summarize_entry(viz, "Generated package dashboard"));
        let summary = (request.generate_summary || visualization.is_some()).then(|| {
            generate_summarize(
                &request.name,
                &metadata,
                &layout,
                readme.as_ref().map_or(0, String::len),
                &source_bucket,
                dashboard_entries.as_ref(),
            )
        });

        let message = request.message.clone().unwrap_or_else(|| {
            if request.description.is_empty() {
                format!("Created package {}", request.name)
            } else {
                request.description.clone()
            }
        });

        let entries: Vec<(String, String)> = layout
            .entries
            .iter()
            .map(|e| (e.logical_key.clone(), e.physical_key.clone()))
            .collect();

        // Dry run stops before anything is staged or submitted.
        if request.dry_run {
            return Ok(WriteOutcome {
                status: "dry_run",
                package_name: request.name.clone(),
                top_hash: None,
                registry: format!("s3://{registry_bucket}"),
                message,
                entries,
                readme_attached: readme.is_some(),
                summary,
                metadata: Value::Object(metadata),
                warnings,
            });
        }

        let mut s3_uris = request.files.clone();
        let mut readme_attached = false;
        if let Some(content) = &readme {
            match self
                .stage_file(&registry_bucket, &request.name, "README.md", content.as_bytes())
                .await
            {
                Ok(uri) => {
                    s3_uris.push(uri);
                    readme_attached = true;
                }
                Err(e) => warnings.push(format!("README.md could not be staged: {e}")),
            }
        }
        if let Some(summary_doc) = &summary {
            let body = serde_json::to_vec_pretty(summary_doc)
                .map_err(|e| Error::Internal(format!("failed to encode summary: {e}")))?;
            match self
                .stage_file(&registry_bucket, &request.name, "quilt_summarize.json", &body)
                .await
            {
                Ok(uri) => s3_uris.push(uri),
                Err(e) => warnings.push(format!("quilt_summarize.json could not be staged: {e}")),
            }
        }
        if let Some(viz) = &visualization {
            let config_body = serde_json::to_vec_pretty(&viz.config)
                .map_err(|e| Error::Internal(format!("failed to encode chart config: {e}")))?;
            match self
                .stage_file(&registry_bucket, &request.name, &viz.config_filename, &config_body)
                .await
            {
                Ok(config_uri) => {
                    s3_uris.push(config_uri);
                    match self
                        .stage_file(
                            &registry_bucket,
                            &request.name,
                            &viz.csv_filename,
                            viz.csv.as_bytes(),
                        )
                        .await
                    {
                        Ok(csv_uri) => s3_uris.push(csv_uri),
                        Err(e) => warnings.push(format!("chart data could not be staged: {e}")),
                    }
                }
                Err(e) => warnings.push(format!("chart config could not be staged: {e}")),
            }
        }

        // Revision submission.
        let response = self
            .catalog
            .package_create(
                &request.name,
                &s3_uris,
                &Value::Object(metadata.clone()),
                &message,
                request.flatten,
                copy_mode.as_str(),
            )
            .await?;

        Ok(WriteOutcome {
            status: "success",
            package_name: request.name.clone(),
            top_hash: extract_top_hash(&response),
            registry: format!("s3://{registry_bucket}"),
            message,
            entries,
            readme_attached,
            summary,
            metadata: Value::Object(metadata),
            warnings,
        })
    }

    /// Runs the update pipeline (same steps, update endpoint).
    ///
    /// # Errors
    ///
    /// As [`PackageWritePipeline::create`].
    pub async fn update(&self, request: &CreateRequest) -> Result<WriteOutcome> {
        validate_package_name(&request.name)?;
        let parsed_files = validate_files(&request.files)?;
        let copy_mode = CopyMode::parse(&request.copy_mode)?;
        let PreparedMetadata {
            metadata,
            readme_content: _,
            mut warnings,
        } = prepare_metadata(request.metadata.as_ref())?;

        let source_bucket = parsed_files[0].0.clone();
        let registry_bucket = self
            .resolve_registry(request, &source_bucket, &mut warnings)
            .await;
        self.check_registry_writable(&registry_bucket, &source_bucket, request)
            .await?;

        let layout = if request.flatten {
            OrganizedLayout::flat(&parsed_files)
        } else {
            OrganizedLayout::smart(&parsed_files)
        };
        let message = request
            .message
            .clone()
            .unwrap_or_else(|| format!("Updated package {}", request.name));

        let response = self
            .catalog
            .package_update(
                &request.name,
                &request.files,
                &Value::Object(metadata.clone()),
                &message,
                request.flatten,
                copy_mode.as_str(),
            )
            .await?;

        Ok(WriteOutcome {
            status: "success",
            package_name: request.name.clone(),
            top_hash: extract_top_hash(&response),
            registry: format!("s3://{registry_bucket}"),
            message,
            entries: layout
                .entries
                .iter()
                .map(|e| (e.logical_key.clone(), e.physical_key.clone()))
                .collect(),
            readme_attached: false,
            summary: None,
            metadata: Value::Object(metadata),
            warnings,
        })
    }

    /// Resolves the target registry bucket.
    async fn resolve_registry(
        &self,
        request: &CreateRequest,
        source_bucket: &str,
        warnings: &mut Vec<String>,
    ) -> String {
        if let Some(registry) = &request.registry {
            return normalize_registry_bucket(registry);
        }

        if let Some(discovery) = self.discovery {
            let candidates = discovery.enumerate_buckets(Some(self.catalog)).await;
            if let Ok(infos) = discovery.discover_all(&candidates).await {
                let writable: Vec<_> = infos
                    .into_iter()
                    .filter(|b| b.permission_level.is_writable())
                    .collect();
                let scored = score_recommendations(
                    &writable,
                    Some(source_bucket),
                    request.user_context.as_ref(),
                );
                if let Some(best) = scored.first() {
                    warnings.push(format!(
                        "Registry auto-selected from permission discovery: {}",
                        best.bucket_name
                    ));
                    return best.bucket_name.clone();
                }
            }
            warnings.push(format!(
                "No writable bucket discovered; using configured default registry {}",
                self.config.default_registry
            ));
        }
        self.config.default_registry_bucket().to_string()
    }

    /// Fails with `authorization_error` when the registry is known to be
    /// unwritable, recommending alternatives.
    async fn check_registry_writable(
        &self,
        registry_bucket: &str,
        source_bucket: &str,
        request: &CreateRequest,
    ) -> Result<()> {
        let Some(discovery) = self.discovery else {
            return Ok(());
        };
        // An unverifiable registry (no AWS identity) is left for the
        // catalog to enforce; only a known-unwritable one fails here.
        let info = match discovery.discover_bucket(registry_bucket).await {
            Ok(info) => info,
            Err(e) => {
                tracing::debug!(error = %e, "registry writability could not be verified");
                return Ok(());
            }
        };
        if info.can_write {
            return Ok(());
        }

        let candidates = discovery.enumerate_buckets(Some(self.catalog)).await;
        let alternatives = match discovery.discover_all(&candidates).await {
            Ok(infos) => {
                let writable: Vec<_> = infos
                    .into_iter()
                    .filter(|b| b.permission_level.is_writable())
                    .collect();
                score_recommendations(
                    &writable,
                    Some(source_bucket),
                    request.user_context.as_ref(),
                )
                .into_iter()
                .take(3)
                .map(|r| r.bucket_name)
                .collect::<Vec<_>>()
            }
            Err(_) => Vec::new(),
        };

        let mut reason = format!("Registry s3://{registry_bucket} is not writable");
        if !alternatives.is_empty() {
            reason.push_str(&format!("; writable alternatives: {}", alternatives.join(", ")));
        }
        Err(Error::Authorization {
            reason,
            missing_permissions: Vec::new(),
            missing_buckets: vec![registry_bucket.to_string()],
        })
    }

    /// Uploads a generated file under the package's staging prefix and
    /// returns its URI.
    async fn stage_file(
        &self,
        registry_bucket: &str,
        package_name: &str,
        filename: &str,
        body: &[u8],
    ) -> Result<String> {
        let Some(s3) = self.s3 else {
            return Err(Error::authentication(
                "no_aws_identity",
                "No AWS session available to stage generated files",
            ));
        };
        let key = format!(".quilt/packages/{package_name}/{filename}");
        s3.put_object(registry_bucket, &key, body.to_vec()).await?;
        Ok(format!("s3://{registry_bucket}/{key}"))
    }
}

/// Normalizes `bucket`, `s3://bucket`, or `s3://bucket/prefix` to the
/// bucket name.
fn normalize_registry_bucket(registry: &str) -> String {
    registry
        .trim()
        .strip_prefix("s3://")
        .unwrap_or(registry.trim())
        .split('/')
        .next()
        .unwrap_or_default()
        .trim_matches('/')
        .to_string()
}

/// Overlays user metadata on top of a template skeleton.
fn overlay_template(
    template: &str,
    user_metadata: Map<String, Value>,
) -> Result<Map<String, Value>> {
    let template_doc = super::metadata::metadata_template(template)?;
    let mut merged = Map::new();
    if let Some(fields) = template_doc["fields"].as_object() {
        for (field, spec) in fields {
            if let Some(default) = spec.get("default") {
                merged.insert(field.clone(), default.clone());
            }
        }
    }
    merged.insert("metadata_template".to_string(), json!(template));
    for (key, value) in user_metadata {
        merged.insert(key, value);
    }
    Ok(merged)
}

/// Builds a visualization from an inline chart spec.
///
/// Spec shape: `{data: [records], plot_type, x_column, y_column, title?}`.
fn build_visualization_from_spec(spec: &Value) -> Result<crate::visualize::Visualization> {
    let data = spec
        .get("data")
        .ok_or_else(|| Error::Validation("Visualization spec requires 'data'".to_string()))?;
    let plot_type = crate::visualize::PlotType::parse(
        spec.get("plot_type").and_then(Value::as_str).unwrap_or("bar"),
    )?;
    let x_column = spec
        .get("x_column")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Validation("Visualization spec requires 'x_column'".to_string()))?;
    let y_column = spec
        .get("y_column")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Validation("Visualization spec requires 'y_column'".to_string()))?;
    crate::visualize::build_visualization(
        data,
        plot_type,
        x_column,
        y_column,
        spec.get("title").and_then(Value::as_str),
    )
}

/// Pulls the revision hash out of the catalog response, whatever its
/// nesting.
fn extract_top_hash(response: &Value) -> Option<String> {
    for key in ["top_hash", "topHash", "hash"] {
        if let Some(hash) = response.get(key).and_then(Value::as_str) {
            return Some(hash.to_string());
        }
    }
    response
        .get("result")
        .and_then(|r| extract_top_hash(r))
}
