//! Package write workflow.
//!
//! The create/update pipeline: validate the request, prepare metadata
//! (README extraction, templates), resolve a target registry with
//! permission discovery, organize logical keys, materialize README and
//! summary files, and submit the revision through the catalog REST API.

mod metadata;
mod organize;
mod pipeline;
mod readme;
mod summary;
mod validate;

pub use metadata::{PreparedMetadata, metadata_template, metadata_templates, prepare_metadata};
pub use organize::{LayoutEntry, OrganizedLayout, smart_folder};
pub use pipeline::{CreateRequest, PackageWritePipeline, WriteOutcome};
pub use summary::generate_summarize;
pub use validate::{CopyMode, validate_files, validate_package_name};
