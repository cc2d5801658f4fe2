//! Typed client for the Quilt catalog.
//!
//! All catalog traffic goes through [`CatalogClient`]: GraphQL for search,
//! packages, tabulator and admin operations, REST for package revisions
//! and server-side bucket search. Mutations returning GraphQL unions
//! (`Ok | InvalidInput | OperationError | ...`) are decoded once, in
//! [`union`].

mod admin;
mod client;
mod packages;
mod search;
mod tabulator;
pub mod union;

pub use admin::PolicyPermission;
pub use client::CatalogClient;
pub use packages::PackageEntry;
pub use search::{BucketPackagesPage, ObjectHit, ObjectsSearchOutcome, PackageHit};
pub use tabulator::TabulatorTable;
