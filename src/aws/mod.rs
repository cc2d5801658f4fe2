//! AWS operations performed with the request's session.
//!
//! Everything here runs under the identity resolved by
//! [`auth`](crate::auth): S3 object wrappers for the bucket tools and the
//! S3 search fallback, and the bucket-by-bucket permission discovery with
//! its process-wide TTL cache.

pub mod permissions;
pub mod s3;

pub use permissions::{BucketInfo, PermissionDiscovery, PermissionLevel};
pub use s3::{ObjectInfo, ObjectPage, S3Operations};
