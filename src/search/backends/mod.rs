//! Search backend implementations.
//!
//! Backends share the [`SearchBackend`] capability: given a routed query
//! (concrete search type, scope, filters) they return a
//! [`BackendResponse`] and never an error; failures are folded into the
//! response so the orchestrator can degrade gracefully.

mod graphql;
mod s3;

pub use graphql::GraphqlBackend;
pub use s3::S3FallbackBackend;

use super::types::{BackendResponse, SearchQuery};
use std::future::Future;

/// Capability shared by all search backends.
pub trait SearchBackend {
    /// Stable backend name used for hit tagging and selection.
    fn name(&self) -> &'static str;

    /// Executes a routed query.
    fn search(&self, query: &SearchQuery) -> impl Future<Output = BackendResponse> + Send;
}

/// A backend selected at runtime.
pub enum AnyBackend {
    /// Catalog GraphQL search.
    Graphql(GraphqlBackend),
    /// S3 list-and-filter fallback.
    S3(S3FallbackBackend),
}

impl SearchBackend for AnyBackend {
    fn name(&self) -> &'static str {
        match self {
            Self::Graphql(b) => b.name(),
            Self::S3(b) => b.name(),
        }
    }

    async fn search(&self, query: &SearchQuery) -> BackendResponse {
        match self {
            Self::Graphql(b) => b.search(query).await,
            Self::S3(b) => b.search(query).await,
        }
    }
}
