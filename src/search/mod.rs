//! Unified search across the catalog and S3.
//!
//! A [`SearchQuery`] is classified ([`intent`]), routed to one or more
//! backends ([`backends`]), and the normalized hits are merged by the
//! orchestrator ([`unified`]). Backend failures degrade gracefully: an
//! erroring backend contributes an empty result list and its error
//! message, and the aggregate only fails when every selected backend is
//! down.

pub mod backends;
pub mod intent;
pub mod suggest;
mod types;
pub mod unified;

pub use backends::{AnyBackend, SearchBackend};
pub use types::{
    BackendResponse, BackendStatus, ResultKind, SearchFilters, SearchQuery, SearchResult,
    SearchScope, SearchType,
};
pub use unified::{UnifiedResponse, UnifiedSearch};
