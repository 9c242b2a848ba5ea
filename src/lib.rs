// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregate;
pub mod ai_adapter;
pub mod api;
pub mod metrics;
pub mod relevance;
pub mod sanitize;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::types::{
    AggregateResponse, Listing, ListingKind, SearchQuery, SourceResult,
};
pub use crate::api::{create_router, AppState};
