// src/aggregate/types.rs
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hard cap on per-term results a caller may request.
pub const MAX_LIMIT: usize = 50;
pub const DEFAULT_LIMIT: usize = 10;

/// Normalized search input. Terms are trimmed, deduplicated
/// case-insensitively (first spelling wins) and kept in request order;
/// the limit is clamped to `1..=MAX_LIMIT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub terms: Vec<String>,
    pub limit: usize,
}

impl SearchQuery {
    pub fn new(terms: Vec<String>, limit: Option<usize>) -> Self {
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut kept = Vec::new();
        for raw in terms {
            let term = raw.trim().to_string();
            if term.is_empty() {
                continue;
            }
            if seen.insert(term.to_lowercase()) {
                kept.push(term);
            }
        }
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        Self { terms: kept, limit }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// What a listing is, independent of which provider supplied it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingKind {
    Internship,
    EntryLevel,
    Conference,
    Workshop,
    Meetup,
    Other,
}

/// Normalized unit of result data: one job or event, in the shared schema
/// every adapter maps into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Source-prefixed, unique within a response.
    pub id: String,
    pub title: String,
    pub organization: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_logo_url: Option<String>,
    pub url: String,
    pub category: String,
    pub tags: BTreeSet<String>,
    pub kind: ListingKind,
    pub published_at: DateTime<Utc>,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compensation: Option<String>,
    pub description: String,
    /// 0–100, stamped by the relevance filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<u8>,
}

/// Listings one adapter produced for one term. `synthetic` is an explicit
/// provenance flag; downstream code never infers it from the source name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResult {
    pub source: String,
    /// The term that produced these items.
    pub query: String,
    pub synthetic: bool,
    pub items: Vec<Listing>,
}

/// Per-adapter bookkeeping the orchestrator exposes with every response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterRun {
    pub source: String,
    pub ran: bool,
    pub items: usize,
    /// Whether this adapter's output satisfied the short-circuit
    /// condition (non-empty and not synthetic).
    pub counted_real: bool,
}

/// Aggregated payload for one search request. `success == true` implies
/// at least one non-empty `SourceResult`; synthetic content is always
/// flagged through `fallback_used` plus the per-result `synthetic` bit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResponse {
    pub success: bool,
    pub by_source: BTreeMap<String, Vec<SourceResult>>,
    pub count: usize,
    pub fallback_used: bool,
    pub adapters: Vec<AdapterRun>,
    pub message: String,
}

/// Failure taxonomy for a single adapter term-lookup. All variants are
/// recovered locally: the orchestrator logs them and falls through to the
/// next adapter in priority order.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Missing credential, network failure, timeout, or non-2xx status.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    /// Provider responded but the relevance filter removed everything.
    #[error("no relevant results")]
    NoRelevantResults,
    /// Upstream payload did not match the expected shape.
    #[error("malformed upstream payload: {0}")]
    MalformedPayload(String),
}

/// One external data provider. `fetch_term` performs a single provider
/// query, applies the relevance filter, and truncates to `limit`.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch_term(&self, term: &str, limit: usize) -> Result<Vec<Listing>, AdapterError>;
    fn name(&self) -> &'static str;
    /// Synthetic adapters produce designed placeholder data and never
    /// satisfy the orchestrator's short-circuit condition.
    fn synthetic(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_dedups_case_insensitively_keeping_order() {
        let q = SearchQuery::new(
            vec![
                "Marketing".into(),
                "  ".into(),
                "marketing".into(),
                "Design".into(),
            ],
            None,
        );
        assert_eq!(q.terms, vec!["Marketing", "Design"]);
        assert_eq!(q.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn query_clamps_limit() {
        assert_eq!(SearchQuery::new(vec!["a".into()], Some(0)).limit, 1);
        assert_eq!(SearchQuery::new(vec!["a".into()], Some(500)).limit, MAX_LIMIT);
        assert_eq!(SearchQuery::new(vec!["a".into()], Some(5)).limit, 5);
    }

    #[test]
    fn empty_query_detected() {
        assert!(SearchQuery::new(vec![], Some(3)).is_empty());
        assert!(SearchQuery::new(vec!["   ".into()], Some(3)).is_empty());
    }

    #[test]
    fn listing_kind_serializes_snake_case() {
        let s = serde_json::to_string(&ListingKind::EntryLevel).expect("serialize");
        assert_eq!(s, "\"entry_level\"");
    }
}
