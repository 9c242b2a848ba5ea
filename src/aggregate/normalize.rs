// src/aggregate/normalize.rs
//! Pure mapping from heterogeneous provider payloads into the shared
//! `Listing` schema. Missing fields are substituted with documented
//! defaults; defaulting, not failure, is the policy for incomplete
//! upstream data.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::aggregate::types::{Listing, ListingKind};

pub const DEFAULT_TITLE: &str = "Untitled Opportunity";
pub const DEFAULT_ORGANIZATION: &str = "Unknown Company";
pub const DEFAULT_COMPENSATION: &str = "Competitive";
pub const DEFAULT_LOCATION: &str = "Location not specified";
pub const DEFAULT_CATEGORY: &str = "General";

const DESCRIPTION_CAP: usize = 1500;

/// Provider-agnostic intermediate shape. Every field is optional; the
/// adapter fills what its provider supplies and `normalize` does the rest.
#[derive(Debug, Default, Clone)]
pub struct RawListing {
    pub id: Option<String>,
    pub title: Option<String>,
    pub organization: Option<String>,
    pub organization_logo_url: Option<String>,
    pub url: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub kind: Option<ListingKind>,
    pub published_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub compensation: Option<String>,
    pub description: Option<String>,
}

/// Normalize free text: decode HTML entities, strip tags, collapse
/// whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > DESCRIPTION_CAP {
        out = out.chars().take(DESCRIPTION_CAP).collect();
    }
    out
}

/// Deterministic short token for listings whose provider supplied no id.
/// First six digest bytes as hex, same shape as our anonymized log ids.
pub fn listing_token(source: &str, title: &str, url: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(title.as_bytes());
    hasher.update(url.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let t = s.trim().to_string();
        if t.is_empty() {
            None
        } else {
            Some(t)
        }
    })
}

/// Map one provider record into the shared schema. Never fails: every
/// missing field gets its documented default, ids are source-prefixed to
/// avoid cross-provider collisions.
pub fn normalize(source: &str, raw: RawListing) -> Listing {
    let title = non_empty(raw.title)
        .map(|t| normalize_text(&t))
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let url = non_empty(raw.url).unwrap_or_default();
    let id_body = non_empty(raw.id).unwrap_or_else(|| listing_token(source, &title, &url));
    let description = non_empty(raw.description)
        .map(|d| normalize_text(&d))
        .unwrap_or_default();

    let tags: BTreeSet<String> = raw
        .tags
        .into_iter()
        .filter_map(|t| {
            let t = t.trim().to_lowercase();
            if t.is_empty() {
                None
            } else {
                Some(t)
            }
        })
        .collect();

    Listing {
        id: format!("{source}-{id_body}"),
        title,
        organization: non_empty(raw.organization)
            .unwrap_or_else(|| DEFAULT_ORGANIZATION.to_string()),
        organization_logo_url: non_empty(raw.organization_logo_url),
        url,
        category: non_empty(raw.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        tags,
        kind: raw.kind.unwrap_or(ListingKind::Other),
        published_at: raw.published_at.unwrap_or_else(Utc::now),
        location: non_empty(raw.location).unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        compensation: Some(
            non_empty(raw.compensation).unwrap_or_else(|| DEFAULT_COMPENSATION.to_string()),
        ),
        description,
        relevance_score: None,
    }
}

/// Kind heuristic shared by job adapters whose payloads carry no explicit
/// classification.
pub fn job_kind_from_title(title: &str) -> ListingKind {
    let lower = title.to_lowercase();
    if lower.contains("intern") {
        ListingKind::Internship
    } else {
        ListingKind::EntryLevel
    }
}

/// Kind heuristic for event vendors: the event name is the only signal.
pub fn event_kind_from_name(name: &str) -> ListingKind {
    let lower = name.to_lowercase();
    if lower.contains("conference") || lower.contains("summit") || lower.contains("expo") {
        ListingKind::Conference
    } else if lower.contains("workshop") || lower.contains("bootcamp") {
        ListingKind::Workshop
    } else {
        ListingKind::Meetup
    }
}
