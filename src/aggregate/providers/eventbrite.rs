// src/aggregate/providers/eventbrite.rs
//! Event vendor: Eventbrite search. Expanded with venue + organizer so
//! the normalized listing carries a human-readable location and host.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::aggregate::config::HttpSection;
use crate::aggregate::normalize::{self, RawListing};
use crate::aggregate::types::{AdapterError, Listing, SourceAdapter};
use crate::relevance;

const SOURCE: &str = "eventbrite";
const ENV_TOKEN: &str = "EVENTBRITE_TOKEN";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    events: Option<Vec<EbEvent>>,
}

#[derive(Debug, Deserialize)]
struct EbEvent {
    id: Option<String>,
    name: Option<EbText>,
    description: Option<EbText>,
    url: Option<String>,
    start: Option<EbStart>,
    logo: Option<EbLogo>,
    organizer: Option<EbOrganizer>,
    venue: Option<EbVenue>,
    is_free: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct EbText {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EbStart {
    utc: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EbLogo {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EbOrganizer {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EbVenue {
    name: Option<String>,
    address: Option<EbAddress>,
}

#[derive(Debug, Deserialize)]
struct EbAddress {
    localized_address_display: Option<String>,
    city: Option<String>,
}

pub struct EventbriteAdapter {
    mode: Mode,
}

enum Mode {
    Http {
        client: reqwest::Client,
        token: String,
    },
    Fixture(String),
}

impl EventbriteAdapter {
    pub fn from_env(http: &HttpSection) -> Self {
        let token = std::env::var(ENV_TOKEN).unwrap_or_default();
        let client = reqwest::Client::builder()
            .user_agent("opportunity-aggregator/0.1")
            .connect_timeout(http.connect_timeout())
            .timeout(http.timeout())
            .build()
            .expect("reqwest client");
        Self {
            mode: Mode::Http { client, token },
        }
    }

    pub fn from_fixture(payload: &str) -> Self {
        Self {
            mode: Mode::Fixture(payload.to_string()),
        }
    }

    fn parse_payload(body: &str) -> Result<Vec<Listing>, AdapterError> {
        let resp: SearchResponse = serde_json::from_str(body)
            .map_err(|e| AdapterError::MalformedPayload(e.to_string()))?;
        Ok(resp
            .events
            .unwrap_or_default()
            .into_iter()
            .map(map_event)
            .collect())
    }
}

fn map_event(event: EbEvent) -> Listing {
    let name = event.name.and_then(|n| n.text);
    let kind = name
        .as_deref()
        .map(normalize::event_kind_from_name)
        .unwrap_or(crate::aggregate::types::ListingKind::Meetup);

    let location = event.venue.and_then(|v| {
        v.address
            .and_then(|a| a.localized_address_display.or(a.city))
            .or(v.name)
    });

    let mut tags = vec!["networking".to_string()];
    let compensation = match event.is_free {
        Some(true) => {
            tags.push("free".to_string());
            Some("Free".to_string())
        }
        _ => None,
    };

    let raw = RawListing {
        id: event.id,
        title: name,
        organization: event.organizer.and_then(|o| o.name),
        organization_logo_url: event.logo.and_then(|l| l.url),
        url: event.url,
        category: Some("Networking Events".to_string()),
        tags,
        kind: Some(kind),
        published_at: event
            .start
            .and_then(|s| s.utc)
            .as_deref()
            .and_then(parse_utc),
        location,
        compensation,
        description: event.description.and_then(|d| d.text),
    };
    normalize::normalize(SOURCE, raw)
}

/// Eventbrite's `utc` field is RFC 3339 with a trailing `Z`.
fn parse_utc(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl SourceAdapter for EventbriteAdapter {
    async fn fetch_term(&self, term: &str, limit: usize) -> Result<Vec<Listing>, AdapterError> {
        let listings = match &self.mode {
            Mode::Fixture(payload) => Self::parse_payload(payload)?,
            Mode::Http { client, token } => {
                if token.is_empty() {
                    return Err(AdapterError::Unavailable(format!("{ENV_TOKEN} not set")));
                }
                let url = format!(
                    "https://www.eventbriteapi.com/v3/events/search/?q={}&expand=venue,organizer",
                    urlencoding::encode(term)
                );
                let resp = client
                    .get(&url)
                    .bearer_auth(token)
                    .send()
                    .await
                    .map_err(|e| AdapterError::Unavailable(e.to_string()))?;
                if !resp.status().is_success() {
                    return Err(AdapterError::Unavailable(format!(
                        "status {}",
                        resp.status()
                    )));
                }
                let body = resp
                    .text()
                    .await
                    .map_err(|e| AdapterError::Unavailable(e.to_string()))?;
                Self::parse_payload(&body)?
            }
        };

        let had_any = !listings.is_empty();
        let kept = relevance::filter_listings(term, listings, limit);
        if kept.is_empty() && had_any {
            return Err(AdapterError::NoRelevantResults);
        }
        Ok(kept)
    }

    fn name(&self) -> &'static str {
        SOURCE
    }
}
