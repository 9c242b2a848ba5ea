// src/aggregate/providers/ticketmaster.rs
//! Event vendor: Ticketmaster Discovery. Results arrive under a HAL
//! `_embedded` envelope; venues and classifications are optional.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::aggregate::config::HttpSection;
use crate::aggregate::normalize::{self, RawListing};
use crate::aggregate::types::{AdapterError, Listing, SourceAdapter};
use crate::relevance;

const SOURCE: &str = "ticketmaster";
const ENV_KEY: &str = "TICKETMASTER_API_KEY";

#[derive(Debug, Deserialize)]
struct DiscoveryResponse {
    #[serde(rename = "_embedded")]
    embedded: Option<Embedded>,
}

#[derive(Debug, Deserialize)]
struct Embedded {
    events: Vec<TmEvent>,
}

#[derive(Debug, Deserialize)]
struct TmEvent {
    id: Option<String>,
    name: Option<String>,
    url: Option<String>,
    info: Option<String>,
    description: Option<String>,
    dates: Option<TmDates>,
    images: Option<Vec<TmImage>>,
    classifications: Option<Vec<TmClassification>>,
    #[serde(rename = "_embedded")]
    embedded: Option<TmEventEmbedded>,
}

#[derive(Debug, Deserialize)]
struct TmDates {
    start: Option<TmStart>,
}

#[derive(Debug, Deserialize)]
struct TmStart {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmImage {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmClassification {
    segment: Option<TmNamed>,
    genre: Option<TmNamed>,
}

#[derive(Debug, Deserialize)]
struct TmNamed {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmEventEmbedded {
    venues: Option<Vec<TmVenue>>,
}

#[derive(Debug, Deserialize)]
struct TmVenue {
    name: Option<String>,
    city: Option<TmNamed>,
}

pub struct TicketmasterAdapter {
    mode: Mode,
}

enum Mode {
    Http { client: reqwest::Client, key: String },
    Fixture(String),
}

impl TicketmasterAdapter {
    pub fn from_env(http: &HttpSection) -> Self {
        let key = std::env::var(ENV_KEY).unwrap_or_default();
        let client = reqwest::Client::builder()
            .user_agent("opportunity-aggregator/0.1")
            .connect_timeout(http.connect_timeout())
            .timeout(http.timeout())
            .build()
            .expect("reqwest client");
        Self {
            mode: Mode::Http { client, key },
        }
    }

    pub fn from_fixture(payload: &str) -> Self {
        Self {
            mode: Mode::Fixture(payload.to_string()),
        }
    }

    fn parse_payload(body: &str) -> Result<Vec<Listing>, AdapterError> {
        let resp: DiscoveryResponse = serde_json::from_str(body)
            .map_err(|e| AdapterError::MalformedPayload(e.to_string()))?;
        Ok(resp
            .embedded
            .map(|e| e.events)
            .unwrap_or_default()
            .into_iter()
            .map(map_event)
            .collect())
    }
}

fn map_event(event: TmEvent) -> Listing {
    let kind = event
        .name
        .as_deref()
        .map(normalize::event_kind_from_name)
        .unwrap_or(crate::aggregate::types::ListingKind::Meetup);

    let mut tags = vec!["networking".to_string()];
    for c in event.classifications.unwrap_or_default() {
        for named in [c.segment, c.genre].into_iter().flatten() {
            if let Some(n) = named.name {
                tags.push(n);
            }
        }
    }

    let location = event.embedded.and_then(|e| {
        e.venues
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|v| match (v.name, v.city.and_then(|c| c.name)) {
                (Some(name), Some(city)) => format!("{name}, {city}"),
                (Some(name), None) => name,
                (None, Some(city)) => city,
                (None, None) => String::new(),
            })
    });

    let raw = RawListing {
        id: event.id,
        title: event.name,
        organization: None,
        organization_logo_url: event
            .images
            .unwrap_or_default()
            .into_iter()
            .find_map(|i| i.url),
        url: event.url,
        category: Some("Networking Events".to_string()),
        tags,
        kind: Some(kind),
        published_at: event
            .dates
            .and_then(|d| d.start)
            .and_then(|s| s.date_time)
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        location,
        compensation: None,
        description: event.info.or(event.description),
    };
    normalize::normalize(SOURCE, raw)
}

#[async_trait]
impl SourceAdapter for TicketmasterAdapter {
    async fn fetch_term(&self, term: &str, limit: usize) -> Result<Vec<Listing>, AdapterError> {
        let listings = match &self.mode {
            Mode::Fixture(payload) => Self::parse_payload(payload)?,
            Mode::Http { client, key } => {
                if key.is_empty() {
                    return Err(AdapterError::Unavailable(format!("{ENV_KEY} not set")));
                }
                let url = format!(
                    "https://app.ticketmaster.com/discovery/v2/events.json?keyword={}&apikey={}",
                    urlencoding::encode(term),
                    key
                );
                let resp = client
                    .get(&url)
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
