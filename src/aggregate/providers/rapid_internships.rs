// src/aggregate/providers/rapid_internships.rs
//! Primary internship source: the RapidAPI internships index. One GET per
//! term, filtered down to listings relevant to that term.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::aggregate::config::HttpSection;
use crate::aggregate::normalize::{self, RawListing};
use crate::aggregate::types::{AdapterError, Listing, SourceAdapter};
use crate::relevance;

const SOURCE: &str = "rapid";
const HOST: &str = "internships-api.p.rapidapi.com";
const ENV_KEY: &str = "RAPIDAPI_KEY";

#[derive(Debug, Deserialize)]
struct RapidJob {
    id: Option<serde_json::Value>,
    title: Option<String>,
    organization: Option<String>,
    organization_logo: Option<String>,
    url: Option<String>,
    date_posted: Option<String>,
    locations_derived: Option<Vec<String>>,
    employment_type: Option<Vec<String>>,
    remote_derived: Option<bool>,
    salary_raw: Option<serde_json::Value>,
    description_text: Option<String>,
}

pub struct RapidInternshipsAdapter {
    mode: Mode,
}

enum Mode {
    Http { client: reqwest::Client, key: String },
    Fixture(String),
}

impl RapidInternshipsAdapter {
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

    /// Parse a canned provider payload instead of hitting the network.
    pub fn from_fixture(payload: &str) -> Self {
        Self {
            mode: Mode::Fixture(payload.to_string()),
        }
    }

    fn parse_payload(body: &str) -> Result<Vec<Listing>, AdapterError> {
        let jobs: Vec<RapidJob> = serde_json::from_str(body)
            .map_err(|e| AdapterError::MalformedPayload(e.to_string()))?;
        Ok(jobs.into_iter().map(map_job).collect())
    }
}

fn map_job(job: RapidJob) -> Listing {
    let title = job.title.clone();
    let kind = title
        .as_deref()
        .map(normalize::job_kind_from_title)
        .unwrap_or(crate::aggregate::types::ListingKind::Internship);

    let mut tags: Vec<String> = job.employment_type.unwrap_or_default();
    if job.remote_derived.unwrap_or(false) {
        tags.push("remote".to_string());
    }

    let raw = RawListing {
        id: job.id.map(|v| match v {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        }),
        title,
        organization: job.organization,
        organization_logo_url: job.organization_logo,
        url: job.url,
        category: Some("Internships".to_string()),
        tags,
        kind: Some(kind),
        published_at: job
            .date_posted
            .as_deref()
            .and_then(parse_timestamp),
        location: job
            .locations_derived
            .and_then(|mut l| if l.is_empty() { None } else { Some(l.remove(0)) }),
        compensation: job.salary_raw.and_then(flatten_salary),
        description: job.description_text,
    };
    normalize::normalize(SOURCE, raw)
}

/// Providers send either RFC 3339 or a bare date.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// `salary_raw` is unstructured; keep a string rendering when one exists.
fn flatten_salary(v: serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) => {
            if s.trim().is_empty() {
                None
            } else {
                Some(s)
            }
        }
        serde_json::Value::Object(map) => {
            let min = map.get("minValue").and_then(|v| v.as_f64());
            let max = map.get("maxValue").and_then(|v| v.as_f64());
            let currency = map
                .get("currency")
                .and_then(|v| v.as_str())
                .unwrap_or("USD");
            match (min, max) {
                (Some(lo), Some(hi)) => Some(format!("{lo:.0}-{hi:.0} {currency}")),
                (Some(lo), None) => Some(format!("from {lo:.0} {currency}")),
                _ => None,
            }
        }
        _ => None,
    }
}

#[async_trait]
impl SourceAdapter for RapidInternshipsAdapter {
    async fn fetch_term(&self, term: &str, limit: usize) -> Result<Vec<Listing>, AdapterError> {
        let listings = match &self.mode {
            Mode::Fixture(payload) => Self::parse_payload(payload)?,
            Mode::Http { client, key } => {
                if key.is_empty() {
                    return Err(AdapterError::Unavailable(format!("{ENV_KEY} not set")));
                }
                let url = format!(
                    "https://{HOST}/active-jb-7d?title_filter={}",
                    urlencoding::encode(term)
                );
                let resp = client
                    .get(&url)
                    .header("x-rapidapi-key", key)
                    .header("x-rapidapi-host", HOST)
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

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"[
        {
            "id": 1882530,
            "title": "Product Design Intern",
            "organization": "Helios Studio",
            "organization_logo": "https://cdn.example.com/helios.png",
            "url": "https://jobs.example.com/1882530",
            "date_posted": "2025-07-30T09:15:00+00:00",
            "locations_derived": ["Austin, TX"],
            "employment_type": ["INTERN"],
            "remote_derived": false
        },
        {
            "title": "Kitchen Crew",
            "organization": "Diner Co",
            "url": "https://jobs.example.com/999",
            "date_posted": "2025-07-29"
        }
    ]"#;

    #[tokio::test]
    async fn fixture_parses_filters_and_prefixes_ids() {
        let adapter = RapidInternshipsAdapter::from_fixture(FIXTURE);
        let out = adapter.fetch_term("Product Design", 5).await.expect("fetch");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "rapid-1882530");
        assert_eq!(out[0].organization, "Helios Studio");
        assert_eq!(out[0].location, "Austin, TX");
        assert!(out[0].relevance_score.is_some());
    }

    #[tokio::test]
    async fn irrelevant_only_payload_reports_no_relevant_results() {
        let adapter = RapidInternshipsAdapter::from_fixture(FIXTURE);
        let err = adapter.fetch_term("astrophysics", 5).await.unwrap_err();
        assert!(matches!(err, AdapterError::NoRelevantResults));
    }

    #[tokio::test]
    async fn malformed_payload_is_reported() {
        let adapter = RapidInternshipsAdapter::from_fixture("{\"nope\":true}");
        let err = adapter.fetch_term("design", 5).await.unwrap_err();
        assert!(matches!(err, AdapterError::MalformedPayload(_)));
    }

    #[test]
    fn bare_dates_parse() {
        assert!(parse_timestamp("2025-07-29").is_some());
        assert!(parse_timestamp("2025-07-30T09:15:00+00:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
