// src/aggregate/providers/jsearch.rs
//! Secondary job source: the JSearch board aggregator on RapidAPI.
//! Broader than the internships index, so titles are re-classified and
//! the relevance filter does the narrowing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::aggregate::config::HttpSection;
use crate::aggregate::normalize::{self, RawListing};
use crate::aggregate::types::{AdapterError, Listing, SourceAdapter};
use crate::relevance;

const SOURCE: &str = "jsearch";
const HOST: &str = "jsearch.p.rapidapi.com";
const ENV_KEY: &str = "RAPIDAPI_KEY";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Option<Vec<JsearchJob>>,
}

#[derive(Debug, Deserialize)]
struct JsearchJob {
    job_id: Option<String>,
    job_title: Option<String>,
    employer_name: Option<String>,
    employer_logo: Option<String>,
    job_apply_link: Option<String>,
    job_description: Option<String>,
    job_employment_type: Option<String>,
    job_posted_at_datetime_utc: Option<String>,
    job_city: Option<String>,
    job_state: Option<String>,
    job_country: Option<String>,
    job_is_remote: Option<bool>,
    job_min_salary: Option<f64>,
    job_max_salary: Option<f64>,
    job_salary_currency: Option<String>,
    job_salary_period: Option<String>,
}

pub struct JsearchAdapter {
    mode: Mode,
}

enum Mode {
    Http { client: reqwest::Client, key: String },
    Fixture(String),
}

impl JsearchAdapter {
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
        let resp: SearchResponse = serde_json::from_str(body)
            .map_err(|e| AdapterError::MalformedPayload(e.to_string()))?;
        Ok(resp
            .data
            .unwrap_or_default()
            .into_iter()
            .map(map_job)
            .collect())
    }
}

fn join_location(job: &JsearchJob) -> Option<String> {
    let parts: Vec<&str> = [&job.job_city, &job.job_state, &job.job_country]
        .into_iter()
        .filter_map(|p| p.as_deref())
        .filter(|p| !p.trim().is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn render_salary(job: &JsearchJob) -> Option<String> {
    let currency = job.job_salary_currency.as_deref().unwrap_or("USD");
    let period = job.job_salary_period.as_deref().unwrap_or("YEAR");
    match (job.job_min_salary, job.job_max_salary) {
        (Some(lo), Some(hi)) => Some(format!("{lo:.0}-{hi:.0} {currency}/{period}")),
        (Some(lo), None) => Some(format!("from {lo:.0} {currency}/{period}")),
        (None, Some(hi)) => Some(format!("up to {hi:.0} {currency}/{period}")),
        (None, None) => None,
    }
}

fn map_job(job: JsearchJob) -> Listing {
    let kind = job
        .job_title
        .as_deref()
        .map(normalize::job_kind_from_title)
        .unwrap_or(crate::aggregate::types::ListingKind::EntryLevel);

    let mut tags = Vec::new();
    if let Some(t) = &job.job_employment_type {
        tags.push(t.clone());
    }
    if job.job_is_remote.unwrap_or(false) {
        tags.push("remote".to_string());
    }

    let location = join_location(&job);
    let compensation = render_salary(&job);

    let raw = RawListing {
        id: job.job_id,
        title: job.job_title,
        organization: job.employer_name,
        organization_logo_url: job.employer_logo,
        url: job.job_apply_link,
        category: Some("Job Boards".to_string()),
        tags,
        kind: Some(kind),
        published_at: job
            .job_posted_at_datetime_utc
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        location,
        compensation,
        description: job.job_description,
    };
    normalize::normalize(SOURCE, raw)
}

#[async_trait]
impl SourceAdapter for JsearchAdapter {
    async fn fetch_term(&self, term: &str, limit: usize) -> Result<Vec<Listing>, AdapterError> {
        let listings = match &self.mode {
            Mode::Fixture(payload) => Self::parse_payload(payload)?,
            Mode::Http { client, key } => {
                if key.is_empty() {
                    return Err(AdapterError::Unavailable(format!("{ENV_KEY} not set")));
                }
                let url = format!(
                    "https://{HOST}/search?query={}&page=1&num_pages=1",
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
    use crate::aggregate::normalize::DEFAULT_COMPENSATION;
    use crate::aggregate::types::ListingKind;

    const FIXTURE: &str = r#"{
        "status": "OK",
        "data": [
            {
                "job_id": "a1b2",
                "job_title": "Product Design Intern",
                "employer_name": "Nimbus Works",
                "job_apply_link": "https://boards.example.com/a1b2",
                "job_description": "Help our design team ship.",
                "job_employment_type": "INTERN",
                "job_posted_at_datetime_utc": "2025-07-28T12:00:00Z",
                "job_city": "Denver",
                "job_state": "CO",
                "job_country": "US",
                "job_min_salary": 20,
                "job_max_salary": 25,
                "job_salary_currency": "USD",
                "job_salary_period": "HOUR"
            },
            {
                "job_title": "Junior Marketing Analyst",
                "employer_name": "Brightline",
                "job_country": "US"
            }
        ]
    }"#;

    #[tokio::test]
    async fn fixture_maps_salary_location_and_kind() {
        let adapter = JsearchAdapter::from_fixture(FIXTURE);
        let out = adapter.fetch_term("Product Design", 5).await.expect("fetch");
        assert_eq!(out.len(), 1);
        let l = &out[0];
        assert_eq!(l.id, "jsearch-a1b2");
        assert_eq!(l.kind, ListingKind::Internship);
        assert_eq!(l.location, "Denver, CO, US");
        assert_eq!(l.compensation.as_deref(), Some("20-25 USD/HOUR"));
    }

    #[tokio::test]
    async fn missing_salary_defaults_to_competitive() {
        let adapter = JsearchAdapter::from_fixture(FIXTURE);
        let out = adapter.fetch_term("Marketing", 5).await.expect("fetch");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, ListingKind::EntryLevel);
        assert_eq!(out[0].compensation.as_deref(), Some(DEFAULT_COMPENSATION));
    }

    #[tokio::test]
    async fn empty_data_array_is_ok_and_empty() {
        let adapter = JsearchAdapter::from_fixture(r#"{"status":"OK","data":[]}"#);
        let out = adapter.fetch_term("anything", 5).await.expect("fetch");
        assert!(out.is_empty());
    }
}
