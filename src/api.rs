use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use shuttle_axum::axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::aggregate::config::SourcesConfig;
use crate::aggregate::providers::{self, Domain};
use crate::aggregate::types::{SearchQuery, SourceAdapter, SourceResult};
use crate::aggregate::{fetch_all_terms, Orchestrator};
use crate::ai_adapter;
use crate::sanitize;

#[derive(Clone)]
pub struct AppState {
    pub internships: Arc<Orchestrator>,
    pub events: Arc<Orchestrator>,
}

impl AppState {
    /// Build both adapter chains from `config/sources.toml` (or built-in
    /// defaults) plus environment credentials.
    pub fn from_env() -> Self {
        let cfg = SourcesConfig::load_default().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "sources config unreadable; using defaults");
            SourcesConfig::default()
        });
        Self::from_config(&cfg)
    }

    pub fn from_config(cfg: &SourcesConfig) -> Self {
        let ai = ai_adapter::build_ai_client();

        let build = |domain: Domain, names: &[String]| -> Vec<Arc<dyn SourceAdapter>> {
            names
                .iter()
                .filter_map(|name| {
                    let adapter = providers::build_adapter(domain, name, &cfg.http, &ai);
                    if adapter.is_none() {
                        tracing::warn!(source = %name, "unknown source in config; skipping");
                    }
                    adapter
                })
                .collect()
        };

        Self {
            internships: Arc::new(Orchestrator::new(
                "internships",
                build(Domain::Internships, &cfg.internships.priority),
            )),
            events: Arc::new(Orchestrator::new(
                "events",
                build(Domain::Events, &cfg.events.priority),
            )),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/internships/search", post(search_internships))
        .route("/api/events/search", post(search_events))
        .route("/api/internships/test/{source}", post(test_internship_source))
        .route("/api/events/test/{source}", post(test_event_source))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    terms: Vec<String>,
    #[serde(default)]
    limit: Option<usize>,
}

async fn search_internships(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> Json<Value> {
    let query = SearchQuery::new(body.terms, body.limit);
    let resp = state.internships.run(&query).await;
    Json(sanitize::safe_json(&resp))
}

async fn search_events(State(state): State<AppState>, Json(body): Json<SearchBody>) -> Json<Value> {
    let query = SearchQuery::new(body.terms, body.limit);
    let resp = state.events.run(&query).await;
    Json(sanitize::safe_json(&resp))
}

/// Payload of the per-adapter diagnostic endpoints.
#[derive(Debug, serde::Serialize)]
struct DiagnosticResponse {
    success: bool,
    source: String,
    results: Vec<SourceResult>,
    count: usize,
    message: String,
}

async fn run_diagnostic(
    orchestrator: &Orchestrator,
    source: &str,
    body: Option<SearchBody>,
    default_term: &str,
) -> DiagnosticResponse {
    let Some(adapter) = orchestrator.adapter(source) else {
        return DiagnosticResponse {
            success: false,
            source: source.to_string(),
            results: Vec::new(),
            count: 0,
            message: format!(
                "Unknown source '{source}'. Configured: {}.",
                orchestrator.adapter_names().join(", ")
            ),
        };
    };

    let body = body.unwrap_or(SearchBody {
        terms: Vec::new(),
        limit: None,
    });
    let mut query = SearchQuery::new(body.terms, body.limit);
    if query.is_empty() {
        query = SearchQuery::new(vec![default_term.to_string()], Some(query.limit));
    }

    let results = fetch_all_terms(&adapter, &query.terms, query.limit).await;
    let count: usize = results.iter().map(|r| r.items.len()).sum();
    DiagnosticResponse {
        success: count > 0,
        source: source.to_string(),
        message: if count > 0 {
            format!("{source} returned {count} items.")
        } else {
            format!("{source} returned no items.")
        },
        results,
        count,
    }
}

async fn test_internship_source(
    State(state): State<AppState>,
    Path(source): Path<String>,
    body: Option<Json<SearchBody>>,
) -> Json<Value> {
    let resp = run_diagnostic(
        &state.internships,
        &source,
        body.map(|Json(b)| b),
        "internship",
    )
    .await;
    Json(sanitize::safe_json(&resp))
}

async fn test_event_source(
    State(state): State<AppState>,
    Path(source): Path<String>,
    body: Option<Json<SearchBody>>,
) -> Json<Value> {
    let resp = run_diagnostic(&state.events, &source, body.map(|Json(b)| b), "networking").await;
    Json(sanitize::safe_json(&resp))
}
