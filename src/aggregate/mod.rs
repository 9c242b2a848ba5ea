// src/aggregate/mod.rs
pub mod config;
pub mod normalize;
pub mod providers;
pub mod types;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;

use crate::aggregate::types::{
    AdapterError, AdapterRun, AggregateResponse, Listing, SearchQuery, SourceAdapter, SourceResult,
};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("aggregate_requests_total", "Aggregation runs started.");
        describe_counter!(
            "aggregate_items_total",
            "Listings returned across all responses."
        );
        describe_counter!(
            "aggregate_adapter_errors_total",
            "Adapter term-lookups that failed."
        );
        describe_counter!(
            "aggregate_fallback_total",
            "Responses served from the generated fallback."
        );
        describe_counter!(
            "aggregate_empty_total",
            "Responses where every source, fallback included, failed."
        );
        describe_histogram!("aggregate_adapter_ms", "Wall time per adapter invocation.");
    });
}

/// Tries adapters in fixed priority order, short-circuiting on the first
/// non-empty genuine result set; the synthetic catch-all only serves when
/// everything ahead of it came up empty.
pub struct Orchestrator {
    domain: &'static str,
    adapters: Vec<Arc<dyn SourceAdapter>>,
}

impl Orchestrator {
    pub fn new(domain: &'static str, adapters: Vec<Arc<dyn SourceAdapter>>) -> Self {
        Self { domain, adapters }
    }

    pub fn domain(&self) -> &'static str {
        self.domain
    }

    pub fn adapter_names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// Look up one adapter by name (diagnostic endpoints).
    pub fn adapter(&self, name: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters
            .iter()
            .find(|a| a.name() == name)
            .map(Arc::clone)
    }

    pub async fn run(&self, query: &SearchQuery) -> AggregateResponse {
        ensure_metrics_described();
        counter!("aggregate_requests_total", "domain" => self.domain).increment(1);

        if query.is_empty() {
            return AggregateResponse {
                success: false,
                by_source: BTreeMap::new(),
                count: 0,
                fallback_used: false,
                adapters: self
                    .adapters
                    .iter()
                    .map(|a| AdapterRun {
                        source: a.name().to_string(),
                        ran: false,
                        items: 0,
                        counted_real: false,
                    })
                    .collect(),
                message: "Add at least one search term to get results.".to_string(),
            };
        }

        let mut runs: Vec<AdapterRun> = Vec::with_capacity(self.adapters.len());
        let mut by_source: BTreeMap<String, Vec<SourceResult>> = BTreeMap::new();
        let mut total = 0usize;
        let mut fallback_used = false;

        for (idx, adapter) in self.adapters.iter().enumerate() {
            let t0 = Instant::now();
            let results = fetch_all_terms(adapter, &query.terms, query.limit).await;
            histogram!("aggregate_adapter_ms", "source" => adapter.name())
                .record(t0.elapsed().as_secs_f64() * 1_000.0);

            let items: usize = results.iter().map(|r| r.items.len()).sum();
            let counted_real = items > 0 && !adapter.synthetic();
            runs.push(AdapterRun {
                source: adapter.name().to_string(),
                ran: true,
                items,
                counted_real,
            });

            if items > 0 {
                if adapter.synthetic() {
                    fallback_used = true;
                }
                total += items;
                by_source.insert(adapter.name().to_string(), results);
            }

            if counted_real {
                // Short-circuit: later adapters are never invoked, but
                // they still appear in the bookkeeping.
                for rest in &self.adapters[idx + 1..] {
                    runs.push(AdapterRun {
                        source: rest.name().to_string(),
                        ran: false,
                        items: 0,
                        counted_real: false,
                    });
                }
                counter!("aggregate_items_total", "domain" => self.domain)
                    .increment(total as u64);
                return AggregateResponse {
                    success: true,
                    by_source,
                    count: total,
                    fallback_used,
                    adapters: runs,
                    message: format!("Found {total} results from {}.", adapter.name()),
                };
            }
        }

        // Exhausted the chain without a genuine success.
        if total > 0 {
            counter!("aggregate_fallback_total", "domain" => self.domain).increment(1);
            counter!("aggregate_items_total", "domain" => self.domain).increment(total as u64);
            AggregateResponse {
                success: true,
                by_source,
                count: total,
                fallback_used,
                adapters: runs,
                message: format!(
                    "Live sources are unavailable right now; showing {total} generated suggestions."
                ),
            }
        } else {
            counter!("aggregate_empty_total", "domain" => self.domain).increment(1);
            AggregateResponse {
                success: false,
                by_source,
                count: 0,
                fallback_used: false,
                adapters: runs,
                message: "All sources are currently unavailable. Try again in a few minutes."
                    .to_string(),
            }
        }
    }
}

/// Fan out one adapter's per-term lookups concurrently and collect the
/// surviving results in term order. Failures are logged and skipped so
/// one term's outage cannot block its siblings.
pub async fn fetch_all_terms(
    adapter: &Arc<dyn SourceAdapter>,
    terms: &[String],
    limit: usize,
) -> Vec<SourceResult> {
    let mut set: JoinSet<(usize, String, Result<Vec<Listing>, AdapterError>)> = JoinSet::new();
    for (idx, term) in terms.iter().enumerate() {
        let adapter = Arc::clone(adapter);
        let term = term.clone();
        set.spawn(async move {
            let out = adapter.fetch_term(&term, limit).await;
            (idx, term, out)
        });
    }

    let mut slots: Vec<Option<SourceResult>> = vec![None; terms.len()];
    while let Some(joined) = set.join_next().await {
        let Ok((idx, term, outcome)) = joined else {
            tracing::warn!(source = adapter.name(), "term lookup task panicked");
            counter!("aggregate_adapter_errors_total", "source" => adapter.name()).increment(1);
            continue;
        };
        match outcome {
            Ok(items) if !items.is_empty() => {
                slots[idx] = Some(SourceResult {
                    source: adapter.name().to_string(),
                    query: term,
                    synthetic: adapter.synthetic(),
                    items,
                });
            }
            // Terms yielding nothing are silently skipped.
            Ok(_) | Err(AdapterError::NoRelevantResults) => {
                tracing::debug!(source = adapter.name(), term = %term, "no relevant results");
            }
            Err(err) => {
                tracing::warn!(source = adapter.name(), term = %term, error = %err, "adapter error");
                counter!("aggregate_adapter_errors_total", "source" => adapter.name()).increment(1);
            }
        }
    }
    slots.into_iter().flatten().collect()
}
