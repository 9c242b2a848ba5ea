// tests/aggregate_fallback.rs
//
// Fallback-chain behavior over real adapter implementations driven by
// fixture payloads: primary down, secondary carrying, and the
// generated catch-all when everything else fails.

use std::sync::Arc;

use opportunity_aggregator::aggregate::providers::jsearch::JsearchAdapter;
use opportunity_aggregator::aggregate::providers::rapid_internships::RapidInternshipsAdapter;
use opportunity_aggregator::aggregate::providers::{generated::GeneratedAdapter, Domain};
use opportunity_aggregator::aggregate::types::{SearchQuery, SourceAdapter};
use opportunity_aggregator::aggregate::Orchestrator;
use opportunity_aggregator::ai_adapter::DisabledClient;

const JSEARCH_ONE_HIT: &str = r#"{
    "status": "OK",
    "data": [
        {
            "job_id": "pd-77",
            "job_title": "Product Design Intern",
            "employer_name": "Nimbus Works",
            "job_apply_link": "https://boards.example.com/pd-77",
            "job_description": "Support the product design team.",
            "job_city": "Denver",
            "job_country": "US"
        },
        {
            "job_title": "Forklift Operator",
            "employer_name": "Depot Inc"
        }
    ]
}"#;

/// An adapter whose payload never parses, standing in for a provider
/// outage.
fn broken_rapid() -> Arc<dyn SourceAdapter> {
    Arc::new(RapidInternshipsAdapter::from_fixture("service unavailable"))
}

fn broken_jsearch() -> Arc<dyn SourceAdapter> {
    Arc::new(JsearchAdapter::from_fixture("<html>502</html>"))
}

fn generated() -> Arc<dyn SourceAdapter> {
    Arc::new(GeneratedAdapter::new(
        Domain::Internships,
        Arc::new(DisabledClient),
    ))
}

fn query(terms: &[&str], limit: usize) -> SearchQuery {
    SearchQuery::new(terms.iter().map(|t| t.to_string()).collect(), Some(limit))
}

#[tokio::test]
async fn secondary_source_carries_when_primary_is_down() {
    let orchestrator = Orchestrator::new(
        "internships",
        vec![
            broken_rapid(),
            Arc::new(JsearchAdapter::from_fixture(JSEARCH_ONE_HIT)),
            generated(),
        ],
    );

    let resp = orchestrator.run(&query(&["Product Design"], 2)).await;

    assert!(resp.success);
    assert!(!resp.fallback_used);
    assert_eq!(resp.count, 1, "only the relevant listing survives: {resp:?}");

    let results = &resp.by_source["jsearch"];
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].items[0].title, "Product Design Intern");
    assert!(!results[0].synthetic);
    assert!(!resp.by_source.contains_key("generated"), "fallback absent");

    // Bookkeeping: rapid ran and failed, jsearch counted, generated untried.
    let run = |name: &str| {
        resp.adapters
            .iter()
            .find(|r| r.source == name)
            .cloned()
            .unwrap_or_else(|| panic!("missing bookkeeping for {name}"))
    };
    assert!(run("rapid").ran && run("rapid").items == 0);
    assert!(run("jsearch").counted_real);
    assert!(!run("generated").ran);
}

#[tokio::test]
async fn all_providers_down_yields_flagged_synthetic_content() {
    let orchestrator = Orchestrator::new(
        "internships",
        vec![broken_rapid(), broken_jsearch(), generated()],
    );

    let resp = orchestrator.run(&query(&["Marketing"], 5)).await;

    assert!(resp.success);
    assert!(resp.fallback_used);
    assert_eq!(resp.by_source.len(), 1, "only the generated source: {resp:?}");
    for result in &resp.by_source["generated"] {
        assert!(result.synthetic);
        assert!(!result.items.is_empty());
    }
    assert!(
        resp.message.contains("generated"),
        "message flags fallback content: {}",
        resp.message
    );
}

#[tokio::test]
async fn total_failure_without_fallback_is_not_success() {
    let orchestrator = Orchestrator::new("internships", vec![broken_rapid(), broken_jsearch()]);

    let resp = orchestrator.run(&query(&["Marketing"], 5)).await;

    assert!(!resp.success);
    assert_eq!(resp.count, 0);
    assert!(resp.by_source.is_empty());
    assert!(resp.adapters.iter().all(|r| r.ran));
}

#[tokio::test]
async fn multiple_terms_fan_out_within_one_adapter() {
    let orchestrator = Orchestrator::new(
        "internships",
        vec![Arc::new(JsearchAdapter::from_fixture(JSEARCH_ONE_HIT)) as Arc<dyn SourceAdapter>],
    );

    // Both terms hit the same fixture; one matches design, one matches
    // the forklift listing.
    let resp = orchestrator.run(&query(&["Design", "Forklift"], 3)).await;

    assert!(resp.success);
    let results = &resp.by_source["jsearch"];
    assert_eq!(results.len(), 2, "one SourceResult per productive term");
    assert_eq!(results[0].query, "Design");
    assert_eq!(results[1].query, "Forklift");
}
