// src/aggregate/providers/mod.rs
pub mod eventbrite;
pub mod generated;
pub mod jsearch;
pub mod rapid_internships;
pub mod ticketmaster;

use std::sync::Arc;

use crate::aggregate::config::HttpSection;
use crate::aggregate::types::SourceAdapter;
use crate::ai_adapter::DynAiClient;

/// Which adapter chain a provider is being built for. The generated
/// fallback emits different placeholder content per domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Internships,
    Events,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Internships => "internships",
            Domain::Events => "events",
        }
    }
}

/// Registry mapping configured source names to adapter instances.
/// Unknown names yield `None`; the caller logs and skips them so one typo
/// in the config cannot take the whole chain down.
pub fn build_adapter(
    domain: Domain,
    name: &str,
    http: &HttpSection,
    ai: &DynAiClient,
) -> Option<Arc<dyn SourceAdapter>> {
    match name {
        "rapid" => Some(Arc::new(rapid_internships::RapidInternshipsAdapter::from_env(http))),
        "jsearch" => Some(Arc::new(jsearch::JsearchAdapter::from_env(http))),
        "eventbrite" => Some(Arc::new(eventbrite::EventbriteAdapter::from_env(http))),
        "ticketmaster" => Some(Arc::new(ticketmaster::TicketmasterAdapter::from_env(http))),
        "generated" => Some(Arc::new(generated::GeneratedAdapter::new(
            domain,
            Arc::clone(ai),
        ))),
        _ => None,
    }
}
