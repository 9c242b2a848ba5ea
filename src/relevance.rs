// src/relevance.rs
//! Term relevance: token matching and scoring over normalized listing
//! text. A listing matches a term when ANY whitespace-delimited token of
//! the term is a case-insensitive substring of the listing's searchable
//! text (title + description + tags).

use std::collections::BTreeSet;

use crate::aggregate::types::Listing;

/// Outcome of matching one term against one piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermMatch {
    pub matched: Vec<String>,
    /// Share of the term's tokens that matched, as 0–100.
    pub score: u8,
}

/// Split a term into lowercase tokens, dropping empties and duplicates
/// while preserving first-seen order.
pub fn tokenize(term: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for tok in term.split_whitespace() {
        let lower = tok.to_lowercase();
        if seen.insert(lower.clone()) {
            out.push(lower);
        }
    }
    out
}

/// Lowercased haystack a listing is matched against.
pub fn searchable_text(listing: &Listing) -> String {
    let mut text = String::with_capacity(
        listing.title.len() + listing.description.len() + 32,
    );
    text.push_str(&listing.title);
    text.push(' ');
    text.push_str(&listing.description);
    for tag in &listing.tags {
        text.push(' ');
        text.push_str(tag);
    }
    text.to_lowercase()
}

/// Match one term against free text. `None` when no token matches.
pub fn score(term: &str, haystack: &str) -> Option<TermMatch> {
    let tokens = tokenize(term);
    if tokens.is_empty() {
        return None;
    }
    let lower = haystack.to_lowercase();
    let matched: Vec<String> = tokens
        .iter()
        .filter(|t| lower.contains(t.as_str()))
        .cloned()
        .collect();
    if matched.is_empty() {
        return None;
    }
    let score = ((matched.len() * 100) / tokens.len()).min(100) as u8;
    Some(TermMatch { matched, score })
}

pub fn matches(term: &str, haystack: &str) -> bool {
    score(term, haystack).is_some()
}

/// Keep listings relevant to `term`, stamp their relevance score, and
/// truncate to `limit`. Order of surviving listings is preserved.
pub fn filter_listings(term: &str, listings: Vec<Listing>, limit: usize) -> Vec<Listing> {
    let mut out = Vec::new();
    for mut listing in listings {
        if out.len() >= limit {
            break;
        }
        if let Some(m) = score(term, &searchable_text(&listing)) {
            listing.relevance_score = Some(m.score);
            out.push(listing);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::types::ListingKind;

    fn listing(title: &str, description: &str, tags: &[&str]) -> Listing {
        Listing {
            id: "test-1".into(),
            title: title.into(),
            organization: "Acme".into(),
            organization_logo_url: None,
            url: "https://example.com".into(),
            category: "General".into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            kind: ListingKind::Internship,
            published_at: chrono::Utc::now(),
            location: "Remote".into(),
            compensation: None,
            description: description.into(),
            relevance_score: None,
        }
    }

    #[test]
    fn tokenize_lowercases_and_dedups() {
        assert_eq!(tokenize("Product  product DESIGN"), vec!["product", "design"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn any_token_substring_matches() {
        // Only one token of the term appears; that is enough.
        let m = score("Product Design", "senior designer wanted").expect("match");
        assert_eq!(m.matched, vec!["design"]);
        assert_eq!(m.score, 50);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(matches("MARKETING", "Marketing Intern (Summer)"));
        assert!(!matches("finance", "Marketing Intern (Summer)"));
    }

    #[test]
    fn all_tokens_matching_scores_full() {
        let m = score("data science", "Data Science Bootcamp").expect("match");
        assert_eq!(m.score, 100);
    }

    #[test]
    fn filter_checks_title_description_and_tags() {
        let items = vec![
            listing("Product Design Intern", "", &[]),
            listing("Campus role", "help with product launches", &[]),
            listing("Untitled", "", &["design"]),
            listing("Barista", "coffee", &["food"]),
        ];
        let kept = filter_listings("Product Design", items, 10);
        assert_eq!(kept.len(), 3);
        assert!(kept.iter().all(|l| l.relevance_score.is_some()));
    }

    #[test]
    fn filter_truncates_to_limit() {
        let items = vec![
            listing("Design Intern A", "", &[]),
            listing("Design Intern B", "", &[]),
            listing("Design Intern C", "", &[]),
        ];
        let kept = filter_listings("design", items, 2);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].title, "Design Intern A");
    }
}
