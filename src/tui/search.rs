//! Advanced fuzzy search with multi-term support using nucleo
//!
//! Provides fuse.js-like search capabilities:
//! - Multi-term search (whitespace splits terms, ALL must match)
//! - Weighted field scoring
//! - Smart case handling

use crate::data::Ticket;
use nucleo::{
    pattern::{CaseMatching, Normalization, Pattern},
    Config, Matcher, Utf32Str,
};

/// Fuzzy searcher with multi-term support
pub struct FuzzySearch {
    matcher: Matcher,
}

impl Default for FuzzySearch {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzySearch {
    pub fn new() -> Self {
        Self {
            matcher: Matcher::new(Config::DEFAULT),
        }
    }

    /// Match a single term against text, return score if matched
    fn match_term(&mut self, term: &str, haystack: &str) -> Option<u32> {
        if term.is_empty() || haystack.is_empty() {
            return if term.is_empty() { Some(0) } else { None };
        }

        let pattern = Pattern::parse(term, CaseMatching::Ignore, Normalization::Smart);
        let mut haystack_buf = Vec::new();
        let haystack_utf32 = Utf32Str::new(haystack, &mut haystack_buf);

        pattern.score(haystack_utf32, &mut self.matcher)
    }

    /// Multi-term search: split query on whitespace, ALL terms must match (AND semantics)
    /// Returns total score if all terms match, None otherwise
    pub fn multi_term_match(&mut self, query: &str, haystack: &str) -> Option<u32> {
        let terms: Vec<&str> = query.split_whitespace().collect();

        if terms.is_empty() {
            return Some(0);
        }

        let mut total_score = 0u32;

        for term in terms {
            match self.match_term(term, haystack) {
                Some(score) => total_score = total_score.saturating_add(score),
                None => return None, // Any term not matching = no match
            }
        }

        Some(total_score)
    }

    /// Best weighted score of `query` over a ticket's searchable text, or
    /// `None` when no field matches every term.
    pub fn score_ticket(&mut self, ticket: &Ticket, query: &str) -> Option<u32> {
        let mut fields: Vec<(&str, u32)> = vec![
            (&ticket.key, 10),
            (&ticket.summary, 8),
            (&ticket.status, 3),
            (ticket.assignee.as_deref().unwrap_or(""), 3),
            (ticket.description.as_deref().unwrap_or(""), 4),
        ];
        let sub_texts: Vec<String> = ticket
            .sub_tickets
            .iter()
            .map(|sub| format!("{} {}", sub.key, sub.summary))
            .collect();
        fields.extend(sub_texts.iter().map(|text| (text.as_str(), 2)));

        fields
            .into_iter()
            .filter_map(|(text, weight)| {
                self.multi_term_match(query, text)
                    .map(|score| score.saturating_mul(weight))
            })
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_term_match() {
        let mut search = FuzzySearch::new();
        assert!(search.multi_term_match("test", "this is a test").is_some());
        assert!(search.multi_term_match("xyz", "this is a test").is_none());
    }

    #[test]
    fn test_multi_term_match() {
        let mut search = FuzzySearch::new();
        // All terms must match
        assert!(search
            .multi_term_match("test case", "this is a test case")
            .is_some());
        assert!(search
            .multi_term_match("test xyz", "this is a test case")
            .is_none());
    }

    #[test]
    fn test_ticket_fields_are_searched() {
        let mut search = FuzzySearch::new();
        let ticket = Ticket {
            key: "EPM-42".to_string(),
            summary: "Login page crashes".to_string(),
            description: Some("Happens on Safari only".to_string()),
            sub_tickets: vec![crate::data::SubTicket {
                key: "EPM-43".to_string(),
                summary: "Write regression".to_string(),
                status: "To Do".to_string(),
                done: false,
            }],
            ..Ticket::default()
        };
        assert!(search.score_ticket(&ticket, "epm42").is_some());
        assert!(search.score_ticket(&ticket, "login crash").is_some());
        assert!(search.score_ticket(&ticket, "safari").is_some());
        assert!(search.score_ticket(&ticket, "regression").is_some());
        assert!(search.score_ticket(&ticket, "zebra").is_none());
    }

    #[test]
    fn test_terms_must_share_a_field() {
        let mut search = FuzzySearch::new();
        let ticket = Ticket {
            key: "EPM-42".to_string(),
            summary: "Login page".to_string(),
            status: "Blocked".to_string(),
            ..Ticket::default()
        };
        assert!(search.score_ticket(&ticket, "login blocked").is_none());
    }

    #[test]
    fn test_case_insensitive() {
        let mut search = FuzzySearch::new();
        assert!(search.multi_term_match("TEST", "this is a test").is_some());
        assert!(search.multi_term_match("Test", "THIS IS A TEST").is_some());
    }
}
