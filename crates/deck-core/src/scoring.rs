//! Aggregate scoring of analysis documents
//!
//! Scoring never fails. Malformed entries contribute zero.

use deck_artifact::{AnalysisDocument, AnalysisItem};
use serde_json::Value;

/// Minimum total score for a deck to pass round-1 screening
///
/// Policy value shared with the analysis prompts; changing it changes which
/// decks reach round 2.
pub const PASS_THRESHOLD: i64 = 115;

/// Pure scoring functions
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    /// Sum of `Score` over every item of every list-valued category except
    /// the reserved `Overview`
    ///
    /// Saturates at the `i64` bounds.
    #[must_use]
    pub fn total_score(document: &AnalysisDocument) -> i64 {
        document
            .scored_categories()
            .filter_map(|(_, value)| match value {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .flatten()
            .map(AnalysisItem::score_of)
            .fold(0i64, i64::saturating_add)
    }

    /// `score >= PASS_THRESHOLD`
    #[inline]
    #[must_use]
    pub fn passes_threshold(score: i64) -> bool {
        score >= PASS_THRESHOLD
    }

    /// Total score and pass/fail for a document
    #[must_use]
    pub fn evaluate(document: &AnalysisDocument) -> (i64, bool) {
        let total = Self::total_score(document);
        (total, Self::passes_threshold(total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn threshold_boundary() {
        assert!(!ScoringEngine::passes_threshold(114));
        assert!(ScoringEngine::passes_threshold(115));
    }

    #[test]
    fn empty_document_scores_zero() {
        assert_eq!(ScoringEngine::total_score(&AnalysisDocument::new()), 0);
    }

    #[test]
    fn overview_and_non_list_categories_are_ignored() {
        let doc = AnalysisDocument::from_value(json!({
            "Team": [{"Criteria": "Founders", "Score": 40, "Explanation": "..."}],
            "Overview": [{"Score": 1000}],
            "Notes": "n/a",
            "Extra": {"Score": 5}
        }));
        assert_eq!(ScoringEngine::total_score(&doc), 40);
    }

    #[test]
    fn malformed_items_contribute_zero() {
        let doc = AnalysisDocument::from_value(json!({
            "Team": [
                {"Criteria": "Founders", "Score": 9},
                {"Criteria": "Advisors"},
                {"Criteria": "Hiring", "Score": "high"},
                "free text",
                null
            ]
        }));
        assert_eq!(ScoringEngine::total_score(&doc), 9);
    }

    #[test]
    fn huge_scores_saturate() {
        let doc = AnalysisDocument::from_value(json!({
            "Team": [{"Score": i64::MAX}, {"Score": 1}],
            "Market": [{"Score": i64::MAX}]
        }));
        assert_eq!(ScoringEngine::evaluate(&doc), (i64::MAX, true));

        let negative = AnalysisDocument::from_value(json!({
            "Team": [{"Score": i64::MIN}, {"Score": -1}]
        }));
        assert_eq!(ScoringEngine::total_score(&negative), i64::MIN);
    }

    #[test]
    fn flat_and_grouped_shapes_score_alike() {
        let grouped = AnalysisDocument::from_value(json!({
            "Team": [{"Score": 40}],
            "Market": [{"Score": 80}]
        }));
        let flat = AnalysisDocument::from_value(json!({
            "DetailedAnalysis": [
                {"Category": "Team", "Score": 40},
                {"Category": "Market", "Score": 80}
            ]
        }));
        assert_eq!(ScoringEngine::evaluate(&grouped), (120, true));
        assert_eq!(ScoringEngine::evaluate(&flat), (120, true));
    }
}
