use serde::{Deserialize, Serialize};

/// Upper bound of the similarity scale reported by comparators.
pub const MAX_SCORE: f32 = 100.0;

/// Outcome of one pairwise comparison (captured image vs. one reference).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub matched: bool,
    /// Similarity in [0, 100], if the comparator reports one.
    pub score: Option<f32>,
}

impl ComparisonResult {
    /// A positive comparison with the given similarity.
    pub fn matched(score: f32) -> Self {
        Self {
            matched: true,
            score: sanitize_score(Some(score)),
        }
    }

    /// A negative comparison with no similarity attached.
    pub fn unmatched() -> Self {
        Self {
            matched: false,
            score: None,
        }
    }

    /// Build a result from raw comparator output, clamping the score.
    pub fn new(matched: bool, score: Option<f32>) -> Self {
        Self {
            matched,
            score: sanitize_score(score),
        }
    }

    /// Boolean equality outcome (hash comparison without a distance).
    pub fn from_equality(equal: bool) -> Self {
        Self {
            matched: equal,
            score: None,
        }
    }

    /// Score used for ranking and reporting a matched leg.
    ///
    /// A matched result without a score came from an exact equality check
    /// and counts as full similarity.
    pub fn effective_score(&self) -> f32 {
        sanitize_score(self.score).unwrap_or(MAX_SCORE)
    }
}

/// Whether `score` is a usable similarity: finite and within [0, 100].
pub fn is_valid_score(score: f32) -> bool {
    (0.0..=MAX_SCORE).contains(&score)
}

/// Clamp a score into [0, 100]; NaN is dropped.
fn sanitize_score(score: Option<f32>) -> Option<f32> {
    score
        .filter(|s| !s.is_nan())
        .map(|s| s.clamp(0.0, MAX_SCORE))
}

/// One comparison leg tagged with the label of its reference image.
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub label: String,
    pub result: ComparisonResult,
}

impl Leg {
    pub fn new(label: impl Into<String>, result: ComparisonResult) -> Self {
        Self {
            label: label.into(),
            result,
        }
    }
}

/// Final answer for one request, serialized directly as the response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDecision {
    pub match_found: bool,
    /// Similarity of the winning leg; always 0 when nothing matched.
    pub similarity: f32,
    /// Label of the reference image that matched.
    #[serde(
        rename = "matchedImage",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub matched_label: Option<String>,
}

impl MatchDecision {
    pub fn no_match() -> Self {
        Self {
            match_found: false,
            similarity: 0.0,
            matched_label: None,
        }
    }

    pub fn found(leg: &Leg) -> Self {
        Self {
            match_found: true,
            similarity: leg.result.effective_score(),
            matched_label: Some(leg.label.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_is_clamped() {
        assert_eq!(ComparisonResult::matched(150.0).score, Some(100.0));
        assert_eq!(ComparisonResult::matched(-3.0).score, Some(0.0));
    }

    #[test]
    fn test_nan_score_dropped() {
        let r = ComparisonResult::new(true, Some(f32::NAN));
        assert_eq!(r.score, None);
        assert_eq!(r.effective_score(), MAX_SCORE);
    }

    #[test]
    fn test_valid_score_range() {
        assert!(is_valid_score(0.0));
        assert!(is_valid_score(80.0));
        assert!(is_valid_score(MAX_SCORE));
        assert!(!is_valid_score(-0.5));
        assert!(!is_valid_score(100.5));
        assert!(!is_valid_score(f32::NAN));
        assert!(!is_valid_score(f32::INFINITY));
    }

    #[test]
    fn test_equality_result_has_no_score() {
        let r = ComparisonResult::from_equality(true);
        assert!(r.matched);
        assert!(r.score.is_none());
    }

    #[test]
    fn test_decision_serialization_found() {
        let leg = Leg::new("image2", ComparisonResult::matched(91.5));
        let json = serde_json::to_value(MatchDecision::found(&leg)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "matchFound": true,
                "similarity": 91.5,
                "matchedImage": "image2",
            })
        );
    }

    #[test]
    fn test_decision_serialization_no_match_omits_label() {
        let json = serde_json::to_value(MatchDecision::no_match()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "matchFound": false, "similarity": 0.0 })
        );
    }
}
