//! Match decision policy.
//!
//! Folds zero, one or two comparison legs into a single [`MatchDecision`].
//! Each leg is accepted on its own: a leg counts when its comparator
//! reported a match and, if a minimum similarity is configured, its score
//! is strictly above it. Among accepted legs the higher score wins and a
//! tie goes to the first leg.

use crate::types::{Leg, MatchDecision};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatchPolicy {
    /// Accepted legs must score strictly above this. `None` accepts any
    /// leg the comparator reported as matched.
    pub min_similarity: Option<f32>,
}

impl MatchPolicy {
    /// Policy gated on a minimum similarity.
    pub fn with_min_similarity(min_similarity: f32) -> Self {
        Self {
            min_similarity: Some(min_similarity),
        }
    }

    /// Whether a single leg qualifies as a match under this policy.
    pub fn accepts(&self, leg: &Leg) -> bool {
        if !leg.result.matched {
            return false;
        }
        match self.min_similarity {
            Some(min) => leg.result.effective_score() > min,
            None => true,
        }
    }

    /// Decide the best match among the supplied legs.
    ///
    /// Absent legs (not supplied, or whose comparison failed) are skipped.
    pub fn decide(&self, first: Option<&Leg>, second: Option<&Leg>) -> MatchDecision {
        let first = first.filter(|leg| self.accepts(leg));
        let second = second.filter(|leg| self.accepts(leg));

        let winner = match (first, second) {
            (Some(a), Some(b)) => {
                if b.result.effective_score() > a.result.effective_score() {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };

        match winner {
            Some(leg) => {
                tracing::debug!(
                    label = %leg.label,
                    similarity = leg.result.effective_score(),
                    "match selected"
                );
                MatchDecision::found(leg)
            }
            None => MatchDecision::no_match(),
        }
    }
}
